//! Conversational Query Agent and Insight Synthesizer.
//!
//! [`QueryAgent`] turns a chat message into a validated read-only query,
//! runs it and summarizes the rows; history lives in the [`AgentContext`]
//! passed in by the caller. [`InsightSynthesizer`] turns aggregated metrics
//! into a narrative report.

pub mod agent;
pub mod conversation;
pub mod insights;

pub use agent::{with_knowledge_context, ChatResponse, QueryAgent, APOLOGY, NO_DATA, REFUSAL};
pub use conversation::{AgentContext, ConversationStore};
pub use insights::{Insight, InsightKind, InsightSynthesizer, MetricSnapshot, MetricValue, RawInsight};
