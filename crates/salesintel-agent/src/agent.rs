use serde::Serialize;
use std::sync::Arc;

use salesintel_core::config::AgentSettings;
use salesintel_core::schema::SchemaDescription;
use salesintel_core::traits::{CompletionRequest, QueryExecutor, TextGenerator};
use salesintel_core::types::{ChatTurn, DocumentType, Row};
use salesintel_core::{Error, Result};
use salesintel_query::{QueryValidator, Translator, Verdict};
use salesintel_vector::VectorStore;

use crate::conversation::AgentContext;

pub const REFUSAL: &str =
    "I can only help with data queries. Please ask about your sales, leads, campaigns, or customers.";
pub const APOLOGY: &str = "I encountered an error processing your request. Please try rephrasing your question.";
pub const NO_DATA: &str = "I couldn't find any data matching your query.";

const SUMMARY_SYSTEM: &str = "You are a helpful sales analytics assistant. Provide clear, concise insights \
based on the data. Format numbers nicely (use commas for thousands, currency symbols where appropriate). \
Keep responses focused and actionable. If showing multiple records, summarize the key findings.";
const SUMMARY_TEMPERATURE: f32 = 0.5;
const SUMMARY_MAX_TOKENS: u32 = 800;

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    /// The validated query that produced `data`; absent on refusal or failure.
    pub query: Option<String>,
    pub data: Option<Vec<Row>>,
    pub conversation_id: String,
}

/// Conversational Query Agent: translate, validate, execute, summarize.
pub struct QueryAgent {
    context: Arc<AgentContext>,
    translator: Translator,
    validator: QueryValidator,
    executor: Arc<dyn QueryExecutor>,
    oracle: Arc<dyn TextGenerator>,
    row_limit: usize,
    summary_sample_rows: usize,
    knowledge: Option<(Arc<VectorStore>, usize)>,
}

/// Wrap `question` with knowledge-base context; unchanged when `context` is empty.
pub fn with_knowledge_context(question: &str, context: &str) -> String {
    if context.is_empty() {
        return question.to_string();
    }
    format!("Using the following context from our knowledge base:\n\n{context}\n\n---\n\nAnswer this question: {question}")
}

impl QueryAgent {
    pub fn new(
        context: Arc<AgentContext>,
        translator: Translator,
        validator: QueryValidator,
        executor: Arc<dyn QueryExecutor>,
        oracle: Arc<dyn TextGenerator>,
        settings: &AgentSettings,
    ) -> Self {
        Self {
            context,
            translator,
            validator,
            executor,
            oracle,
            row_limit: settings.row_limit,
            summary_sample_rows: settings.summary_sample_rows,
            knowledge: None,
        }
    }

    /// Let [`QueryAgent::process_message_with_context`] pull notes from `store`
    /// within `token_budget`.
    pub fn with_knowledge(mut self, store: Arc<VectorStore>, token_budget: usize) -> Self {
        self.knowledge = Some((store, token_budget));
        self
    }

    /// Wire translator and validator from settings over the sales schema.
    pub fn from_settings(
        context: Arc<AgentContext>,
        oracle: Arc<dyn TextGenerator>,
        executor: Arc<dyn QueryExecutor>,
        settings: &AgentSettings,
    ) -> Result<Self> {
        let translator = Translator::new(
            Arc::clone(&oracle),
            SchemaDescription::sales(),
            settings.translator_turns,
            settings.row_limit,
        );
        let validator = QueryValidator::new(&settings.allowed_entities, settings.max_query_chars)?;
        Ok(Self::new(context, translator, validator, executor, oracle, settings))
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        &self.context
    }

    /// Handle one user message.
    ///
    /// Refusals and execution failures come back as `Ok` with a fixed answer
    /// and leave the history untouched. Translation and summarization
    /// failures are returned as errors.
    pub async fn process_message(&self, message: &str, conversation_id: Option<&str>) -> Result<ChatResponse> {
        let conversations = &self.context.conversations;
        let conversation_id = conversations.resolve(conversation_id);
        let history = conversations.history(&conversation_id).await;

        let candidate = self.translator.translate(message, &history).await?;

        if let Verdict::Rejected(reason) = self.validator.validate(&candidate) {
            tracing::warn!(target: "agent", conversation = %conversation_id, reason = reason.code(), query = %candidate, "candidate query rejected");
            return Ok(ChatResponse { answer: REFUSAL.to_string(), query: None, data: None, conversation_id });
        }

        // One extra row tells a full result from a cut one.
        let mut rows = match self.executor.fetch_rows(&candidate, self.row_limit.saturating_add(1)).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(target: "agent", conversation = %conversation_id, error = ?e, query = %candidate, "query execution failed");
                return Ok(ChatResponse { answer: APOLOGY.to_string(), query: None, data: None, conversation_id });
            }
        };
        let capped = rows.len() > self.row_limit;
        rows.truncate(self.row_limit);
        tracing::info!(target: "agent", conversation = %conversation_id, rows = rows.len(), capped, "query executed");

        let answer = self.summarize(message, &rows, capped).await?;
        conversations.record_exchange(&conversation_id, message, &answer).await;

        let data = if rows.is_empty() { None } else { Some(rows) };
        Ok(ChatResponse { answer, query: Some(candidate), data, conversation_id })
    }

    /// Same as [`QueryAgent::process_message`], with the question first
    /// wrapped in context assembled from the knowledge base. Without a store
    /// attached this is an [`Error::InvalidConfig`].
    pub async fn process_message_with_context(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        document_type: Option<DocumentType>,
    ) -> Result<ChatResponse> {
        let Some((store, budget)) = &self.knowledge else {
            return Err(Error::InvalidConfig("no knowledge base attached to the agent".into()));
        };
        let context = store.assemble_context(message, document_type, *budget).await?;
        tracing::debug!(target: "agent", context_chars = context.chars().count(), "assembled knowledge context");
        self.process_message(&with_knowledge_context(message, &context), conversation_id).await
    }

    async fn summarize(&self, question: &str, rows: &[Row], capped: bool) -> Result<String> {
        if rows.is_empty() {
            return Ok(NO_DATA.to_string());
        }
        let sample = &rows[..rows.len().min(self.summary_sample_rows)];
        let sample_text = serde_json::to_string(sample).map_err(|e| Error::Operation(format!("serializing sample rows: {e}")))?;
        let total = if capped { format!("more than {}", rows.len()) } else { rows.len().to_string() };
        let prompt = format!(
            "Question: {question}\n\nQuery returned {total} rows. Sample data:\n{sample_text}\n\n\
             Provide a helpful response summarizing the data and any insights."
        );
        let request = CompletionRequest::new(
            vec![ChatTurn::system(SUMMARY_SYSTEM), ChatTurn::user(prompt)],
            SUMMARY_TEMPERATURE,
            SUMMARY_MAX_TOKENS,
        );
        self.oracle.complete(request).await
    }
}
