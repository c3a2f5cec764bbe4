//! Vector Store Engine.
//!
//! [`VectorStore`] owns the embedding gateway and a [`VectorRepository`]
//! (LanceDB on disk, or the in-memory store for tests and small tools) and
//! provides indexing, similarity search and token-budgeted context assembly.
//!
//! [`VectorRepository`]: salesintel_core::traits::VectorRepository

pub mod context;
pub mod lance;
pub mod memory;
pub mod schema;
pub mod store;
pub mod table;

pub use context::{assemble, CONTEXT_SEPARATOR};
pub use lance::LanceVectorStore;
pub use memory::MemoryVectorStore;
pub use store::VectorStore;
