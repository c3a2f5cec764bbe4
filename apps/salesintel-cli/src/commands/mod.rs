pub mod chat;
pub mod documents;
pub mod insight;
pub mod retrieval;
