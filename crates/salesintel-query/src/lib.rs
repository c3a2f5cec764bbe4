//! Query side of the chat agent: the safety validator, the NL-to-query
//! translator and a read-only SQLite executor.
#![deny(unused_imports)]

pub mod sqlite;
pub mod translator;
pub mod validator;

pub use sqlite::SqliteExecutor;
pub use translator::{Translator, CANNOT_ANSWER};
pub use validator::{QueryValidator, RejectReason, Verdict};
