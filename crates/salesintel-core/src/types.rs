//! Domain types used by the vector store and the query agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type DocumentId = String;

/// One result row from the structured store, columns kept in query order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Closed set of document tags stored alongside each embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    LeadNote,
    CustomerNote,
    CampaignContent,
    SalesNote,
    Insight,
}

impl DocumentType {
    pub const ALL: [DocumentType; 5] = [
        DocumentType::LeadNote,
        DocumentType::CustomerNote,
        DocumentType::CampaignContent,
        DocumentType::SalesNote,
        DocumentType::Insight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::LeadNote => "lead_note",
            DocumentType::CustomerNote => "customer_note",
            DocumentType::CampaignContent => "campaign_content",
            DocumentType::SalesNote => "sales_note",
            DocumentType::Insight => "insight",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::NotFound(format!("document type '{s}'")))
    }
}

/// Composite key of the foreign entity a document was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_table: String,
    pub source_id: i64,
}

impl SourceRef {
    pub fn new(source_table: impl Into<String>, source_id: i64) -> Self {
        Self { source_table: source_table.into(), source_id }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_table, self.source_id)
    }
}

/// Input to the indexer before an embedding has been computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub content: String,
    pub document_type: DocumentType,
    pub source: SourceRef,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A persisted document with its embedding.
///
/// `seq` is assigned by the repository on first insert and is the
/// secondary ordering key when two documents score the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: DocumentId,
    pub seq: i64,
    pub content: String,
    pub document_type: DocumentType,
    pub source: SourceRef,
    pub embedding: Vec<f32>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A document returned by a nearest-neighbour lookup with its cosine distance.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: VectorDocument,
    pub distance: f32,
}

/// Similarity hit handed back to callers. `similarity` lies in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: DocumentId,
    pub content: String,
    pub document_type: DocumentType,
    pub source: SourceRef,
    pub metadata: Option<serde_json::Value>,
    pub similarity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a chat transcript, also the unit sent to the text oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_round_trips_through_its_tag() {
        for t in DocumentType::ALL {
            assert_eq!(t.as_str().parse::<DocumentType>().ok(), Some(t));
        }
        assert_eq!("Lead_Note".parse::<DocumentType>().ok(), Some(DocumentType::LeadNote));
        assert!("memo".parse::<DocumentType>().is_err());
    }

    #[test]
    fn document_type_serializes_snake_case() {
        let json = serde_json::to_string(&DocumentType::CampaignContent).expect("json");
        assert_eq!(json, "\"campaign_content\"");
    }

    #[test]
    fn chat_turn_roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatTurn::assistant("hi")).expect("json");
        assert_eq!(json["role"], "assistant");
    }
}
