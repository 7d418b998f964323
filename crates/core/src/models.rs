use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One retrievable window of a document's extracted text.
///
/// Serialized with camelCase keys (`content`, `chunkIndex`, `pageNumber`) so
/// persisted chunks read the same as the upload service's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub content: String,
    pub chunk_index: usize,
    #[serde(default)]
    pub page_number: u32,
}

impl Chunk {
    pub fn new(chunk_index: usize, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            chunk_index,
            page_number: 0,
        }
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// A chunk annotated with its lexical score for a single query. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Processing,
    Ready,
    Failed,
}

impl DocumentStatus {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "processing" => Some(Self::Processing),
            "ready" => Some(Self::Ready),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub file_name: String,
    pub file_size: u64,
    pub status: DocumentStatus,
    pub error: Option<String>,
    pub extracted_text: String,
    pub chunks: Vec<Chunk>,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Ready
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub file_name: String,
    pub file_size: u64,
    pub status: DocumentStatus,
    pub error: Option<String>,
    pub chunk_count: usize,
    pub preview: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// `chunk_index` values the message was grounded on; empty for user turns.
    pub relevant_chunks: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub document_id: String,
    pub question: String,
    pub answer: String,
    pub relevant_chunks: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptExplanation {
    pub document_id: String,
    pub concept: String,
    pub explanation: String,
    pub relevant_chunks: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSummary {
    pub document_id: String,
    pub title: String,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_uses_camel_case_keys() {
        let value = serde_json::to_value(Chunk::new(4, "deep learning")).unwrap();
        assert_eq!(value["chunkIndex"], 4);
        assert_eq!(value["pageNumber"], 0);
        assert_eq!(value["content"], "deep learning");
    }

    #[test]
    fn scored_chunk_flattens_chunk_fields() {
        let scored = ScoredChunk {
            chunk: Chunk::new(1, "cooking recipes"),
            score: 2,
        };
        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["chunkIndex"], 1);
        assert_eq!(value["score"], 2);
    }

    #[test]
    fn page_number_defaults_when_missing() {
        let chunk: Chunk =
            serde_json::from_str(r#"{"content":"alpha","chunkIndex":0}"#).unwrap();
        assert_eq!(chunk.page_number, 0);
    }

    #[test]
    fn status_codes_round_trip_through_parse() {
        for status in [
            DocumentStatus::Processing,
            DocumentStatus::Ready,
            DocumentStatus::Failed,
        ] {
            assert_eq!(DocumentStatus::parse(status.as_code()), Some(status));
        }
        assert_eq!(DocumentStatus::parse("archived"), None);
    }
}
