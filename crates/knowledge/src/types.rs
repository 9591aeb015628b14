//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form document metadata (`source`, `file_type`, `knowledge_base`, ...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A document added to a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// Unique source identifier
    pub id: String,

    /// File path, when the text came from a file
    pub path: Option<String>,

    /// "text", "markdown", "inline"
    pub content_type: String,

    pub learned_at: DateTime<Utc>,

    pub size_bytes: u64,
}

/// A text chunk with embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Source metadata plus chunk offsets
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Statistics for one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Knowledge base name
    pub name: String,

    /// Backing collection name
    pub collection_name: String,

    pub description: String,

    /// Number of stored chunks
    pub vectors_count: u64,

    pub sources_count: u64,
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub source_id: String,
    pub position: u32,
    pub text: String,
    pub metadata: serde_json::Value,
}
