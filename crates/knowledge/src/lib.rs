//! Knowledge base management for Concierge.
//!
//! Named knowledge bases, each stored as a SQLite file of embedded text
//! chunks. The RAG agent searches one or more of them per query and ranks
//! the merged hits by cosine distance.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod parser;
pub mod registry;
pub mod retrieval;
pub mod types;
pub mod vector_index;


pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::SqliteIndex;
pub use ingest::{ingest_folder, ingest_texts, load_documents_from_folder, IngestStats};
pub use registry::KnowledgeRegistry;
pub use retrieval::{build_context, RetrievalOutcome, RetrievalSettings, RetrievedPassage};
pub use types::{CollectionStats, KnowledgeChunk, KnowledgeSource, Metadata};
pub use vector_index::VectorIndex;
