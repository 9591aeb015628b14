//! Named knowledge bases, each backed by its own vector index.

use crate::chunker::chunk_text;
use crate::embeddings::EmbeddingProvider;
use crate::index::SqliteIndex;
use crate::retrieval::{
    rank, select_collections, similarity_to_distance, RetrievalOutcome, RetrievalSettings,
    RetrievedPassage,
};
use crate::types::{CollectionStats, KnowledgeChunk, KnowledgeSource, Metadata};
use crate::vector_index::VectorIndex;
use chrono::Utc;
use concierge_core::{AppError, AppResult, KnowledgeBaseSpec};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

const DEFAULT_CHUNK_SIZE: usize = 512;
const DEFAULT_CHUNK_OVERLAP: usize = 50;

struct Collection {
    spec: KnowledgeBaseSpec,
    index: Box<dyn VectorIndex>,
}

/// The set of configured knowledge bases plus the embedder shared by all of
/// them. Collection order follows configuration order; the first one is the
/// default target for ingestion.
pub struct KnowledgeRegistry {
    collections: Vec<Collection>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl std::fmt::Debug for KnowledgeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeRegistry")
            .field("collections", &self.names())
            .field("embedder", &self.embedder)
            .finish()
    }
}

impl KnowledgeRegistry {
    /// Open one SQLite file per knowledge base under `dir`, creating
    /// missing ones.
    pub fn open(
        dir: &Path,
        specs: &[KnowledgeBaseSpec],
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        let mut indexes: Vec<(KnowledgeBaseSpec, Box<dyn VectorIndex>)> =
            Vec::with_capacity(specs.len());
        for spec in specs {
            let path = dir.join(format!("{}.sqlite", spec.collection));
            let index = SqliteIndex::open(&path)?;
            indexes.push((spec.clone(), Box::new(index)));
        }

        let registry = Self::with_indexes(indexes, embedder);
        tracing::info!(
            "Initialized {} knowledge bases in {:?}",
            registry.len(),
            dir
        );
        Ok(registry)
    }

    /// Knowledge bases held in memory only.
    pub fn in_memory(
        specs: &[KnowledgeBaseSpec],
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        let mut indexes: Vec<(KnowledgeBaseSpec, Box<dyn VectorIndex>)> =
            Vec::with_capacity(specs.len());
        for spec in specs {
            indexes.push((spec.clone(), Box::new(SqliteIndex::open_in_memory()?)));
        }
        Ok(Self::with_indexes(indexes, embedder))
    }

    /// Build from already opened indexes.
    pub fn with_indexes(
        indexes: Vec<(KnowledgeBaseSpec, Box<dyn VectorIndex>)>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            collections: indexes
                .into_iter()
                .map(|(spec, index)| Collection { spec, index })
                .collect(),
            embedder,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    /// Override the chunk window used by [`add_documents`](Self::add_documents).
    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.collections.iter().map(|c| c.spec.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// `(name, description)` for every knowledge base.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.collections
            .iter()
            .map(|c| (c.spec.name.clone(), c.spec.description.clone()))
            .collect()
    }

    pub fn default_base(&self) -> Option<&str> {
        self.collections.first().map(|c| c.spec.name.as_str())
    }

    /// Where documents for `requested` end up: that base if it exists,
    /// otherwise the default one.
    pub fn target_for(&self, requested: Option<&str>) -> Option<&str> {
        match requested {
            Some(name) if self.contains(name) => self.get(name).map(|c| c.spec.name.as_str()),
            Some(name) => {
                tracing::warn!(
                    "Knowledge base '{}' does not exist, using the default",
                    name
                );
                self.default_base()
            }
            None => self.default_base(),
        }
    }

    fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.spec.name == name)
    }

    fn get_or_err(&self, name: &str) -> AppResult<&Collection> {
        self.get(name).ok_or_else(|| {
            AppError::Knowledge(format!("Knowledge base '{}' does not exist", name))
        })
    }

    /// Stats for one knowledge base, or all of them when `name` is `None`.
    pub fn stats(&self, name: Option<&str>) -> AppResult<Vec<CollectionStats>> {
        let selected: Vec<&Collection> = match name {
            Some(name) => vec![self.get_or_err(name)?],
            None => self.collections.iter().collect(),
        };

        selected
            .into_iter()
            .map(|c| {
                let (sources_count, vectors_count) = c.index.stats()?;
                Ok(CollectionStats {
                    name: c.spec.name.clone(),
                    collection_name: c.spec.collection.clone(),
                    description: c.spec.description.clone(),
                    vectors_count,
                    sources_count,
                })
            })
            .collect()
    }

    /// Chunk, embed and store documents.
    ///
    /// Each text becomes one source. Its metadata (if given) is copied onto
    /// every chunk, with `knowledge_base` set to the base actually written.
    /// Returns the number of chunks stored.
    pub async fn add_documents(
        &self,
        texts: &[String],
        metadatas: Option<&[Metadata]>,
        knowledge_base: Option<&str>,
    ) -> AppResult<usize> {
        if let Some(metadatas) = metadatas {
            if metadatas.len() != texts.len() {
                return Err(AppError::Knowledge(format!(
                    "Got {} metadata entries for {} texts",
                    metadatas.len(),
                    texts.len()
                )));
            }
        }

        let target = self
            .target_for(knowledge_base)
            .ok_or_else(|| AppError::Knowledge("No knowledge base available".to_string()))?;
        let collection = self.get_or_err(target)?;

        let mut total_chunks = 0usize;

        for (i, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                tracing::warn!("Skipping empty document at index {}", i);
                continue;
            }

            let mut metadata = metadatas
                .map(|m| m[i].clone())
                .unwrap_or_default();
            metadata.insert(
                "knowledge_base".to_string(),
                Value::String(target.to_string()),
            );

            let source = KnowledgeSource {
                id: uuid::Uuid::new_v4().to_string(),
                path: metadata
                    .get("file_path")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                content_type: metadata
                    .get("file_type")
                    .and_then(Value::as_str)
                    .unwrap_or("inline")
                    .to_string(),
                learned_at: Utc::now(),
                size_bytes: text.len() as u64,
            };
            collection.index.upsert_source(&source)?;

            let candidates = chunk_text(&source.id, text, self.chunk_size, self.chunk_overlap);
            let chunk_texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&chunk_texts).await?;

            for (candidate, embedding) in candidates.into_iter().zip(embeddings) {
                let mut chunk_metadata = metadata.clone();
                if let Value::Object(offsets) = candidate.metadata {
                    chunk_metadata.extend(offsets);
                }

                collection.index.upsert_chunk(&KnowledgeChunk {
                    id: uuid::Uuid::new_v4().to_string(),
                    source_id: candidate.source_id,
                    position: candidate.position,
                    text: candidate.text,
                    embedding: Some(embedding),
                    metadata: Value::Object(chunk_metadata),
                })?;
                total_chunks += 1;
            }
        }

        tracing::info!(
            "Added {} documents ({} chunks) to knowledge base '{}'",
            texts.len(),
            total_chunks,
            target
        );

        Ok(total_chunks)
    }

    /// Remove every document from a knowledge base.
    pub fn clean(&self, name: &str) -> AppResult<()> {
        self.get_or_err(name)?.index.reset()?;
        tracing::info!("Knowledge base '{}' cleaned", name);
        Ok(())
    }

    /// Search the selected knowledge bases and rank the merged hits.
    ///
    /// `selection` of `None` searches every knowledge base.
    pub async fn retrieve(
        &self,
        query: &str,
        selection: Option<&[String]>,
        settings: &RetrievalSettings,
    ) -> AppResult<RetrievalOutcome> {
        if self.is_empty() {
            return Ok(RetrievalOutcome::NoCollections);
        }

        let searched = select_collections(&self.names(), selection);
        if searched.is_empty() {
            tracing::info!("None of the requested knowledge bases exist: {:?}", selection);
            return Ok(RetrievalOutcome::NoMatchingCollections);
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut hits: Vec<RetrievedPassage> = Vec::new();
        for name in &searched {
            let collection = self.get_or_err(name)?;
            for (chunk, similarity) in collection.index.search(&query_embedding, settings.top_k)? {
                let mut metadata = chunk.metadata;
                if let Value::Object(ref mut map) = metadata {
                    map.insert("knowledge_base".to_string(), Value::String(name.clone()));
                }

                hits.push(RetrievedPassage {
                    text: chunk.text,
                    distance: similarity_to_distance(similarity),
                    knowledge_base: name.clone(),
                    metadata,
                });
            }
        }

        tracing::debug!(
            "Retrieved {} candidate passages from {} knowledge bases",
            hits.len(),
            searched.len()
        );

        Ok(rank(hits, settings, searched))
    }
}
