//! SQLite-backed vector index for knowledge chunks.

use crate::types::{KnowledgeChunk, KnowledgeSource};
use crate::vector_index::VectorIndex;
use concierge_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id TEXT PRIMARY KEY,
    path TEXT,
    content_type TEXT NOT NULL,
    learned_at TEXT NOT NULL,
    size_bytes INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    metadata TEXT,
    FOREIGN KEY (source_id) REFERENCES sources(id)
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
"#;

/// One collection stored in one SQLite file.
///
/// Search is a brute-force cosine scan, which is fine at knowledge-base
/// sizes of a few thousand chunks.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIndex").field("path", &self.path).finish()
    }
}

impl SqliteIndex {
    /// Open (or create) the index file at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        init_schema(&conn)?;

        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(db_path.to_path_buf()),
        })
    }

    /// Index that lives only as long as the process.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(SCHEMA)
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))
}

impl VectorIndex for SqliteIndex {
    fn upsert_source(&self, source: &KnowledgeSource) -> AppResult<()> {
        self.lock()
            .execute(
                "INSERT OR REPLACE INTO sources (id, path, content_type, learned_at, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    source.id,
                    source.path,
                    source.content_type,
                    source.learned_at.to_rfc3339(),
                    source.size_bytes as i64,
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;

        Ok(())
    }

    fn upsert_chunk(&self, chunk: &KnowledgeChunk) -> AppResult<()> {
        let embedding = chunk
            .embedding
            .as_ref()
            .ok_or_else(|| AppError::Knowledge("Chunk missing embedding".to_string()))?;
        let embedding_bytes = embedding_to_bytes(embedding);

        let metadata_json = serde_json::to_string(&chunk.metadata)?;

        self.lock()
            .execute(
                "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    chunk.id,
                    chunk.source_id,
                    chunk.position as i64,
                    chunk.text,
                    embedding_bytes,
                    metadata_json,
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

        Ok(())
    }

    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT id, source_id, position, text, embedding, metadata FROM chunks")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                let metadata_json: Option<String> = row.get(5)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    embedding_bytes,
                    metadata_json,
                ))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let (id, source_id, position, text, embedding_bytes, metadata_json) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;

            let embedding = match bytes_to_embedding(&embedding_bytes) {
                Ok(embedding) => embedding,
                Err(e) => {
                    tracing::warn!("Skipping chunk {}: {}", id, e);
                    continue;
                }
            };
            let metadata = match metadata_json {
                Some(json) => serde_json::from_str(&json)?,
                None => serde_json::Value::Null,
            };

            let score = cosine_similarity(query_embedding, &embedding);
            results.push((
                KnowledgeChunk {
                    id,
                    source_id,
                    position: position as u32,
                    text,
                    embedding: Some(embedding),
                    metadata,
                },
                score,
            ));
        }

        // Sort by score descending; NaN scores go last
        let key = |score: f32| if score.is_nan() { f32::NEG_INFINITY } else { score };
        results.sort_by(|a, b| key(b.1).total_cmp(&key(a.1)));
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    fn stats(&self) -> AppResult<(u64, u64)> {
        let conn = self.lock();
        let count = |table: &str| -> AppResult<u64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|v| v as u64)
            .map_err(|e| AppError::Knowledge(format!("Failed to count {}: {}", table, e)))
        };

        Ok((count("sources")?, count("chunks")?))
    }

    fn reset(&self) -> AppResult<()> {
        self.lock()
            .execute_batch("DELETE FROM chunks; DELETE FROM sources;")
            .map_err(|e| AppError::Knowledge(format!("Failed to reset index: {}", e)))?;

        tracing::info!("Reset knowledge index {:?}", self.path);
        Ok(())
    }
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
