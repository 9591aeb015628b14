//! Loading documents from disk into a knowledge base.

use crate::parser::{read_document, ContentType};
use crate::registry::KnowledgeRegistry;
use crate::types::Metadata;
use concierge_core::{AppError, AppResult};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Documents read from a folder, ready for [`KnowledgeRegistry::add_documents`].
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub texts: Vec<String>,
    pub metadatas: Vec<Metadata>,
    /// Files that were empty, unreadable or of an unsupported type.
    pub skipped: Vec<PathBuf>,
}

/// Statistics from an ingest run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestStats {
    pub knowledge_base: String,
    pub documents: usize,
    pub chunks: usize,
    pub skipped: usize,
    pub duration_secs: f64,
}

/// Read the `.txt`, `.md` and `.pdf` files directly inside `folder`.
///
/// Subfolders are not descended into. Each document gets
/// `{source, file_type, file_path}` metadata.
pub fn load_documents_from_folder(folder: &Path) -> AppResult<LoadedDocuments> {
    if !folder.is_dir() {
        return Err(AppError::Knowledge(format!(
            "Folder {:?} does not exist",
            folder
        )));
    }

    let mut loaded = LoadedDocuments::default();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }

        let content_type = ContentType::from_path(path);
        if !content_type.is_supported() {
            tracing::debug!("Skipping unsupported file {:?}", path);
            loaded.skipped.push(path.to_path_buf());
            continue;
        }

        let text = match read_document(path) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("Skipping empty file {:?}", path);
                loaded.skipped.push(path.to_path_buf());
                continue;
            }
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                loaded.skipped.push(path.to_path_buf());
                continue;
            }
        };

        let mut metadata = Metadata::new();
        metadata.insert(
            "source".to_string(),
            Value::String(entry.file_name().to_string_lossy().into_owned()),
        );
        metadata.insert(
            "file_type".to_string(),
            Value::String(content_type.as_str().to_string()),
        );
        metadata.insert(
            "file_path".to_string(),
            Value::String(path.to_string_lossy().into_owned()),
        );

        loaded.texts.push(text);
        loaded.metadatas.push(metadata);
    }

    tracing::info!(
        "Loaded {} documents from {:?} ({} skipped)",
        loaded.texts.len(),
        folder,
        loaded.skipped.len()
    );

    Ok(loaded)
}

/// Ingest every supported file in `folder`.
pub async fn ingest_folder(
    registry: &KnowledgeRegistry,
    folder: &Path,
    knowledge_base: Option<&str>,
) -> AppResult<IngestStats> {
    let start = Instant::now();
    let loaded = load_documents_from_folder(folder)?;
    let target = target_name(registry, knowledge_base)?;

    let chunks = if loaded.texts.is_empty() {
        0
    } else {
        registry
            .add_documents(&loaded.texts, Some(loaded.metadatas.as_slice()), knowledge_base)
            .await?
    };

    Ok(IngestStats {
        knowledge_base: target,
        documents: loaded.texts.len(),
        chunks,
        skipped: loaded.skipped.len(),
        duration_secs: start.elapsed().as_secs_f64(),
    })
}

/// Ingest literal texts, tagged `document_<i>`.
pub async fn ingest_texts(
    registry: &KnowledgeRegistry,
    texts: Vec<String>,
    knowledge_base: Option<&str>,
) -> AppResult<IngestStats> {
    let start = Instant::now();
    let target = target_name(registry, knowledge_base)?;

    let metadatas: Vec<Metadata> = (0..texts.len())
        .map(|i| {
            let mut m = Metadata::new();
            m.insert("source".to_string(), Value::String(format!("document_{}", i)));
            m
        })
        .collect();

    let chunks = registry
        .add_documents(&texts, Some(metadatas.as_slice()), knowledge_base)
        .await?;

    Ok(IngestStats {
        knowledge_base: target,
        documents: texts.len(),
        chunks,
        skipped: 0,
        duration_secs: start.elapsed().as_secs_f64(),
    })
}

fn target_name(registry: &KnowledgeRegistry, knowledge_base: Option<&str>) -> AppResult<String> {
    registry
        .target_for(knowledge_base)
        .map(str::to_string)
        .ok_or_else(|| AppError::Knowledge("No knowledge base available".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::TrigramProvider;
    use crate::tests::fixtures::write_pdf;
    use concierge_core::KnowledgeBaseSpec;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_load_documents_from_folder() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.md", "# Diabetes\nInsulin regulates glucose.");
        write(dir.path(), "a.txt", "Hypertension is high blood pressure.");
        write(dir.path(), "empty.txt", "   ");
        write(dir.path(), "broken.pdf", "%PDF-1.4");
        fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "deep.txt", "not loaded");

        let loaded = load_documents_from_folder(dir.path()).unwrap();

        assert_eq!(loaded.texts.len(), 2);
        assert_eq!(loaded.metadatas[0]["source"], "a.txt");
        assert_eq!(loaded.metadatas[0]["file_type"], "txt");
        assert_eq!(loaded.metadatas[1]["file_type"], "md");
        assert!(loaded.metadatas[1]["file_path"]
            .as_str()
            .unwrap()
            .ends_with("b.md"));
        assert_eq!(loaded.skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_folder_reads_pdf() {
        let dir = TempDir::new().unwrap();
        write_pdf(
            &dir.path().join("leaflet.pdf"),
            "Metformin is taken with meals",
        );

        let loaded = load_documents_from_folder(dir.path()).unwrap();
        assert_eq!(loaded.texts.len(), 1);
        assert!(loaded.texts[0].contains("Metformin is taken with meals"));
        assert_eq!(loaded.metadatas[0]["source"], "leaflet.pdf");
        assert_eq!(loaded.metadatas[0]["file_type"], "pdf");

        let registry = KnowledgeRegistry::in_memory(
            &[KnowledgeBaseSpec::new("medical", "medical_kb", "")],
            Arc::new(TrigramProvider::new(128)),
        )
        .unwrap();
        let stats = ingest_folder(&registry, dir.path(), None).await.unwrap();
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.skipped, 0);
        assert_eq!(registry.stats(Some("medical")).unwrap()[0].sources_count, 1);
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_documents_from_folder(&dir.path().join("nope")).is_err());
    }

    #[tokio::test]
    async fn test_ingest_folder_and_texts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt", "Hypertension is high blood pressure.");

        let registry = KnowledgeRegistry::in_memory(
            &[KnowledgeBaseSpec::new("general", "general_knowledge", "")],
            Arc::new(TrigramProvider::new(128)),
        )
        .unwrap();

        let stats = ingest_folder(&registry, dir.path(), None).await.unwrap();
        assert_eq!(stats.knowledge_base, "general");
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.chunks, 1);

        let stats = ingest_texts(&registry, vec!["A single fact.".to_string()], Some("general"))
            .await
            .unwrap();
        assert_eq!(stats.chunks, 1);
        assert_eq!(registry.stats(None).unwrap()[0].sources_count, 2);
    }
}
