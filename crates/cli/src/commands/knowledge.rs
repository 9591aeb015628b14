//! Knowledge command handler.
//!
//! Lists, inspects, searches, fills and empties the configured knowledge
//! bases.

use anyhow::Context;
use clap::{Args, Subcommand};
use concierge_agents::Source;
use concierge_core::config::AppConfig;
use concierge_knowledge::{ingest_folder, ingest_texts, IngestStats};
use concierge_server::{open_knowledge, AppState};
use std::path::PathBuf;

/// Knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// List the configured knowledge bases
    List,
    /// Show document and chunk counts
    Stats(KnowledgeStatsCommand),
    /// Answer a query from the knowledge bases
    Search(KnowledgeSearchCommand),
    /// Import documents from a folder or a literal text
    Ingest(KnowledgeIngestCommand),
    /// Remove every document from a knowledge base
    Clean(KnowledgeCleanCommand),
}

/// Show knowledge base stats
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Knowledge base name (all when omitted)
    #[arg(long)]
    pub kb: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let registry = open_knowledge(config)?;
        let stats = registry.stats(self.kb.as_deref())?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        for s in &stats {
            println!("Knowledge base: {}", s.name);
            println!("  Collection: {}", s.collection_name);
            if !s.description.is_empty() {
                println!("  Description: {}", s.description);
            }
            println!("  Documents: {}", s.sources_count);
            println!("  Chunks: {}", s.vectors_count);
        }
        Ok(())
    }
}

/// Search knowledge bases
#[derive(Args, Debug)]
pub struct KnowledgeSearchCommand {
    /// Query text
    pub query: String,

    /// Knowledge bases to search (all when omitted)
    #[arg(long)]
    pub kb: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeSearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Searching knowledge bases for {:?}", self.query);

        let state = AppState::from_config(config)?;
        let selection = if self.kb.is_empty() {
            None
        } else {
            Some(self.kb.as_slice())
        };

        let reply = state.router.rag().query(&self.query, &[], selection).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reply)?);
            return Ok(());
        }

        println!("Answer:\n{}\n", reply.response);
        println!("Best distance: {:.4}", reply.confidence.unwrap_or_default());
        println!("Knowledge bases: {}", reply.knowledge_bases_used.join(", "));

        if !reply.sources.is_empty() {
            println!("\nSources:");
            for (i, source) in reply.sources.iter().enumerate() {
                if let Source::Knowledge(kb) = source {
                    println!("  [{}] {} (distance {:.4})", i + 1, kb.knowledge_base, kb.score);
                    println!("      {}", kb.content);
                    if let Some(file) = kb.metadata.get("source").and_then(|v| v.as_str()) {
                        println!("      File: {}", file);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Import documents
#[derive(Args, Debug)]
pub struct KnowledgeIngestCommand {
    /// Folder of .txt/.md/.pdf files to import
    #[arg(long, default_value = "./text", conflicts_with = "text")]
    pub folder: PathBuf,

    /// Import one literal text instead of a folder
    #[arg(long)]
    pub text: Option<String>,

    /// Target knowledge base (the first configured one when omitted)
    #[arg(long)]
    pub kb: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeIngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let registry = open_knowledge(config)?;

        let stats: IngestStats = match self.text {
            Some(ref text) => ingest_texts(&registry, vec![text.clone()], self.kb.as_deref()).await?,
            None => ingest_folder(&registry, &self.folder, self.kb.as_deref())
                .await
                .with_context(|| format!("Failed to ingest {:?}", self.folder))?,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else if stats.documents == 0 {
            println!("No documents to import from {:?} (supported: .txt, .md, .pdf)", self.folder);
        } else {
            println!(
                "Imported {} documents ({} chunks, {} skipped) into '{}' in {:.2}s",
                stats.documents,
                stats.chunks,
                stats.skipped,
                stats.knowledge_base,
                stats.duration_secs
            );
        }
        Ok(())
    }
}

/// Clean knowledge base
#[derive(Args, Debug)]
pub struct KnowledgeCleanCommand {
    /// Knowledge base name
    pub name: String,
}

impl KnowledgeCleanCommand {
    pub fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        open_knowledge(config)?.clean(&self.name)?;
        println!("Knowledge base '{}' cleaned", self.name);
        Ok(())
    }
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        match &self.action {
            KnowledgeAction::List => {
                for spec in &config.knowledge_bases {
                    if spec.description.is_empty() {
                        println!("{} ({})", spec.name, spec.collection);
                    } else {
                        println!("{} ({}): {}", spec.name, spec.collection, spec.description);
                    }
                }
                Ok(())
            }
            KnowledgeAction::Stats(cmd) => cmd.execute(config),
            KnowledgeAction::Search(cmd) => cmd.execute(config).await,
            KnowledgeAction::Ingest(cmd) => cmd.execute(config).await,
            KnowledgeAction::Clean(cmd) => cmd.execute(config),
        }
    }
}
