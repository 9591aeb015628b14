//! Ask command handler.
//!
//! Routes one query through the same agents the HTTP API uses.

use clap::Args;
use concierge_agents::{ChatRequest, ChatResponse, Source};
use concierge_core::config::AppConfig;
use concierge_server::AppState;

/// Route a single query and print the answer
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Session id (only meaningful within this process)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Restrict knowledge-base retrieval to these bases
    #[arg(long = "kb")]
    pub knowledge_bases: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ask command");

        let state = AppState::from_config(config)?;

        let request = ChatRequest {
            query: self.query.clone(),
            session_id: self.session.clone(),
            conversation_history: None,
            knowledge_bases: if self.knowledge_bases.is_empty() {
                None
            } else {
                Some(self.knowledge_bases.clone())
            },
        };

        let response = state.router.handle(request).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print_response(&response);
        }

        Ok(())
    }
}

fn print_response(response: &ChatResponse) {
    println!("[{}] {}", response.agent, response.routing.decision);
    println!();
    println!("{}", response.response);

    if let Some(confidence) = response.confidence {
        println!();
        println!("Best distance: {:.3}", confidence);
    }

    if !response.knowledge_bases_used.is_empty() {
        println!("Knowledge bases: {}", response.knowledge_bases_used.join(", "));
    }

    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, source) in response.sources.iter().enumerate() {
            match source {
                Source::Knowledge(kb) => {
                    println!("{}. [{}] ({:.3}) {}", i + 1, kb.knowledge_base, kb.score, kb.content)
                }
                Source::Web(web) => println!("{}. {} <{}>", i + 1, web.title, web.url),
            }
        }
    }
}
