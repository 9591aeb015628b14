//! Serve command handler.

use clap::Args;
use concierge_core::config::AppConfig;
use concierge_server::AppState;

/// Run the HTTP API until Ctrl-C
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (overrides the configured one)
    #[arg(short, long, env = "CONCIERGE_BIND")]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let bind = self.bind.as_deref().unwrap_or(&config.bind);
        let state = AppState::from_config(config)?;

        println!("Concierge listening on http://{}", bind);
        concierge_server::serve(state, bind).await?;
        Ok(())
    }
}
