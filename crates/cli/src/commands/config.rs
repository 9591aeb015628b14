//! Config command handler.

use clap::{Args, Subcommand};
use concierge_core::config::AppConfig;
use concierge_prompt::SettingsStore;

/// Show or reset the user settings
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the service configuration and the user settings
    Show,
    /// Restore the default prompts and RAG switch
    Reset,
}

impl ConfigCommand {
    pub fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        config.ensure_data_dir()?;
        let store = SettingsStore::open(config.settings_path());

        match self.action {
            ConfigAction::Show => {
                let mut service = config.clone();
                if service.api_key.is_some() {
                    service.api_key = Some("<redacted>".to_string());
                }
                println!("# Service configuration");
                println!("{}", serde_yaml::to_string(&service)?);
                println!("# User settings ({:?})", config.settings_path());
                println!("{}", serde_json::to_string_pretty(&store.get())?);
            }
            ConfigAction::Reset => {
                store.reset()?;
                println!("User settings reset to defaults ({:?})", config.settings_path());
            }
        }
        Ok(())
    }
}
