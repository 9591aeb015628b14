//! Service configuration for Concierge.
//!
//! Configuration is merged from, in increasing precedence:
//! - built-in defaults
//! - a YAML file (`<data_dir>/concierge.yaml` or `CONCIERGE_CONFIG`)
//! - environment variables
//! - command-line flags
//!
//! User-editable prompts and the RAG switch live in a separate JSON
//! settings file managed by `concierge-prompt`; this module only points
//! at its location.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::sections::{
    default_knowledge_bases, AgentSettings, EmbeddingSettings, KnowledgeBaseSpec, SearchSettings,
    SessionSettings,
};

const CONFIG_FILE_NAME: &str = "concierge.yaml";
const SETTINGS_FILE_NAME: &str = "user_config.json";
const KNOWLEDGE_DIR_NAME: &str = "knowledge";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the settings file and knowledge collections
    pub data_dir: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Address the HTTP server binds to
    pub bind: String,

    /// LLM provider ("ollama", "openai", "dashscope", "mock")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider table from the YAML file
    pub llm: Option<LlmConfig>,

    pub embedding: EmbeddingSettings,

    pub search: SearchSettings,

    pub agents: AgentSettings,

    pub knowledge_bases: Vec<KnowledgeBaseSpec>,

    pub sessions: SessionSettings,
}

/// LLM section of `concierge.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// Any `/chat/completions` compatible API (OpenAI, DashScope, vLLM...)
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    server: Option<ServerSection>,
    logging: Option<LoggingSection>,
    embedding: Option<EmbeddingSettings>,
    search: Option<SearchSettings>,
    agents: Option<AgentSettings>,
    knowledge_bases: Option<Vec<KnowledgeBaseSpec>>,
    sessions: Option<SessionSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerSection {
    bind: Option<String>,
    data_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            config_file: None,
            bind: "127.0.0.1:8000".to_string(),
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            embedding: EmbeddingSettings::default(),
            search: SearchSettings::default(),
            agents: AgentSettings::default(),
            knowledge_bases: default_knowledge_bases(),
            sessions: SessionSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `CONCIERGE_DATA_DIR`: data directory
    /// - `CONCIERGE_CONFIG`: path to the YAML file
    /// - `CONCIERGE_PROVIDER`: LLM provider
    /// - `CONCIERGE_MODEL`: model identifier
    /// - `CONCIERGE_API_KEY`: API key
    /// - `CONCIERGE_BIND`: server bind address
    /// - `RUST_LOG`: log level
    /// - `NO_COLOR`: disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use concierge_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Data dir: {:?}", config.data_dir);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(data_dir) = std::env::var("CONCIERGE_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(config_file) = std::env::var("CONCIERGE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        let config_path = config.config_path();
        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        if let Ok(provider) = std::env::var("CONCIERGE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("CONCIERGE_MODEL") {
            config.model = model;
        }

        if let Ok(bind) = std::env::var("CONCIERGE_BIND") {
            config.bind = bind;
        }

        if let Ok(key) = std::env::var("CONCIERGE_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var_os("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Path of the YAML file this config reads from.
    pub fn config_path(&self) -> PathBuf {
        match self.config_file {
            Some(ref cf) => cf.clone(),
            None => self.data_dir.join(CONFIG_FILE_NAME),
        }
    }

    /// Merge a YAML configuration file into a copy of this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(server) = config_file.server {
            if let Some(bind) = server.bind {
                result.bind = bind;
            }
            if let Some(data_dir) = server.data_dir {
                result.data_dir = PathBuf::from(data_dir);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }
            result.llm = Some(llm);
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(search) = config_file.search {
            result.search = search;
        }
        if let Some(agents) = config_file.agents {
            result.agents = agents;
        }
        if let Some(bases) = config_file.knowledge_bases {
            result.knowledge_bases = bases;
        }
        if let Some(sessions) = config_file.sessions {
            result.sessions = sessions;
        }

        tracing::debug!("Merged configuration from {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// JSON file holding prompts and the RAG switch.
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE_NAME)
    }

    /// Directory holding one SQLite file per knowledge collection.
    pub fn knowledge_dir(&self) -> PathBuf {
        self.data_dir.join(KNOWLEDGE_DIR_NAME)
    }

    /// Ensure the data directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir).map_err(|e| {
                AppError::Config(format!(
                    "Failed to create data directory {:?}: {}",
                    self.data_dir, e
                ))
            })?;
        }
        Ok(())
    }

    /// Get a provider entry from the YAML provider table.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint configured for a provider, if any.
    pub fn endpoint_for(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.endpoint())
            .map(str::to_string)
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: explicit key, the provider's `apiKeyEnv`, then the
    /// conventional variable for known hosted providers.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(api_key_env) {
                return Some(key);
            }
        }

        let conventional = match provider {
            "openai" => "OPENAI_API_KEY",
            "dashscope" => "DASHSCOPE_API_KEY",
            _ => return None,
        };
        std::env::var(conventional).ok()
    }

    /// Validate configuration for the active provider and knowledge bases.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["ollama", "openai", "dashscope", "mock"];
        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        let hosted = matches!(self.provider.as_str(), "openai" | "dashscope");
        if hosted && self.resolve_api_key(&self.provider).is_none() {
            return Err(AppError::Config(format!(
                "Provider '{}' requires an API key",
                self.provider
            )));
        }

        let mut names = HashSet::new();
        for base in &self.knowledge_bases {
            if base.name.trim().is_empty() || base.collection.trim().is_empty() {
                return Err(AppError::Config(
                    "Knowledge base name and collection cannot be empty".to_string(),
                ));
            }
            if !names.insert(base.name.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate knowledge base name: {}",
                    base.name
                )));
            }
        }

        if self.sessions.max_history == 0 {
            return Err(AppError::Config(
                "sessions.max_history must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
