//! User-editable settings persisted as JSON.
//!
//! Holds the RAG switch, the four prompt templates and the display strings
//! served to clients. Keys missing from the file take their defaults on
//! load; keys this version does not know about are kept and written back.

use crate::templates::{
    default_template, DEFAULT_SYSTEM_NAME, DEFAULT_WELCOME_MESSAGE,
};
use crate::types::PromptKind;
use chrono::Utc;
use concierge_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The persisted settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default = "default_rag_enabled")]
    pub rag_enabled: bool,

    #[serde(default = "default_decision_prompt")]
    pub agent_decision_prompt: String,

    #[serde(default = "default_conversation_prompt")]
    pub conversation_prompt: String,

    #[serde(default = "default_rag_prompt")]
    pub rag_prompt: String,

    #[serde(default = "default_websearch_prompt")]
    pub websearch_prompt: String,

    #[serde(default = "default_system_name")]
    pub system_name: String,

    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,

    /// RFC 3339 timestamp of the last save.
    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_rag_enabled() -> bool {
    true
}

fn default_decision_prompt() -> String {
    default_template(PromptKind::Decision).to_string()
}

fn default_conversation_prompt() -> String {
    default_template(PromptKind::Conversation).to_string()
}

fn default_rag_prompt() -> String {
    default_template(PromptKind::Rag).to_string()
}

fn default_websearch_prompt() -> String {
    default_template(PromptKind::WebSearch).to_string()
}

fn default_system_name() -> String {
    DEFAULT_SYSTEM_NAME.to_string()
}

fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            rag_enabled: default_rag_enabled(),
            agent_decision_prompt: default_decision_prompt(),
            conversation_prompt: default_conversation_prompt(),
            rag_prompt: default_rag_prompt(),
            websearch_prompt: default_websearch_prompt(),
            system_name: default_system_name(),
            welcome_message: default_welcome_message(),
            updated_at: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl UserSettings {
    /// Stored template for `kind`, or the built-in one when blank.
    pub fn prompt(&self, kind: PromptKind) -> &str {
        let stored = match kind {
            PromptKind::Decision => &self.agent_decision_prompt,
            PromptKind::Conversation => &self.conversation_prompt,
            PromptKind::Rag => &self.rag_prompt,
            PromptKind::WebSearch => &self.websearch_prompt,
        };
        if stored.trim().is_empty() {
            default_template(kind)
        } else {
            stored
        }
    }

    /// Apply the fields present in `update`.
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(v) = update.rag_enabled {
            self.rag_enabled = v;
        }
        if let Some(v) = update.agent_decision_prompt {
            self.agent_decision_prompt = v;
        }
        if let Some(v) = update.conversation_prompt {
            self.conversation_prompt = v;
        }
        if let Some(v) = update.rag_prompt {
            self.rag_prompt = v;
        }
        if let Some(v) = update.websearch_prompt {
            self.websearch_prompt = v;
        }
        if let Some(v) = update.system_name {
            self.system_name = v;
        }
        if let Some(v) = update.welcome_message {
            self.welcome_message = v;
        }
    }
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_decision_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websearch_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Shared, file-backed settings.
///
/// Readers always see the latest saved values, so agents pick up prompt
/// edits on their next request.
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: RwLock<UserSettings>,
}

impl SettingsStore {
    /// Load settings from `path`.
    ///
    /// A missing file is created with defaults. An unreadable or invalid
    /// file is logged and replaced in memory by defaults; it is only
    /// overwritten on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let settings = if path.exists() {
            match read_settings(&path) {
                Ok(settings) => {
                    tracing::debug!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    tracing::warn!("Failed to load settings from {:?}: {}. Using defaults", path, e);
                    UserSettings::default()
                }
            }
        } else {
            let mut defaults = UserSettings::default();
            match write_settings(&path, &mut defaults) {
                Ok(()) => tracing::info!("Created default settings at {:?}", path),
                Err(e) => tracing::warn!("Failed to write default settings: {}", e),
            }
            defaults
        };

        Self {
            path: Some(path),
            current: RwLock::new(settings),
        }
    }

    /// Settings that are never written to disk.
    pub fn in_memory(settings: UserSettings) -> Self {
        Self {
            path: None,
            current: RwLock::new(settings),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of the current settings.
    pub fn get(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn is_rag_enabled(&self) -> bool {
        self.read().rag_enabled
    }

    /// Current template for `kind`.
    pub fn prompt(&self, kind: PromptKind) -> String {
        self.read().prompt(kind).to_string()
    }

    /// Persist the current settings, stamping `updated_at`.
    pub fn save(&self) -> AppResult<()> {
        let mut guard = self.write();
        self.persist(&mut guard)
    }

    /// Apply a partial update and save.
    pub fn update(&self, update: SettingsUpdate) -> AppResult<UserSettings> {
        let mut guard = self.write();
        guard.apply(update);
        self.persist(&mut guard)?;
        Ok(guard.clone())
    }

    /// Restore defaults and save.
    pub fn reset(&self) -> AppResult<UserSettings> {
        let mut guard = self.write();
        *guard = UserSettings::default();
        self.persist(&mut guard)?;
        Ok(guard.clone())
    }

    fn persist(&self, settings: &mut UserSettings) -> AppResult<()> {
        match self.path {
            Some(ref path) => write_settings(path, settings),
            None => {
                settings.updated_at = Some(Utc::now().to_rfc3339());
                Ok(())
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_settings(path: &Path) -> AppResult<UserSettings> {
    let contents = fs::read_to_string(path)
        .map_err(|e| AppError::Prompt(format!("Failed to read {:?}: {}", path, e)))?;
    let settings = serde_json::from_str(&contents)?;
    Ok(settings)
}

fn write_settings(path: &Path, settings: &mut UserSettings) -> AppResult<()> {
    settings.updated_at = Some(Utc::now().to_rfc3339());

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)
        .map_err(|e| AppError::Prompt(format!("Failed to write {:?}: {}", path, e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/user_config.json");

        let store = SettingsStore::open(&path);
        assert!(path.exists());
        assert!(store.is_rag_enabled());
        assert!(store.get().updated_at.is_some());
    }

    #[test]
    fn test_missing_keys_take_defaults_and_extras_survive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_config.json");
        fs::write(
            &path,
            r#"{"rag_enabled": false, "system_name": "Clinic Desk", "theme": "dark"}"#,
        )
        .unwrap();

        let store = SettingsStore::open(&path);
        let settings = store.get();
        assert!(!settings.rag_enabled);
        assert_eq!(settings.system_name, "Clinic Desk");
        assert_eq!(settings.rag_prompt, default_template(PromptKind::Rag));
        assert_eq!(settings.extra["theme"], "dark");

        store.save().unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["theme"], "dark");
        assert!(saved["conversation_prompt"].is_string());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_config.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::open(&path);
        assert_eq!(store.get().system_name, DEFAULT_SYSTEM_NAME);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_update_persists_only_given_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_config.json");
        let store = SettingsStore::open(&path);

        let updated = store
            .update(SettingsUpdate {
                rag_enabled: Some(false),
                rag_prompt: Some("Context: {{context}}\nQ: {{query}}".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(!updated.rag_enabled);
        assert_eq!(updated.welcome_message, DEFAULT_WELCOME_MESSAGE);

        let reopened = SettingsStore::open(&path);
        assert!(!reopened.is_rag_enabled());
        assert_eq!(
            reopened.prompt(PromptKind::Rag),
            "Context: {{context}}\nQ: {{query}}"
        );
    }

    #[test]
    fn test_reset_restores_defaults() {
        let store = SettingsStore::in_memory(UserSettings::default());
        store
            .update(SettingsUpdate {
                system_name: Some("Renamed".to_string()),
                ..Default::default()
            })
            .unwrap();

        let reset = store.reset().unwrap();
        assert_eq!(reset.system_name, DEFAULT_SYSTEM_NAME);
        assert!(reset.updated_at.is_some());
    }

    #[test]
    fn test_blank_prompt_falls_back() {
        let settings = UserSettings {
            conversation_prompt: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.prompt(PromptKind::Conversation),
            default_template(PromptKind::Conversation)
        );
    }

    #[test]
    fn test_update_deserializes_partial_body() {
        let update: SettingsUpdate =
            serde_json::from_str(r#"{"rag_enabled": false, "unknown": 1}"#).unwrap();
        assert_eq!(update.rag_enabled, Some(false));
        assert!(update.system_name.is_none());
        assert!(!update.is_empty());
        assert!(SettingsUpdate::default().is_empty());
    }
}
