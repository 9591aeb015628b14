//! Prompt system for Concierge.
//!
//! - Chat turn and prompt kind types
//! - Built-in templates
//! - JSON-backed user settings (RAG switch, editable prompts)
//! - Handlebars rendering and history formatting

pub mod builder;
pub mod settings;
pub mod templates;
pub mod types;

pub use builder::{
    format_dialogue_history, format_labeled_history, render_prompt, CONVERSATION_START,
    EMPTY_HISTORY,
};
pub use settings::{SettingsStore, SettingsUpdate, UserSettings};
pub use templates::default_template;
pub use types::{ChatTurn, PromptKind, Role};
