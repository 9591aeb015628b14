//! Template rendering and history formatting.

use crate::types::{ChatTurn, Role};
use concierge_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Shown to the classifier and RAG/web agents when there is no history.
pub const EMPTY_HISTORY: &str = "None";

/// Shown to the conversation agent when there is no history.
pub const CONVERSATION_START: &str = "This is the start of the conversation.";

/// Render a prompt template with variables.
///
/// Templates use Handlebars placeholders (`{{query}}`). Single-brace
/// placeholders (`{query}`) for the variables being supplied are accepted
/// too, since saved prompts may come from older configurations. Output is
/// not HTML-escaped.
///
/// # Example
/// ```
/// use concierge_prompt::render_prompt;
/// use std::collections::HashMap;
///
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "What is RAG?".to_string());
/// let out = render_prompt("Question: {{query}}", &vars).unwrap();
/// assert_eq!(out, "Question: What is RAG?");
/// ```
pub fn render_prompt(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let keys: Vec<&str> = variables.keys().map(String::as_str).collect();
    let template = normalize_placeholders(template, &keys);

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", &template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

/// Rewrite `{name}` to `{{name}}` for each known variable name.
fn normalize_placeholders(template: &str, names: &[&str]) -> String {
    let mut out = template.to_string();
    for name in names {
        let double = format!("{{{{{}}}}}", name);
        let single = format!("{{{}}}", name);
        let guard = format!("\u{0}{}\u{0}", name);
        out = out
            .replace(&double, &guard)
            .replace(&single, &double)
            .replace(&guard, &double);
    }
    out
}

/// Last `window` turns as `"role: content"` lines, or [`EMPTY_HISTORY`].
pub fn format_labeled_history(turns: &[ChatTurn], window: usize) -> String {
    let recent = tail(turns, window);
    if recent.is_empty() {
        return EMPTY_HISTORY.to_string();
    }

    recent
        .iter()
        .map(|turn| format!("{}: {}\n", turn.role, turn.content))
        .collect()
}

/// Last `limit` turns as a `User:`/`Assistant:` dialogue, or
/// [`CONVERSATION_START`]. System turns are left out.
pub fn format_dialogue_history(turns: &[ChatTurn], limit: usize) -> String {
    let recent = tail(turns, limit);
    if recent.is_empty() {
        return CONVERSATION_START.to_string();
    }

    let mut out = String::new();
    for turn in recent {
        let speaker = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => continue,
        };
        out.push_str(speaker);
        out.push_str(": ");
        out.push_str(&turn.content);
        out.push('\n');
    }
    out
}

fn tail(turns: &[ChatTurn], n: usize) -> &[ChatTurn] {
    &turns[turns.len().saturating_sub(n)..]
}
