//! Built-in prompt templates and display strings.

use crate::types::PromptKind;

pub const DEFAULT_SYSTEM_NAME: &str = "Concierge";

pub const DEFAULT_WELCOME_MESSAGE: &str = "Hello! I am your assistant. I can answer questions, \
look things up in the knowledge base or on the web, and help you find useful information. \
What can I do for you?";

pub const DECISION_PROMPT: &str = r#"You are the routing component of an assistant. Based on the user's query, decide which agent should handle it.

Available agents:
1. RAG agent - answers from the knowledge base. Use for:
   - questions that need specialist knowledge
   - domain-specific queries
   - questions about content known to be in the knowledge base

2. Web search agent - searches for current information. Use for:
   - recent news and research developments
   - real-time information
   - questions that need up-to-date data

3. Conversation agent - general conversation. Use for:
   - simple questions
   - questions that do not need the knowledge base
   - small talk

Conversation history:
{{conversation_history}}

User query: {{query}}

Analyse the query and answer with exactly one of: "RAG", "WEBSEARCH" or "CONVERSATION"

Your decision:"#;

pub const CONVERSATION_PROMPT: &str = r#"You are a professional and friendly assistant. Your job is to answer the user's questions.

Guidelines:
1. Give accurate, useful advice
2. Use plain language
3. Keep a professional but warm tone
4. Use the conversation context where it helps

Conversation history:
{{conversation_history}}

User: {{query}}

Assistant:"#;

pub const RAG_PROMPT: &str = r#"You are a professional assistant. Answer the user's question using the reference material below.

Reference material:
{{context}}

Conversation history:
{{conversation_history}}

User question: {{query}}

Give an accurate, professional answer based on the reference material. If the material does not contain the answer, say so honestly.

Your answer:"#;

pub const WEBSEARCH_PROMPT: &str = r#"You are an assistant. Answer the user's question using the search results below.

Search results:
{{search_results}}

Conversation history:
{{conversation_history}}

User question: {{query}}

Combine the search results into an accurate, useful answer.

Your answer:"#;

/// Built-in template for a prompt kind.
pub fn default_template(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Decision => DECISION_PROMPT,
        PromptKind::Conversation => CONVERSATION_PROMPT,
        PromptKind::Rag => RAG_PROMPT,
        PromptKind::WebSearch => WEBSEARCH_PROMPT,
    }
}
