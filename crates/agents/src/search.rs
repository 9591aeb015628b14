//! Web search backends.
//!
//! The web search agent talks to a [`SearchClient`]; providers only turn a
//! query into a list of `{title, body, href}` results.
//!
//! [`DuckDuckGoClient`] uses the Instant Answer API, which returns an
//! abstract and related topics rather than ranked web pages. Queries about
//! recent events often come back empty there, so deployments that need
//! general web results should run SearXNG (`search.provider: searxng`).

use concierge_core::{AppError, AppResult, SearchSettings};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com";
pub const DEFAULT_SEARXNG_URL: &str = "http://localhost:8888";

/// One search hit. Providers leave fields `None` when they have nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: Option<String>,
    pub body: Option<String>,
    pub href: Option<String>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, body: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            href: Some(href.into()),
        }
    }
}

#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    fn provider_name(&self) -> &str;

    /// At most `max_results` results for `query`.
    async fn search(&self, query: &str, max_results: usize) -> AppResult<Vec<SearchResult>>;
}

fn http_client(timeout_secs: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("concierge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Search(format!("Failed to build HTTP client: {}", e)))
}

async fn get_json<T: for<'de> Deserialize<'de>>(
    request: reqwest::RequestBuilder,
    provider: &str,
) -> AppResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::Search(format!("{} request failed: {}", provider, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AppError::Search(format!(
            "{} API error ({}): {}",
            provider, status, error_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Search(format!("Failed to parse {} response: {}", provider, e)))
}

/// DuckDuckGo Instant Answer API.
pub struct DuckDuckGoClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a topic or a named group of topics.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "FirstURL")]
    first_url: Option<String>,
    #[serde(default)]
    topics: Vec<RelatedTopic>,
}

impl DuckDuckGoClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> AppResult<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout_secs)?,
        })
    }
}

/// Flatten an instant answer into results: the abstract first, then
/// related topics depth-first.
fn instant_answer_results(answer: InstantAnswer, max_results: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if !answer.abstract_text.is_empty() {
        results.push(SearchResult {
            title: Some(answer.heading).filter(|h| !h.is_empty()),
            body: Some(answer.abstract_text),
            href: Some(answer.abstract_url).filter(|u| !u.is_empty()),
        });
    }

    let mut stack: Vec<RelatedTopic> = answer.related_topics.into_iter().rev().collect();
    while let Some(topic) = stack.pop() {
        if results.len() >= max_results {
            break;
        }
        if !topic.topics.is_empty() {
            stack.extend(topic.topics.into_iter().rev());
            continue;
        }
        let Some(text) = topic.text.filter(|t| !t.is_empty()) else {
            continue;
        };
        // Topic text reads "Title - description".
        let title = text
            .split_once(" - ")
            .map(|(title, _)| title.to_string())
            .unwrap_or_else(|| text.clone());
        results.push(SearchResult {
            title: Some(title),
            body: Some(text),
            href: topic.first_url,
        });
    }

    results.truncate(max_results);
    results
}

#[async_trait::async_trait]
impl SearchClient for DuckDuckGoClient {
    fn provider_name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> AppResult<Vec<SearchResult>> {
        tracing::debug!(query = %query, "Searching DuckDuckGo");

        let request = self.client.get(&self.base_url).query(&[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ]);
        let answer: InstantAnswer = get_json(request, "DuckDuckGo").await?;
        Ok(instant_answer_results(answer, max_results))
    }
}

/// A SearXNG instance with the JSON output format enabled.
pub struct SearxngClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngHit>,
}

#[derive(Debug, Deserialize)]
struct SearxngHit {
    title: Option<String>,
    content: Option<String>,
    url: Option<String>,
}

impl SearxngClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> AppResult<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout_secs)?,
        })
    }
}

#[async_trait::async_trait]
impl SearchClient for SearxngClient {
    fn provider_name(&self) -> &str {
        "searxng"
    }

    async fn search(&self, query: &str, max_results: usize) -> AppResult<Vec<SearchResult>> {
        tracing::debug!(query = %query, "Searching SearXNG");

        let url = format!("{}/search", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json")]);
        let response: SearxngResponse = get_json(request, "SearXNG").await?;

        Ok(response
            .results
            .into_iter()
            .take(max_results)
            .map(|hit| SearchResult {
                title: hit.title,
                body: hit.content,
                href: hit.url,
            })
            .collect())
    }
}

/// Build the configured search backend.
pub fn create_search_client(settings: &SearchSettings) -> AppResult<Arc<dyn SearchClient>> {
    match settings.provider.to_lowercase().as_str() {
        "duckduckgo" | "ddg" => {
            let url = settings.endpoint.as_deref().unwrap_or(DUCKDUCKGO_URL);
            Ok(Arc::new(DuckDuckGoClient::new(url, settings.timeout_secs)?))
        }
        "searxng" => {
            let url = settings.endpoint.as_deref().unwrap_or(DEFAULT_SEARXNG_URL);
            Ok(Arc::new(SearxngClient::new(url, settings.timeout_secs)?))
        }
        other => Err(AppError::Config(format!(
            "Unknown search provider '{}'. Supported: duckduckgo, searxng",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(json: serde_json::Value) -> InstantAnswer {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_instant_answer_abstract_and_topics() {
        let parsed = answer(serde_json::json!({
            "Heading": "Hypertension",
            "AbstractText": "Hypertension is long-term high blood pressure.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Hypertension",
            "RelatedTopics": [
                {"Text": "Blood pressure - force of circulating blood", "FirstURL": "https://duckduckgo.com/Blood_pressure"},
                {"Name": "Treatment", "Topics": [
                    {"Text": "ACE inhibitor - a class of drugs", "FirstURL": "https://duckduckgo.com/ACE_inhibitor"}
                ]},
                {"Text": "", "FirstURL": "https://duckduckgo.com/empty"}
            ]
        }));

        let results = instant_answer_results(parsed, 5);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title.as_deref(), Some("Hypertension"));
        assert_eq!(
            results[0].href.as_deref(),
            Some("https://en.wikipedia.org/wiki/Hypertension")
        );
        assert_eq!(results[1].title.as_deref(), Some("Blood pressure"));
        assert_eq!(results[2].title.as_deref(), Some("ACE inhibitor"));
        assert_eq!(
            results[2].body.as_deref(),
            Some("ACE inhibitor - a class of drugs")
        );
    }

    #[test]
    fn test_instant_answer_respects_max_results() {
        let topics: Vec<serde_json::Value> = (0..10)
            .map(|i| serde_json::json!({"Text": format!("Topic {}", i), "FirstURL": "u"}))
            .collect();
        let parsed = answer(serde_json::json!({ "RelatedTopics": topics }));

        let results = instant_answer_results(parsed, 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title.as_deref(), Some("Topic 0"));
    }

    #[test]
    fn test_empty_instant_answer() {
        let parsed = answer(serde_json::json!({"AbstractText": "", "RelatedTopics": []}));
        assert!(instant_answer_results(parsed, 5).is_empty());
    }

    #[test]
    fn test_create_search_client() {
        let settings = SearchSettings::default();
        assert_eq!(
            create_search_client(&settings).unwrap().provider_name(),
            "duckduckgo"
        );

        let searx = SearchSettings {
            provider: "SearXNG".to_string(),
            endpoint: Some("http://search.local/".to_string()),
            ..Default::default()
        };
        assert_eq!(create_search_client(&searx).unwrap().provider_name(), "searxng");

        let bad = SearchSettings {
            provider: "bing".to_string(),
            ..Default::default()
        };
        assert!(create_search_client(&bad).is_err());
    }
}
