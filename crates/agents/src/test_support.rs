//! Test doubles shared by the agent tests.

use crate::search::{SearchClient, SearchResult};
use concierge_core::{AppError, AppResult};
use std::sync::Mutex;

/// Returns fixed results and records the queries it saw.
pub struct FakeSearch {
    results: Result<Vec<SearchResult>, String>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn returning(results: Vec<SearchResult>) -> Self {
        Self {
            results: Ok(results),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            results: Err(message.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchClient for FakeSearch {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn search(&self, query: &str, max_results: usize) -> AppResult<Vec<SearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.results {
            Ok(results) => Ok(results.iter().take(max_results).cloned().collect()),
            Err(message) => Err(AppError::Search(message.clone())),
        }
    }
}
