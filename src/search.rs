//! Search box behaviour: every keystroke dispatches a query, results land in
//! two typed buckets, and failures quietly become an empty result set.
//!
//! Each dispatch is numbered. A response is only applied if no newer query
//! (including clearing the box) happened since it was sent.

use crate::api_client::ForestClient;
use crate::error::ApiError;
use crate::models::{SearchHit, SearchResultSet, Tree};

/// A dispatched query waiting for its response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub generation: u64,
    pub query: String,
}

#[derive(Debug, Default)]
pub struct SearchInteraction {
    query: String,
    results: SearchResultSet,
    generation: u64,
}

impl SearchInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &SearchResultSet {
        &self.results
    }

    /// The results panel is shown whenever the box has text
    pub fn is_open(&self) -> bool {
        !self.query.is_empty()
    }

    /// Record new query text. Returns the request to send, or `None` when the
    /// trimmed query is empty (results are reset right away).
    pub fn set_query(&mut self, query: &str) -> Option<SearchRequest> {
        self.query = query.to_string();
        self.generation += 1;

        if query.trim().is_empty() {
            self.results = SearchResultSet::empty();
            return None;
        }

        Some(SearchRequest {
            generation: self.generation,
            query: query.to_string(),
        })
    }

    /// Apply a response. Returns false if the request was superseded.
    pub fn apply(&mut self, request: &SearchRequest, outcome: Result<SearchResultSet, ApiError>) -> bool {
        if request.generation != self.generation {
            log::debug!("[Search] Dropping stale results for '{}'", request.query);
            return false;
        }

        self.results = match outcome {
            Ok(results) => results,
            Err(e) => {
                log::warn!("[Search] {}", e);
                SearchResultSet::empty()
            }
        };
        true
    }

    /// Dispatch and apply in one step
    pub async fn query_changed(&mut self, client: &ForestClient, query: &str) {
        if let Some(request) = self.set_query(query) {
            let outcome = client.search(&request.query).await;
            self.apply(&request, outcome);
        }
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.results = SearchResultSet::empty();
        self.generation += 1;
    }

    /// Rows in display order: trees first, then planters
    pub fn hits(&self) -> Vec<SearchHit> {
        self.results.trees.iter().cloned().map(SearchHit::Tree)
            .chain(self.results.users.iter().cloned().map(SearchHit::User))
            .collect()
    }
}

/// Tree the camera should fly to when `hit` is selected; planters have no
/// position and select nothing
pub fn focus_target(hit: &SearchHit) -> Option<&Tree> {
    match hit {
        SearchHit::Tree(tree) => Some(tree),
        SearchHit::User(user) => {
            log::info!("[Search] Planter selected: {} ({} trees)", user.name, user.trees_planted);
            None
        }
    }
}
