//! Landing page state: backend health gates planting, stats feed the counter.

use crate::api_client::ForestClient;

pub const BACKEND_OFFLINE: &str = "Backend is currently offline. Please try again later.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Landing {
    backend_online: bool,
    tree_count: u64,
}

impl Landing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe the backend; only load stats when it answers
    pub async fn mount(&mut self, client: &ForestClient) {
        self.backend_online = client.check_health().await;
        if !self.backend_online {
            return;
        }
        match client.get_stats().await {
            Ok(stats) => self.tree_count = stats.total_trees,
            Err(e) => log::error!("[Landing] Failed to load stats: {}", e),
        }
    }

    pub fn backend_online(&self) -> bool {
        self.backend_online
    }

    pub fn tree_count(&self) -> u64 {
        self.tree_count
    }

    /// Opening the plant form requires a live backend
    pub fn request_plant(&self) -> Result<(), &'static str> {
        if self.backend_online { Ok(()) } else { Err(BACKEND_OFFLINE) }
    }

    pub fn tree_planted(&mut self) {
        self.tree_count += 1;
    }
}
