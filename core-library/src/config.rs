//! Library configuration.

use serde::{Deserialize, Serialize};

/// Tuning for [`LibraryManager`](crate::LibraryManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Maximum number of remembered search queries.
    #[serde(default = "default_search_history_limit")]
    pub search_history_limit: usize,
}

fn default_search_history_limit() -> usize {
    20
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            search_history_limit: default_search_history_limit(),
        }
    }
}

impl LibraryConfig {
    pub fn with_search_history_limit(mut self, limit: usize) -> Self {
        self.search_history_limit = limit.max(1);
        self
    }
}
