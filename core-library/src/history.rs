//! Recent search queries.

/// Most-recent-first list of search queries, capped at a limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHistory {
    entries: Vec<String>,
    limit: usize,
}

impl SearchHistory {
    pub fn new(entries: Vec<String>, limit: usize) -> Self {
        let mut history = Self {
            entries: Vec::new(),
            limit: limit.max(1),
        };
        // Oldest first so the newest ends up in front.
        for entry in entries.into_iter().rev() {
            history.record(&entry);
        }
        history
    }

    /// Move `query` to the front. Blank queries are ignored.
    ///
    /// Returns whether the history changed.
    pub fn record(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        if self.entries.first().map(String::as_str) == Some(query) {
            return false;
        }

        self.entries.retain(|q| q != query);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(self.limit);
        true
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.entries.is_empty();
        self.entries.clear();
        changed
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}
