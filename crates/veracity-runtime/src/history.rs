//! In-memory response history.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::collaborators::{CollaboratorError, HistoryStore};

/// Responses kept per context by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Keeps the most recent responses of each context in memory.
#[derive(Debug)]
pub struct InMemoryHistory {
    limit: usize,
    entries: RwLock<HashMap<String, VecDeque<String>>>,
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl InMemoryHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a context with earlier responses, oldest first.
    pub async fn seed<I, S>(&self, context_id: &str, responses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = self.entries.write().await;
        let slot = entries.entry(context_id.to_string()).or_default();
        for response in responses {
            push_bounded(slot, response.into(), self.limit);
        }
    }
}

fn push_bounded(slot: &mut VecDeque<String>, response: String, limit: usize) {
    slot.push_back(response);
    while slot.len() > limit {
        slot.pop_front();
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn history(
        &self,
        _query: &str,
        context_id: &str,
    ) -> Result<Vec<String>, CollaboratorError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(context_id)
            .map(|slot| slot.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn record(
        &self,
        _query: &str,
        context_id: &str,
        response: &str,
    ) -> Result<(), CollaboratorError> {
        let mut entries = self.entries.write().await;
        let slot = entries.entry(context_id.to_string()).or_default();
        push_bounded(slot, response.to_string(), self.limit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_context() {
        let store = InMemoryHistory::default();
        assert!(store.history("q", "ctx").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keeps_most_recent() {
        let store = InMemoryHistory::new(2);
        for response in ["one", "two", "three"] {
            store.record("q", "ctx", response).await.unwrap();
        }
        assert_eq!(store.history("q", "ctx").await.unwrap(), vec!["two", "three"]);
    }

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        let store = InMemoryHistory::default();
        store.seed("a", ["first answer"]).await;
        store.record("q", "b", "other answer").await.unwrap();
        assert_eq!(store.history("q", "a").await.unwrap(), vec!["first answer"]);
        assert_eq!(store.history("q", "b").await.unwrap(), vec!["other answer"]);
    }
}
