use std::collections::HashMap;
use tokio::sync::RwLock;

use salesintel_core::types::ChatTurn;

/// In-memory, per-identifier chat history with a sliding window.
///
/// Lives as long as the process. Concurrent exchanges on one identifier are
/// last-write-wins per append; their relative order is not guaranteed.
pub struct ConversationStore {
    window: usize,
    turns: RwLock<HashMap<String, Vec<ChatTurn>>>,
}

impl ConversationStore {
    pub fn new(window: usize) -> Self {
        Self { window, turns: RwLock::new(HashMap::new()) }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// The caller's identifier when it is non-blank, otherwise a fresh one.
    pub fn resolve(&self, id: Option<&str>) -> String {
        match id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(existing) => existing.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Snapshot of the stored turns, oldest first. Unknown ids are empty.
    pub async fn history(&self, id: &str) -> Vec<ChatTurn> {
        self.turns.read().await.get(id).cloned().unwrap_or_default()
    }

    /// Append one user/assistant exchange and drop the oldest turns beyond the window.
    pub async fn record_exchange(&self, id: &str, user: &str, assistant: &str) {
        let mut turns = self.turns.write().await;
        let history = turns.entry(id.to_string()).or_default();
        history.push(ChatTurn::user(user));
        history.push(ChatTurn::assistant(assistant));
        if history.len() > self.window {
            let excess = history.len() - self.window;
            history.drain(..excess);
        }
    }

    pub async fn forget(&self, id: &str) -> bool {
        self.turns.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Shared state handed to the agent instead of a module-level singleton.
pub struct AgentContext {
    pub conversations: ConversationStore,
}

impl AgentContext {
    pub fn new(history_window: usize) -> Self {
        Self { conversations: ConversationStore::new(history_window) }
    }
}
