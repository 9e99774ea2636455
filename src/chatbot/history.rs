//! Per-user conversation history.
//!
//! Each user gets a small FIFO log of recent turns, used to give the AI
//! providers some context. Histories live for the process lifetime and are
//! never persisted; distinct users are never evicted.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Maximum number of entries kept per user.
pub const MAX_HISTORY: usize = 15;

/// One recorded turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub text: String,
    pub is_bot: bool,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Format for the provider prompt: "Friend: ..." for our own turns, "You: ..." otherwise.
    pub fn format(&self) -> String {
        let speaker = if self.is_bot { "Friend" } else { "You" };
        format!("{}: {}", speaker, self.text)
    }
}

/// Store of bounded histories keyed by user id.
///
/// The lock is never held across an await point, so each `record` is atomic
/// with respect to concurrently running handlers.
pub struct HistoryStore {
    histories: Mutex<HashMap<String, VecDeque<HistoryEntry>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            histories: Mutex::new(HashMap::new()),
        }
    }

    /// Append a turn, evicting the oldest entries past `MAX_HISTORY`.
    pub fn record(&self, user_id: &str, text: &str, is_bot: bool) {
        let entry = HistoryEntry {
            text: text.to_string(),
            is_bot,
            timestamp: Utc::now(),
        };

        let mut histories = self.lock();
        let history = histories.entry(user_id.to_string()).or_default();
        history.push_back(entry);
        while history.len() > MAX_HISTORY {
            history.pop_front();
        }
    }

    /// Last `n` entries for a user, oldest first.
    pub fn recent(&self, user_id: &str, n: usize) -> Vec<HistoryEntry> {
        let histories = self.lock();
        match histories.get(user_id) {
            Some(history) => {
                let skip = history.len().saturating_sub(n);
                history.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub fn len(&self, user_id: &str) -> usize {
        self.lock().get(user_id).map_or(0, VecDeque::len)
    }

    pub fn user_count(&self) -> usize {
        self.lock().len()
    }

    // Push and pop are each complete, so a poisoned map is still consistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<HistoryEntry>>> {
        self.histories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
