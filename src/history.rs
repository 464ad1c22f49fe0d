//! Bounded conversation history ledger
//!
//! Append-only ordered record of user/assistant turns, capped with
//! oldest-entries-evicted-first semantics. Shared between the
//! request/response path and the streaming queue path; the internal mutex
//! is the single serialization point, and `append_pair` holds it across
//! both pushes so a concurrent turn can never observe or interleave a
//! half-appended pair.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::Role;

/// One dialogue turn entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Bounded, ordered dialogue history
pub struct HistoryLedger {
    entries: Mutex<VecDeque<HistoryEntry>>,
    cap: usize,
}

impl HistoryLedger {
    /// Create a ledger bounded at `cap` entries
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(cap.min(128))),
            cap,
        }
    }

    /// Append a single entry, evicting the oldest beyond the cap
    pub fn append(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_back(entry);
        Self::evict(&mut entries, self.cap);
    }

    /// Append a user/assistant pair atomically
    ///
    /// Both entries land under one lock acquisition, so no other turn's
    /// entries can interleave between them and no reader sees the user
    /// entry without its reply.
    pub fn append_pair(&self, user: impl Into<String>, assistant: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_back(HistoryEntry::new(Role::User, user));
        entries.push_back(HistoryEntry::new(Role::Assistant, assistant));
        Self::evict(&mut entries, self.cap);
    }

    /// The most recent `n` entries, oldest first
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let start = entries.len().saturating_sub(n);
        entries.iter().skip(start).cloned().collect()
    }

    /// Page backward from the newest entry
    ///
    /// Skips the `offset` most recent entries and returns up to `limit`
    /// entries before that, in dialogue order.
    #[must_use]
    pub fn slice(&self, limit: usize, offset: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let end = entries.len().saturating_sub(offset);
        let start = end.saturating_sub(limit);
        entries.iter().take(end).skip(start).cloned().collect()
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Current number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict(entries: &mut VecDeque<HistoryEntry>, cap: usize) {
        while entries.len() > cap {
            entries.pop_front();
        }
    }
}
