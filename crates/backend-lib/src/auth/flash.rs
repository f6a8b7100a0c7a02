// ============================
// crates/backend-lib/src/auth/flash.rs
// ============================
//! One-shot notices carried to the next rendered response.
//!
//! Notices are keyed by a visitor's flash key (a signed cookie), not by the
//! session, so guests see "please log in" and "registration successful" too.
//! [`FlashStore::drain`] reads and clears in one atomic removal.

use dashmap::DashMap;
use portal_common::{Notice, NoticeKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Notices are dropped if nobody collects them within this period
pub const FLASH_TTL: Duration = Duration::from_secs(10 * 60);

/// Default upper bound on flash keys held at once
pub const MAX_FLASH_KEYS: usize = 100_000;

/// Pending success and error texts, in the order they were raised
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingNotice {
    pub success: Vec<String>,
    pub error: Vec<String>,
}

impl PendingNotice {
    pub fn push(&mut self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => self.success.push(notice.text),
            NoticeKind::Error => self.error.push(notice.text),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.error.is_empty()
    }

    /// Put `earlier` in front of what is already pending
    fn prepend(&mut self, mut earlier: PendingNotice) {
        earlier.success.append(&mut self.success);
        earlier.error.append(&mut self.error);
        *self = earlier;
    }
}

#[derive(Debug)]
struct FlashEntry {
    pending: PendingNotice,
    touched: Instant,
}

/// Store of pending notices keyed by flash key.
///
/// Anonymous visitors mint keys freely, so the number of keys is capped. Once
/// full, notices for new keys are dropped until stale entries age out.
#[derive(Debug)]
pub struct FlashStore {
    entries: DashMap<String, FlashEntry>,
    max_keys: usize,
}

impl Default for FlashStore {
    fn default() -> Self {
        Self::with_max_keys(MAX_FLASH_KEYS)
    }
}

impl FlashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_keys(max_keys: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_keys,
        }
    }

    /// Whether `key` may hold notices, evicting stale entries if the store is full
    fn admits(&self, key: &str) -> bool {
        if self.entries.contains_key(key) || self.entries.len() < self.max_keys {
            return true;
        }
        self.purge_stale();
        if self.entries.len() < self.max_keys {
            return true;
        }
        tracing::warn!(max_keys = self.max_keys, "flash store full, dropping notice");
        false
    }

    /// Queue a notice for the visitor holding `key`
    pub fn push(&self, key: &str, notice: Notice) {
        if !self.admits(key) {
            return;
        }
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| FlashEntry {
                pending: PendingNotice::default(),
                touched: Instant::now(),
            });
        entry.pending.push(notice);
        entry.touched = Instant::now();
    }

    /// Take every pending notice for `key`, leaving nothing behind
    pub fn drain(&self, key: &str) -> PendingNotice {
        self.entries
            .remove(key)
            .map(|(_, entry)| entry.pending)
            .unwrap_or_default()
    }

    /// Return drained notices to the queue ahead of anything queued since
    pub fn requeue(&self, key: &str, drained: PendingNotice) {
        if drained.is_empty() || !self.admits(key) {
            return;
        }
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| FlashEntry {
                pending: PendingNotice::default(),
                touched: Instant::now(),
            });
        entry.pending.prepend(drained);
        entry.touched = Instant::now();
    }

    /// Whether anything waits for `key`
    pub fn has_pending(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.pending.is_empty())
    }

    /// Drop notices nobody came back for
    pub fn purge_stale(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.touched) < FLASH_TTL);
        before.saturating_sub(self.entries.len())
    }

    /// Spawn a task that drops stale notices every `every`
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                store.purge_stale();
            }
        })
    }
}
