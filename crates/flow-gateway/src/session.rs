//! In-memory flow session store.
//!
//! One session per flow token, created lazily on first touch and reaped
//! opportunistically on request arrival rather than by a background timer.
//! Expiry is therefore an amortized side effect of traffic; acceptable
//! because the store is purely in-memory and bounded by real traffic
//! volume. Sessions do not survive process restart.
//!
//! Constructed once at startup and injected as `Arc<SessionManager>`; the
//! `DashMap` backing guards concurrent requests racing on one token.

use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// One in-progress form instance.
#[derive(Debug, Clone)]
pub struct FlowSession {
    /// Progressively accumulated form fields, last write wins per key
    pub fields: Map<String, Value>,
    /// Set at creation; deliberately NOT refreshed on merge, so a session
    /// always expires TTL after it was first observed
    pub created_at: Instant,
}

impl FlowSession {
    fn new() -> Self {
        Self {
            fields: Map::new(),
            created_at: Instant::now(),
        }
    }
}

/// Read-only session snapshot for operational diagnostics.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Flow token (natural key)
    pub token: String,
    /// Number of accumulated fields
    pub field_count: usize,
    /// Accumulated field names
    pub field_names: Vec<String>,
    /// Elapsed time since session creation
    pub age: Duration,
}

/// Store statistics.
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Sessions created
    pub created: AtomicU64,
    /// Merge operations applied
    pub merged: AtomicU64,
    /// Sessions removed by the reaper
    pub reaped: AtomicU64,
    /// Sessions removed explicitly
    pub deleted: AtomicU64,
}

/// Session table keyed by flow token.
pub struct SessionManager {
    sessions: DashMap<String, FlowSession>,
    stats: SessionStats,
}

impl SessionManager {
    /// Create an empty session manager.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            stats: SessionStats::default(),
        }
    }

    /// Create the session for `token` if absent; returns whether it was
    /// created by this call.
    pub fn ensure(&self, token: &str) -> bool {
        let mut created = false;
        self.sessions.entry(token.to_string()).or_insert_with(|| {
            created = true;
            FlowSession::new()
        });
        if created {
            self.stats.created.fetch_add(1, Ordering::Relaxed);
            debug!(token, "Created flow session");
        }
        created
    }

    /// Replace any existing session for `token` with a fresh empty one,
    /// resetting its creation time.
    pub fn reset(&self, token: &str) {
        self.sessions.insert(token.to_string(), FlowSession::new());
        self.stats.created.fetch_add(1, Ordering::Relaxed);
        debug!(token, "Reset flow session");
    }

    /// Upsert every key of `new_fields` into the session, creating the
    /// session on the fly if needed. Later writes overwrite earlier ones
    /// for the same key. The creation timestamp is NOT refreshed.
    pub fn merge(&self, token: &str, new_fields: &Map<String, Value>) {
        let mut session = self
            .sessions
            .entry(token.to_string())
            .or_insert_with(FlowSession::new);
        if !new_fields.is_empty() {
            for (k, v) in new_fields {
                session.fields.insert(k.clone(), v.clone());
            }
            self.stats.merged.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Snapshot of the session's accumulated fields.
    pub fn fields(&self, token: &str) -> Option<Map<String, Value>> {
        self.sessions.get(token).map(|s| s.fields.clone())
    }

    /// Remove the session; returns whether it existed.
    pub fn delete(&self, token: &str) -> bool {
        let existed = self.sessions.remove(token).is_some();
        if existed {
            self.stats.deleted.fetch_add(1, Ordering::Relaxed);
            debug!(token, "Deleted flow session");
        }
        existed
    }

    /// Diagnostic listing of all live sessions.
    pub fn list(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|entry| SessionInfo {
                token: entry.key().clone(),
                field_count: entry.fields.len(),
                field_names: entry.fields.keys().cloned().collect(),
                age: entry.created_at.elapsed(),
            })
            .collect()
    }

    /// Delete every session strictly older than `ttl`; returns the number
    /// removed. Invoked at the start of each inbound request.
    pub fn reap(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.created_at.elapsed() <= ttl);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            self.stats.reaped.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "Reaped expired flow sessions");
        }
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop all sessions (shutdown semantics).
    pub fn clear(&self) {
        self.sessions.clear();
    }

    /// Store statistics.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Backdate a session's creation time (test hook for the reaper).
    #[cfg(test)]
    pub(crate) fn backdate(&self, token: &str, age: Duration) {
        if let Some(mut session) = self.sessions.get_mut(token) {
            session.created_at = Instant::now() - age;
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
