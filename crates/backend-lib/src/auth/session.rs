// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
use dashmap::DashMap;
use metrics::{counter, gauge};
use portal_common::AccountId;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::token_generator::generate_session_token;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};

/// Default idle TTL of a session
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7); // 7 days

/// Binding of a token to an authenticated account
#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: AccountId,
    pub created_at: SystemTime,
    expires_at: Instant,
}

/// Session store mapping bearer tokens to accounts, with sliding expiry.
///
/// Expiry is enforced on [`SessionStore::resolve`]; the periodic sweep only
/// reclaims memory.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SESSION_TTL)
    }
}

impl SessionStore {
    /// Create a new session store with the given idle TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Create a session for `account_id` and return its token
    pub fn create(&self, account_id: AccountId) -> String {
        let token = generate_session_token();
        let session = Session {
            account_id,
            created_at: SystemTime::now(),
            expires_at: Instant::now() + self.ttl,
        };
        self.sessions.insert(token.clone(), session);

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
        tracing::debug!(%account_id, "session created");

        token
    }

    /// Resolve a token to its account, refreshing the expiry on success
    pub fn resolve(&self, token: &str) -> Option<AccountId> {
        let now = Instant::now();
        {
            let mut session = self.sessions.get_mut(token)?;
            if now < session.expires_at {
                session.expires_at = now + self.ttl;
                return Some(session.account_id);
            }
        }
        // The shard guard above must be released before removing.
        if self.sessions.remove_if(token, |_, s| s.expires_at <= now).is_some() {
            counter!(SESSION_EXPIRED).increment(1);
            tracing::debug!("expired session evicted on access");
        }
        None
    }

    /// Remove a session. Destroying an absent token is not an error.
    pub fn destroy(&self, token: &str) -> bool {
        let removed = self.sessions.remove(token).is_some();
        if removed {
            gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
        }
        removed
    }

    /// Drop every expired session, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| now < session.expires_at);
        let removed = before.saturating_sub(self.sessions.len());

        if removed > 0 {
            counter!(SESSION_EXPIRED).increment(removed as u64);
            gauge!(SESSION_ACTIVE).set(self.sessions.len() as f64);
        }
        removed
    }

    /// Number of live entries, expired ones included until swept
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Spawn a task that sweeps expired sessions every `every`
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = store.purge_expired();
                if removed > 0 {
                    tracing::info!(removed, "swept expired sessions");
                }
            }
        })
    }
}
