use std::sync::Arc;

use async_trait::async_trait;
use portal_common::AccountId;

use super::password::hash_password_secure;
use super::{AuthService, CredentialHasher, SessionStore};
use crate::error::AppError;

/// [`AuthService`] backed by scrypt and the in-process session store
pub struct DefaultAuth {
    hasher: Arc<CredentialHasher>,
    sessions: Arc<SessionStore>,
}

impl DefaultAuth {
    pub fn new(hasher: Arc<CredentialHasher>, sessions: Arc<SessionStore>) -> Self {
        Self { hasher, sessions }
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    async fn hash_password(&self, plain: &str) -> Result<String, AppError> {
        let hasher = Arc::clone(&self.hasher);
        let mut plain = plain.to_string();
        tokio::task::spawn_blocking(move || hash_password_secure(&hasher, &mut plain)).await?
    }

    async fn verify_password(&self, digest: Option<&str>, plain: &str) -> bool {
        let hasher = Arc::clone(&self.hasher);
        let digest = digest.map(str::to_string);
        let plain = zeroize::Zeroizing::new(plain.to_string());
        let outcome = tokio::task::spawn_blocking(move || match digest {
            Some(digest) => hasher.verify(&plain, &digest),
            None => hasher.verify_absent(&plain),
        })
        .await;

        match outcome {
            Ok(matched) => matched,
            Err(err) => {
                tracing::error!(error = %err, "password verification task failed");
                false
            },
        }
    }

    fn needs_rehash(&self, digest: &str) -> bool {
        self.hasher.needs_rehash(digest)
    }

    fn new_session(&self, account_id: AccountId) -> String {
        self.sessions.create(account_id)
    }

    fn resolve_session(&self, token: &str) -> Option<AccountId> {
        self.sessions.resolve(token)
    }

    fn end_session(&self, token: &str) -> bool {
        self.sessions.destroy(token)
    }
}
