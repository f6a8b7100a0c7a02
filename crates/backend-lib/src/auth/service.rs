use async_trait::async_trait;
use portal_common::AccountId;

use crate::error::AppError;

/// Credential and session operations the auth flows depend on
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Hash a plaintext password off the async executor
    async fn hash_password(&self, plain: &str) -> Result<String, AppError>;
    /// Verify `plain` against `digest`; `None` burns an equivalent amount of work
    async fn verify_password(&self, digest: Option<&str>, plain: &str) -> bool;
    fn needs_rehash(&self, digest: &str) -> bool;
    fn new_session(&self, account_id: AccountId) -> String;
    fn resolve_session(&self, token: &str) -> Option<AccountId>;
    fn end_session(&self, token: &str) -> bool;
}
