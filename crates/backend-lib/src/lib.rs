// ============================
// portal-backend-lib/src/lib.rs
// ============================
//! Authentication core of the account portal: credential hashing, sessions,
//! access guarding and rate limiting for the credential endpoints.

pub mod auth;
pub mod config;
pub mod cookies;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{
    AuthService, CredentialHasher, DefaultAuth, FlashStore, PasswordRequirements, RateLimiter,
    SessionStore,
};
use crate::config::Settings;
use crate::error::AppError;
use crate::storage::AccountStorage;

/// Application state shared across all handlers
pub struct AppState<S> {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Session store
    pub sessions: Arc<SessionStore>,
    /// Pending one-shot notices
    pub flash: Arc<FlashStore>,
    /// Rate limiter for credential endpoints
    pub rate_limiter: Arc<RateLimiter>,
    /// Settings
    pub settings: Arc<Settings>,
    /// Password policy derived from the settings
    pub password_requirements: PasswordRequirements,
    /// Account storage backend
    pub storage: S,
}

impl<S: AccountStorage> AppState<S> {
    /// Create a new application state
    pub fn new(storage: S, settings: Settings) -> Result<Self, AppError> {
        let hasher = Arc::new(CredentialHasher::new(&settings.hashing)?);
        let sessions = Arc::new(SessionStore::new(settings.session.ttl()));
        let auth = Arc::new(DefaultAuth::new(hasher, Arc::clone(&sessions)));
        let rate_limiter = Arc::new(RateLimiter::from_settings(&settings.rate_limit));
        let password_requirements = settings.password.requirements();

        Ok(Self {
            auth,
            sessions,
            flash: Arc::new(FlashStore::new()),
            rate_limiter,
            settings: Arc::new(settings),
            password_requirements,
            storage,
        })
    }
}
