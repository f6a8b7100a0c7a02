// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod flash;
pub mod flow;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod token_generator;
mod service;
mod service_impl;

pub use flash::{FlashStore, PendingNotice};
pub use password::{validate_password_strength, CredentialHasher, PasswordRequirements, MIN_PASSWORD_LENGTH};
pub use rate_limit::{LimitedEndpoint, RateDecision, RateLimitPolicy, RateLimiter};
pub use session::{Session, SessionStore, SESSION_TTL};
pub use service::AuthService;
pub use service_impl::DefaultAuth;
