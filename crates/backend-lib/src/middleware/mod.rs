// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the account portal.

pub mod guard;
pub mod rate_limit;

pub use guard::{access_guard, classify, route_access, Decision, RequestContext, RouteAccess};
pub use rate_limit::{client_key, rate_limit};
