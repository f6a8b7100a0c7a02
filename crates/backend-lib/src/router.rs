// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, routing::post, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::{account, auth};
use crate::middleware::{access_guard, rate_limit};
use crate::storage::AccountStorage;
use crate::AppState;

/// Create the application router.
///
/// Every route, including the fallback, passes the access guard first. The
/// credential routes additionally pass the rate limiter.
pub fn create_router<S: AccountStorage + 'static>(state: Arc<AppState<S>>) -> Router {
    let credential_routes = Router::new()
        .route("/auth/login", get(auth::login_page).post(auth::login_submit::<S>))
        .route("/auth/register", get(auth::register_page).post(auth::register_submit::<S>))
        .route_layer(from_fn_with_state(Arc::clone(&state), rate_limit::<S>));

    let member_routes = Router::new()
        .route("/", get(account::dashboard))
        .route("/dashboard", get(account::dashboard))
        .route("/auth/logout", get(auth::logout::<S>))
        .route("/account/settings", get(account::settings_page))
        .route("/account/update", post(account::update_account::<S>))
        .route("/account/password", post(account::change_password::<S>));

    Router::new()
        .merge(credential_routes)
        .merge(member_routes)
        .layer(from_fn_with_state(Arc::clone(&state), access_guard::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
