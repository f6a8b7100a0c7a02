// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Login, registration and logout endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::header::SET_COOKIE,
    response::Response,
    Extension, Form, Json,
};
use portal_common::{LoginForm, PageView, RegisterForm};
use tracing::error;

use super::{finish, run_detached, SharedState};
use crate::auth::flow::{self, LOGIN_PATH, REGISTER_PATH};
use crate::cookies::clear_session_cookie;
use crate::middleware::RequestContext;
use crate::storage::AccountStorage;

/// `GET /auth/login`
pub async fn login_page(Extension(context): Extension<RequestContext>) -> Json<PageView> {
    Json(context.page("Login"))
}

/// `POST /auth/login`
pub async fn login_submit<S: AccountStorage + 'static>(
    State(state): State<SharedState<S>>,
    Extension(context): Extension<RequestContext>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    // An unreadable body is the same as an empty form
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let outcome = run_detached(flow::login(Arc::clone(&state), form), LOGIN_PATH).await;
    finish(&state, &context, outcome)
}

/// `GET /auth/register`
pub async fn register_page(Extension(context): Extension<RequestContext>) -> Json<PageView> {
    Json(context.page("Register"))
}

/// `POST /auth/register`
pub async fn register_submit<S: AccountStorage + 'static>(
    State(state): State<SharedState<S>>,
    Extension(context): Extension<RequestContext>,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let outcome = run_detached(flow::register(Arc::clone(&state), form), REGISTER_PATH).await;
    finish(&state, &context, outcome)
}

/// `GET /auth/logout`. The cookie is cleared whether or not a session existed.
pub async fn logout<S: AccountStorage + 'static>(
    State(state): State<SharedState<S>>,
    Extension(context): Extension<RequestContext>,
) -> Response {
    let outcome = run_detached(
        flow::logout(Arc::clone(&state), context.session_token.clone()),
        LOGIN_PATH,
    )
    .await;
    let mut response = finish(&state, &context, outcome);
    match clear_session_cookie(&state.settings.session) {
        Ok(cookie) => {
            response.headers_mut().append(SET_COOKIE, cookie);
        },
        Err(err) => error!(error = %err, "failed to build session clearing cookie"),
    }
    response
}
