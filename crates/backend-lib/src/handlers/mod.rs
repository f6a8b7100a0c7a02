// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers. Pages answer with the JSON page context; form submissions
//! run a flow and answer with a redirect.

pub mod account;
pub mod auth;

use std::future::Future;
use std::sync::Arc;

use axum::{
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
};
use portal_common::Notice;
use tracing::error;

use crate::auth::flow::FlowOutcome;
use crate::cookies::session_cookie;
use crate::middleware::RequestContext;
use crate::storage::AccountStorage;
use crate::AppState;

const FLOW_ABORTED: &str = "An error occurred. Please try again.";

/// Run a flow on its own task so a client hanging up cannot cancel it halfway
pub(crate) async fn run_detached<F>(flow: F, location: &'static str) -> FlowOutcome
where
    F: Future<Output = FlowOutcome> + Send + 'static,
{
    match tokio::spawn(flow).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "flow task failed");
            FlowOutcome {
                location,
                notice: Some(Notice::error(FLOW_ABORTED)),
                session: None,
            }
        },
    }
}

/// Queue the outcome's notice and build the redirect, setting the session cookie after a login.
///
/// Notices the guard drained for this request were never rendered, so they go
/// back in front of the outcome's notice.
pub(crate) fn finish<S: AccountStorage>(state: &AppState<S>, context: &RequestContext, outcome: FlowOutcome) -> Response {
    state.flash.requeue(&context.flash_key, context.notices.clone());
    if let Some(notice) = outcome.notice {
        state.flash.push(&context.flash_key, notice);
    }

    let mut response = Redirect::to(outcome.location).into_response();
    if let Some(token) = outcome.session {
        match session_cookie(&state.settings.session, &token) {
            Ok(cookie) => {
                response.headers_mut().append(SET_COOKIE, cookie);
            },
            Err(err) => {
                // Without the cookie the client is not signed in; drop the orphaned session
                error!(error = %err, "failed to build session cookie");
                state.auth.end_session(&token);
            },
        }
    }
    response
}

pub(crate) type SharedState<S> = Arc<AppState<S>>;
