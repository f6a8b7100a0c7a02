// ============================
// crates/backend-lib/src/middleware/guard.rs
// ============================
//! Per-route access control.
//!
//! [`classify`] is the whole policy and is a pure function. [`access_guard`]
//! does the I/O around it: resolve the session cookie, load the account, drain
//! the visitor's notices and either admit the request or redirect it.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use portal_common::{AccountId, AccountView, Notice, PageView};
use tracing::{debug, warn};

use crate::auth::flow::{HOME_PATH, LOGIN_PATH, REGISTER_PATH};
use crate::auth::token_generator::generate_flash_key;
use crate::auth::PendingNotice;
use crate::cookies::{flash_cookie, read_signed_cookie, FLASH_COOKIE_NAME};
use crate::error::AppError;
use crate::storage::{Account, AccountStorage};
use crate::AppState;

const LOGIN_REQUIRED: &str = "Please log in to access this page";

/// Who may see a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Only visitors without a session (login and registration pages)
    GuestOnly,
    /// Only signed-in accounts
    MemberOnly,
}

/// What the guard does with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Redirect {
        to: &'static str,
        notice: Option<Notice>,
    },
}

/// Access class of `path`. Anything not explicitly guest-only needs a session.
pub fn route_access(path: &str) -> RouteAccess {
    match path.trim_end_matches('/') {
        LOGIN_PATH | REGISTER_PATH => RouteAccess::GuestOnly,
        _ => RouteAccess::MemberOnly,
    }
}

/// Decide whether a request for a route of class `access` may proceed
pub fn classify(access: RouteAccess, authenticated: bool) -> Decision {
    match (access, authenticated) {
        (RouteAccess::MemberOnly, false) => Decision::Redirect {
            to: LOGIN_PATH,
            notice: Some(Notice::error(LOGIN_REQUIRED)),
        },
        (RouteAccess::GuestOnly, true) => Decision::Redirect {
            to: HOME_PATH,
            notice: None,
        },
        _ => Decision::Admit,
    }
}

/// Per-request identity and notices, available to handlers as an `Extension`
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub current_user: Option<AccountView>,
    pub account_id: Option<AccountId>,
    /// Token of the resolved session, if any
    pub session_token: Option<String>,
    /// Key under which notices for this visitor are queued
    pub flash_key: String,
    /// Notices drained for this response
    pub notices: PendingNotice,
}

impl RequestContext {
    /// Page context for the render layer
    pub fn page(&self, title: &str) -> PageView {
        PageView {
            title: title.to_string(),
            current_user: self.current_user.clone(),
            success: self.notices.success.clone(),
            error: self.notices.error.clone(),
        }
    }
}

/// Resolve a session token to its account.
///
/// A session whose account has vanished is destroyed. A storage failure only
/// makes this request anonymous; the session is kept for the next one.
async fn resolve_account<S: AccountStorage>(state: &AppState<S>, token: &str) -> Option<Account> {
    let account_id = state.auth.resolve_session(token)?;
    match state.storage.find_by_id(account_id).await {
        Ok(Some(account)) => Some(account),
        Ok(None) | Err(AppError::NotFound(_)) => {
            debug!(account_id = %account_id, "session refers to a missing account");
            state.auth.end_session(token);
            None
        },
        Err(err) => {
            warn!(account_id = %account_id, error = %err, "account lookup failed, treating request as anonymous");
            None
        },
    }
}

/// Access guard middleware
pub async fn access_guard<S: AccountStorage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session_settings = &state.settings.session;
    let secret = session_settings.secret_bytes();

    let session_token = read_signed_cookie(request.headers(), &session_settings.cookie_name, secret);
    let (flash_key, fresh_flash_key) = match read_signed_cookie(request.headers(), FLASH_COOKIE_NAME, secret) {
        Some(key) => (key, false),
        None => (generate_flash_key(), true),
    };

    let account = match session_token.as_deref() {
        Some(token) => resolve_account(&state, token).await,
        None => None,
    };
    let notices = state.flash.drain(&flash_key);
    let path = request.uri().path().to_string();

    let mut response = match classify(route_access(&path), account.is_some()) {
        Decision::Admit => {
            let context = RequestContext {
                current_user: account.as_ref().map(Account::view),
                account_id: account.as_ref().map(|account| account.id),
                session_token: account.as_ref().and(session_token),
                flash_key: flash_key.clone(),
                notices,
            };
            request.extensions_mut().insert(context);
            next.run(request).await
        },
        Decision::Redirect { to, notice } => {
            debug!(path = %path, to, "guard redirect");
            state.flash.requeue(&flash_key, notices);
            if let Some(notice) = notice {
                state.flash.push(&flash_key, notice);
            }
            Redirect::to(to).into_response()
        },
    };

    if fresh_flash_key && state.flash.has_pending(&flash_key) {
        match flash_cookie(session_settings, &flash_key) {
            Ok(cookie) => {
                response.headers_mut().append(SET_COOKIE, cookie);
            },
            Err(err) => warn!(error = %err, "failed to build flash cookie"),
        }
    }
    response
}
