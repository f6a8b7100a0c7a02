// ============================
// crates/backend-lib/src/handlers/account.rs
// ============================
//! Dashboard and account settings endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    response::Response,
    Extension, Form, Json,
};
use portal_common::{AccountUpdateForm, PageView, PasswordChangeForm};

use super::{finish, run_detached, SharedState};
use crate::auth::flow::{self, SETTINGS_PATH};
use crate::middleware::RequestContext;
use crate::storage::AccountStorage;

/// `GET /` and `GET /dashboard`
pub async fn dashboard(Extension(context): Extension<RequestContext>) -> Json<PageView> {
    Json(context.page("Dashboard"))
}

/// `GET /account/settings`
pub async fn settings_page(Extension(context): Extension<RequestContext>) -> Json<PageView> {
    Json(context.page("Account Settings"))
}

/// `POST /account/update`
pub async fn update_account<S: AccountStorage + 'static>(
    State(state): State<SharedState<S>>,
    Extension(context): Extension<RequestContext>,
    form: Result<Form<AccountUpdateForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let outcome = run_detached(
        flow::update_account(Arc::clone(&state), context.account_id, form),
        SETTINGS_PATH,
    )
    .await;
    finish(&state, &context, outcome)
}

/// `POST /account/password`
pub async fn change_password<S: AccountStorage + 'static>(
    State(state): State<SharedState<S>>,
    Extension(context): Extension<RequestContext>,
    form: Result<Form<PasswordChangeForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let outcome = run_detached(
        flow::change_password(Arc::clone(&state), context.account_id, form),
        SETTINGS_PATH,
    )
    .await;
    finish(&state, &context, outcome)
}
