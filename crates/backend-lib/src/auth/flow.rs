// ============================
// crates/backend-lib/src/auth/flow.rs
// ============================
//! Register, login, logout and account maintenance flows.
//!
//! Every flow resolves to a [`FlowOutcome`]: where to redirect, what notice to
//! queue and, after a login, the new session token. Errors never escape a flow;
//! they are logged and turned into an error notice here.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use portal_common::{
    AccountId, AccountUpdateForm, LoginForm, Notice, PasswordChangeForm, RegisterForm,
};
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::metrics::{LOGIN_FAILED, LOGIN_SUCCEEDED, REGISTER_SUCCEEDED};
use crate::storage::{Account, AccountStorage, EMAIL_TAKEN};
use crate::validation::{validate_email_change, validate_login, validate_new_password, validate_registration};
use crate::AppState;

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const SETTINGS_PATH: &str = "/account/settings";

const REGISTERED: &str = "Registration successful! Please log in.";
const REGISTER_FAILED: &str = "An error occurred during registration. Please try again.";
const LOGGED_IN: &str = "Login successful! Welcome back.";
const LOGIN_FAILED_MSG: &str = "An error occurred during login. Please try again.";
const PASSWORD_CHANGED: &str = "Password changed successfully";
const PASSWORD_CHANGE_FAILED: &str = "An error occurred while changing your password";
const WRONG_CURRENT_PASSWORD: &str = "Current password is incorrect";
const ACCOUNT_UPDATED: &str = "Account information updated successfully";
const ACCOUNT_UPDATE_FAILED: &str = "An error occurred while updating your account";
const EMAIL_IN_USE: &str = "Email is already in use";
const USER_NOT_FOUND: &str = "User not found";

/// Result of a flow, ready to be turned into a redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub location: &'static str,
    pub notice: Option<Notice>,
    /// Session token to hand to the client
    pub session: Option<String>,
}

impl FlowOutcome {
    fn redirect(location: &'static str) -> Self {
        Self {
            location,
            notice: None,
            session: None,
        }
    }

    fn success(location: &'static str, text: &str) -> Self {
        Self {
            notice: Some(Notice::success(text)),
            ..Self::redirect(location)
        }
    }

    fn failure(location: &'static str, text: String) -> Self {
        Self {
            notice: Some(Notice::error(text)),
            ..Self::redirect(location)
        }
    }
}

fn log_failure(flow: &'static str, err: &AppError) {
    if err.is_transient() {
        error!(flow, code = err.error_code(), error = %err, "flow failed");
    } else {
        debug!(flow, code = err.error_code(), error = %err, "flow rejected input");
    }
}

/// Create an account. Never signs the new account in.
pub async fn register<S: AccountStorage>(state: Arc<AppState<S>>, form: RegisterForm) -> FlowOutcome {
    match try_register(&state, &form).await {
        Ok(id) => {
            info!(account_id = %id, "account registered");
            counter!(REGISTER_SUCCEEDED).increment(1);
            FlowOutcome::success(LOGIN_PATH, REGISTERED)
        },
        Err(err) => {
            log_failure("register", &err);
            FlowOutcome::failure(REGISTER_PATH, err.user_message(REGISTER_FAILED))
        },
    }
}

async fn try_register<S: AccountStorage>(state: &AppState<S>, form: &RegisterForm) -> Result<AccountId, AppError> {
    let email = validate_registration(
        &form.email,
        &form.password,
        &form.confirm_password,
        &state.password_requirements,
    )?;

    // Fast path only; the storage insert is what enforces uniqueness
    if state.storage.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
    }

    let digest = state.auth.hash_password(&form.password).await?;
    state.storage.insert(Account::new(&email, digest)).await
}

/// Check credentials and open a session
pub async fn login<S: AccountStorage>(state: Arc<AppState<S>>, form: LoginForm) -> FlowOutcome {
    match try_login(&state, &form).await {
        Ok(token) => {
            counter!(LOGIN_SUCCEEDED).increment(1);
            FlowOutcome {
                session: Some(token),
                ..FlowOutcome::success(HOME_PATH, LOGGED_IN)
            }
        },
        Err(err) => {
            if matches!(err, AppError::InvalidCredentials) {
                counter!(LOGIN_FAILED).increment(1);
            }
            log_failure("login", &err);
            FlowOutcome::failure(LOGIN_PATH, err.user_message(LOGIN_FAILED_MSG))
        },
    }
}

async fn try_login<S: AccountStorage>(state: &AppState<S>, form: &LoginForm) -> Result<String, AppError> {
    let email = validate_login(&form.email, &form.password)?;
    let account = state.storage.find_by_email(&email).await?;

    // Unknown emails still pay for a verification
    let digest = account.as_ref().map(|account| account.password_hash.as_str());
    if !state.auth.verify_password(digest, &form.password).await {
        return Err(AppError::InvalidCredentials);
    }
    let Some(mut account) = account else {
        return Err(AppError::InvalidCredentials);
    };

    if state.auth.needs_rehash(&account.password_hash) {
        upgrade_hash(state, &mut account, &form.password).await;
    }

    let token = state.auth.new_session(account.id);
    info!(account_id = %account.id, "login succeeded");
    Ok(token)
}

/// Re-hash a password stored under outdated parameters. Failures only cost the upgrade.
async fn upgrade_hash<S: AccountStorage>(state: &AppState<S>, account: &mut Account, plain: &str) {
    let digest = match state.auth.hash_password(plain).await {
        Ok(digest) => digest,
        Err(err) => {
            warn!(account_id = %account.id, error = %err, "password rehash failed");
            return;
        },
    };
    account.password_hash = digest;
    account.updated_at = Utc::now();
    match state.storage.update(account).await {
        Ok(()) => debug!(account_id = %account.id, "password hash upgraded"),
        Err(err) => warn!(account_id = %account.id, error = %err, "storing rehashed password failed"),
    }
}

/// End the session behind `token`, if any. Always lands on the login page.
pub async fn logout<S: AccountStorage>(state: Arc<AppState<S>>, token: Option<String>) -> FlowOutcome {
    if let Some(token) = token {
        if state.auth.end_session(&token) {
            debug!("session destroyed");
        }
    }
    FlowOutcome::redirect(LOGIN_PATH)
}

/// Replace the password of the signed-in account. Other sessions stay valid.
pub async fn change_password<S: AccountStorage>(
    state: Arc<AppState<S>>,
    account_id: Option<AccountId>,
    form: PasswordChangeForm,
) -> FlowOutcome {
    match try_change_password(&state, account_id, &form).await {
        Ok(()) => {
            info!(account_id = ?account_id, "password changed");
            FlowOutcome::success(SETTINGS_PATH, PASSWORD_CHANGED)
        },
        Err(err @ AppError::NotFound(_)) => {
            log_failure("change_password", &err);
            FlowOutcome::failure(LOGIN_PATH, err.user_message(PASSWORD_CHANGE_FAILED))
        },
        Err(AppError::InvalidCredentials) => {
            debug!(account_id = ?account_id, "current password rejected");
            FlowOutcome::failure(SETTINGS_PATH, WRONG_CURRENT_PASSWORD.to_string())
        },
        Err(err) => {
            log_failure("change_password", &err);
            FlowOutcome::failure(SETTINGS_PATH, err.user_message(PASSWORD_CHANGE_FAILED))
        },
    }
}

async fn load_account<S: AccountStorage>(state: &AppState<S>, account_id: Option<AccountId>) -> Result<Account, AppError> {
    let id = account_id.ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;
    state
        .storage
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))
}

async fn try_change_password<S: AccountStorage>(
    state: &AppState<S>,
    account_id: Option<AccountId>,
    form: &PasswordChangeForm,
) -> Result<(), AppError> {
    let mut account = load_account(state, account_id).await?;

    if !state
        .auth
        .verify_password(Some(&account.password_hash), &form.current_password)
        .await
    {
        return Err(AppError::InvalidCredentials);
    }
    validate_new_password(&form.new_password, &form.confirm_password, &state.password_requirements)?;

    account.password_hash = state.auth.hash_password(&form.new_password).await?;
    account.updated_at = Utc::now();
    state.storage.update(&account).await
}

/// Change the display name and/or email of the signed-in account
pub async fn update_account<S: AccountStorage>(
    state: Arc<AppState<S>>,
    account_id: Option<AccountId>,
    form: AccountUpdateForm,
) -> FlowOutcome {
    match try_update_account(&state, account_id, &form).await {
        Ok(()) => {
            info!(account_id = ?account_id, "account updated");
            FlowOutcome::success(SETTINGS_PATH, ACCOUNT_UPDATED)
        },
        Err(err @ AppError::NotFound(_)) => {
            log_failure("update_account", &err);
            FlowOutcome::failure(LOGIN_PATH, err.user_message(ACCOUNT_UPDATE_FAILED))
        },
        Err(AppError::Conflict(_)) => {
            debug!(account_id = ?account_id, "email change collides with another account");
            FlowOutcome::failure(SETTINGS_PATH, EMAIL_IN_USE.to_string())
        },
        Err(err) => {
            log_failure("update_account", &err);
            FlowOutcome::failure(SETTINGS_PATH, err.user_message(ACCOUNT_UPDATE_FAILED))
        },
    }
}

async fn try_update_account<S: AccountStorage>(
    state: &AppState<S>,
    account_id: Option<AccountId>,
    form: &AccountUpdateForm,
) -> Result<(), AppError> {
    let mut account = load_account(state, account_id).await?;

    if let Some(email) = form.email.as_deref().filter(|email| !email.trim().is_empty()) {
        let email = validate_email_change(email)?;
        if email != account.email {
            if state.storage.find_by_email(&email).await?.is_some() {
                return Err(AppError::Conflict(EMAIL_IN_USE.to_string()));
            }
            account.email = email;
        }
    }
    if let Some(full_name) = &form.full_name {
        account.full_name = full_name.trim().to_string();
    }

    account.updated_at = Utc::now();
    state.storage.update(&account).await
}
