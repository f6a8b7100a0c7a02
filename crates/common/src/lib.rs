// ================
// common/src/lib.rs
// ================
//! Common types shared between the account portal server and its callers.
//! This module defines the form payloads the server accepts and the page
//! context it hands to the render layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

/// Identifier of a stored account
pub type AccountId = Uuid;

/// Kind of one-shot notice shown on the next rendered page
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A single user-facing outcome message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Account as exposed to the render layer. Never carries the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub email: String,
    pub full_name: String,
    pub profile_photo: String,
    pub created_at: DateTime<Utc>,
}

/// Context consumed by the render layer for every page
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    /// Page title
    pub title: String,
    /// The signed-in account, if any
    pub current_user: Option<AccountView>,
    /// Pending success notices, drained for this response
    pub success: Vec<String>,
    /// Pending error notices, drained for this response
    pub error: Vec<String>,
}

/// Login form
/// # Fields
/// * `email` - Account email, matched case-insensitively
/// * `password` - Plaintext password
#[derive(Deserialize, Debug, Clone, Default)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form
/// # Fields
/// * `email` - Account email
/// * `password` - Chosen password
/// * `confirm_password` - Must equal `password`
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Password change form submitted from account settings
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Account information form submitted from account settings.
/// Absent fields leave the stored value untouched.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdateForm {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Drop for LoginForm {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

impl Drop for RegisterForm {
    fn drop(&mut self) {
        self.password.zeroize();
        self.confirm_password.zeroize();
    }
}

impl Drop for PasswordChangeForm {
    fn drop(&mut self) {
        self.current_password.zeroize();
        self.new_password.zeroize();
        self.confirm_password.zeroize();
    }
}
