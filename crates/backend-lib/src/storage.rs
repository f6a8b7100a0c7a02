// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Account storage abstraction with flat-file and in-memory implementations.
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use portal_common::{AccountId, AccountView};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{fs as tokio_fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::error::AppError;

/// Photo shown until the user uploads one
pub const DEFAULT_PROFILE_PHOTO: &str = "/img/profile.png";

/// Message reported for a duplicate email
pub const EMAIL_TAKEN: &str = "An account with this email already exists";

/// Stored identity record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    /// Unique, always lowercase
    pub email: String,
    /// PHC digest; the plaintext is never stored
    pub password_hash: String,
    pub full_name: String,
    pub profile_photo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh account for `email` with an already hashed password
    pub fn new(email: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            password_hash,
            full_name: String::new(),
            profile_photo: DEFAULT_PROFILE_PHOTO.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The account as the render layer sees it
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            profile_photo: self.profile_photo.clone(),
            created_at: self.created_at,
        }
    }
}

/// Trait for account storage backends
#[async_trait]
pub trait AccountStorage: Send + Sync {
    /// Look up an account by email, case-insensitively
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    /// Look up an account by id
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, AppError>;

    /// Store a new account. Fails with [`AppError::Conflict`] if the email is
    /// taken, even when a concurrent insert won the race.
    async fn insert(&self, account: Account) -> Result<AccountId, AppError>;

    /// Replace a stored account, moving its email index if the email changed
    async fn update(&self, account: &Account) -> Result<(), AppError>;
}

/// Filesystem failures mean the store is unreachable, not that the caller erred
fn unavailable(err: std::io::Error) -> AppError {
    AppError::Transient(format!("account storage unavailable: {err}"))
}

/// Flat-file implementation of the [`AccountStorage`] trait.
///
/// Layout under `root`:
/// - `accounts/<id>.json` holds the record
/// - `accounts/by-email/<base64url(email)>` holds the owning id; it is created
///   with `create_new`, which makes the filesystem enforce email uniqueness.
#[derive(Clone, Debug)]
pub struct FlatFileStorage {
    root: PathBuf,
}

impl FlatFileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("accounts").join("by-email"))?;
        Ok(Self { root })
    }

    fn record_path(&self, id: AccountId) -> PathBuf {
        self.root.join("accounts").join(format!("{id}.json"))
    }

    fn index_path(&self, email: &str) -> PathBuf {
        let key = URL_SAFE_NO_PAD.encode(email.to_lowercase());
        self.root.join("accounts").join("by-email").join(key)
    }

    /// Claim `email` for `id`; fails with `Conflict` if already claimed
    async fn claim_email(&self, email: &str, id: AccountId) -> Result<(), AppError> {
        let mut file = match tokio_fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.index_path(email))
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
            },
            Err(err) => return Err(unavailable(err)),
        };
        file.write_all(id.to_string().as_bytes()).await.map_err(unavailable)?;
        file.flush().await.map_err(unavailable)?;
        Ok(())
    }

    async fn release_email(&self, email: &str) {
        if let Err(err) = tokio_fs::remove_file(self.index_path(email)).await {
            tracing::warn!(error = %err, "failed to remove email index entry");
        }
    }

    /// Write the record through a temp file so readers never see half a record
    async fn write_record(&self, account: &Account) -> Result<(), AppError> {
        let path = self.record_path(account.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(account)?;
        tokio_fs::write(&tmp, json).await.map_err(unavailable)?;
        tokio_fs::rename(&tmp, &path).await.map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl AccountStorage for FlatFileStorage {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let id = match tokio_fs::read_to_string(self.index_path(email)).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(unavailable(err)),
        };
        // Claimed but not yet written
        if id.trim().is_empty() {
            return Ok(None);
        }
        let id = Uuid::parse_str(id.trim())
            .map_err(|e| AppError::Internal(format!("corrupt email index: {e}")))?;
        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, AppError> {
        let content = match tokio_fs::read(self.record_path(id)).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(unavailable(err)),
        };
        Ok(Some(serde_json::from_slice(&content)?))
    }

    async fn insert(&self, account: Account) -> Result<AccountId, AppError> {
        self.claim_email(&account.email, account.id).await?;
        if let Err(err) = self.write_record(&account).await {
            // Give the email back so a retry is not reported as a duplicate
            self.release_email(&account.email).await;
            return Err(err);
        }
        Ok(account.id)
    }

    async fn update(&self, account: &Account) -> Result<(), AppError> {
        let current = self
            .find_by_id(account.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let email_changed = current.email != account.email;
        if email_changed {
            self.claim_email(&account.email, account.id).await?;
        }
        if let Err(err) = self.write_record(account).await {
            if email_changed {
                self.release_email(&account.email).await;
            }
            return Err(err);
        }
        if email_changed {
            self.release_email(&current.email).await;
        }
        Ok(())
    }
}

/// In-memory implementation of the [`AccountStorage`] trait
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    accounts: Arc<DashMap<AccountId, Account>>,
    by_email: Arc<DashMap<String, AccountId>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Remove an account outright. Only used to simulate records vanishing.
    pub fn remove(&self, id: AccountId) -> Option<Account> {
        let (_, account) = self.accounts.remove(&id)?;
        self.by_email.remove(&account.email);
        Some(account)
    }
}

#[async_trait]
impl AccountStorage for MemoryStorage {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let Some(id) = self.by_email.get(&email.to_lowercase()).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.get(&id).map(|account| account.clone()))
    }

    async fn insert(&self, account: Account) -> Result<AccountId, AppError> {
        match self.by_email.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(EMAIL_TAKEN.to_string())),
            Entry::Vacant(slot) => {
                let id = account.id;
                self.accounts.insert(id, account);
                slot.insert(id);
                Ok(id)
            },
        }
    }

    async fn update(&self, account: &Account) -> Result<(), AppError> {
        let previous_email = self
            .accounts
            .get(&account.id)
            .map(|stored| stored.email.clone())
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if previous_email != account.email {
            match self.by_email.entry(account.email.clone()) {
                Entry::Occupied(_) => return Err(AppError::Conflict(EMAIL_TAKEN.to_string())),
                Entry::Vacant(slot) => {
                    slot.insert(account.id);
                },
            }
            self.by_email.remove(&previous_email);
        }
        self.accounts.insert(account.id, account.clone());
        Ok(())
    }
}
