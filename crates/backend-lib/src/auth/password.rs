// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Digests are PHC strings (`$scrypt$ln=..,r=..,p=..$<salt>$<hash>`), so the
//! algorithm, its cost parameters and the salt travel with every stored hash
//! and a parameter change can be detected with [`CredentialHasher::needs_rehash`].
use rand::{rngs::OsRng, RngCore};
use scrypt::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use std::sync::OnceLock;
use zeroize::Zeroize;

use crate::config::HashingSettings;
use crate::error::AppError;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Symbols accepted (and one of which is required) in a password
pub const PASSWORD_SYMBOLS: &str = "@$!%*?&";

const SALT_BYTES: usize = 16;
const OUTPUT_LEN: usize = 32;
const ALGORITHM: &str = "scrypt";

/// Password complexity requirements
#[derive(Debug, Clone)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
    /// Reject characters outside ASCII letters, digits and [`PASSWORD_SYMBOLS`]
    pub restrict_charset: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
            restrict_charset: true,
        }
    }
}

fn is_symbol(c: char) -> bool {
    PASSWORD_SYMBOLS.contains(c)
}

/// Check if a password meets the complexity requirements
pub fn validate_password_strength(password: &str, requirements: &PasswordRequirements) -> bool {
    if password.chars().count() < requirements.min_length {
        return false;
    }

    if requirements.restrict_charset
        && !password.chars().all(|c| c.is_ascii_alphanumeric() || is_symbol(c))
    {
        return false;
    }

    if requirements.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
        return false;
    }

    if requirements.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
        return false;
    }

    if requirements.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    if requirements.require_special && !password.chars().any(is_symbol) {
        return false;
    }

    true
}

/// One-way password hasher with a fixed scrypt cost.
#[derive(Debug)]
pub struct CredentialHasher {
    params: Params,
    /// Digest of a random secret, verified against when the account is unknown
    dummy: OnceLock<String>,
}

impl CredentialHasher {
    /// Create a hasher with explicit scrypt parameters
    pub fn new(settings: &HashingSettings) -> Result<Self, AppError> {
        let params = Params::new(settings.log_n, settings.r, settings.p, OUTPUT_LEN)
            .map_err(|e| AppError::Internal(format!("invalid scrypt parameters: {e}")))?;
        Ok(Self {
            params,
            dummy: OnceLock::new(),
        })
    }

    /// Hash a password using scrypt with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, AppError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AppError::Internal(format!("salt encoding failed: {e}")))?;

        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored digest.
    ///
    /// The final comparison is constant-time. Malformed digests and any
    /// verifier error count as a mismatch.
    pub fn verify(&self, plain: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            tracing::warn!("stored password digest is not a valid PHC string");
            return false;
        };
        Scrypt.verify_password(plain.as_bytes(), &parsed).is_ok()
    }

    /// Spend one verification on a throwaway digest so lookups for unknown
    /// accounts take as long as a wrong password. Always returns `false`.
    pub fn verify_absent(&self, plain: &str) -> bool {
        match self.dummy_digest() {
            Some(dummy) => {
                let _ = self.verify(plain, dummy);
            },
            // Hashing costs the same as verifying, so the timing still matches
            None => {
                let _ = self.hash(plain);
            },
        }
        false
    }

    /// Lazily computed throwaway digest. A failed attempt is not cached.
    fn dummy_digest(&self) -> Option<&str> {
        if let Some(dummy) = self.dummy.get() {
            return Some(dummy.as_str());
        }
        let mut secret = [0u8; 24];
        OsRng.fill_bytes(&mut secret);
        let mut secret = base64::Engine::encode(&base64::engine::general_purpose::STANDARD_NO_PAD, secret);
        let digest = self.hash(&secret);
        secret.zeroize();
        match digest {
            Ok(digest) => Some(self.dummy.get_or_init(|| digest).as_str()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to compute dummy password digest");
                None
            },
        }
    }

    /// Whether `digest` was produced by another algorithm or other cost parameters
    pub fn needs_rehash(&self, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return true;
        };
        if parsed.algorithm.as_str() != ALGORITHM {
            return true;
        }
        let param = |name: &str| parsed.params.get_decimal(name);
        param("ln") != Some(u32::from(self.params.log_n()))
            || param("r") != Some(self.params.r())
            || param("p") != Some(self.params.p())
    }
}

/// Securely hash a password and zeroize the plaintext
pub fn hash_password_secure(hasher: &CredentialHasher, plain: &mut String) -> Result<String, AppError> {
    let hash = hasher.hash(plain);
    plain.zeroize();
    hash
}
