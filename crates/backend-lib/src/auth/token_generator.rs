// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
/** Secure token generation for sessions and flash keys.
Tokens come straight from OS entropy and are encoded base64url without
padding, so they are safe in cookie values as-is. */
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

/// Session tokens carry 256 bits of entropy
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Flash keys only address pending notices, 128 bits is plenty
pub const FLASH_KEY_BYTES: usize = 16;

/// Generate an unguessable session token
pub fn generate_session_token() -> String {
    generate_token(SESSION_TOKEN_BYTES)
}

/// Generate a key for a visitor's pending notices
pub fn generate_flash_key() -> String {
    generate_token(FLASH_KEY_BYTES)
}

/** Generate a cryptographically secure random token of `bytes` random bytes
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_token(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
