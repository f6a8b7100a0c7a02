//! Signed cookie values and `Set-Cookie` builders.
//!
//! Cookie values are `<token>.<base64url(HMAC-SHA256(secret, token))>`. A value
//! whose signature does not check out is treated as if the cookie were absent.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SessionSettings;

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie carrying the flash key
pub const FLASH_COOKIE_NAME: &str = "portal_flash";

fn mac(secret: &[u8], value: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(value.as_bytes());
    mac
}

/// Append a signature to `value`
pub fn sign(secret: &[u8], value: &str) -> String {
    let tag = mac(secret, value).finalize().into_bytes();
    format!("{value}.{}", URL_SAFE_NO_PAD.encode(tag))
}

/// Strip and check the signature, returning the inner value if it is genuine
pub fn verify(secret: &[u8], signed: &str) -> Option<String> {
    let (value, tag) = signed.rsplit_once('.')?;
    let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
    // `verify_slice` compares in constant time
    mac(secret, value).verify_slice(&tag).ok()?;
    Some(value.to_string())
}

/// Raw value of cookie `name` from the request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
}

/// Verified value of signed cookie `name`
pub fn read_signed_cookie(headers: &HeaderMap, name: &str, secret: &[u8]) -> Option<String> {
    read_cookie(headers, name).and_then(|raw| verify(secret, &raw))
}

fn cookie_header(
    name: &str,
    value: &str,
    max_age: Option<u64>,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build the `HttpOnly` session cookie for `token`
pub fn session_cookie(settings: &SessionSettings, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    cookie_header(
        &settings.cookie_name,
        &sign(settings.secret_bytes(), token),
        Some(settings.ttl_secs),
        settings.cookie_secure,
    )
}

/// Expire the session cookie on the client
pub fn clear_session_cookie(settings: &SessionSettings) -> Result<HeaderValue, InvalidHeaderValue> {
    cookie_header(&settings.cookie_name, "", Some(0), settings.cookie_secure)
}

/// Browser-session cookie for the flash key
pub fn flash_cookie(settings: &SessionSettings, key: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    cookie_header(
        FLASH_COOKIE_NAME,
        &sign(settings.secret_bytes(), key),
        None,
        settings.cookie_secure,
    )
}
