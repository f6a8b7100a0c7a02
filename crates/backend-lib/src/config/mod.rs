// ============================
// crates/backend-lib/src/config/mod.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::auth::PasswordRequirements;

/// Prefix for environment overrides, e.g. `PORTAL_SESSION__SECRET`
pub const ENV_PREFIX: &str = "PORTAL_";

/// Minimum accepted length of the cookie signing secret
pub const MIN_SECRET_LENGTH: usize = 32;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub session: SessionSettings,
    pub rate_limit: RateLimitSettings,
    pub password: PasswordSettings,
    pub hashing: HashingSettings,
    /// Log level
    pub log_level: String,
    /// `text` or `json`
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Data directory path
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Idle time after which a session expires, in seconds
    pub ttl_secs: u64,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Mark cookies `Secure`; enable whenever the site is served over TLS
    pub cookie_secure: bool,
    /// Key used to sign cookie values
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret: SecretString,
    /// Interval between sweeps of expired sessions and stale notices, in seconds
    pub cleanup_interval_secs: u64,
}

/// Limits for a single rate-limited endpoint
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct EndpointLimit {
    pub max_attempts: u32,
    pub window_secs: u64,
}

impl EndpointLimit {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub login: EndpointLimit,
    pub register: EndpointLimit,
    /// Key clients by `X-Real-IP` instead of the peer address
    pub trust_proxy_headers: bool,
}

/// Password complexity requirements
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    /// Minimum password length
    pub min_length: usize,
    /// Require uppercase letters
    pub require_uppercase: bool,
    /// Require lowercase letters
    pub require_lowercase: bool,
    /// Require digits
    pub require_digit: bool,
    /// Require one of `@$!%*?&`
    pub require_special: bool,
}

/// scrypt cost parameters
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HashingSettings {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            session: SessionSettings::default(),
            rate_limit: RateLimitSettings::default(),
            password: PasswordSettings::default(),
            hashing: HashingSettings::default(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data"),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 60 * 60 * 24 * 7, // 7 days
            cookie_name: "portal_session".to_string(),
            cookie_secure: false,
            secret: SecretString::from(String::new()),
            cleanup_interval_secs: 15 * 60,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            login: EndpointLimit {
                max_attempts: 5,
                window_secs: 15 * 60,
            },
            register: EndpointLimit {
                max_attempts: 3,
                window_secs: 60 * 60,
            },
            trust_proxy_headers: false,
        }
    }
}

impl Default for PasswordSettings {
    fn default() -> Self {
        let req = PasswordRequirements::default();
        Self {
            min_length: req.min_length,
            require_uppercase: req.require_uppercase,
            require_lowercase: req.require_lowercase,
            require_digit: req.require_digit,
            require_special: req.require_special,
        }
    }
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self { log_n: 15, r: 8, p: 1 }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl SessionSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn secret_bytes(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }
}

impl PasswordSettings {
    pub fn requirements(&self) -> PasswordRequirements {
        PasswordRequirements {
            min_length: self.min_length,
            require_uppercase: self.require_uppercase,
            require_lowercase: self.require_lowercase,
            require_digit: self.require_digit,
            require_special: self.require_special,
            ..PasswordRequirements::default()
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` in the working directory plus the environment
    pub fn load() -> Result<Self> {
        Self::from_figment(Figment::new().merge(Toml::file("config.toml")))
    }

    /// Load settings from an explicit TOML file plus the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("config file {} does not exist", path.display());
        }
        Self::from_figment(Figment::new().merge(Toml::file(path)))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("failed to parse settings")?;
        Ok(settings)
    }

    /// Socket address to bind
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.server.host, self.server.port))
    }

    /// Reject settings the server cannot run safely with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log_level);
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            bail!("invalid log format: {}", self.log_format);
        }
        if self.session.ttl_secs == 0 {
            bail!("session.ttl_secs must be greater than zero");
        }
        if self.session.cookie_name.is_empty() {
            bail!("session.cookie_name must not be empty");
        }
        if self.session.secret_bytes().len() < MIN_SECRET_LENGTH {
            bail!("session.secret must be at least {MIN_SECRET_LENGTH} bytes");
        }
        for (name, limit) in [("login", &self.rate_limit.login), ("register", &self.rate_limit.register)] {
            if limit.max_attempts == 0 || limit.window_secs == 0 {
                bail!("rate_limit.{name} needs non-zero max_attempts and window_secs");
            }
        }
        if self.password.min_length < 8 {
            bail!("password.min_length must be at least 8");
        }
        if scrypt::Params::new(self.hashing.log_n, self.hashing.r, self.hashing.p, 32).is_err() {
            bail!("invalid scrypt parameters: {:?}", self.hashing);
        }
        self.bind_addr()?;
        Ok(())
    }
}
