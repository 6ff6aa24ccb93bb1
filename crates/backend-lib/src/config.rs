// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment prefix; nested keys use `__`, e.g. `GUARDIAN_TOKEN__SECRET`
pub const ENV_PREFIX: &str = "GUARDIAN_";

/// Minimum accepted token signing secret, in bytes
pub const MIN_TOKEN_SECRET_BYTES: usize = 32;

/// Ceiling for every configured duration; keeps `now + duration` in range
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub token: TokenSettings,
    pub rate_limit: RateLimitSettings,
    pub session: SessionSettings,
    pub audit: AuditSettings,
    pub password: PasswordSettings,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    ///
    /// Only safe behind a reverse proxy that overwrites these headers; with
    /// direct client access they are attacker-controlled and would let a
    /// client pick its own rate-limit key. Disable to always use the peer
    /// socket address.
    pub trust_forwarded_headers: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            trust_forwarded_headers: true,
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server address: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Data directory for the flat-file tenant store
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// HMAC signing secret shared by every instance
    pub secret: String,
    pub ttl_secs: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_secs: 3600,
        }
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

/// Deployment-wide limiter settings (not per tenant)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_attempts: u32,
    pub window_secs: u64,
    /// Zero disables blocking; exhausted windows then only throttle
    pub block_duration_secs: u64,
    pub sweep_interval_secs: u64,
    pub stale_after_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 5 * 60,
            block_duration_secs: 15 * 60,
            sweep_interval_secs: 5 * 60,
            stale_after_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Used only when a session's tenant cannot be resolved
    pub default_idle_timeout_minutes: u32,
    pub cache_sweep_interval_secs: u64,
    /// How long inactive records are kept before purging
    pub retention_secs: u64,
    pub store_sweep_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_idle_timeout_minutes: 30,
            cache_sweep_interval_secs: 5 * 60,
            retention_secs: 24 * 60 * 60,
            store_sweep_interval_secs: 10 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 100,
        }
    }
}

/// Password complexity requirements and hashing cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
    /// scrypt CPU/memory cost as log2(N)
    pub scrypt_log_n: u8,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
            scrypt_log_n: 15,
        }
    }
}

/// Tracing filter level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLevel(pub String);

impl Default for LogLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Settings {
    /// Load defaults, then `config.toml` (or `path`), then `GUARDIAN_*` env vars
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.toml")
    }

    /// Load with an explicit config file; a missing file is not an error
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(invalid(format!("unknown log level {:?}", self.log_level.as_str())));
        }
        if self.token.secret.len() < MIN_TOKEN_SECRET_BYTES {
            return Err(invalid(format!(
                "token.secret must be at least {MIN_TOKEN_SECRET_BYTES} bytes"
            )));
        }
        if self.token.ttl_secs == 0 {
            return Err(invalid("token.ttl_secs must be positive"));
        }
        if self.rate_limit.max_attempts == 0 {
            return Err(invalid("rate_limit.max_attempts must be positive"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(invalid("rate_limit.window_secs must be positive"));
        }
        if self.rate_limit.sweep_interval_secs == 0
            || self.session.cache_sweep_interval_secs == 0
            || self.session.store_sweep_interval_secs == 0
        {
            return Err(invalid("sweep intervals must be positive"));
        }
        if self.session.default_idle_timeout_minutes == 0 {
            return Err(invalid("session.default_idle_timeout_minutes must be positive"));
        }
        let durations = [
            ("token.ttl_secs", self.token.ttl_secs),
            ("rate_limit.window_secs", self.rate_limit.window_secs),
            ("rate_limit.block_duration_secs", self.rate_limit.block_duration_secs),
            ("rate_limit.sweep_interval_secs", self.rate_limit.sweep_interval_secs),
            ("rate_limit.stale_after_secs", self.rate_limit.stale_after_secs),
            ("session.cache_sweep_interval_secs", self.session.cache_sweep_interval_secs),
            ("session.retention_secs", self.session.retention_secs),
            ("session.store_sweep_interval_secs", self.session.store_sweep_interval_secs),
            (
                "session.default_idle_timeout_minutes",
                u64::from(self.session.default_idle_timeout_minutes) * 60,
            ),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, secs)| *secs > MAX_DURATION_SECS) {
            return Err(invalid(format!("{name} exceeds {MAX_DURATION_SECS} seconds")));
        }
        if self.audit.workers == 0 || self.audit.queue_capacity == 0 {
            return Err(invalid("audit.workers and audit.queue_capacity must be positive"));
        }
        if self.password.min_length < 6 {
            return Err(invalid("password.min_length must be at least 6"));
        }
        if !(1..=20).contains(&self.password.scrypt_log_n) {
            return Err(invalid("password.scrypt_log_n must be between 1 and 20"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

/// Programmatic construction, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.settings.server.host = host.into();
        self.settings.server.port = port;
        self
    }

    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.settings.server.trust_forwarded_headers = trust;
        self
    }

    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.storage.path = path.into();
        self
    }

    pub fn token_secret(mut self, secret: impl Into<String>) -> Self {
        self.settings.token.secret = secret.into();
        self
    }

    pub fn token_ttl_secs(mut self, ttl: u64) -> Self {
        self.settings.token.ttl_secs = ttl;
        self
    }

    pub fn rate_limit(mut self, rate_limit: RateLimitSettings) -> Self {
        self.settings.rate_limit = rate_limit;
        self
    }

    pub fn session(mut self, session: SessionSettings) -> Self {
        self.settings.session = session;
        self
    }

    pub fn audit(mut self, audit: AuditSettings) -> Self {
        self.settings.audit = audit;
        self
    }

    pub fn password(mut self, password: PasswordSettings) -> Self {
        self.settings.password = password;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.settings.log_level = LogLevel(level.into());
        self
    }

    pub fn build(self) -> Result<Settings, ConfigError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
