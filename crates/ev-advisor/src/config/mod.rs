use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::recommendation::{PlaceholderPolicy, DEFAULT_RESUBMIT_COOLDOWN};

pub const DEFAULT_RANKING_SERVICE_URL: &str = "http://127.0.0.1:8080/handleSubmit";
const DEFAULT_RANKING_TIMEOUT_SECS: u64 = 30;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the advisor service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub ranking: RankingConfig,
    pub brand_directory: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            ranking: RankingConfig::from_env()?,
            brand_directory: env::var("BRAND_DIRECTORY_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection and presentation settings for the external ranking service.
#[derive(Debug, Clone)]
pub struct RankingConfig {
    pub endpoint: String,
    pub timeout: Duration,
    /// Window after a settled request during which a resubmission for the same session is
    /// still refused. Zero disables it.
    pub resubmit_cooldown: Duration,
    pub placeholders: PlaceholderPolicy,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RANKING_SERVICE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_RANKING_TIMEOUT_SECS),
            resubmit_cooldown: DEFAULT_RESUBMIT_COOLDOWN,
            placeholders: PlaceholderPolicy::default(),
        }
    }
}

impl RankingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let endpoint = env::var("RANKING_SERVICE_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.endpoint);

        let timeout = match env::var("RANKING_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout)?;
                if secs == 0 {
                    return Err(ConfigError::InvalidTimeout);
                }
                Duration::from_secs(secs)
            }
            Err(_) => defaults.timeout,
        };

        let resubmit_cooldown = match env::var("RANKING_RESUBMIT_COOLDOWN_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidCooldown)?,
            Err(_) => defaults.resubmit_cooldown,
        };

        let placeholders = match env::var("RANKING_PLACEHOLDERS") {
            Ok(raw) => PlaceholderPolicy::from_setting(&raw)
                .ok_or(ConfigError::InvalidPlaceholderPolicy { value: raw })?,
            Err(_) => defaults.placeholders,
        };

        Ok(Self {
            endpoint,
            timeout,
            resubmit_cooldown,
            placeholders,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidCooldown,
    InvalidPlaceholderPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "RANKING_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidCooldown => write!(
                f,
                "RANKING_RESUBMIT_COOLDOWN_MS must be a non-negative number of milliseconds"
            ),
            ConfigError::InvalidPlaceholderPolicy { value } => write!(
                f,
                "RANKING_PLACEHOLDERS '{}' must be one of estimated, unknown, randomized",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidCooldown
            | ConfigError::InvalidPlaceholderPolicy { .. } => None,
        }
    }
}
