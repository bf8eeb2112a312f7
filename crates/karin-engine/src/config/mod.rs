use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::NaiveDate;

use crate::workflows::karin::deadline::{DEFAULT_PRECAUTIONARY_MEASURES_DAYS, DEFAULT_TERM_DAYS};
use crate::workflows::karin::{BusinessCalendar, DeadlineCalculator, StatuteParameters};

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub statute: StatuteConfig,
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
            statute: StatuteConfig::from_env()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Deployment-specific legal terms and the holiday calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatuteConfig {
    pub precautionary_measures_days: u32,
    pub default_term_days: u32,
    pub holidays: Vec<NaiveDate>,
}

impl Default for StatuteConfig {
    fn default() -> Self {
        Self {
            precautionary_measures_days: DEFAULT_PRECAUTIONARY_MEASURES_DAYS,
            default_term_days: DEFAULT_TERM_DAYS,
            holidays: Vec::new(),
        }
    }
}

impl StatuteConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let precautionary_measures_days =
            term_from_env("KARIN_PRECAUTIONARY_DAYS", DEFAULT_PRECAUTIONARY_MEASURES_DAYS)?;
        let default_term_days = term_from_env("KARIN_DEFAULT_TERM_DAYS", DEFAULT_TERM_DAYS)?;
        let holidays = match env::var("KARIN_HOLIDAYS") {
            Ok(raw) => parse_holidays(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            precautionary_measures_days,
            default_term_days,
            holidays,
        })
    }

    pub fn calculator(&self) -> DeadlineCalculator {
        DeadlineCalculator::new(
            BusinessCalendar::with_holidays(self.holidays.iter().copied()),
            StatuteParameters {
                precautionary_measures_days: self.precautionary_measures_days,
                default_term_days: self.default_term_days,
            },
        )
    }
}

fn term_from_env(var: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidTerm { var }),
        Err(_) => Ok(default),
    }
}

/// Comma-separated `YYYY-MM-DD` dates; blanks are skipped.
fn parse_holidays(raw: &str) -> Result<Vec<NaiveDate>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| {
                ConfigError::InvalidHoliday {
                    value: value.to_string(),
                    source,
                }
            })
        })
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTerm { var: &'static str },
    InvalidHoliday { value: String, source: chrono::ParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTerm { var } => {
                write!(f, "{var} must be a non-negative number of days")
            }
            ConfigError::InvalidHoliday { value, .. } => {
                write!(f, "KARIN_HOLIDAYS entry '{value}' is not a YYYY-MM-DD date")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidTerm { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidHoliday { source, .. } => Some(source),
        }
    }
}
