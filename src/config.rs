use std::env;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub backend_base_url: Option<String>,
    pub backend_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            event_buffer_size: 1024,
            default_page_size: 10,
            max_page_size: 100,
            backend_base_url: None,
            backend_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let log_format = match env::var("LOG_FORMAT") {
            Ok(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            Ok(raw) if raw.eq_ignore_ascii_case("compact") => LogFormat::Compact,
            Ok(raw) => {
                return Err(AppError::Internal(format!(
                    "invalid LOG_FORMAT: {raw}, expected compact or json"
                )));
            }
            Err(_) => defaults.log_format,
        };

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            default_page_size: parse_or_default("DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: parse_or_default("MAX_PAGE_SIZE", defaults.max_page_size)?,
            backend_base_url: env::var("BACKEND_BASE_URL").ok(),
            backend_timeout_secs: parse_or_default(
                "BACKEND_TIMEOUT_SECS",
                defaults.backend_timeout_secs,
            )?,
        };

        if config.default_page_size == 0 || config.max_page_size < config.default_page_size {
            return Err(AppError::Internal(
                "page sizes must satisfy 0 < DEFAULT_PAGE_SIZE <= MAX_PAGE_SIZE".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
