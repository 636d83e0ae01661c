//! Centralized configuration for arcade-cli.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than halfway through a command.

use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SEED: usize = 3;

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Log format
    pub log_format: LogFormat,
    /// Deadline applied to every adapter operation (default: 5s)
    pub op_timeout: Duration,
    /// Number of demo widgets inserted before the command runs (default: 3)
    pub seed: usize,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        // Log format
        let log_format =
            LogFormat::from_str(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        // Operation timeout
        let op_timeout = match lookup("ARCADE_OP_TIMEOUT_MS") {
            None => Duration::from_millis(DEFAULT_TIMEOUT_MS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(ConfigError {
                        field: "ARCADE_OP_TIMEOUT_MS",
                        message: format!("expected a positive integer, got '{}'", raw),
                    })
                }
            },
        };

        // Seed count
        let seed = match lookup("ARCADE_SEED") {
            None => DEFAULT_SEED,
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| ConfigError {
                field: "ARCADE_SEED",
                message: format!("invalid count '{}': {}", raw, e),
            })?,
        };

        Ok(Self {
            log_format,
            op_timeout,
            seed,
        })
    }
}
