//! Runtime configuration from environment variables.
//!
//! | Variable                         | Default        |
//! |----------------------------------|----------------|
//! | `COLLAB_MONITOR_BIND`            | `0.0.0.0:8000` |
//! | `GITHUB_WEBHOOK_SECRET`          | empty (checks disabled) |
//! | `COLLAB_MONITOR_RETRY_ATTEMPTS`  | `3`            |
//! | `COLLAB_MONITOR_RETRY_DELAY_MS`  | `1000`         |
//! | `REDIS_HOST`                     | unset (in-memory store) |
//! | `REDIS_PORT`                     | `6379`         |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::store::{RetryPolicy, redis_url};
use crate::webhooks::WebhookSecret;

pub const ENV_BIND: &str = "COLLAB_MONITOR_BIND";
pub const ENV_WEBHOOK_SECRET: &str = "GITHUB_WEBHOOK_SECRET";
pub const ENV_RETRY_ATTEMPTS: &str = "COLLAB_MONITOR_RETRY_ATTEMPTS";
pub const ENV_RETRY_DELAY_MS: &str = "COLLAB_MONITOR_RETRY_DELAY_MS";
pub const ENV_REDIS_HOST: &str = "REDIS_HOST";
pub const ENV_REDIS_PORT: &str = "REDIS_PORT";

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub webhook_secret: WebhookSecret,
    pub retry: RetryPolicy,
    /// `redis://` URL of the backing store, or `None` to keep events in memory.
    pub redis_url: Option<String>,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = parse_var(&lookup, ENV_BIND)?.unwrap_or(SocketAddr::from(([0, 0, 0, 0], 8000)));
        let webhook_secret = WebhookSecret::new(lookup(ENV_WEBHOOK_SECRET).unwrap_or_default());
        let attempts = parse_var(&lookup, ENV_RETRY_ATTEMPTS)?.unwrap_or(RetryPolicy::DEFAULT.max_attempts);
        let delay = parse_var::<u64>(&lookup, ENV_RETRY_DELAY_MS)?
            .map(Duration::from_millis)
            .unwrap_or(RetryPolicy::DEFAULT.delay);

        let redis_port = parse_var(&lookup, ENV_REDIS_PORT)?.unwrap_or(DEFAULT_REDIS_PORT);
        let redis_url = lookup(ENV_REDIS_HOST)
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .map(|host| redis_url(&host, redis_port));

        if attempts == 0 {
            return Err(ConfigError::Invalid {
                var: ENV_RETRY_ATTEMPTS,
                value: "0".into(),
                reason: "at least one attempt is required".into(),
            });
        }

        Ok(Config {
            bind,
            webhook_secret,
            retry: RetryPolicy::new(attempts, delay),
            redis_url,
        })
    }
}

/// Parses `var` if set and non-blank.
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
