// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service configuration loaded from environment variables
//!
//! | Variable                | Default          |
//! |-------------------------|------------------|
//! | `IPAM_LISTEN_ADDR`      | `0.0.0.0:8080`   |
//! | `IPAM_RETRY_ATTEMPTS`   | `3`              |
//! | `IPAM_RETRY_BACKOFF_MS` | `10`             |
//! | `NATS_URL`              | unset (no bus)   |
//! | `NATS_CLIENT_NAME`      | `dcim-ipam`      |

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::nats::NatsConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Bounded retry of requests that lost an optimistic-concurrency race
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpamConfig {
    pub listen_addr: SocketAddr,
    pub retry: RetryPolicy,
    /// Event bus; events are dropped when unset
    pub nats: Option<NatsConfig>,
}

impl Default for IpamConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            retry: RetryPolicy::default(),
            nats: None,
        }
    }
}

impl IpamConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr = parse_var(&lookup, "IPAM_LISTEN_ADDR")?.unwrap_or(defaults.listen_addr);

        let max_attempts: u32 =
            parse_var(&lookup, "IPAM_RETRY_ATTEMPTS")?.unwrap_or(defaults.retry.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var: "IPAM_RETRY_ATTEMPTS",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        let backoff = parse_var::<u64, _>(&lookup, "IPAM_RETRY_BACKOFF_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.backoff);

        let nats = lookup("NATS_URL").map(|url| {
            let mut config = NatsConfig {
                servers: url.split(',').map(|s| s.trim().to_string()).collect(),
                ..NatsConfig::default()
            };
            if let Some(name) = lookup("NATS_CLIENT_NAME") {
                config.name = name;
            }
            config
        });

        Ok(Self {
            listen_addr,
            retry: RetryPolicy {
                max_attempts,
                backoff,
            },
            nats,
        })
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var,
                value: value.clone(),
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = IpamConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, IpamConfig::default());
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_overrides() {
        let config = IpamConfig::from_lookup(lookup(&[
            ("IPAM_LISTEN_ADDR", "127.0.0.1:9000"),
            ("IPAM_RETRY_ATTEMPTS", "5"),
            ("IPAM_RETRY_BACKOFF_MS", "25"),
            ("NATS_URL", "nats://a:4222, nats://b:4222"),
            ("NATS_CLIENT_NAME", "ipam-test"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(
            config.retry,
            RetryPolicy {
                max_attempts: 5,
                backoff: Duration::from_millis(25)
            }
        );
        let nats = config.nats.unwrap();
        assert_eq!(nats.servers, vec!["nats://a:4222", "nats://b:4222"]);
        assert_eq!(nats.name, "ipam-test");
    }

    #[test]
    fn test_invalid_values() {
        let err = IpamConfig::from_lookup(lookup(&[("IPAM_RETRY_ATTEMPTS", "many")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "IPAM_RETRY_ATTEMPTS",
                ..
            }
        ));

        assert_err!(IpamConfig::from_lookup(lookup(&[("IPAM_RETRY_ATTEMPTS", "0")])));
        assert_err!(IpamConfig::from_lookup(lookup(&[("IPAM_LISTEN_ADDR", "nowhere")])));
        assert_ok!(IpamConfig::from_lookup(lookup(&[("IPAM_RETRY_BACKOFF_MS", "0")])));
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(10),
        };
        assert_eq!(policy.delay_for(2), Duration::from_millis(20));
    }
}
