//! Environment-provided configuration, validated once at startup. The
//! process refuses to start on a missing or malformed required value.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use dompulse_core::{AlertThresholds, NotificationTarget, DEFAULT_MARKET_API_URL};

const DEFAULT_INTERVAL_SECS: u64 = 3_600;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:10000";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("required environment variable '{0}' is not set")]
    Missing(&'static str),
    #[error("environment variable '{name}' is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("CRITICAL_THRESHOLD must not exceed WARNING_THRESHOLD ({critical} > {warning})")]
    InvertedThresholds { warning: f64, critical: f64 },
}

/// Startup configuration for the bot process.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub telegram_token: String,
    pub target: NotificationTarget,
    pub thresholds: AlertThresholds,
    pub interval: Duration,
    pub bind_addr: SocketAddr,
    pub market_api_url: String,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read configuration through an injectable lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_token = require(&lookup, "TELEGRAM_TOKEN")?;

        let chat_id: i64 = parse("GROUP_ID", Some(require(&lookup, "GROUP_ID")?))?
            .ok_or(ConfigError::Missing("GROUP_ID"))?;

        // THREAD_ID of 0 means "no thread", matching the upstream API where
        // the field is simply omitted.
        let thread_id =
            parse::<i64>("THREAD_ID", lookup("THREAD_ID"))?.filter(|id| *id != 0);

        let interval_secs = parse::<u64>("POLL_INTERVAL_SECS", lookup("POLL_INTERVAL_SECS"))?
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "POLL_INTERVAL_SECS",
                reason: "interval must be non-zero".to_owned(),
            });
        }

        let warning = parse::<f64>("WARNING_THRESHOLD", lookup("WARNING_THRESHOLD"))?
            .unwrap_or(AlertThresholds::default().warning);
        let critical = parse::<f64>("CRITICAL_THRESHOLD", lookup("CRITICAL_THRESHOLD"))?
            .unwrap_or(AlertThresholds::default().critical);
        validate_threshold("WARNING_THRESHOLD", warning)?;
        validate_threshold("CRITICAL_THRESHOLD", critical)?;
        if critical > warning {
            return Err(ConfigError::InvertedThresholds { warning, critical });
        }

        let bind_addr = parse::<SocketAddr>("BIND_ADDR", lookup("BIND_ADDR"))?
            .unwrap_or_else(|| {
                DEFAULT_BIND_ADDR
                    .parse()
                    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 10_000)))
            });

        let market_api_url =
            lookup("MARKET_API_URL").unwrap_or_else(|| DEFAULT_MARKET_API_URL.to_owned());

        Ok(Self {
            telegram_token,
            target: NotificationTarget {
                chat_id,
                thread_id,
                markdown: true,
            },
            thresholds: AlertThresholds { warning, critical },
            interval: Duration::from_secs(interval_secs),
            bind_addr,
            market_api_url,
        })
    }
}

fn require<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse<T>(name: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(None),
        Some(value) => value.trim().parse::<T>().map(Some).map_err(|e| {
            ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }
        }),
    }
}

fn validate_threshold(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: format!("threshold must lie in 0..=100, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(entries: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn minimal_environment_yields_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("GROUP_ID", "-1002782765335"),
        ]))
        .expect("valid config");

        assert_eq!(config.target.chat_id, -1_002_782_765_335);
        assert_eq!(config.target.thread_id, None);
        assert_eq!(config.interval, Duration::from_secs(3_600));
        assert_eq!(config.thresholds, AlertThresholds::default());
        assert_eq!(config.bind_addr.port(), 10_000);
        assert_eq!(config.market_api_url, DEFAULT_MARKET_API_URL);
    }

    #[test]
    fn missing_token_is_rejected() {
        let error = Config::from_lookup(lookup(&[("GROUP_ID", "7")]))
            .expect_err("token required");

        assert_eq!(error, ConfigError::Missing("TELEGRAM_TOKEN"));
    }

    #[test]
    fn blank_token_is_rejected() {
        let error = Config::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "   "),
            ("GROUP_ID", "7"),
        ]))
        .expect_err("blank token rejected");

        assert_eq!(error, ConfigError::Missing("TELEGRAM_TOKEN"));
    }

    #[test]
    fn malformed_chat_id_is_rejected() {
        let error = Config::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("GROUP_ID", "not-a-number"),
        ]))
        .expect_err("chat id must be numeric");

        assert!(matches!(error, ConfigError::Invalid { name: "GROUP_ID", .. }));
    }

    #[test]
    fn thread_id_zero_means_no_thread() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("GROUP_ID", "7"),
            ("THREAD_ID", "0"),
        ]))
        .expect("valid config");

        assert_eq!(config.target.thread_id, None);
    }

    #[test]
    fn explicit_thread_id_is_carried() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("GROUP_ID", "7"),
            ("THREAD_ID", "3"),
        ]))
        .expect("valid config");

        assert_eq!(config.target.thread_id, Some(3));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let error = Config::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("GROUP_ID", "7"),
            ("POLL_INTERVAL_SECS", "0"),
        ]))
        .expect_err("zero interval rejected");

        assert!(matches!(
            error,
            ConfigError::Invalid { name: "POLL_INTERVAL_SECS", .. }
        ));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let error = Config::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("GROUP_ID", "7"),
            ("WARNING_THRESHOLD", "45"),
            ("CRITICAL_THRESHOLD", "50"),
        ]))
        .expect_err("critical above warning rejected");

        assert_eq!(
            error,
            ConfigError::InvertedThresholds {
                warning: 45.0,
                critical: 50.0
            }
        );
    }

    #[test]
    fn threshold_overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("GROUP_ID", "7"),
            ("WARNING_THRESHOLD", "60"),
            ("CRITICAL_THRESHOLD", "52.5"),
        ]))
        .expect("valid config");

        assert_eq!(config.thresholds.warning, 60.0);
        assert_eq!(config.thresholds.critical, 52.5);
    }
}
