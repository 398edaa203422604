// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants;
use crate::normalizer::FormatMode;
use crate::shipper::RetryStrategy;

/// Bulk listener the payloads are posted to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Endpoint {
    /// Base URL, e.g. `https://listener.logz.io:8071`.
    pub url: String,
    pub token: String,
    /// Log type label attached to every shipped line by the listener.
    pub log_type: String,
}

impl Endpoint {
    /// URL of the bulk route, without the query string.
    #[must_use]
    pub fn bulk_url(&self) -> String {
        format!("{}/", self.url.trim_end_matches('/'))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub endpoint: Endpoint,
    pub format_mode: FormatMode,
    /// Adds logGroup, logStream and owner to every line
    pub include_source_metadata: bool,
    pub max_payload_bytes: usize,
    pub max_payload_lines: usize,
    /// HTTP attempts per payload, the first one included
    pub retry_attempts: u32,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_max_ms: u64,
    /// Timeout for each POST request, in seconds
    pub request_timeout_secs: u64,
    pub https_proxy: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: Endpoint::default(),
            format_mode: FormatMode::Plain,
            include_source_metadata: false,
            max_payload_bytes: constants::MAX_CONTENT_SIZE_BYTES,
            max_payload_lines: constants::MAX_BATCH_ENTRIES_SIZE,
            retry_attempts: constants::FLUSH_RETRY_COUNT,
            retry_backoff_base_ms: constants::RETRY_BACKOFF_BASE_MS,
            retry_backoff_max_ms: constants::RETRY_BACKOFF_MAX_MS,
            request_timeout_secs: constants::REQUEST_TIMEOUT_SECS,
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration from the function's environment variables.
    pub fn new() -> anyhow::Result<Config> {
        let endpoint = Endpoint {
            url: required_var("URL")?,
            token: required_var("TOKEN")?,
            log_type: required_var("TYPE")?,
        };

        let format_mode = match env::var("FORMAT") {
            Ok(format) => FormatMode::from_str(&format).map_err(anyhow::Error::msg)?,
            Err(_) => FormatMode::Plain,
        };

        let defaults = Config::default();
        let config = Config {
            endpoint,
            format_mode,
            include_source_metadata: env::var("INCLUDE_SOURCE_METADATA")
                .map(|val| val.to_lowercase() == "true")
                .unwrap_or(false),
            max_payload_bytes: parse_var("MAX_PAYLOAD_BYTES")?
                .unwrap_or(defaults.max_payload_bytes),
            max_payload_lines: parse_var("MAX_PAYLOAD_LINES")?
                .unwrap_or(defaults.max_payload_lines),
            retry_attempts: parse_var("MAX_RETRIES")?.unwrap_or(defaults.retry_attempts),
            retry_backoff_base_ms: parse_var("RETRY_BACKOFF_BASE_MS")?
                .unwrap_or(defaults.retry_backoff_base_ms),
            retry_backoff_max_ms: parse_var("RETRY_BACKOFF_MAX_MS")?
                .unwrap_or(defaults.retry_backoff_max_ms),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS")?
                .unwrap_or(defaults.request_timeout_secs),
            https_proxy: env::var("HTTPS_PROXY").ok().filter(|val| !val.is_empty()),
            log_level: env::var("LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        if config.max_payload_bytes == 0 {
            anyhow::bail!("MAX_PAYLOAD_BYTES must be greater than zero");
        }
        if config.max_payload_lines == 0 {
            anyhow::bail!("MAX_PAYLOAD_LINES must be greater than zero");
        }
        if config.retry_attempts == 0 {
            anyhow::bail!("MAX_RETRIES must be greater than zero");
        }

        Ok(config)
    }

    #[must_use]
    pub fn retry_strategy(&self) -> RetryStrategy {
        RetryStrategy::ExponentialBackoff {
            attempts: self.retry_attempts,
            base_ms: self.retry_backoff_base_ms,
            max_ms: self.retry_backoff_max_ms,
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Filter directives for the shipper's own logs. HTTP stack crates are
    /// quieted so they don't end up next to the shipped logs.
    #[must_use]
    pub fn log_filter(&self) -> String {
        format!(
            "h2=off,hyper=off,reqwest=warn,rustls=off,{}",
            self.log_level
        )
    }
}

fn required_var(name: &str) -> anyhow::Result<String> {
    match env::var(name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(anyhow::anyhow!("{name} environment variable is not set")),
    }
}

fn parse_var<T: FromStr>(name: &str) -> anyhow::Result<Option<T>> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{name} is not a valid number: '{val}'")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serial_test::serial;
    use std::env;

    use super::*;

    const ALL_VARS: [&str; 13] = [
        "URL",
        "TOKEN",
        "TYPE",
        "FORMAT",
        "INCLUDE_SOURCE_METADATA",
        "MAX_PAYLOAD_BYTES",
        "MAX_PAYLOAD_LINES",
        "MAX_RETRIES",
        "RETRY_BACKOFF_BASE_MS",
        "RETRY_BACKOFF_MAX_MS",
        "REQUEST_TIMEOUT_SECS",
        "HTTPS_PROXY",
        "LOG_LEVEL",
    ];

    fn set_endpoint_vars() {
        for name in ALL_VARS {
            env::remove_var(name);
        }
        env::set_var("URL", "https://listener.logz.io:8071");
        env::set_var("TOKEN", "123456789");
        env::set_var("TYPE", "vpcflow");
    }

    fn clear_vars() {
        for name in ALL_VARS {
            env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        set_endpoint_vars();

        let config = Config::new().unwrap();

        assert_eq!(config.endpoint.url, "https://listener.logz.io:8071");
        assert_eq!(config.endpoint.token, "123456789");
        assert_eq!(config.endpoint.log_type, "vpcflow");
        assert_eq!(config.format_mode, FormatMode::Plain);
        assert!(!config.include_source_metadata);
        assert_eq!(config.max_payload_bytes, constants::MAX_CONTENT_SIZE_BYTES);
        assert_eq!(config.max_payload_lines, constants::MAX_BATCH_ENTRIES_SIZE);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.https_proxy, None);
        assert_eq!(config.log_level, "info");
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_error_if_no_token() {
        set_endpoint_vars();
        env::remove_var("TOKEN");

        let config = Config::new();

        assert!(config.is_err());
        assert_eq!(
            config.unwrap_err().to_string(),
            "TOKEN environment variable is not set"
        );
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        set_endpoint_vars();
        env::set_var("FORMAT", "JSON");
        env::set_var("INCLUDE_SOURCE_METADATA", "True");
        env::set_var("MAX_PAYLOAD_BYTES", "1024");
        env::set_var("MAX_PAYLOAD_LINES", " 50 ");
        env::set_var("MAX_RETRIES", "5");
        env::set_var("RETRY_BACKOFF_BASE_MS", "10");
        env::set_var("RETRY_BACKOFF_MAX_MS", "40");
        env::set_var("REQUEST_TIMEOUT_SECS", "2");
        env::set_var("HTTPS_PROXY", "http://proxy.local:3128");
        env::set_var("LOG_LEVEL", "DEBUG");

        let config = Config::new().unwrap();

        assert_eq!(config.format_mode, FormatMode::StructuredJson);
        assert!(config.include_source_metadata);
        assert_eq!(config.max_payload_bytes, 1024);
        assert_eq!(config.max_payload_lines, 50);
        assert_eq!(
            config.retry_strategy(),
            RetryStrategy::ExponentialBackoff {
                attempts: 5,
                base_ms: 10,
                max_ms: 40,
            }
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.https_proxy.as_deref(), Some("http://proxy.local:3128"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.log_filter(),
            "h2=off,hyper=off,reqwest=warn,rustls=off,debug"
        );
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_error_on_invalid_number() {
        set_endpoint_vars();
        env::set_var("MAX_PAYLOAD_BYTES", "five megabytes");

        let config = Config::new();

        assert_eq!(
            config.unwrap_err().to_string(),
            "MAX_PAYLOAD_BYTES is not a valid number: 'five megabytes'"
        );
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_error_on_zero_bounds() {
        set_endpoint_vars();
        env::set_var("MAX_PAYLOAD_LINES", "0");
        assert!(Config::new().is_err());

        env::remove_var("MAX_PAYLOAD_LINES");
        env::set_var("MAX_RETRIES", "0");
        assert!(Config::new().is_err());
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_error_on_unknown_format() {
        set_endpoint_vars();
        env::set_var("FORMAT", "xml");

        let config = Config::new();

        assert_eq!(
            config.unwrap_err().to_string(),
            "unknown log format 'xml', expected 'text' or 'json'"
        );
        clear_vars();
    }

    #[test]
    fn test_bulk_url() {
        let mut endpoint = Endpoint {
            url: "https://listener.logz.io:8071".to_string(),
            ..Default::default()
        };
        assert_eq!(endpoint.bulk_url(), "https://listener.logz.io:8071/");

        endpoint.url = "http://127.0.0.1:1234/".to_string();
        assert_eq!(endpoint.bulk_url(), "http://127.0.0.1:1234/");
    }
}
