//! # Runtime Configuration Module
//!
//! Settings that change how requests are resolved and dispatched, loaded from
//! `BRRTR_*` environment variables with an optional YAML/TOML/JSON file
//! underneath. Environment variables always win over the file.
//!
//! ## Environment Variables
//!
//! | Variable                        | Field                    | Default |
//! |---------------------------------|--------------------------|---------|
//! | `BRRTR_REQUEST_TIMEOUT_MS`      | `request_timeout_ms`     | none    |
//! | `BRRTR_SLOW_MATCH_THRESHOLD_US` | `slow_match_threshold_us`| `1000`  |
//! | `BRRTR_HEAD_FALLBACK`           | `head_fallback`          | `true`  |
//! | `BRRTR_LOG_ROUTES`              | `log_routes`             | `false` |
//!
//! `BRRTR_REQUEST_TIMEOUT_MS=0` disables the timeout. Unparseable values are
//! ignored and the previous value is kept.
//!
//! ## Usage
//!
//! ```rust
//! use brrtrouter_dispatch::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("HEAD falls back to GET: {}", config.head_fallback);
//! ```

use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Runtime configuration for routing and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Per-request deadline in milliseconds; `None` means no deadline.
    pub request_timeout_ms: Option<u64>,
    /// Resolutions slower than this are logged at `warn`.
    pub slow_match_threshold_us: u64,
    /// Let `HEAD` requests use the `GET` route when no `HEAD` route matches.
    pub head_fallback: bool,
    /// Dump the routing table at startup.
    pub log_routes: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: None,
            slow_match_threshold_us: 1000,
            head_fallback: true,
            log_routes: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Load a config file and apply environment overrides on top.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, has an unsupported extension, or
    /// does not parse.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config: Self = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid YAML in {}", path.display()))?,
            "toml" => toml::from_str(&raw)
                .with_context(|| format!("invalid TOML in {}", path.display()))?,
            "json" => serde_json::from_str(&raw)
                .with_context(|| format!("invalid JSON in {}", path.display()))?,
            other => bail!(
                "unsupported runtime config format '{other}' for {} (expected yaml, yml, toml or json)",
                path.display()
            ),
        };
        Ok(config)
    }

    /// Apply `BRRTR_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("BRRTR_REQUEST_TIMEOUT_MS") {
            match val.trim().parse::<u64>() {
                Ok(0) => self.request_timeout_ms = None,
                Ok(ms) => self.request_timeout_ms = Some(ms),
                Err(_) => warn!(value = %val, "Ignoring invalid BRRTR_REQUEST_TIMEOUT_MS"),
            }
        }
        if let Some(val) = lookup("BRRTR_SLOW_MATCH_THRESHOLD_US") {
            match val.trim().parse::<u64>() {
                Ok(us) => self.slow_match_threshold_us = us,
                Err(_) => warn!(value = %val, "Ignoring invalid BRRTR_SLOW_MATCH_THRESHOLD_US"),
            }
        }
        if let Some(val) = lookup("BRRTR_HEAD_FALLBACK") {
            match parse_bool(&val) {
                Some(b) => self.head_fallback = b,
                None => warn!(value = %val, "Ignoring invalid BRRTR_HEAD_FALLBACK"),
            }
        }
        if let Some(val) = lookup("BRRTR_LOG_ROUTES") {
            match parse_bool(&val) {
                Some(b) => self.log_routes = b,
                None => warn!(value = %val, "Ignoring invalid BRRTR_LOG_ROUTES"),
            }
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn slow_match_threshold(&self) -> Duration {
        Duration::from_micros(self.slow_match_threshold_us)
    }
}

pub(crate) fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
