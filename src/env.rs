//! Environment variable names used by this crate for convenient
//! configuration of a [`Logger`](crate::logger::Logger) from services.
//!
//! These are purely helpers; the core types remain decoupled from
//! environment access.

use crate::level::{Level, ParseLevelError};
use crate::local::CallerFormat;
use crate::logger::LoggerOptions;
use std::time::Duration;

/// Ingestion endpoint, e.g. `https://logs.example.com/ingest`.
pub const DUAL_LOG_ENDPOINT_ENV: &str = "DUAL_LOG_ENDPOINT";

/// Access key id sent with every batch.
pub const DUAL_LOG_ACCESS_KEY_ID_ENV: &str = "DUAL_LOG_ACCESS_KEY_ID";

/// Access key secret sent with every batch.
pub const DUAL_LOG_ACCESS_KEY_SECRET_ENV: &str = "DUAL_LOG_ACCESS_KEY_SECRET";

/// Remote topic identifier.
pub const DUAL_LOG_TOPIC_ID_ENV: &str = "DUAL_LOG_TOPIC_ID";

/// Minimum level that is rendered and shipped.
pub const DUAL_LOG_OUT_LEVEL_ENV: &str = "DUAL_LOG_OUT_LEVEL";

/// Minimum level that carries a stack.
pub const DUAL_LOG_STACK_LEVEL_ENV: &str = "DUAL_LOG_STACK_LEVEL";

/// `short` or `full`.
pub const DUAL_LOG_CALLER_FORMAT_ENV: &str = "DUAL_LOG_CALLER_FORMAT";

/// strftime layout of the local timestamp.
pub const DUAL_LOG_TIMESTAMP_FORMAT_ENV: &str = "DUAL_LOG_TIMESTAMP_FORMAT";

/// Extra stack frames to skip.
pub const DUAL_LOG_CALLER_SKIP_ENV: &str = "DUAL_LOG_CALLER_SKIP";

/// `true`/`1` renders locally only.
pub const DUAL_LOG_DISABLE_SYNCING_ENV: &str = "DUAL_LOG_DISABLE_SYNCING";

/// Close timeout in milliseconds.
pub const DUAL_LOG_CLOSE_TIMEOUT_MS_ENV: &str = "DUAL_LOG_CLOSE_TIMEOUT_MS";

/// Error type returned when an environment value cannot be used.
#[derive(thiserror::Error, Debug)]
pub enum EnvError {
    #[error("{key}: {source}")]
    Level {
        key: &'static str,
        #[source]
        source: ParseLevelError,
    },

    #[error("{key}: invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl LoggerOptions {
    /// Build options from `DUAL_LOG_*` variables; unset ones keep defaults.
    pub fn from_env() -> Result<Self, EnvError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LoggerOptions::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EnvError> {
        let mut options = LoggerOptions::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(DUAL_LOG_ENDPOINT_ENV) {
            options.endpoint = v;
        }
        if let Some(v) = get(DUAL_LOG_ACCESS_KEY_ID_ENV) {
            options.access_key_id = v;
        }
        if let Some(v) = get(DUAL_LOG_ACCESS_KEY_SECRET_ENV) {
            options.access_key_secret = v;
        }
        if let Some(v) = get(DUAL_LOG_TOPIC_ID_ENV) {
            options.topic_id = v;
        }
        if let Some(v) = get(DUAL_LOG_OUT_LEVEL_ENV) {
            options.out_level = parse_level(DUAL_LOG_OUT_LEVEL_ENV, &v)?;
        }
        if let Some(v) = get(DUAL_LOG_STACK_LEVEL_ENV) {
            options.stack_level = Some(parse_level(DUAL_LOG_STACK_LEVEL_ENV, &v)?);
        }
        if let Some(v) = get(DUAL_LOG_CALLER_FORMAT_ENV) {
            options.caller_format = match v.trim().to_ascii_lowercase().as_str() {
                "short" => CallerFormat::ShortPath,
                "full" => CallerFormat::FullPath,
                _ => return Err(invalid(DUAL_LOG_CALLER_FORMAT_ENV, v)),
            };
        }
        if let Some(v) = get(DUAL_LOG_TIMESTAMP_FORMAT_ENV) {
            options.timestamp_format = v;
        }
        if let Some(v) = get(DUAL_LOG_CALLER_SKIP_ENV) {
            options.caller_skip = v
                .trim()
                .parse()
                .map_err(|_| invalid(DUAL_LOG_CALLER_SKIP_ENV, v.clone()))?;
        }
        if let Some(v) = get(DUAL_LOG_DISABLE_SYNCING_ENV) {
            options.disable_syncing = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(invalid(DUAL_LOG_DISABLE_SYNCING_ENV, v)),
            };
        }
        if let Some(v) = get(DUAL_LOG_CLOSE_TIMEOUT_MS_ENV) {
            let millis: u64 = v
                .trim()
                .parse()
                .map_err(|_| invalid(DUAL_LOG_CLOSE_TIMEOUT_MS_ENV, v.clone()))?;
            options.close_timeout = Duration::from_millis(millis);
        }

        Ok(options)
    }
}

fn parse_level(key: &'static str, value: &str) -> Result<Level, EnvError> {
    value.parse().map_err(|source| EnvError::Level { key, source })
}

fn invalid(key: &'static str, value: String) -> EnvError {
    EnvError::Invalid { key, value }
}
