use std::sync::Arc;

use crate::noop_sink::NoopSink;
use crate::producer::ProducerConfig;
use crate::sink::LogSink;

/// Supported remote sink kinds, selected by endpoint scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Http,
    Noop,
}

/// Parse an endpoint and infer the sink kind from its scheme.
///
/// Examples:
/// - "https://logs.example.com/ingest"
/// - "http://127.0.0.1:8080/ingest"
/// - "noop://" (records are accepted and discarded)
pub fn parse_endpoint(endpoint: &str) -> Result<SinkKind, EndpointError> {
    let lower = endpoint.trim().to_ascii_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(SinkKind::Http)
    } else if lower.starts_with("noop://") {
        Ok(SinkKind::Noop)
    } else {
        Err(EndpointError::UnknownScheme(endpoint.to_string()))
    }
}

/// Error type returned when parsing an endpoint.
#[derive(thiserror::Error, Debug)]
pub enum EndpointError {
    #[error("unknown or unsupported endpoint scheme: {0:?}")]
    UnknownScheme(String),
}

/// Error type returned when building a sink from configuration.
#[derive(thiserror::Error, Debug)]
pub enum BackendBuildError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("http feature is not enabled")]
    HttpFeatureDisabled,
}

/// Create the [`LogSink`] the default producer delivers to.
pub fn make_sink_from_config(cfg: &ProducerConfig) -> Result<Arc<dyn LogSink>, BackendBuildError> {
    match parse_endpoint(&cfg.endpoint)? {
        SinkKind::Noop => Ok(Arc::new(NoopSink) as Arc<dyn LogSink>),
        SinkKind::Http => {
            #[cfg(feature = "http")]
            {
                use crate::http::{HttpConfig, HttpSink};

                let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
                let config = HttpConfig {
                    access_key_id: non_empty(&cfg.access_key_id),
                    access_key_secret: non_empty(&cfg.access_key_secret),
                    ..HttpConfig::new(cfg.endpoint.trim())
                };
                Ok(Arc::new(HttpSink::new(config)) as Arc<dyn LogSink>)
            }

            #[cfg(not(feature = "http"))]
            {
                Err(BackendBuildError::HttpFeatureDisabled)
            }
        }
    }
}
