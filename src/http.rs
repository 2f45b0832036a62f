use crate::record::RemoteLog;
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;

/// Configuration for [`HttpSink`].
///
/// The sink posts newline-delimited JSON, one [`RemoteLog`] per line, to
/// `<url>?topic=<topic>`.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Ingestion URL without query, e.g. "https://logs.example.com/ingest"
    pub url: String,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub request_timeout: Duration,
}

impl HttpConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_key_id: None,
            access_key_secret: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// JSON-over-HTTP implementation of [`LogSink`].
#[derive(Clone)]
pub struct HttpSink {
    client: Client,
    config: HttpConfig,
}

impl HttpSink {
    /// Construct a new sink instance using the provided configuration.
    pub fn new(config: HttpConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    fn endpoint(&self, topic: &str) -> String {
        format!(
            "{}?topic={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(topic)
        )
    }

    fn body(logs: &[RemoteLog]) -> Result<String, serde_json::Error> {
        let mut body = String::new();
        for log in logs {
            body.push_str(&serde_json::to_string(log)?);
            body.push('\n');
        }
        Ok(body)
    }
}

#[async_trait]
impl LogSink for HttpSink {
    async fn send(&self, topic: &str, logs: &[RemoteLog]) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut request = self
            .client
            .post(self.endpoint(topic))
            .timeout(self.config.request_timeout)
            .header("Content-Type", "application/x-ndjson")
            .body(Self::body(logs)?);

        if let Some(key_id) = &self.config.access_key_id {
            request = request.basic_auth(key_id, self.config.access_key_secret.as_ref());
        }

        let resp = request.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("log ingestion failed with status {}: {}", status, text).into())
        }
    }
}
