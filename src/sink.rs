use crate::record::RemoteLog;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous transport used by [`AsyncProducer`](crate::producer::AsyncProducer)
/// to deliver batches of [`RemoteLog`]s.
///
/// Implementations are responsible for moving records to a concrete
/// backend (HTTP ingestion endpoint, a test buffer, nothing at all). The
/// producer calls `send` from its own worker runtime and never on the
/// application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Send a batch of logs routed to `topic`.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the whole batch.
    /// - `Err(..)` if the backend failed (network error, serialization
    ///   error, HTTP status, etc). The producer treats this as transient
    ///   and retries the batch a bounded number of times.
    async fn send(&self, topic: &str, logs: &[RemoteLog]) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered records, if the backend implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
