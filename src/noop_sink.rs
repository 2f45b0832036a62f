use crate::record::RemoteLog;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;

/// A sink that simply drops all records.
///
/// Useful for measuring the overhead of the adapter itself without any
/// external I/O, and for setups that only care about local output.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _topic: &str, _logs: &[RemoteLog]) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
