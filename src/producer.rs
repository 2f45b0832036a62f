use crate::record::RemoteLog;
use crate::sink::LogSink;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Name of every thread the producer runs transport work on, including the
/// runtime's blocking pool. Events raised there are never shipped.
pub const WORKER_THREAD_NAME: &str = "dual-log-producer";

/// Whether the current thread belongs to a producer worker.
pub fn on_worker_thread() -> bool {
    thread::current().name() == Some(WORKER_THREAD_NAME)
}

/// Delivery notifications for a single submitted log.
pub trait Callback: Send + Sync {
    fn on_success(&self, _log: &RemoteLog) {}

    fn on_failure(&self, _log: &RemoteLog, _error: &str) {}
}

/// Handle to the remote ingestion backend.
///
/// `send` must return quickly; the actual transmission happens in the
/// producer's own concurrency domain.
pub trait Producer: Send + Sync {
    fn start(&self) -> Result<(), ProducerError>;

    fn send(
        &self,
        topic: &str,
        log: RemoteLog,
        callback: Option<Arc<dyn Callback>>,
    ) -> Result<(), ProducerError>;

    /// Flush pending logs and stop, waiting at most `timeout`.
    /// Calling it again after the producer stopped is a no-op.
    fn close(&self, timeout: Duration) -> Result<(), ProducerError>;
}

/// Errors reported by a [`Producer`].
#[derive(thiserror::Error, Debug)]
pub enum ProducerError {
    #[error("invalid producer config: {0}")]
    Config(String),

    #[error("producer is already started")]
    AlreadyStarted,

    #[error("producer is closed")]
    Closed,

    #[error("producer queue is full, log dropped")]
    QueueFull,

    #[error("failed to spawn producer worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("timed out after {0:?} waiting for pending logs")]
    CloseTimeout(Duration),

    #[error(transparent)]
    Other(Box<dyn Error + Send + Sync>),
}

/// Configuration for [`AsyncProducer`].
#[derive(Clone, Debug)]
pub struct ProducerConfig {
    pub endpoint: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    /// Maximum number of logs queued before new ones are dropped.
    pub channel_buffer: usize,
    /// Number of logs handed to the sink at once.
    pub batch_size: usize,
    /// Maximum time a partial batch waits before being flushed.
    pub flush_interval: Duration,
    /// Attempts per batch after the first failure.
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key_id: String::new(),
            access_key_secret: String::new(),
            channel_buffer: 4096,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl ProducerConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        self.access_key_id = key_id.into();
        self.access_key_secret = key_secret.into();
        self
    }

    /// Enforce minimal thresholds to avoid degenerate configs.
    fn normalized(mut self) -> Self {
        self.channel_buffer = self.channel_buffer.max(16);
        self.batch_size = self.batch_size.max(1);
        self.flush_interval = self.flush_interval.max(Duration::from_millis(10));
        self.retry_backoff = self.retry_backoff.max(Duration::from_millis(1));
        self.max_backoff = self.max_backoff.max(self.retry_backoff);
        self
    }
}

/// Counters maintained by [`AsyncProducer`].
#[derive(Debug, Default)]
pub struct ProducerStats {
    /// Accepted into the queue.
    pub submitted: AtomicU64,
    /// Rejected because the queue was full.
    pub dropped: AtomicU64,
    /// Acknowledged by the sink.
    pub delivered: AtomicU64,
    /// Given up on after retries.
    pub failed: AtomicU64,
}

struct Envelope {
    topic: String,
    log: RemoteLog,
    callback: Option<Arc<dyn Callback>>,
}

/// Default [`Producer`]: a bounded queue drained by a dedicated worker
/// thread that batches logs per topic and hands them to a [`LogSink`].
pub struct AsyncProducer {
    config: ProducerConfig,
    sink: Arc<dyn LogSink>,
    sender: RwLock<Option<mpsc::Sender<Envelope>>>,
    receiver: Mutex<Option<mpsc::Receiver<Envelope>>>,
    done: Mutex<Option<std_mpsc::Receiver<()>>>,
    stats: Arc<ProducerStats>,
}

impl AsyncProducer {
    pub fn new(config: ProducerConfig, sink: Arc<dyn LogSink>) -> Result<Self, ProducerError> {
        if config.endpoint.trim().is_empty() {
            return Err(ProducerError::Config("endpoint is empty".to_string()));
        }
        let config = config.normalized();
        let (tx, rx) = mpsc::channel(config.channel_buffer);

        Ok(Self {
            config,
            sink,
            sender: RwLock::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            done: Mutex::new(None),
            stats: Arc::new(ProducerStats::default()),
        })
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    pub fn stats(&self) -> &ProducerStats {
        &self.stats
    }
}

impl Producer for AsyncProducer {
    fn start(&self) -> Result<(), ProducerError> {
        let rx = self.receiver.lock().take();
        let rx = match rx {
            Some(rx) => rx,
            None if self.sender.read().is_none() => return Err(ProducerError::Closed),
            None => return Err(ProducerError::AlreadyStarted),
        };

        let (done_tx, done_rx) = std_mpsc::channel();
        let worker = Worker {
            sink: Arc::clone(&self.sink),
            stats: Arc::clone(&self.stats),
            config: self.config.clone(),
        };

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .thread_name(WORKER_THREAD_NAME)
                    .enable_all()
                    .build();
                match runtime {
                    Ok(rt) => rt.block_on(worker.run(rx)),
                    Err(e) => tracing::error!(error = %e, "failed to build producer runtime"),
                }
                let _ = done_tx.send(());
            })?;

        *self.done.lock() = Some(done_rx);
        Ok(())
    }

    fn send(
        &self,
        topic: &str,
        log: RemoteLog,
        callback: Option<Arc<dyn Callback>>,
    ) -> Result<(), ProducerError> {
        let sender = self.sender.read();
        let Some(tx) = sender.as_ref() else {
            return Err(ProducerError::Closed);
        };

        let envelope = Envelope {
            topic: topic.to_string(),
            log,
            callback,
        };
        match tx.try_send(envelope) {
            Ok(()) => {
                self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Err(ProducerError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ProducerError::Closed),
        }
    }

    fn close(&self, timeout: Duration) -> Result<(), ProducerError> {
        // Dropping the only sender lets the worker drain and exit.
        if self.sender.write().take().is_none() {
            return Ok(());
        }
        self.receiver.lock().take();

        let Some(done) = self.done.lock().take() else {
            return Ok(());
        };
        match done.recv_timeout(timeout) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => Ok(()),
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(?timeout, "producer close timed out, pending logs dropped");
                Err(ProducerError::CloseTimeout(timeout))
            }
        }
    }
}

struct Worker {
    sink: Arc<dyn LogSink>,
    stats: Arc<ProducerStats>,
    config: ProducerConfig,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<Envelope>) {
        let mut batch = Vec::with_capacity(self.config.batch_size);
        let mut ticker = tokio::time::interval(self.config.flush_interval);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(envelope) => {
                        batch.push(envelope);
                        if batch.len() >= self.config.batch_size {
                            self.flush_batch(&mut batch).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        self.flush_batch(&mut batch).await;
                    }
                }
            }
        }

        self.flush_batch(&mut batch).await;
        if let Err(e) = self.sink.flush().await {
            tracing::warn!(error = %e, "log sink flush failed");
        }
    }

    async fn flush_batch(&self, batch: &mut Vec<Envelope>) {
        let mut by_topic: BTreeMap<String, Vec<Envelope>> = BTreeMap::new();
        for envelope in batch.drain(..) {
            by_topic.entry(envelope.topic.clone()).or_default().push(envelope);
        }

        for (topic, envelopes) in by_topic {
            let logs: Vec<RemoteLog> = envelopes.iter().map(|e| e.log.clone()).collect();
            let result = self.send_with_retry(&topic, &logs).await;
            let count = envelopes.len() as u64;

            match result {
                Ok(()) => {
                    self.stats.delivered.fetch_add(count, Ordering::Relaxed);
                    for envelope in &envelopes {
                        if let Some(cb) = &envelope.callback {
                            cb.on_success(&envelope.log);
                        }
                    }
                }
                Err(e) => {
                    self.stats.failed.fetch_add(count, Ordering::Relaxed);
                    let message = e.to_string();
                    tracing::warn!(topic = %topic, count, error = %message, "giving up on log batch");
                    for envelope in &envelopes {
                        if let Some(cb) = &envelope.callback {
                            cb.on_failure(&envelope.log, &message);
                        }
                    }
                }
            }
        }
    }

    async fn send_with_retry(
        &self,
        topic: &str,
        logs: &[RemoteLog],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut backoff = self.config.retry_backoff;
        let mut attempt = 0;

        loop {
            match self.sink.send(topic, logs).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= self.config.max_retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    tracing::debug!(error = %e, ?backoff, attempt, "log sink send failed, retrying");
                    sleep(backoff).await;
                    backoff = std::cmp::min(backoff.saturating_mul(2), self.config.max_backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecord;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[derive(Default)]
    struct MemorySink {
        received: Mutex<Vec<(String, RemoteLog)>>,
    }

    #[async_trait]
    impl LogSink for MemorySink {
        async fn send(&self, topic: &str, logs: &[RemoteLog]) -> Result<(), Box<dyn Error + Send + Sync>> {
            let mut received = self.received.lock();
            received.extend(logs.iter().map(|l| (topic.to_string(), l.clone())));
            Ok(())
        }
    }

    struct FailingSink {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl LogSink for FailingSink {
        async fn send(&self, _topic: &str, _logs: &[RemoteLog]) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err("backend unavailable".into())
        }
    }

    struct SlowSink;

    #[async_trait]
    impl LogSink for SlowSink {
        async fn send(&self, _topic: &str, _logs: &[RemoteLog]) -> Result<(), Box<dyn Error + Send + Sync>> {
            sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingCallback {
        ok: AtomicUsize,
        failed: AtomicUsize,
    }

    impl Callback for CountingCallback {
        fn on_success(&self, _log: &RemoteLog) {
            self.ok.fetch_add(1, Ordering::SeqCst);
        }

        fn on_failure(&self, _log: &RemoteLog, _error: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn log() -> RemoteLog {
        RemoteLog::new(1, LogRecord::default())
    }

    fn fast_config() -> ProducerConfig {
        ProducerConfig {
            flush_interval: Duration::from_millis(10),
            retry_backoff: Duration::from_millis(1),
            max_retries: 2,
            ..ProducerConfig::new("noop://")
        }
    }

    struct ThreadNameSink {
        names: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl LogSink for ThreadNameSink {
        async fn send(&self, _topic: &str, _logs: &[RemoteLog]) -> Result<(), Box<dyn Error + Send + Sync>> {
            let name = thread::current().name().map(str::to_string);
            self.names.lock().push(name);
            Ok(())
        }
    }

    #[test]
    fn sink_runs_on_named_worker_thread() {
        let sink = Arc::new(ThreadNameSink {
            names: Mutex::new(Vec::new()),
        });
        let producer = AsyncProducer::new(fast_config(), sink.clone()).expect("producer");
        producer.start().expect("start");
        producer.send("t", log(), None).expect("send");
        producer.close(Duration::from_secs(5)).expect("close");

        assert!(!on_worker_thread());
        let names = sink.names.lock();
        assert!(!names.is_empty());
        assert!(names.iter().all(|n| n.as_deref() == Some(WORKER_THREAD_NAME)));
    }

    #[test]
    fn huge_max_backoff_does_not_overflow() {
        let sink = Arc::new(FailingSink {
            attempts: AtomicUsize::new(0),
        });
        let config = ProducerConfig {
            retry_backoff: Duration::from_millis(1),
            max_backoff: Duration::MAX,
            max_retries: 3,
            ..fast_config()
        };
        let worker = Worker {
            sink: sink.clone(),
            stats: Arc::new(ProducerStats::default()),
            config: config.normalized(),
        };

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let result = rt.block_on(worker.send_with_retry("t", &[log()]));
        assert!(result.is_err());
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 4);

        let near_max = Duration::MAX - Duration::from_secs(1);
        assert_eq!(near_max.saturating_mul(2), Duration::MAX);
    }

    #[test]
    fn rejects_empty_endpoint() {
        let result = AsyncProducer::new(ProducerConfig::default(), Arc::new(MemorySink::default()));
        assert!(matches!(result, Err(ProducerError::Config(_))));
    }

    #[test]
    fn delivers_queued_logs_on_close() {
        let sink = Arc::new(MemorySink::default());
        let producer = AsyncProducer::new(fast_config(), sink.clone()).expect("producer");
        producer.start().expect("start");

        let callback = Arc::new(CountingCallback::default());
        for topic in ["a", "b", "a"] {
            producer
                .send(topic, log(), Some(callback.clone() as Arc<dyn Callback>))
                .expect("send");
        }
        producer.close(Duration::from_secs(5)).expect("close");

        let received = sink.received.lock();
        assert_eq!(received.len(), 3);
        assert_eq!(received.iter().filter(|(t, _)| t == "a").count(), 2);
        assert_eq!(callback.ok.load(Ordering::SeqCst), 3);
        assert_eq!(producer.stats().delivered.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn failed_batches_are_retried_then_reported() {
        let sink = Arc::new(FailingSink {
            attempts: AtomicUsize::new(0),
        });
        let producer = AsyncProducer::new(fast_config(), sink.clone()).expect("producer");
        producer.start().expect("start");

        let callback = Arc::new(CountingCallback::default());
        producer
            .send("t", log(), Some(callback.clone() as Arc<dyn Callback>))
            .expect("send");
        producer.close(Duration::from_secs(5)).expect("close");

        assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(callback.failed.load(Ordering::SeqCst), 1);
        assert_eq!(producer.stats().failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn close_is_bounded_by_timeout() {
        let producer = AsyncProducer::new(fast_config(), Arc::new(SlowSink)).expect("producer");
        producer.start().expect("start");
        producer.send("t", log(), None).expect("send");

        let started = Instant::now();
        let result = producer.close(Duration::from_millis(50));
        assert!(matches!(result, Err(ProducerError::CloseTimeout(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn close_is_idempotent_and_send_after_close_fails() {
        let producer = AsyncProducer::new(fast_config(), Arc::new(MemorySink::default())).expect("producer");
        producer.start().expect("start");
        producer.close(Duration::from_secs(1)).expect("first close");
        producer.close(Duration::from_secs(1)).expect("second close");
        assert!(matches!(producer.send("t", log(), None), Err(ProducerError::Closed)));
        assert!(matches!(producer.start(), Err(ProducerError::Closed)));
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let config = ProducerConfig {
            channel_buffer: 16,
            ..fast_config()
        };
        // Never started, so nothing drains the queue.
        let producer = AsyncProducer::new(config, Arc::new(MemorySink::default())).expect("producer");
        for _ in 0..16 {
            producer.send("t", log(), None).expect("send");
        }
        assert!(matches!(producer.send("t", log(), None), Err(ProducerError::QueueFull)));
        assert_eq!(producer.stats().dropped.load(Ordering::Relaxed), 1);
        producer.close(Duration::from_millis(10)).expect("close");
    }
}
