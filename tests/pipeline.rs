use dual_log_sink::layer::ShipLayer;
use dual_log_sink::local::{StdBackend, StdOptions};
use dual_log_sink::{
    Callback, Level, LifecycleState, Logger, LoggerError, LoggerOptions, Producer, ProducerError,
    RemoteLog,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

#[derive(Default)]
struct RecordingProducer {
    sent: Mutex<Vec<(String, RemoteLog)>>,
    closes: AtomicUsize,
    unavailable: AtomicBool,
}

impl Producer for RecordingProducer {
    fn start(&self) -> Result<(), ProducerError> {
        Ok(())
    }

    fn send(
        &self,
        topic: &str,
        log: RemoteLog,
        _callback: Option<Arc<dyn Callback>>,
    ) -> Result<(), ProducerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProducerError::Other("connection refused".into()));
        }
        self.sent.lock().push((topic.to_string(), log));
        Ok(())
    }

    fn close(&self, _timeout: Duration) -> Result<(), ProducerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedWriter {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn setup(options: LoggerOptions) -> (Logger, Arc<RecordingProducer>, SharedWriter) {
    let producer = Arc::new(RecordingProducer::default());
    let writer = SharedWriter::default();
    let backend = StdBackend::with_writer(options.std_options(), writer.clone());
    let logger = Logger::with_parts(options, producer.clone(), Box::new(backend)).expect("logger");
    (logger, producer, writer)
}

#[test]
fn info_call_renders_once_and_ships_once() {
    let (logger, producer, writer) = setup(LoggerOptions::new("noop://", "orders"));

    let line = line!() + 1;
    logger.info("order accepted");

    let sent = producer.sent.lock();
    assert_eq!(sent.len(), 1);
    let (topic, log) = &sent[0];
    assert_eq!(topic, "orders");
    assert_eq!(log.contents.level(), "INFO");
    assert_eq!(log.contents.message(), "order accepted");
    assert_eq!(log.contents.get("file"), Some(format!("pipeline.rs:{line}").as_str()));
    assert!(log.contents.stack().is_none());
    assert!(log.time > 0);

    let lines = writer.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("INFO["));
    assert!(lines[0].ends_with("order accepted"));
}

#[test]
fn syncing_disabled_renders_without_shipping() {
    let (logger, producer, writer) =
        setup(LoggerOptions::new("noop://", "orders").with_disable_syncing(true));

    logger.info("local only");

    assert!(producer.sent.lock().is_empty());
    assert_eq!(writer.lines().len(), 1);
}

#[test]
fn suppressed_levels_do_nothing() {
    let (logger, producer, writer) =
        setup(LoggerOptions::new("noop://", "orders").with_out_level(Level::Error));

    logger.debug("d");
    logger.info("i");
    logger.warn("w");

    assert!(producer.sent.lock().is_empty());
    assert!(writer.lines().is_empty());
}

#[test]
fn unavailable_backend_does_not_affect_local_output() {
    let (logger, producer, writer) = setup(LoggerOptions::new("noop://", "orders"));
    producer.unavailable.store(true, Ordering::SeqCst);

    logger.error("still printed");

    assert!(producer.sent.lock().is_empty());
    assert_eq!(writer.lines().len(), 1);
}

#[test]
fn stack_is_attached_at_stack_level() {
    let (logger, producer, _writer) = setup(
        LoggerOptions::new("noop://", "orders").with_stack_level(Level::Error),
    );

    logger.warn("no stack");
    logger.error("with stack");

    let sent = producer.sent.lock();
    assert!(sent[0].1.contents.stack().is_none());

    // Symbol resolution depends on the build; when frames are found they
    // must form a valid list of func/file objects.
    if let Some(stack) = sent[1].1.contents.stack() {
        let frames: Vec<Value> = serde_json::from_str(stack).expect("stack is a JSON list");
        assert!(!frames.is_empty());
        for frame in frames {
            assert!(frame["func"].is_string());
            assert!(frame["file"].as_str().is_some_and(|f| f.contains(':')));
        }
    }
}

#[test]
fn close_is_idempotent() {
    let (logger, producer, _writer) = setup(LoggerOptions::new("noop://", "orders"));

    logger.close().expect("close");
    logger.close().expect("close again");

    assert_eq!(producer.closes.load(Ordering::SeqCst), 1);
    assert_eq!(logger.state(), LifecycleState::Closed);
}

#[test]
fn tracing_events_flow_through_the_layer() {
    let (logger, producer, writer) = setup(LoggerOptions::new("noop://", "orders"));
    let logger = Arc::new(logger);
    let subscriber = Registry::default().with(ShipLayer::new(Arc::clone(&logger)));

    tracing::subscriber::with_default(subscriber, || {
        tracing::debug!("filtered out");
        tracing::warn!(attempt = 2, "retrying payment");
    });

    let sent = producer.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.contents.level(), "WARN");
    assert_eq!(sent[0].1.contents.message(), "retrying payment attempt=2");
    assert_eq!(writer.lines().len(), 1);
}

#[test]
fn tracing_stack_starts_at_the_call_site() {
    let (logger, producer, _writer) = setup(
        LoggerOptions::new("noop://", "orders").with_stack_level(Level::Error),
    );
    let logger = Arc::new(logger);
    let subscriber = Registry::default().with(ShipLayer::new(Arc::clone(&logger)));

    tracing::subscriber::with_default(subscriber, || {
        tracing::error!("payment declined");
    });
    logger.error("direct call");

    let sent = producer.sent.lock();
    assert_eq!(sent.len(), 2);
    for (_, log) in sent.iter() {
        let stack = log.contents.stack().expect("stack captured at error level");
        let frames: Vec<Value> = serde_json::from_str(stack).expect("stack is a JSON list");
        let first = frames[0]["func"].as_str().expect("func is a string");
        assert!(
            first.starts_with("pipeline::tracing_stack_starts_at_the_call_site"),
            "stack starts at {first}"
        );
    }
}

#[test]
fn default_construction_with_noop_endpoint() {
    let logger = Logger::try_new(
        LoggerOptions::new("noop://", "orders").with_close_timeout(Duration::from_secs(5)),
    )
    .expect("logger");
    assert_eq!(logger.state(), LifecycleState::Running);
    logger.close().expect("close");
}

#[test]
fn unknown_endpoint_fails_construction() {
    let result = Logger::try_new(LoggerOptions::new("carrier-pigeon://coop", "orders"));
    assert!(matches!(result, Err(LoggerError::Backend(_))));
}

#[test]
#[should_panic(expected = "failed to initialize log producer")]
fn new_panics_without_a_producer() {
    let _ = Logger::new(LoggerOptions::default());
}
