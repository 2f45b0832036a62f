use std::sync::Arc;
use std::time::Duration;

use dual_log_sink::local::{StdBackend, StdOptions};
use dual_log_sink::{Callback, ExitPolicy, Logger, LoggerOptions, Producer, ProducerError, RemoteLog};

/// Example of integrating a completely custom transport by implementing
/// the `Producer` trait directly. Imagine this hands records to some
/// proprietary client library for which this crate has no sink.
struct PrintingProducer;

impl Producer for PrintingProducer {
    fn start(&self) -> Result<(), ProducerError> {
        println!("[my-transport] started");
        Ok(())
    }

    fn send(
        &self,
        topic: &str,
        log: RemoteLog,
        _callback: Option<Arc<dyn Callback>>,
    ) -> Result<(), ProducerError> {
        let json = serde_json::to_string(&log).map_err(|e| ProducerError::Other(Box::new(e)))?;
        println!("[my-transport] {} {}", topic, json);
        Ok(())
    }

    fn close(&self, timeout: Duration) -> Result<(), ProducerError> {
        println!("[my-transport] closed (waited at most {:?})", timeout);
        Ok(())
    }
}

/// Keeps the host process alive after a fatal call.
struct KeepRunning;

impl ExitPolicy for KeepRunning {
    fn exit(&self, code: i32) {
        println!("fatal log would exit with status {}", code);
    }
}

fn main() {
    let options = LoggerOptions::new("custom://", "my-topic");
    let backend = StdBackend::new(StdOptions::default());
    let logger = Logger::with_parts(options, Arc::new(PrintingProducer), Box::new(backend))
        .expect("create logger")
        .with_exit_policy(KeepRunning);

    logger.info("custom transport example started");
    logger.fatal("simulated fatal error sent via custom transport");
}
