use std::sync::Arc;

use dual_log_sink::init::init_tracing;
use dual_log_sink::{Level, Logger, LoggerOptions};
use tracing::{error, info};

fn main() {
    // Example endpoint: https://logs.example.com/ingest
    let options = LoggerOptions::from_env()
        .expect("invalid DUAL_LOG_* environment")
        .with_stack_level(Level::Error);
    let options = if options.endpoint.is_empty() {
        LoggerOptions {
            endpoint: "http://127.0.0.1:8080/ingest".to_string(),
            topic_id: "demo".to_string(),
            ..options
        }
    } else {
        options
    };

    let logger = Arc::new(Logger::new(options));
    init_tracing(Arc::clone(&logger)).expect("set global subscriber");

    info!("http backend example started");
    error!(endpoint = "ingest", "simulated error sent via HTTP backend");
    logger.warn("direct call on the logger");

    if let Err(e) = logger.close() {
        eprintln!("close: {}", e);
    }
}
