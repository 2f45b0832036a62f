use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dual_log_sink::local::StdBackend;
use dual_log_sink::noop_sink::NoopSink;
use dual_log_sink::{AsyncProducer, Level, Logger, LoggerOptions, ProducerConfig};

fn main() {
    let options = LoggerOptions::new("noop://", "load-test")
        .with_stack_level(Level::Error)
        .with_close_timeout(Duration::from_secs(5));

    let producer_config = ProducerConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        ..options.producer_config()
    };
    let producer = Arc::new(
        AsyncProducer::new(producer_config, Arc::new(NoopSink)).expect("create producer"),
    );

    // Discard local output so only the pipeline itself is measured.
    let backend = StdBackend::with_writer(options.std_options(), io::sink());
    let logger = Logger::with_parts(options, producer.clone(), Box::new(backend))
        .expect("create logger");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        if i % 100 == 0 {
            logger.error(format_args!("custom load test error with stack, iteration={}", i));
        } else {
            logger.warn(format_args!("custom load test warning, iteration={}", i));
        }
    }

    let elapsed = start.elapsed();
    if let Err(e) = logger.close() {
        eprintln!("close: {}", e);
    }

    let stats = producer.stats();
    println!(
        "custom config: {} events in {:?} (~{:.0} ev/s), delivered={} dropped={}",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64(),
        stats.delivered.load(Ordering::Relaxed),
        stats.dropped.load(Ordering::Relaxed),
    );
}
