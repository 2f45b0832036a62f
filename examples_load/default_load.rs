use std::time::{Duration, Instant};

use dual_log_sink::{Logger, LoggerOptions};

fn main() {
    // Every call is printed to stdout; the noop endpoint accepts and
    // discards the shipped copies.
    let logger = Logger::new(
        LoggerOptions::new("noop://", "load-test").with_close_timeout(Duration::from_secs(5)),
    );

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        logger.error(format_args!("default load test error, iteration={}", i));
    }

    let elapsed = start.elapsed();
    if let Err(e) = logger.close() {
        eprintln!("close: {}", e);
    }

    eprintln!("default config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
