use crate::backend::{make_sink_from_config, BackendBuildError};
use crate::entity::Caller;
use crate::level::{Level, LevelFilter};
use crate::local::{CallerFormat, LocalBackend, StdBackend, StdOptions, DEFAULT_TIMESTAMP_FORMAT};
use crate::producer::{AsyncProducer, Producer, ProducerConfig, ProducerError};
use crate::record::{RecordBuilder, RemoteLog};
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on how long [`Logger::close`] waits for pending logs.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Exit status used after a fatal log call.
pub const FATAL_EXIT_CODE: i32 = 1;

/// Configuration of a [`Logger`].
#[derive(Clone, Debug)]
pub struct LoggerOptions {
    pub endpoint: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    /// Remote routing identifier every record is submitted under.
    pub topic_id: String,
    pub out_level: Level,
    pub stack_level: Option<Level>,
    pub caller_format: CallerFormat,
    pub timestamp_format: String,
    pub caller_skip: usize,
    /// Render locally only; nothing is submitted to the producer.
    pub disable_syncing: bool,
    pub close_timeout: Duration,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key_id: String::new(),
            access_key_secret: String::new(),
            topic_id: String::new(),
            out_level: Level::Info,
            stack_level: None,
            caller_format: CallerFormat::ShortPath,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            caller_skip: 0,
            disable_syncing: false,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl LoggerOptions {
    pub fn new(endpoint: impl Into<String>, topic_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            topic_id: topic_id.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        self.access_key_id = key_id.into();
        self.access_key_secret = key_secret.into();
        self
    }

    pub fn with_out_level(mut self, level: Level) -> Self {
        self.out_level = level;
        self
    }

    pub fn with_stack_level(mut self, level: Level) -> Self {
        self.stack_level = Some(level);
        self
    }

    pub fn with_caller_format(mut self, format: CallerFormat) -> Self {
        self.caller_format = format;
        self
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    pub fn with_caller_skip(mut self, skip: usize) -> Self {
        self.caller_skip = skip;
        self
    }

    pub fn with_disable_syncing(mut self, disable: bool) -> Self {
        self.disable_syncing = disable;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Options for the default local backend. The caller skip is applied
    /// later through [`LocalBackend::advance_skip`].
    pub fn std_options(&self) -> StdOptions {
        StdOptions {
            out_level: self.out_level,
            stack_level: self.stack_level,
            caller_format: self.caller_format,
            timestamp_format: self.timestamp_format.clone(),
            caller_skip: 0,
        }
    }

    pub fn producer_config(&self) -> ProducerConfig {
        ProducerConfig::new(self.endpoint.clone())
            .with_credentials(self.access_key_id.clone(), self.access_key_secret.clone())
    }
}

/// What happens to the process after a fatal log call.
pub trait ExitPolicy: Send + Sync {
    fn exit(&self, code: i32);
}

/// Terminates the process with [`std::process::exit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl ExitPolicy for ProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Lifecycle of a [`Logger`]'s producer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Created = 0,
    Started = 1,
    Running = 2,
    Closing = 3,
    Closed = 4,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Created,
            1 => LifecycleState::Started,
            2 => LifecycleState::Running,
            3 => LifecycleState::Closing,
            _ => LifecycleState::Closed,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("failed to build log sink: {0}")]
    Backend(#[from] BackendBuildError),

    #[error("log producer error: {0}")]
    Producer(#[from] ProducerError),
}

/// Adapter that renders every eligible call locally and ships a normalized
/// copy to the remote producer.
pub struct Logger {
    options: LoggerOptions,
    filter: LevelFilter,
    builder: RecordBuilder,
    backend: Box<dyn LocalBackend>,
    producer: Arc<dyn Producer>,
    exit: Box<dyn ExitPolicy>,
    state: AtomicU8,
}

impl Logger {
    /// Build a logger with the default producer and local backend.
    ///
    /// # Panics
    ///
    /// Panics if the producer cannot be created or started; there is no
    /// mode of operation without a working remote handle.
    pub fn new(options: LoggerOptions) -> Self {
        match Self::try_new(options) {
            Ok(logger) => logger,
            Err(e) => panic!("failed to initialize log producer: {e}"),
        }
    }

    pub fn try_new(options: LoggerOptions) -> Result<Self, LoggerError> {
        let config = options.producer_config();
        let sink = make_sink_from_config(&config)?;
        let producer = AsyncProducer::new(config, sink)?;
        let backend = StdBackend::new(options.std_options());
        Self::with_parts(options, Arc::new(producer), Box::new(backend))
    }

    /// Build a logger around caller-supplied collaborators and start the
    /// producer.
    pub fn with_parts(
        options: LoggerOptions,
        producer: Arc<dyn Producer>,
        mut backend: Box<dyn LocalBackend>,
    ) -> Result<Self, LoggerError> {
        backend.advance_skip(options.caller_skip);

        let logger = Self {
            filter: LevelFilter::new(options.out_level),
            builder: RecordBuilder::default(),
            backend,
            producer,
            exit: Box::new(ProcessExit),
            state: AtomicU8::new(LifecycleState::Created as u8),
            options,
        };

        logger.producer.start()?;
        logger.set_state(LifecycleState::Started);
        logger.set_state(LifecycleState::Running);
        tracing::debug!(topic = %logger.options.topic_id, "log producer started");

        Ok(logger)
    }

    /// Replace what happens after a fatal call, e.g. to unwind instead of
    /// exiting when embedded in a host application.
    pub fn with_exit_policy(mut self, policy: impl ExitPolicy + 'static) -> Self {
        self.exit = Box::new(policy);
        self
    }

    pub fn options(&self) -> &LoggerOptions {
        &self.options
    }

    pub fn producer(&self) -> &Arc<dyn Producer> {
        &self.producer
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.filter.is_eligible(level)
    }

    /// Run one call through the pipeline: gate, build, submit, render.
    pub fn emit(&self, level: Level, caller: Caller<'_>, message: impl fmt::Display) {
        if !self.filter.is_eligible(level) {
            return;
        }

        let entity = self.backend.entity(level, caller, message.to_string());

        if !self.options.disable_syncing {
            let log = RemoteLog::now(self.builder.build(&entity));
            // Shipping is best effort and never reaches the caller.
            let _ = self.producer.send(&self.options.topic_id, log, None);
        }

        self.backend.render(&entity);
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl fmt::Display) {
        self.emit(level, Location::caller().into(), message);
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::Warn, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message);
    }

    /// Log, close the producer, then hand over to the exit policy.
    #[track_caller]
    pub fn fatal(&self, message: impl fmt::Display) {
        self.log(Level::Fatal, message);
        let _ = self.close();
        self.exit.exit(FATAL_EXIT_CODE);
    }

    /// Log only; unwinding is left to the caller.
    #[track_caller]
    pub fn panic(&self, message: impl fmt::Display) {
        self.log(Level::Panic, message);
    }

    /// Flush and close the producer, waiting at most the configured
    /// close timeout. Only the first call reaches the producer.
    pub fn close(&self) -> Result<(), LoggerError> {
        let running = self.state.compare_exchange(
            LifecycleState::Running as u8,
            LifecycleState::Closing as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if running.is_err() {
            return Ok(());
        }

        let result = self.producer.close(self.options.close_timeout);
        self.set_state(LifecycleState::Closed);
        result.map_err(LoggerError::from)
    }

    fn set_state(&self, state: LifecycleState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}
