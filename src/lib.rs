pub mod level;
pub mod entity;
pub mod pool;
pub mod stack;
pub mod record;
pub mod local;

pub mod sink;
pub mod producer;
pub mod backend;
pub mod noop_sink;

#[cfg(feature = "http")]
pub mod http;

pub mod logger;
pub mod layer;
pub mod init;
pub mod env;

pub use entity::{Caller, Frame, LogEntity};
pub use level::{Level, LevelFilter};
pub use logger::{ExitPolicy, LifecycleState, Logger, LoggerError, LoggerOptions, ProcessExit};
pub use producer::{AsyncProducer, Callback, Producer, ProducerConfig, ProducerError};
pub use record::{LogRecord, RecordBuilder, RemoteLog};
