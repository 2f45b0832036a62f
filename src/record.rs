use crate::entity::LogEntity;
use crate::pool::BufferPool;
use crate::stack::StackEncoder;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

pub const FIELD_KEY_LEVEL: &str = "level";
pub const FIELD_KEY_TIME: &str = "time";
pub const FIELD_KEY_FILE: &str = "file";
pub const FIELD_KEY_MSG: &str = "msg";
pub const FIELD_KEY_STACK: &str = "stack";

/// Normalized key/value record shipped to the remote backend.
///
/// `level`, `time`, `file` and `msg` are always present; `stack` only when
/// the source entity carried frames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LogRecord {
    fields: BTreeMap<&'static str, String>,
}

impl LogRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn level(&self) -> &str {
        self.get(FIELD_KEY_LEVEL).unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        self.get(FIELD_KEY_MSG).unwrap_or_default()
    }

    pub fn stack(&self) -> Option<&str> {
        self.get(FIELD_KEY_STACK)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn insert(&mut self, key: &'static str, value: String) {
        self.fields.insert(key, value);
    }
}

/// A [`LogRecord`] stamped with the submission time, as handed to a
/// [`Producer`](crate::producer::Producer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLog {
    /// Unix timestamp in seconds.
    pub time: i64,
    pub contents: LogRecord,
}

impl RemoteLog {
    pub fn new(time: i64, contents: LogRecord) -> Self {
        Self { time, contents }
    }

    pub fn now(contents: LogRecord) -> Self {
        Self::new(Utc::now().timestamp(), contents)
    }
}

/// Turns [`LogEntity`] values into [`LogRecord`]s.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    encoder: StackEncoder,
}

impl RecordBuilder {
    pub fn new(pool: BufferPool) -> Self {
        Self {
            encoder: StackEncoder::new(pool),
        }
    }

    pub fn encoder(&self) -> &StackEncoder {
        &self.encoder
    }

    pub fn build(&self, entity: &LogEntity) -> LogRecord {
        let mut record = LogRecord::default();
        record.insert(FIELD_KEY_LEVEL, entity.level.code().to_string());
        record.insert(FIELD_KEY_TIME, entity.time.clone());
        record.insert(FIELD_KEY_FILE, entity.caller.clone());
        record.insert(FIELD_KEY_MSG, entity.message.clone());

        if !entity.frames.is_empty() {
            match self.encoder.encode(&entity.frames) {
                Ok(stack) => record.insert(FIELD_KEY_STACK, stack),
                Err(e) => tracing::debug!(error = %e, "dropping unencodable stack"),
            }
        }

        record
    }
}
