use crate::level::Level;
use std::fmt;
use std::panic::Location;

/// One entry of a captured call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl Frame {
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }
}

/// Source location of a logging call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller<'a> {
    pub file: &'a str,
    pub line: u32,
}

impl<'a> Caller<'a> {
    pub fn new(file: &'a str, line: u32) -> Self {
        Self { file, line }
    }
}

impl From<&'static Location<'static>> for Caller<'static> {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for Caller<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Pre-formatted representation of a single log event, produced by a
/// [`LocalBackend`](crate::local::LocalBackend) for each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntity {
    pub level: Level,
    /// Timestamp already rendered with the backend's format.
    pub time: String,
    /// Caller location already rendered with the backend's caller format.
    pub caller: String,
    pub message: String,
    /// Captured frames in the order the backend produced them.
    pub frames: Vec<Frame>,
}
