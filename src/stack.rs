use crate::entity::Frame;
use crate::pool::BufferPool;
use std::io::{self, Write};

/// Key holding the function name of a frame.
pub const FIELD_KEY_STACK_FUNC: &str = "func";
/// Key holding the `file:line` location of a frame.
pub const FIELD_KEY_STACK_FILE: &str = "file";

/// Error raised while encoding a stack.
#[derive(thiserror::Error, Debug)]
pub enum StackEncodeError {
    #[error("failed to write stack frame: {0}")]
    Write(#[from] io::Error),

    #[error("failed to escape stack frame value: {0}")]
    Escape(#[from] serde_json::Error),
}

/// Serializes frames into a compact list of `{"func":..,"file":"path:line"}`
/// objects, using buffers borrowed from a shared [`BufferPool`].
#[derive(Debug, Default)]
pub struct StackEncoder {
    pool: BufferPool,
}

impl StackEncoder {
    pub fn new(pool: BufferPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Encode `frames` in the order given.
    ///
    /// Callers skip the call entirely for an empty slice; an empty slice
    /// still encodes as `[]`.
    pub fn encode(&self, frames: &[Frame]) -> Result<String, StackEncodeError> {
        let mut buf = self.pool.acquire();

        buf.push(b'[');
        for (i, frame) in frames.iter().enumerate() {
            if i > 0 {
                buf.push(b',');
            }
            write_frame(&mut buf, frame)?;
        }
        buf.push(b']');

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn write_frame(buf: &mut Vec<u8>, frame: &Frame) -> Result<(), StackEncodeError> {
    write!(buf, "{{\"{}\":", FIELD_KEY_STACK_FUNC)?;
    serde_json::to_writer(&mut *buf, &frame.function)?;
    write!(buf, ",\"{}\":", FIELD_KEY_STACK_FILE)?;
    serde_json::to_writer(&mut *buf, &format!("{}:{}", frame.file, frame.line))?;
    buf.push(b'}');
    Ok(())
}
