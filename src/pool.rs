use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// Default upper bound on idle buffers kept by a [`BufferPool`].
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Shared pool of reusable byte buffers.
///
/// Buffers are handed out as [`PooledBuffer`] guards. A guard owns its
/// buffer exclusively until it is dropped, at which point the buffer is
/// cleared and put back.
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
}

impl BufferPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Take a buffer from the pool, allocating a fresh one if none is idle.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self.idle.lock().pop().unwrap_or_default();
        PooledBuffer { pool: self, buf }
    }

    /// Number of buffers currently waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

/// Scoped handle to a pooled buffer. Returned to the pool on drop.
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
