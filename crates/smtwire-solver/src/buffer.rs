//! Reusable read buffers for solver replies.
//!
//! Replies such as models can be large, and a channel reads one reply per
//! command, so buffers are recycled rather than reallocated per read. The
//! pool is an explicit, cloneable handle: channels that should share buffers
//! are built from clones of the same pool.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

/// Capacity of a freshly allocated buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
pub struct BufferPool {
    free: Arc<Mutex<Vec<Vec<u8>>>>,
    initial_capacity: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            free: Arc::new(Mutex::new(Vec::new())),
            initial_capacity: initial_capacity.max(1),
        }
    }

    /// Check out an empty buffer, reusing a released one when available.
    pub fn acquire(&self) -> PooledBuffer {
        let recycled = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let mut buf = recycled.unwrap_or_else(|| Vec::with_capacity(self.initial_capacity));
        buf.clear();
        PooledBuffer {
            buf: Some(buf),
            pool: self.clone(),
        }
    }

    /// Return a buffer to the free list. Contents are discarded, capacity kept.
    pub fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buf);
    }

    /// Number of buffers currently checked in.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A buffer checked out of a [`BufferPool`]; checked back in on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: BufferPool,
}

impl PooledBuffer {
    /// Append `bytes`, doubling capacity as often as needed. Existing content
    /// is always preserved.
    pub fn append(&mut self, bytes: &[u8]) {
        let buf = self.vec_mut();
        let needed = buf.len() + bytes.len();
        if needed > buf.capacity() {
            let mut target = buf.capacity().max(1);
            while target < needed {
                target *= 2;
            }
            buf.reserve_exact(target - buf.len());
        }
        buf.extend_from_slice(bytes);
    }

    /// Split off everything after `at`, leaving the first `at` bytes.
    pub fn split_off(&mut self, at: usize) -> Vec<u8> {
        self.vec_mut().split_off(at)
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self).into_owned()
    }

    fn vec_mut(&mut self) -> &mut Vec<u8> {
        // Only `drop` takes the buffer out.
        self.buf.get_or_insert_with(Vec::new)
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        static EMPTY: Vec<u8> = Vec::new();
        self.buf.as_ref().unwrap_or(&EMPTY)
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.vec_mut()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}
