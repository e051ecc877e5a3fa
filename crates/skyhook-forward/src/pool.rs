//! Process-wide pool of pump buffers
//!
//! Every copy direction of every public connection borrows one buffer and
//! returns it when the pump finishes, so steady-state forwarding allocates
//! nothing.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;

pub const MIN_BUFFER_SIZE: usize = 4096;
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Pool of equally sized byte buffers.
pub struct BufferPool {
    size: usize,
    free: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    /// Build a pool with the given buffer size. Sizes outside
    /// [`MIN_BUFFER_SIZE`, `MAX_BUFFER_SIZE`] fall back to
    /// [`DEFAULT_BUFFER_SIZE`].
    pub fn new(size: usize) -> Arc<Self> {
        let size = if (MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&size) {
            size
        } else {
            DEFAULT_BUFFER_SIZE
        };
        Arc::new(Self {
            size,
            free: Mutex::new(Vec::new()),
        })
    }

    pub fn buffer_size(&self) -> usize {
        self.size
    }

    /// Borrow a buffer; allocates when the pool is empty.
    pub fn take(self: &Arc<Self>) -> PooledBuffer {
        let buf = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| vec![0u8; self.size]);
        PooledBuffer {
            buf: Some(buf),
            pool: Arc::clone(self),
        }
    }

    fn put_back(&self, buf: Vec<u8>) {
        self.free.lock().push(buf);
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// A buffer on loan from a [`BufferPool`]; returns itself on drop.
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.buf.as_deref_mut() {
            Some(buf) => buf,
            None => &mut [],
        }
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.put_back(buf);
        }
    }
}
