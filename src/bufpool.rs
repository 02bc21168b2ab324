// this_file: src/bufpool.rs

//! Thread-local pool of 8-bit alpha buffers.
//!
//! Mask dumps and atlas bakes allocate a fresh coverage buffer on every cache
//! miss. The buffer only lives until its texture is uploaded, so buffers are
//! recycled through a small per-thread pool instead of hitting the allocator.

use std::cell::RefCell;

/// Buffers kept per thread.
const MAX_POOLED: usize = 8;

/// Buffers larger than this are not kept (16 MiB).
const MAX_POOLED_BYTES: usize = 16 * 1024 * 1024;

thread_local! {
    static ALPHA_POOL: RefCell<AlphaPool> = RefCell::new(AlphaPool::new());
}

struct AlphaPool {
    buffers: Vec<Vec<u8>>,
}

impl AlphaPool {
    fn new() -> Self {
        Self {
            buffers: Vec::with_capacity(MAX_POOLED),
        }
    }

    /// Smallest pooled buffer that fits, zero-filled to `size`.
    fn take(&mut self, size: usize) -> Vec<u8> {
        let best = self
            .buffers
            .iter()
            .enumerate()
            .filter(|(_, buf)| buf.capacity() >= size)
            .min_by_key(|(_, buf)| buf.capacity())
            .map(|(idx, _)| idx);

        match best {
            Some(idx) => {
                let mut buf = self.buffers.swap_remove(idx);
                buf.clear();
                buf.resize(size, 0);
                buf
            }
            None => vec![0u8; size],
        }
    }

    fn give_back(&mut self, mut buf: Vec<u8>) {
        if self.buffers.len() < MAX_POOLED && buf.capacity() <= MAX_POOLED_BYTES {
            buf.clear();
            self.buffers.push(buf);
        }
    }
}

/// Zeroed alpha buffer that returns to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
}

impl PooledBuffer {
    /// Take a zeroed buffer of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            buf: ALPHA_POOL.with(|pool| pool.borrow_mut().take(size)),
        }
    }

    /// Take ownership of the bytes; they will not go back to the pool.
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        if buf.capacity() > 0 {
            ALPHA_POOL.with(|pool| pool.borrow_mut().give_back(buf));
        }
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycled_buffers_come_back_zeroed() {
        {
            let mut buf = PooledBuffer::new(64);
            assert_eq!(buf.len(), 64);
            buf.iter_mut().for_each(|px| *px = 0xFF);
        }
        let buf = PooledBuffer::new(32);
        assert_eq!(buf.len(), 32);
        assert!(buf.iter().all(|&px| px == 0));
    }

    #[test]
    fn into_vec_detaches_from_pool() {
        let owned = PooledBuffer::new(16).into_vec();
        assert_eq!(owned.len(), 16);
    }
}
