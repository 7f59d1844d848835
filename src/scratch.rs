// In: src/scratch.rs

//! Reusable, fixed-size scratch buffers.
//!
//! The pipeline decompresses every chunk into a buffer of exactly one chunk, so
//! instead of allocating per chunk it borrows a buffer from a `ScratchPool`. The
//! returned `ScratchBuffer` guard gives the allocation back when it is dropped,
//! including when an error unwinds the caller through `?`.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct PoolInner<T> {
    free: Mutex<Vec<Vec<T>>>,
    capacity: usize,
    max_retained: usize,
}

/// A pool of `capacity`-element buffers shared by cheap clones.
#[derive(Debug)]
pub struct ScratchPool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for ScratchPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Copy + Default> ScratchPool<T> {
    pub fn new(capacity: usize, max_retained: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::new()),
                capacity,
                max_retained,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of idle buffers currently held by the pool.
    pub fn retained(&self) -> usize {
        self.lock_free().len()
    }

    /// Hands out a buffer of exactly `capacity` elements. Contents are unspecified
    /// when the buffer is reused.
    pub fn acquire(&self) -> ScratchBuffer<T> {
        let buf = self
            .lock_free()
            .pop()
            .unwrap_or_else(|| vec![T::default(); self.inner.capacity]);
        ScratchBuffer {
            buf: Some(buf),
            pool: Arc::clone(&self.inner),
        }
    }

    fn lock_free(&self) -> std::sync::MutexGuard<'_, Vec<Vec<T>>> {
        // A poisoned free list holds only plain buffers, so it is still usable.
        self.inner.free.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A borrowed scratch buffer. Derefs to a slice of `capacity` elements.
#[derive(Debug)]
pub struct ScratchBuffer<T> {
    buf: Option<Vec<T>>,
    pool: Arc<PoolInner<T>>,
}

impl<T> Deref for ScratchBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl<T> DerefMut for ScratchBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.buf.as_deref_mut().unwrap_or(&mut [])
    }
}

impl<T> Drop for ScratchBuffer<T> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            let mut free = self.pool.free.lock().unwrap_or_else(|e| e.into_inner());
            if free.len() < self.pool.max_retained && buf.len() == self.pool.capacity {
                free.push(buf);
            }
        }
    }
}
