//! Reusable buffer pools.
//!
//! Pools are **not** thread-safe: each worker thread owns its own pools,
//! injected through a per-worker context.  Every `rent` must be balanced by
//! a `release` to the same pool; releasing to a different pool is a bug (it
//! would mix buffer sizes across workers).

use crate::{Mat, Shape};

// ── MatPool ───────────────────────────────────────────────────────────────────

/// A pool of zeroed accumulator buffers, free-listed by buffer length.
///
/// Row and Col mats of the same zone count share a free list; Full mats get
/// their own by virtue of their squared length.  Worlds of different sizes
/// (full vs sampled) can share one pool.
#[derive(Default)]
pub struct MatPool {
    free: std::collections::HashMap<usize, Vec<Vec<f64>>>,
}

impl MatPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rent a zero-filled mat of `shape` with `scale = 1`.
    pub fn rent(&mut self, shape: Shape) -> Mat<'static> {
        let len = shape.len();
        let buf = match self.free.get_mut(&len).and_then(Vec::pop) {
            Some(mut buf) => {
                buf.iter_mut().for_each(|v| *v = 0.0);
                buf
            }
            None => vec![0.0; len],
        };
        Mat::from_buffer(1.0, shape, buf)
    }

    /// Return a rented mat's buffer to the pool.
    ///
    /// Borrowed mats (LOS slices) are silently dropped — they own nothing.
    pub fn release(&mut self, mat: Mat<'static>) {
        if let Some(buf) = mat.into_buffer() {
            self.free.entry(buf.len()).or_default().push(buf);
        }
    }
}

// ── BufPool ───────────────────────────────────────────────────────────────────

/// A pool of plain `f64` buffers of arbitrary length.
///
/// Used for expected-value rows and sampled-world gathers, whose sizes vary
/// with the zone sample.  Buffers are recycled by capacity; `rent` returns a
/// zero-filled buffer of exactly the requested length.
#[derive(Default)]
pub struct BufPool {
    free: Vec<Vec<f64>>,
}

impl BufPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rent a buffer of `len` cells filled with `fill`.
    pub fn rent(&mut self, len: usize, fill: f64) -> Vec<f64> {
        match self.free.pop() {
            Some(mut buf) => {
                buf.clear();
                buf.resize(len, fill);
                buf
            }
            None => vec![fill; len],
        }
    }

    /// Return a buffer for reuse.
    pub fn release(&mut self, buf: Vec<f64>) {
        self.free.push(buf);
    }
}
