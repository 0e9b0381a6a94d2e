//! Per-worker mutable context.
//!
//! One `WorkerCtx` per worker thread (injected via Rayon's `map_init`);
//! never shared.  It bundles the mat pool, the raw-buffer pool, and the
//! cached destination-offset tables so the engine's borrow paths stay
//! disjoint (`ctx.mats`, `ctx.bufs`, and `ctx.offsets` are independent
//! fields).

use rustc_hash::FxHashMap;

use scaper_mat::{BufPool, MatPool};

// ── OffsetTables ──────────────────────────────────────────────────────────────

/// Cached destination-offset arrays, keyed by zone count.
///
/// `table(n)[i] = (i mod n) · (DayLength + 2)` — for a Full-shaped cell
/// `i = o·n + d` this is destination `d`'s row start in a NonFixed EV row.
/// Row- and Col-shaped accumulators use the first `n` entries, where the
/// cell index itself is the zone.
pub struct OffsetTables {
    stride: usize,
    tables: FxHashMap<usize, Vec<u32>>,
}

impl OffsetTables {
    pub fn new(day_len: usize) -> Self {
        Self {
            stride: day_len + 2,
            tables: FxHashMap::default(),
        }
    }

    /// Stride between zone rows (`DayLength + 2`).
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The all-destinations table for `n` zones (`n²` entries).
    pub fn all_dests(&mut self, n: usize) -> &[u32] {
        let stride = self.stride as u32;
        self.tables.entry(n).or_insert_with(|| {
            (0..n * n).map(|i| (i % n) as u32 * stride).collect()
        })
    }
}

// ── WorkerCtx ─────────────────────────────────────────────────────────────────

/// The pools and tables one worker thread owns.
pub struct WorkerCtx {
    pub mats: MatPool,
    pub bufs: BufPool,
    pub offsets: OffsetTables,
}

impl WorkerCtx {
    pub fn new(day_len: usize) -> Self {
        Self {
            mats: MatPool::new(),
            bufs: BufPool::new(),
            offsets: OffsetTables::new(day_len),
        }
    }
}
