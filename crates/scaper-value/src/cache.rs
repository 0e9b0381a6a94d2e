//! The per-agent, per-class expected-value cache.
//!
//! # Row layout
//!
//! Each [`CacheKey`] owns one row of length `width · (DayLength + 2)`:
//!
//! - `width = 1` for fixed-zone locations (Residence, Workplace),
//! - `width = num_zones` for NonFixed keys, zones-major: zone `z`'s values
//!   start at `z · (DayLength + 2)`.
//!
//! Slot `t ∈ [0, DayLength]` holds `V̄` at integral time `t`; the final slot
//! per zone is a sentinel left at the default so the interpolation kernel
//! can read `idx + 1` unconditionally under a mask without faulting on
//! garbage.
//!
//! The default fill is `−∞`: a slot never written is a `Bad` (or merely
//! unreachable) state and contributes nothing once exponentiated.

use rustc_hash::FxHashMap;

use scaper_mat::{BufPool, Mat};
use scaper_state::{CacheKey, LocTag, State};

struct EvEntry {
    /// `todo[t]` — slot `t` still needs computing.  Length `DayLength + 1`.
    todo: Vec<bool>,
    /// The value row(s); see the module docs for layout.
    ev: Vec<f64>,
}

/// Memo of `V̄` rows for one (agent, latent class).
///
/// Single-owner: lives inside one worker's computation and is reset (or
/// disposed back to the pool) between agents.
pub struct EvCache {
    entries: FxHashMap<CacheKey, EvEntry>,
    day_len: usize,
    n_zones: usize,
    /// Default row fill: `−∞` for value caches, 0 for derivative caches.
    default: f64,
}

impl EvCache {
    pub fn new(day_len: usize, n_zones: usize, default: f64) -> Self {
        Self {
            entries: FxHashMap::default(),
            day_len,
            n_zones,
            default,
        }
    }

    /// Stride between consecutive zones' rows.
    #[inline]
    pub fn stride(&self) -> usize {
        self.day_len + 2
    }

    fn width(&self, key: &CacheKey) -> usize {
        if key.loc == LocTag::NonFixed { self.n_zones } else { 1 }
    }

    fn entry(&mut self, key: CacheKey, bufs: &mut BufPool) -> &mut EvEntry {
        let day_len = self.day_len;
        let row_len = self.width(&key) * (day_len + 2);
        let default = self.default;
        self.entries.entry(key).or_insert_with(|| EvEntry {
            todo: vec![true; day_len + 1],
            ev: bufs.rent(row_len, default),
        })
    }

    /// `true` iff `floor(state.time)` is an interior timestep whose slot has
    /// not been computed yet.  Initializes a default row for unseen keys.
    pub fn needs_caching(&mut self, state: &State, bufs: &mut BufPool) -> bool {
        let t = state.time.floor();
        if t < 0.0 || t >= self.day_len as f64 {
            return false;
        }
        self.entry(state.cache_key(), bufs).todo[t as usize]
    }

    /// The full row for a key (all zones, all timesteps), creating a default
    /// row if absent.
    pub fn row(&mut self, key: CacheKey, bufs: &mut BufPool) -> &[f64] {
        &self.entry(key, bufs).ev
    }

    /// Write a computed `V̄` mat at `floor(state.time)` and mark it done.
    ///
    /// Fixed-zone keys take a Scalar; NonFixed keys take a Col of per-zone
    /// values written with the row stride.
    pub fn store(&mut self, state: &State, values: &Mat<'_>, bufs: &mut BufPool) {
        let width = self.width(&state.cache_key());
        assert_eq!(
            values.data().len(),
            width,
            "shape mismatch: caching {} values into width-{width} row",
            values.data().len()
        );
        let stride = self.stride();
        let t = slot(state, self.day_len);
        let scale = values.scale;
        let entry = self.entry(state.cache_key(), bufs);
        for (z, &v) in values.data().iter().enumerate() {
            entry.ev[z * stride + t] = scale * v;
        }
        entry.todo[t] = false;
    }

    /// Write 0 at `floor(state.time)` for every zone (End states).
    pub fn store_zero(&mut self, state: &State, bufs: &mut BufPool) {
        self.store_constant(state, 0.0, bufs);
    }

    fn store_constant(&mut self, state: &State, v: f64, bufs: &mut BufPool) {
        let width = self.width(&state.cache_key());
        let stride = self.stride();
        let t = slot(state, self.day_len);
        let entry = self.entry(state.cache_key(), bufs);
        for z in 0..width {
            entry.ev[z * stride + t] = v;
        }
        entry.todo[t] = false;
    }

    /// Stored value for one concrete state (zone-resolved), interpolation-free.
    pub fn value_at(&mut self, state: &State, zone_index: usize, bufs: &mut BufPool) -> f64 {
        let stride = self.stride();
        let t = slot(state, self.day_len);
        self.entry(state.cache_key(), bufs).ev[zone_index * stride + t]
    }

    /// Drop all entries, returning their rows to the pool.  The cache is
    /// ready for the next agent afterwards.
    pub fn dispose(&mut self, bufs: &mut BufPool) {
        for (_, entry) in self.entries.drain() {
            bufs.release(entry.ev);
        }
    }
}

/// Row slot of a state's integral time.
///
/// # Panics
///
/// Panics if the time is outside `[0, DayLength]` — callers classify before
/// they cache.
fn slot(state: &State, day_len: usize) -> usize {
    let t = state.time.floor();
    assert!(
        (0.0..=day_len as f64).contains(&t),
        "impossible state: caching at time {t} outside the day"
    );
    t as usize
}
