//! Level-of-service tensors.
//!
//! One [`LosBlock`] per (mode, period) holds the four OD quantities as flat
//! origin-major `n × n` arrays.  The tensors are immutable after loading and
//! shared read-only across all worker threads; sampled worlds gather the
//! rows/columns they need into their own buffers.

use scaper_core::{Mode, N_MODES};

/// Number of LOS periods.
pub const N_PERIODS: usize = 2;
/// Index of the off-peak block.
pub const OFF_PEAK: usize = 0;
/// Index of the peak block.
pub const PEAK: usize = 1;

// ── Quantity ──────────────────────────────────────────────────────────────────

/// The four per-OD LOS quantities.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Quantity {
    /// In-vehicle travel time, minutes.
    Time,
    /// Wait time, minutes.
    Wait,
    /// Access/egress time, minutes.
    Access,
    /// Monetary cost, currency units.
    Cost,
}

// ── LosBlock ──────────────────────────────────────────────────────────────────

/// The four OD matrices of one (mode, period), each `n × n` origin-major.
#[derive(Clone, Debug, Default)]
pub struct LosBlock {
    pub time:   Vec<f64>,
    pub wait:   Vec<f64>,
    pub access: Vec<f64>,
    pub cost:   Vec<f64>,
}

impl LosBlock {
    pub fn quantity(&self, q: Quantity) -> &[f64] {
        match q {
            Quantity::Time   => &self.time,
            Quantity::Wait   => &self.wait,
            Quantity::Access => &self.access,
            Quantity::Cost   => &self.cost,
        }
    }

    /// Door-to-door duration (time + wait + access) of one OD cell.
    #[inline]
    pub fn duration(&self, cell: usize) -> f64 {
        self.time[cell] + self.wait[cell] + self.access[cell]
    }
}

// ── Extrema ───────────────────────────────────────────────────────────────────

/// Duration extrema over some OD subset, split into in-vehicle time and
/// out-of-vehicle (wait + access) components so a travel-time scale factor
/// can be applied without recomputation.
#[derive(Copy, Clone, Debug)]
pub struct Extrema {
    pub time_min: f64,
    pub time_max: f64,
    pub ovt_min:  f64,
    pub ovt_max:  f64,
}

impl Extrema {
    pub const EMPTY: Extrema = Extrema {
        time_min: f64::INFINITY,
        time_max: f64::NEG_INFINITY,
        ovt_min:  f64::INFINITY,
        ovt_max:  f64::NEG_INFINITY,
    };

    /// Widen to include one OD cell of `block`.
    #[inline]
    pub fn include(&mut self, block: &LosBlock, cell: usize) {
        let t = block.time[cell];
        let o = block.wait[cell] + block.access[cell];
        self.time_min = self.time_min.min(t);
        self.time_max = self.time_max.max(t);
        self.ovt_min = self.ovt_min.min(o);
        self.ovt_max = self.ovt_max.max(o);
    }

    /// Widen to include another extrema set.
    #[inline]
    pub fn merge(&mut self, other: &Extrema) {
        self.time_min = self.time_min.min(other.time_min);
        self.time_max = self.time_max.max(other.time_max);
        self.ovt_min = self.ovt_min.min(other.ovt_min);
        self.ovt_max = self.ovt_max.max(other.ovt_max);
    }

    /// Duration bounds in minutes under a travel-time scale factor.
    #[inline]
    pub fn bounds(&self, tt_scale: f64) -> (f64, f64) {
        (
            tt_scale * self.time_min + self.ovt_min,
            tt_scale * self.time_max + self.ovt_max,
        )
    }
}

// ── LosTables ─────────────────────────────────────────────────────────────────

/// All LOS blocks plus precomputed duration extrema.
///
/// Modes without a peak distinction (walk, bike) carry identical data in
/// both period slots so lookups never branch on the mode.
#[derive(Clone, Debug)]
pub struct LosTables {
    pub n: usize,
    /// `N_MODES × N_PERIODS` blocks, indexed `mode.index() * N_PERIODS + period`.
    blocks: Vec<LosBlock>,

    /// Per-mode, per-origin duration extrema over all destinations & periods.
    row_extrema: Vec<Extrema>, // N_MODES * n
    /// Per-mode, per-destination duration extrema over all origins & periods.
    col_extrema: Vec<Extrema>, // N_MODES * n
    /// Per-mode duration extrema over everything.
    global_extrema: [Extrema; N_MODES],
}

impl LosTables {
    /// Wrap the loaded blocks and precompute extrema.
    ///
    /// # Panics
    ///
    /// Panics if `blocks.len() != N_MODES * N_PERIODS` or any matrix is not
    /// `n × n`.
    pub fn new(n: usize, blocks: Vec<LosBlock>) -> Self {
        assert_eq!(blocks.len(), N_MODES * N_PERIODS, "block count");
        for b in &blocks {
            assert_eq!(b.time.len(), n * n, "LOS matrix size");
            assert_eq!(b.wait.len(), n * n, "LOS matrix size");
            assert_eq!(b.access.len(), n * n, "LOS matrix size");
            assert_eq!(b.cost.len(), n * n, "LOS matrix size");
        }

        let mut row_extrema = vec![Extrema::EMPTY; N_MODES * n];
        let mut col_extrema = vec![Extrema::EMPTY; N_MODES * n];
        let mut global_extrema = [Extrema::EMPTY; N_MODES];

        for mode in Mode::ALL {
            let m = mode.index();
            for period in 0..N_PERIODS {
                let block = &blocks[m * N_PERIODS + period];
                for o in 0..n {
                    for d in 0..n {
                        let cell = o * n + d;
                        row_extrema[m * n + o].include(block, cell);
                        col_extrema[m * n + d].include(block, cell);
                        global_extrema[m].include(block, cell);
                    }
                }
            }
        }

        Self { n, blocks, row_extrema, col_extrema, global_extrema }
    }

    #[inline]
    pub fn block(&self, mode: Mode, period: usize) -> &LosBlock {
        &self.blocks[mode.index() * N_PERIODS + period]
    }

    #[inline]
    pub fn row_extrema(&self, mode: Mode, origin: usize) -> &Extrema {
        &self.row_extrema[mode.index() * self.n + origin]
    }

    #[inline]
    pub fn col_extrema(&self, mode: Mode, dest: usize) -> &Extrema {
        &self.col_extrema[mode.index() * self.n + dest]
    }

    #[inline]
    pub fn global_extrema(&self, mode: Mode) -> &Extrema {
        &self.global_extrema[mode.index()]
    }
}
