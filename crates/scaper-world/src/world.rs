//! The `World` view — the single query surface the engine computes against.

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use scaper_core::{AgentRng, Mode, ModelConfig, ParamSet, TimeGrid, ZoneId, N_MODES};
use scaper_mat::{BufPool, Mat, Shape};

use crate::network::{Extrema, LosTables, Quantity, N_PERIODS, OFF_PEAK, PEAK};
use crate::sample::{correction_matrix, sample_zones, sampling_probs};
use crate::zones::ZoneTable;
use crate::{PeakPeriods, WorldResult};

// ── Model ─────────────────────────────────────────────────────────────────────

/// The loaded, immutable model: configuration plus zonal and network data.
///
/// Owned by the entry point; worker threads hold shared references.
pub struct Model {
    pub config: ModelConfig,
    pub peaks:  PeakPeriods,
    pub zones:  ZoneTable,
    pub los:    LosTables,
}

impl Model {
    /// The full-zone world view over this model.
    pub fn full_world(&self) -> World<'_> {
        World::full(self)
    }
}

// ── Axis selectors ────────────────────────────────────────────────────────────

/// One axis of an OD query: a single world zone index, or all of them.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ZoneAxis {
    One(usize),
    All,
}

/// Which axis a zonal vector should broadcast along.
///
/// A per-zone attribute queried with [`ZoneAxis::All`] becomes a `Col` when
/// it varies with the state's own (origin) zone and a `Row` when it varies
/// with a decision's destination zone.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Axis {
    Origin,
    Dest,
}

// ── World ─────────────────────────────────────────────────────────────────────

/// One (mode, period) LOS view; borrowed for full worlds, gathered for
/// sampled ones.
struct LosView<'m> {
    time:   Cow<'m, [f64]>,
    wait:   Cow<'m, [f64]>,
    access: Cow<'m, [f64]>,
    cost:   Cow<'m, [f64]>,
}

impl LosView<'_> {
    fn quantity(&self, q: Quantity) -> &[f64] {
        match q {
            Quantity::Time   => &self.time,
            Quantity::Wait   => &self.wait,
            Quantity::Access => &self.access,
            Quantity::Cost   => &self.cost,
        }
    }

    fn duration(&self, cell: usize, tt_scale: f64) -> f64 {
        tt_scale * self.time[cell] + self.wait[cell] + self.access[cell]
    }
}

/// A per-agent snapshot of zonal and OD data.
///
/// Full worlds borrow the model tensors; sampled worlds own gathered copies
/// over their zone subset plus a correction matrix.  All queries are
/// world-index based: callers translate `ZoneId`s through [`World::index_of`]
/// once and work in world space from then on.
pub struct World<'m> {
    grid:  TimeGrid,
    peaks: PeakPeriods,
    n: usize,

    /// World index → global zone id.  Identity for full worlds.
    zone_ids: Vec<ZoneId>,
    /// Reverse lookup; `None` means identity (full world).
    index: Option<FxHashMap<ZoneId, usize>>,

    log_pop:     Cow<'m, [f64]>,
    log_emp:     Cow<'m, [f64]>,
    parking_min: Cow<'m, [f64]>,

    views: Vec<LosView<'m>>, // N_MODES × N_PERIODS

    row_extrema:    Cow<'m, [Extrema]>, // N_MODES × n
    col_extrema:    Cow<'m, [Extrema]>, // N_MODES × n
    global_extrema: [Extrema; N_MODES],

    /// `n × n` zone-sampling corrections; `None` on full worlds.
    corrections: Option<Vec<f64>>,

    /// Travel-time scale factor (sensitivity sweeps); 1.0 normally.
    tt_scale: f64,
}

impl<'m> World<'m> {
    // ── Construction ──────────────────────────────────────────────────────

    /// The full-zone view: borrows every tensor, no corrections.
    pub fn full(model: &'m Model) -> World<'m> {
        let n = model.zones.n;
        let views = Mode::ALL
            .iter()
            .flat_map(|&mode| {
                (0..N_PERIODS).map(move |period| (mode, period))
            })
            .map(|(mode, period)| {
                let b = model.los.block(mode, period);
                LosView {
                    time:   Cow::Borrowed(&b.time),
                    wait:   Cow::Borrowed(&b.wait),
                    access: Cow::Borrowed(&b.access),
                    cost:   Cow::Borrowed(&b.cost),
                }
            })
            .collect();

        let mut row_extrema = Vec::with_capacity(N_MODES * n);
        let mut col_extrema = Vec::with_capacity(N_MODES * n);
        let mut global_extrema = [Extrema::EMPTY; N_MODES];
        for mode in Mode::ALL {
            for z in 0..n {
                row_extrema.push(*model.los.row_extrema(mode, z));
                col_extrema.push(*model.los.col_extrema(mode, z));
            }
            global_extrema[mode.index()] = *model.los.global_extrema(mode);
        }

        World {
            grid: model.config.grid,
            peaks: model.peaks,
            n,
            zone_ids: (0..n as u32).map(ZoneId).collect(),
            index: None,
            log_pop: Cow::Borrowed(&model.zones.log_pop),
            log_emp: Cow::Borrowed(&model.zones.log_emp),
            parking_min: Cow::Borrowed(&model.zones.parking_per_min),
            views,
            row_extrema: Cow::Owned(row_extrema),
            col_extrema: Cow::Owned(col_extrema),
            global_extrema,
            corrections: None,
            tt_scale: 1.0,
        }
    }

    /// Draw an importance sample of `n_sample` zones (required first) and
    /// build the gathered view over it.
    pub fn sampled(
        model: &Model,
        params: &ParamSet,
        home: ZoneId,
        required: &[ZoneId],
        n_sample: usize,
        rng: &mut AgentRng,
        bufs: &mut BufPool,
    ) -> WorldResult<World<'static>> {
        let probs = sampling_probs(&model.zones, &model.los, params, home)?;
        let zones = sample_zones(&probs, required, n_sample, rng)?;
        Ok(Self::from_zone_list(model, &probs, zones, bufs))
    }

    /// Rebuild a sampled world over a stored zone list (estimation path).
    ///
    /// The corrections are deterministic given the parameter table, so a
    /// choiceset's world can be reconstructed exactly.
    pub fn resampled(
        model: &Model,
        params: &ParamSet,
        home: ZoneId,
        zones: Vec<ZoneId>,
        bufs: &mut BufPool,
    ) -> WorldResult<World<'static>> {
        let probs = sampling_probs(&model.zones, &model.los, params, home)?;
        Ok(Self::from_zone_list(model, &probs, zones, bufs))
    }

    fn from_zone_list(
        model: &Model,
        probs: &[f64],
        zones: Vec<ZoneId>,
        bufs: &mut BufPool,
    ) -> World<'static> {
        let n_s = zones.len();
        let full_n = model.zones.n;

        // First occurrence wins for duplicate sampled zones.
        let mut index = FxHashMap::default();
        for (i, &z) in zones.iter().enumerate() {
            index.entry(z).or_insert(i);
        }

        let gather_vec = |src: &[f64], bufs: &mut BufPool| -> Vec<f64> {
            let mut buf = bufs.rent(n_s, 0.0);
            for (cell, &z) in buf.iter_mut().zip(&zones) {
                *cell = src[z.index()];
            }
            buf
        };
        let gather_mat = |src: &[f64], bufs: &mut BufPool| -> Vec<f64> {
            let mut buf = bufs.rent(n_s * n_s, 0.0);
            for (o, &zo) in zones.iter().enumerate() {
                let src_row = &src[zo.index() * full_n..(zo.index() + 1) * full_n];
                for (d, &zd) in zones.iter().enumerate() {
                    buf[o * n_s + d] = src_row[zd.index()];
                }
            }
            buf
        };

        let mut views = Vec::with_capacity(N_MODES * N_PERIODS);
        for mode in Mode::ALL {
            for period in 0..N_PERIODS {
                let b = model.los.block(mode, period);
                views.push(LosView {
                    time:   Cow::Owned(gather_mat(&b.time, bufs)),
                    wait:   Cow::Owned(gather_mat(&b.wait, bufs)),
                    access: Cow::Owned(gather_mat(&b.access, bufs)),
                    cost:   Cow::Owned(gather_mat(&b.cost, bufs)),
                });
            }
        }

        // Duration extrema over the sampled subset.
        let mut row_extrema = vec![Extrema::EMPTY; N_MODES * n_s];
        let mut col_extrema = vec![Extrema::EMPTY; N_MODES * n_s];
        let mut global_extrema = [Extrema::EMPTY; N_MODES];
        for mode in Mode::ALL {
            let m = mode.index();
            for period in 0..N_PERIODS {
                let view = &views[m * N_PERIODS + period];
                for o in 0..n_s {
                    for d in 0..n_s {
                        let cell = o * n_s + d;
                        let mut e = Extrema::EMPTY;
                        e.time_min = view.time[cell];
                        e.time_max = view.time[cell];
                        e.ovt_min = view.wait[cell] + view.access[cell];
                        e.ovt_max = e.ovt_min;
                        row_extrema[m * n_s + o].merge(&e);
                        col_extrema[m * n_s + d].merge(&e);
                        global_extrema[m].merge(&e);
                    }
                }
            }
        }

        let corrections = Some(correction_matrix(probs, &zones));

        World {
            grid: model.config.grid,
            peaks: model.peaks,
            n: n_s,
            log_pop: Cow::Owned(gather_vec(&model.zones.log_pop, bufs)),
            log_emp: Cow::Owned(gather_vec(&model.zones.log_emp, bufs)),
            parking_min: Cow::Owned(gather_vec(&model.zones.parking_per_min, bufs)),
            zone_ids: zones,
            index: Some(index),
            views,
            row_extrema: Cow::Owned(row_extrema),
            col_extrema: Cow::Owned(col_extrema),
            global_extrema,
            corrections,
            tt_scale: 1.0,
        }
    }

    /// Return the gathered buffers to a pool (sampled worlds only; full
    /// worlds own nothing poolable).
    pub fn release_into(self, bufs: &mut BufPool) {
        for view in self.views {
            for cow in [view.time, view.wait, view.access, view.cost] {
                if let Cow::Owned(v) = cow {
                    bufs.release(v);
                }
            }
        }
        for cow in [self.log_pop, self.log_emp, self.parking_min] {
            if let Cow::Owned(v) = cow {
                bufs.release(v);
            }
        }
        if let Some(c) = self.corrections {
            bufs.release(c);
        }
    }

    // ── Identity ──────────────────────────────────────────────────────────

    #[inline]
    pub fn num_zones(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_sampled(&self) -> bool {
        self.corrections.is_some()
    }

    #[inline]
    pub fn zone_ids(&self) -> &[ZoneId] {
        &self.zone_ids
    }

    #[inline]
    pub fn zone_at(&self, i: usize) -> ZoneId {
        self.zone_ids[i]
    }

    /// World index of a global zone id; `None` if the zone is not in this
    /// world's sample.
    pub fn index_of(&self, zone: ZoneId) -> Option<usize> {
        match &self.index {
            None => (zone.index() < self.n).then(|| zone.index()),
            Some(map) => map.get(&zone).copied(),
        }
    }

    /// Like [`index_of`](Self::index_of) but panics: fixed zones (home, work,
    /// observed trip ends) are required members of every sampled world, so a
    /// miss is a sampling bug.
    pub fn require_index(&self, zone: ZoneId) -> usize {
        self.index_of(zone)
            .unwrap_or_else(|| panic!("zone {zone} missing from sampled world"))
    }

    // ── Time ──────────────────────────────────────────────────────────────

    /// Peak share at time-of-day `t` (timesteps since DayStart).
    #[inline]
    pub fn proportion_peak(&self, t: f64) -> f64 {
        self.peaks.proportion_peak(self.grid.mins_of_day(t))
    }

    #[inline]
    pub fn tt_scale(&self) -> f64 {
        self.tt_scale
    }

    /// Scale all in-vehicle travel times by `s` (sensitivity sweeps).
    pub fn set_tt_scale(&mut self, s: f64) {
        self.tt_scale = s;
    }

    // ── LOS queries ───────────────────────────────────────────────────────

    /// Push the ≥1 mats whose scaled sum is the effective LOS quantity for
    /// this OD selection at departure time `t`.
    ///
    /// Congested modes in the blending buffer produce two parts (peak with
    /// scale `p`, off-peak with scale `1 − p`); everything else produces one.
    pub fn los_parts<'s>(
        &'s self,
        q: Quantity,
        mode: Mode,
        origin: ZoneAxis,
        dest: ZoneAxis,
        t: f64,
        out: &mut Vec<Mat<'s>>,
    ) {
        let p = if mode.uses_peak() { self.proportion_peak(t) } else { 0.0 };
        let q_scale = if q == Quantity::Time { self.tt_scale } else { 1.0 };

        if p > 0.0 {
            let data = self.views[mode.index() * N_PERIODS + PEAK].quantity(q);
            out.push(self.slice(data, origin, dest, p * q_scale));
        }
        if p < 1.0 {
            let data = self.views[mode.index() * N_PERIODS + OFF_PEAK].quantity(q);
            out.push(self.slice(data, origin, dest, (1.0 - p) * q_scale));
        }
    }

    pub fn travel_time<'s>(&'s self, mode: Mode, o: ZoneAxis, d: ZoneAxis, t: f64, out: &mut Vec<Mat<'s>>) {
        self.los_parts(Quantity::Time, mode, o, d, t, out);
    }

    pub fn travel_wait<'s>(&'s self, mode: Mode, o: ZoneAxis, d: ZoneAxis, t: f64, out: &mut Vec<Mat<'s>>) {
        self.los_parts(Quantity::Wait, mode, o, d, t, out);
    }

    pub fn travel_access<'s>(&'s self, mode: Mode, o: ZoneAxis, d: ZoneAxis, t: f64, out: &mut Vec<Mat<'s>>) {
        self.los_parts(Quantity::Access, mode, o, d, t, out);
    }

    pub fn travel_cost<'s>(&'s self, mode: Mode, o: ZoneAxis, d: ZoneAxis, t: f64, out: &mut Vec<Mat<'s>>) {
        self.los_parts(Quantity::Cost, mode, o, d, t, out);
    }

    /// Exact scalar door-to-door duration (minutes) for one OD pair at `t`,
    /// peak-blended.
    pub fn door_to_door_mins(&self, mode: Mode, o: usize, d: usize, t: f64) -> f64 {
        let cell = o * self.n + d;
        let p = if mode.uses_peak() { self.proportion_peak(t) } else { 0.0 };
        let off = self.views[mode.index() * N_PERIODS + OFF_PEAK].duration(cell, self.tt_scale);
        if p == 0.0 {
            return off;
        }
        let peak = self.views[mode.index() * N_PERIODS + PEAK].duration(cell, self.tt_scale);
        p * peak + (1.0 - p) * off
    }

    /// The sorted integral timesteps a travel over this OD selection may
    /// consume: `floor(min) ..= ceil(max)` across peak and off-peak.
    pub fn travel_timesteps(&self, mode: Mode, origin: ZoneAxis, dest: ZoneAxis) -> Vec<u32> {
        let (lo_mins, hi_mins) = self.duration_bounds_mins(mode, origin, dest);
        let lo = self.grid.steps_of_mins(lo_mins).floor().max(0.0) as u32;
        let hi = self.grid.steps_of_mins(hi_mins).ceil().max(0.0) as u32;
        (lo..=hi).collect()
    }

    /// Door-to-door duration bounds (minutes) over an OD selection.
    pub fn duration_bounds_mins(&self, mode: Mode, origin: ZoneAxis, dest: ZoneAxis) -> (f64, f64) {
        let m = mode.index();
        match (origin, dest) {
            (ZoneAxis::One(o), ZoneAxis::One(d)) => {
                let cell = o * self.n + d;
                let mut lo = f64::INFINITY;
                let mut hi = f64::NEG_INFINITY;
                for period in 0..N_PERIODS {
                    let dur = self.views[m * N_PERIODS + period].duration(cell, self.tt_scale);
                    lo = lo.min(dur);
                    hi = hi.max(dur);
                }
                (lo, hi)
            }
            (ZoneAxis::One(o), ZoneAxis::All) => self.row_extrema[m * self.n + o].bounds(self.tt_scale),
            (ZoneAxis::All, ZoneAxis::One(d)) => self.col_extrema[m * self.n + d].bounds(self.tt_scale),
            (ZoneAxis::All, ZoneAxis::All) => self.global_extrema[m].bounds(self.tt_scale),
        }
    }

    // ── Zonal attributes ──────────────────────────────────────────────────

    /// `ln(1 + population)` of the selected zone(s).
    pub fn log_pop(&self, z: ZoneAxis, axis: Axis) -> Mat<'_> {
        self.zone_vector(&self.log_pop, z, axis)
    }

    /// `ln(1 + employment)` of the selected zone(s).
    pub fn log_emp(&self, z: ZoneAxis, axis: Axis) -> Mat<'_> {
        self.zone_vector(&self.log_emp, z, axis)
    }

    /// Parking rate per minute of the selected zone(s).
    pub fn parking_rate(&self, z: ZoneAxis, axis: Axis) -> Mat<'_> {
        self.zone_vector(&self.parking_min, z, axis)
    }

    /// Zone-sampling correction for an OD selection.  Scalar zero on full
    /// worlds; on sampled worlds a slice of the correction matrix shaped like
    /// the selection.
    pub fn corrections(&self, origin: ZoneAxis, dest: ZoneAxis) -> Mat<'_> {
        match &self.corrections {
            None => Mat::scalar(0.0),
            Some(c) => self.slice(c, origin, dest, 1.0),
        }
    }

    // ── Slicing ───────────────────────────────────────────────────────────

    /// Shape an `n × n` origin-major matrix down to an OD selection.
    ///
    /// Fixed-origin rows and the full matrix borrow; a fixed-destination
    /// column is a strided gather and owns its (small) buffer.
    fn slice<'s>(&self, data: &'s [f64], origin: ZoneAxis, dest: ZoneAxis, scale: f64) -> Mat<'s> {
        let n = self.n;
        match (origin, dest) {
            (ZoneAxis::One(o), ZoneAxis::One(d)) => {
                Mat::borrowed(scale, Shape::Scalar, &data[o * n + d..o * n + d + 1])
            }
            (ZoneAxis::One(o), ZoneAxis::All) => {
                Mat::borrowed(scale, Shape::Row(n), &data[o * n..(o + 1) * n])
            }
            (ZoneAxis::All, ZoneAxis::One(d)) => {
                let col: Vec<f64> = (0..n).map(|o| data[o * n + d]).collect();
                Mat::from_buffer(scale, Shape::Col(n), col)
            }
            (ZoneAxis::All, ZoneAxis::All) => Mat::borrowed(scale, Shape::Full(n), data),
        }
    }

    fn zone_vector<'s>(&self, data: &'s [f64], z: ZoneAxis, axis: Axis) -> Mat<'s> {
        match z {
            ZoneAxis::One(i) => Mat::borrowed(1.0, Shape::Scalar, &data[i..i + 1]),
            ZoneAxis::All => {
                let shape = match axis {
                    Axis::Origin => Shape::Col(self.n),
                    Axis::Dest   => Shape::Row(self.n),
                };
                Mat::borrowed(1.0, shape, data)
            }
        }
    }
}
