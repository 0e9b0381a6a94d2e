//! The value-function engine: traversal, option utilities, logsum caching.

use scaper_mat::{Mat, Shape};
use scaper_state::{Decision, Feasibility, LocTag, Location, State, StateSpace};
use scaper_core::ParamSet;
use scaper_world::World;

use crate::cache::EvCache;
use crate::context::{OffsetTables, WorkerCtx};
use crate::kernel::{add_ev, DestOffsets, TimeSpec};
use crate::utility::{UtilityAccumulator, UtilitySpec};

/// The engine for one (agent, latent class, world) triple.
///
/// Holds mutable access to the class's [`EvCache`] and the worker's pools;
/// everything else is read-only.  Creating one is free — per-option work is
/// where the time goes.
pub struct ValueEngine<'e, 'm> {
    pub space: StateSpace<'e, 'm>,
    utility: &'e dyn UtilitySpec,
    params: &'e ParamSet,
    class: usize,
    cache: &'e mut EvCache,
    ctx: &'e mut WorkerCtx,
}

impl<'e, 'm> ValueEngine<'e, 'm> {
    pub fn new(
        space: StateSpace<'e, 'm>,
        utility: &'e dyn UtilitySpec,
        params: &'e ParamSet,
        class: usize,
        cache: &'e mut EvCache,
        ctx: &'e mut WorkerCtx,
    ) -> Self {
        Self { space, utility, params, class, cache, ctx }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Compute the per-option exponentiated utilities Φ of `state`.
    ///
    /// With `explode = true` every NonFixed destination is its own option
    /// (simulation form); otherwise compressed matrix options (EV form).
    /// The returned mats are pool-owned — pass them back through
    /// [`release`](Self::release) when done.
    pub fn option_utilities(
        &mut self,
        state: &State,
        explode: bool,
        out: &mut Vec<(Decision, Mat<'static>)>,
    ) {
        self.ensure_cached(state, explode);
        let mut opts = Vec::new();
        self.space.options(state, explode, &mut opts);
        for d in opts {
            let phi = self.option_phi(state, &d);
            out.push((d, phi));
        }
    }

    /// `V̄(state)` for a concrete (non-wildcard) state: 0 for End, `−∞` for
    /// Bad, the logsum over options for Good.
    pub fn state_value(&mut self, state: &State) -> f64 {
        match self.space.classify(state) {
            Feasibility::End => 0.0,
            Feasibility::Bad => f64::NEG_INFINITY,
            Feasibility::Good => {
                assert!(
                    !state.location.is_all(),
                    "state_value needs a concrete state"
                );
                let mut options = Vec::new();
                self.option_utilities(state, false, &mut options);
                let mut total = 0.0;
                for (_, phi) in options {
                    total += phi.sum();
                    self.ctx.mats.release(phi);
                }
                total.ln()
            }
        }
    }

    /// Return option mats rented by [`option_utilities`](Self::option_utilities).
    pub fn release(&mut self, mat: Mat<'static>) {
        self.ctx.mats.release(mat);
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    /// Make every integral-time state reachable from `(seed, options)` cached.
    ///
    /// Explicit-stack DFS: a state is expanded when first seen and evaluated
    /// once all of its dependencies are cached.  Time is monotone along
    /// every edge and the per-timestep phase chains (`End → Depart → Arrive`)
    /// are acyclic, so the walk terminates.
    fn ensure_cached(&mut self, seed: &State, explode: bool) {
        if self.space.classify(seed) != Feasibility::Good {
            return;
        }
        let mut stack: Vec<State> = Vec::new();
        self.push_uncached_deps(seed, explode, &mut stack);

        while let Some(&top) = stack.last() {
            if !self.cache.needs_caching(&top, &mut self.ctx.bufs) {
                stack.pop();
                continue;
            }
            if !self.push_uncached_deps(&top, false, &mut stack) {
                self.evaluate_and_cache(&top);
                stack.pop();
            }
        }
    }

    /// Push the uncached Good dependencies of `(s, options)`; cache End
    /// states' zeros on the way.  Returns `true` if anything was pushed.
    fn push_uncached_deps(&mut self, s: &State, explode: bool, stack: &mut Vec<State>) -> bool {
        let mut opts = Vec::new();
        self.space.options(s, explode, &mut opts);

        let mut pushed = false;
        for d in &opts {
            for anchor in self.space.next_integral_time_states(s, d) {
                let next = compress(anchor);
                match self.space.classify(&next) {
                    // Unwritten slots default to −∞; nothing to do.
                    Feasibility::Bad => {}
                    Feasibility::End => self.cache.store_zero(&next, &mut self.ctx.bufs),
                    Feasibility::Good => {
                        if self.cache.needs_caching(&next, &mut self.ctx.bufs) {
                            stack.push(next);
                            pushed = true;
                        }
                    }
                }
            }
        }
        pushed
    }

    /// Reduce a Good integral-time state's options to `V̄` and store it.
    fn evaluate_and_cache(&mut self, s: &State) {
        let mut opts = Vec::new();
        self.space.options(s, false, &mut opts);

        let mut acc = self.ctx.mats.rent(self.state_shape(s));
        for d in &opts {
            let phi = self.option_phi(s, d);
            acc.add_dest_sums(&phi);
            self.ctx.mats.release(phi);
        }
        // ln of a zero sum is −∞: a Good state whose every option is
        // downstream-infeasible is itself effectively Bad.
        acc.log_inplace();
        self.cache.store(s, &acc, &mut self.ctx.bufs);
        self.ctx.mats.release(acc);
    }

    // ── Option kernel ─────────────────────────────────────────────────────

    /// Build `Φ(s, d) = exp(u(s,d) + EV(s,d))` as a pool-owned mat.
    fn option_phi(&mut self, s: &State, d: &Decision) -> Mat<'static> {
        let shape = self.decision_shape(s, d);
        let mut u = self.ctx.mats.rent(shape);

        // Instantaneous utility from the pluggable specification.
        {
            let mut sink = UtilityAccumulator {
                params: self.params,
                class: self.class,
                acc: &mut u,
            };
            self.utility.decision_terms(&self.space, s, d, &mut sink);
        }

        // Zone-sampling corrections apply to sampled NonFixed destinations
        // only; fixed-zone travel is always in the sample and uncorrected.
        if let Decision::Travel(_, dest) = d {
            if dest.tag() == LocTag::NonFixed && self.space.world.is_sampled() {
                let o = self.space.zone_axis(&s.location);
                let dd = self.space.zone_axis(dest);
                let corr = self.space.world.corrections(o, dd);
                u.add_assign(&corr);
            }
        }

        self.add_future(s, d, &mut u);
        u.exp_inplace();
        u
    }

    /// Add the interpolated expected future value of `(s, d)` into `u`.
    fn add_future(&mut self, s: &State, d: &Decision, u: &mut Mat<'static>) {
        let day_len = self.space.cfg.grid.day_length() as usize;
        let n = self.space.world.num_zones();

        match *d {
            Decision::Travel(mode, dest) => {
                // Per-cell arrival times: departure + blended door-to-door
                // duration in timesteps.
                let o = self.space.zone_axis(&s.location);
                let dd = self.space.zone_axis(&dest);
                let mut tmat = self.ctx.mats.rent(u.shape());
                {
                    let world = self.space.world;
                    let mut parts = Vec::with_capacity(2);
                    world.travel_time(mode, o, dd, s.time, &mut parts);
                    world.travel_wait(mode, o, dd, s.time, &mut parts);
                    world.travel_access(mode, o, dd, s.time, &mut parts);
                    tmat.add_parts(&parts);
                }
                tmat.scale_by(1.0 / self.space.cfg.grid.timestep_mins);
                tmat.add_assign(&Mat::scalar(s.time));

                let next = self.space.next_state(s, d, s.time);
                let offsets =
                    dest_offsets(&mut self.ctx.offsets, self.space.world, &next.location, n);
                let row = self.cache.row(next.cache_key(), &mut self.ctx.bufs);
                add_ev(u.data_mut(), row, TimeSpec::PerCell(tmat.data()), offsets, day_len);

                self.ctx.mats.release(tmat);
            }

            _ => {
                // End is instantaneous; Continue/Start advance one decision
                // step.  Either way the arrival time is uniform across cells.
                let arrive = match d {
                    Decision::End => s.time,
                    _ => s.time + self.space.cfg.grid.decision_step(s.time),
                };
                let next = self.space.next_state(s, d, arrive);
                let offsets =
                    dest_offsets(&mut self.ctx.offsets, self.space.world, &next.location, n);
                let row = self.cache.row(next.cache_key(), &mut self.ctx.bufs);
                add_ev(u.data_mut(), row, TimeSpec::Uniform(arrive), offsets, day_len);
            }
        }
    }

    // ── Shapes ────────────────────────────────────────────────────────────

    /// The accumulator shape of a state's own `V̄`.
    fn state_shape(&self, s: &State) -> Shape {
        if s.location.is_all() {
            Shape::Col(self.space.world.num_zones())
        } else {
            Shape::Scalar
        }
    }

    /// The matrix shape of one decision's utilities.
    fn decision_shape(&self, s: &State, d: &Decision) -> Shape {
        let n = self.space.world.num_zones();
        let origins = if s.location.is_all() { n } else { 1 };
        match d {
            Decision::Travel(_, dest) => {
                let dests = if dest.is_all() { n } else { 1 };
                Shape::for_axes(origins, dests)
            }
            _ => Shape::for_axes(origins, 1),
        }
    }
}

/// Collapse a concrete NonFixed zone to the all-zones wildcard: exploded
/// states share the compressed states' cache rows.
fn compress(s: State) -> State {
    match s.location {
        Location::NonFixed(Some(_)) => State {
            location: Location::NonFixed(None),
            ..s
        },
        _ => s,
    }
}

/// Where each cell of a decision mat reads its destination's EV row.
fn dest_offsets<'a>(
    offsets: &'a mut OffsetTables,
    world: &World<'_>,
    next_loc: &Location,
    n: usize,
) -> DestOffsets<'a> {
    match next_loc {
        // All destinations: cell i of a Row/Col reads zone i's row; cell
        // o·n + d of a Full reads zone d's row.
        Location::NonFixed(None) => DestOffsets::PerCell(offsets.all_dests(n)),
        // One concrete zone of a NonFixed (width-n) row.
        Location::NonFixed(Some(z)) => {
            DestOffsets::Uniform(world.require_index(*z) * offsets.stride())
        }
        // Fixed-zone keys have width-1 rows.
        Location::Residence(_) | Location::Workplace(_) => DestOffsets::Uniform(0),
    }
}
