//! Unit tests for the world view, peak blending, and zone sampling.

use crate::testkit::tiny_model;

#[cfg(test)]
mod peak {
    use crate::PeakPeriods;

    #[test]
    fn one_inside_window() {
        let p = PeakPeriods::default();
        assert_eq!(p.proportion_peak(7.0 * 60.0), 1.0); // exactly peak start
        assert_eq!(p.proportion_peak(8.0 * 60.0), 1.0);
        assert_eq!(p.proportion_peak(9.0 * 60.0), 1.0);
    }

    #[test]
    fn zero_outside_buffer() {
        let p = PeakPeriods::default();
        assert_eq!(p.proportion_peak(5.0 * 60.0), 0.0);
        assert_eq!(p.proportion_peak(9.5 * 60.0), 0.0); // peak end + buffer
        assert_eq!(p.proportion_peak(12.0 * 60.0), 0.0);
    }

    #[test]
    fn half_at_buffer_midpoint() {
        let p = PeakPeriods::default();
        // AM buffer runs 06:30–07:00; its midpoint is 06:45.
        let v = p.proportion_peak(6.75 * 60.0);
        assert!((v - 0.5).abs() < 1e-12, "got {v}");
    }

    #[test]
    fn strictly_interior_in_buffer() {
        let p = PeakPeriods::default();
        for mins in [395.0, 400.0, 410.0, 415.0] {
            let v = p.proportion_peak(mins);
            assert!(v > 0.0 && v < 1.0, "proportion at {mins} = {v}");
        }
    }

    #[test]
    fn continuous_and_bounded() {
        let p = PeakPeriods::default();
        let mut prev = p.proportion_peak(0.0);
        let mut t = 0.0;
        while t <= 24.0 * 60.0 {
            let v = p.proportion_peak(t);
            assert!((0.0..=1.0).contains(&v));
            // 0.1-minute steps: a C¹ function moves at most ~π/(2b) per min.
            assert!((v - prev).abs() < 0.01, "jump at {t}: {prev} -> {v}");
            prev = v;
            t += 0.1;
        }
    }
}

#[cfg(test)]
mod sampling {
    use scaper_core::{AgentRng, ParamSet, PersonId, ZoneId};

    use super::tiny_model;
    use crate::sample::{correction_matrix, sample_zones, sampling_probs};

    #[test]
    fn probs_are_normalized() {
        let model = tiny_model();
        let params = ParamSet::default();
        let p = sampling_probs(&model.zones, &model.los, &params, ZoneId(0)).unwrap();
        assert_eq!(p.len(), 3);
        let total: f64 = p.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn required_zones_come_first() {
        let model = tiny_model();
        let params = ParamSet::default();
        let probs = sampling_probs(&model.zones, &model.los, &params, ZoneId(0)).unwrap();
        let mut rng = AgentRng::new(1, PersonId(0));
        let zones = sample_zones(&probs, &[ZoneId(2), ZoneId(0)], 6, &mut rng).unwrap();
        assert_eq!(zones.len(), 6);
        assert_eq!(zones[0], ZoneId(2));
        assert_eq!(zones[1], ZoneId(0));
    }

    #[test]
    fn required_duplicates_collapse() {
        let model = tiny_model();
        let params = ParamSet::default();
        let probs = sampling_probs(&model.zones, &model.los, &params, ZoneId(1)).unwrap();
        let mut rng = AgentRng::new(1, PersonId(0));
        let zones = sample_zones(&probs, &[ZoneId(1), ZoneId(1)], 4, &mut rng).unwrap();
        // The duplicate requirement collapses to one leading slot.
        assert_eq!(zones[0], ZoneId(1));
        assert_eq!(zones.len(), 4);
    }

    #[test]
    fn correction_diagonal_is_zero() {
        let probs = vec![0.25, 0.5, 0.25];
        let zones = vec![ZoneId(0), ZoneId(1), ZoneId(2)];
        let c = correction_matrix(&probs, &zones);
        for i in 0..3 {
            assert_eq!(c[i * 3 + i], 0.0);
        }
        // Off-diagonal: -ln(N * p[d]) with N = 3.
        let expected = -(3.0f64 * 0.5).ln();
        assert!((c[0 * 3 + 1] - expected).abs() < 1e-12);
    }
}

#[cfg(test)]
mod world {
    use scaper_core::{AgentRng, Mode, ParamSet, PersonId, ZoneId};
    use scaper_mat::{BufPool, Shape};

    use super::tiny_model;
    use crate::{Axis, Quantity, World, ZoneAxis};

    #[test]
    fn full_world_identity_indexing() {
        let model = tiny_model();
        let w = model.full_world();
        assert_eq!(w.num_zones(), 3);
        assert!(!w.is_sampled());
        assert_eq!(w.index_of(ZoneId(2)), Some(2));
        assert_eq!(w.index_of(ZoneId(9)), None);
    }

    #[test]
    fn off_peak_time_is_single_part() {
        let model = tiny_model();
        let w = model.full_world();
        let mut parts = Vec::new();
        // 05:00 is far outside any peak window.
        w.travel_time(Mode::Car, ZoneAxis::One(0), ZoneAxis::One(2), 0.0, &mut parts);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].value(0, 0), 30.0);
    }

    #[test]
    fn buffer_midpoint_blends_half_and_half() {
        let model = tiny_model();
        let w = model.full_world();
        // 06:45 = 105 minutes after the 05:00 day start = 10.5 steps.
        let t = 10.5;
        let mut parts = Vec::new();
        w.travel_time(Mode::Car, ZoneAxis::One(0), ZoneAxis::One(2), t, &mut parts);
        assert_eq!(parts.len(), 2);
        let total: f64 = parts.iter().map(|m| m.value(0, 0)).sum();
        // 0.5·peak(60) + 0.5·off(30).
        assert!((total - 45.0).abs() < 1e-9, "got {total}");
    }

    #[test]
    fn walk_never_blends() {
        let model = tiny_model();
        let w = model.full_world();
        let mut parts = Vec::new();
        w.travel_time(Mode::Walk, ZoneAxis::One(0), ZoneAxis::One(1), 10.5, &mut parts);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].scale, 1.0);
    }

    #[test]
    fn slice_shapes() {
        let model = tiny_model();
        let w = model.full_world();
        let mut parts = Vec::new();
        w.travel_time(Mode::Walk, ZoneAxis::One(1), ZoneAxis::All, 0.0, &mut parts);
        assert_eq!(parts[0].shape(), Shape::Row(3));
        parts.clear();
        w.travel_time(Mode::Walk, ZoneAxis::All, ZoneAxis::One(1), 0.0, &mut parts);
        assert_eq!(parts[0].shape(), Shape::Col(3));
        assert_eq!(parts[0].value(2, 0), 20.0);
        parts.clear();
        w.travel_time(Mode::Walk, ZoneAxis::All, ZoneAxis::All, 0.0, &mut parts);
        assert_eq!(parts[0].shape(), Shape::Full(3));
    }

    #[test]
    fn travel_timesteps_cover_peak_and_offpeak() {
        let model = tiny_model();
        let w = model.full_world();
        // Car 0→2: off-peak 30 min, peak 60 min; 10-minute steps.
        let steps = w.travel_timesteps(Mode::Car, ZoneAxis::One(0), ZoneAxis::One(2));
        assert_eq!(steps, vec![3, 4, 5, 6]);
        // All destinations from zone 0: 10..=60 minutes.
        let steps = w.travel_timesteps(Mode::Car, ZoneAxis::One(0), ZoneAxis::All);
        assert_eq!(steps, (1..=6).collect::<Vec<u32>>());
    }

    #[test]
    fn corrections_zero_on_full_world() {
        let model = tiny_model();
        let w = model.full_world();
        let c = w.corrections(ZoneAxis::One(0), ZoneAxis::All);
        assert_eq!(c.sum(), 0.0);
    }

    #[test]
    fn sampled_world_gathers_and_corrects() {
        let model = tiny_model();
        let params = ParamSet::default();
        let mut rng = AgentRng::new(42, PersonId(7));
        let mut bufs = BufPool::new();
        let w = World::sampled(&model, &params, ZoneId(0), &[ZoneId(0), ZoneId(2)], 3, &mut rng, &mut bufs)
            .unwrap();
        assert!(w.is_sampled());
        assert_eq!(w.num_zones(), 3);
        assert_eq!(w.zone_at(0), ZoneId(0));
        assert_eq!(w.zone_at(1), ZoneId(2));

        // Gathered LOS: world 0→1 is global 0→2 (30 min off-peak walk... car).
        let mut parts = Vec::new();
        w.travel_time(Mode::Car, ZoneAxis::One(0), ZoneAxis::One(1), 0.0, &mut parts);
        assert_eq!(parts[0].value(0, 0), 30.0);

        // Correction diagonal vanishes, off-diagonal is -ln(N·p).
        let c = w.corrections(ZoneAxis::One(0), ZoneAxis::One(0));
        assert_eq!(c.value(0, 0), 0.0);
        let c = w.corrections(ZoneAxis::One(0), ZoneAxis::One(1));
        assert!(c.value(0, 0).is_finite());

        w.release_into(&mut bufs);
    }

    #[test]
    fn tt_scale_scales_time_but_not_cost() {
        let model = tiny_model();
        let mut w = model.full_world();
        w.set_tt_scale(2.0);
        let mut parts = Vec::new();
        w.travel_time(Mode::Walk, ZoneAxis::One(0), ZoneAxis::One(2), 0.0, &mut parts);
        assert_eq!(parts[0].value(0, 0), 60.0);
        parts.clear();
        w.los_parts(Quantity::Cost, Mode::Walk, ZoneAxis::One(0), ZoneAxis::One(2), 0.0, &mut parts);
        assert_eq!(parts[0].value(0, 0), 3.0);
    }

    #[test]
    fn zone_vectors_take_the_requested_axis() {
        let model = tiny_model();
        let w = model.full_world();
        assert_eq!(w.log_pop(ZoneAxis::All, Axis::Dest).shape(), Shape::Row(3));
        assert_eq!(w.parking_rate(ZoneAxis::All, Axis::Origin).shape(), Shape::Col(3));
        let lp = w.log_pop(ZoneAxis::One(0), Axis::Dest);
        assert!((lp.value(0, 0) - (101.0f64).ln()).abs() < 1e-12);
    }
}
