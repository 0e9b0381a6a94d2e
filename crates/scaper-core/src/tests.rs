//! Unit tests for scaper-core primitives.

#[cfg(test)]
mod ids {
    use crate::{PersonId, ZoneId};

    #[test]
    fn index_roundtrip() {
        let id = PersonId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(PersonId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(PersonId::INVALID.0, u32::MAX);
        assert_eq!(ZoneId::INVALID.0, u32::MAX);
    }

    #[test]
    fn display() {
        assert_eq!(ZoneId(7).to_string(), "ZoneId(7)");
    }
}

#[cfg(test)]
mod mode {
    use crate::{Mode, ModeRules, Vehicle};

    #[test]
    fn index_matches_all_order() {
        for (i, m) in Mode::ALL.iter().enumerate() {
            assert_eq!(m.index(), i);
        }
    }

    #[test]
    fn vehicles() {
        assert_eq!(Mode::Car.vehicle(), Vehicle::Car);
        assert_eq!(Mode::Bike.vehicle(), Vehicle::Bike);
        assert_eq!(Mode::Walk.vehicle(), Vehicle::None);
        assert_eq!(Mode::Transit.vehicle(), Vehicle::None);
    }

    #[test]
    fn peak_modes() {
        assert!(Mode::Car.uses_peak());
        assert!(Mode::Transit.uses_peak());
        assert!(!Mode::Walk.uses_peak());
        assert!(!Mode::Bike.uses_peak());
    }

    #[test]
    fn str_roundtrip() {
        for m in Mode::ALL {
            assert_eq!(Mode::from_str(m.as_str()), Some(m));
        }
        assert_eq!(Mode::from_str("Rocket"), None);
    }

    #[test]
    fn default_rules_are_permissive() {
        let rules = ModeRules::default();
        assert_eq!(rules.available(false).len(), Mode::ALL.len());
    }
}

#[cfg(test)]
mod activity {
    use crate::{Activity, ActivitySettings};

    #[test]
    fn str_roundtrip() {
        for a in Activity::ALL {
            assert_eq!(Activity::from_str(a.as_str()), Some(a));
        }
    }

    #[test]
    fn phase_markers() {
        assert!(Activity::Depart.is_phase_marker());
        assert!(Activity::Arrive.is_phase_marker());
        assert!(!Activity::Home.is_phase_marker());
    }

    #[test]
    fn default_settings() {
        let s = ActivitySettings::default();
        assert_eq!(s.max_duration(Activity::Depart), 0);
        assert!(s.max_duration(Activity::Work) > 0);
        assert!(!s.discretionary.contains(&Activity::Home));
    }
}

#[cfg(test)]
mod time {
    use crate::TimeGrid;

    #[test]
    fn day_length() {
        let grid = TimeGrid::default();
        // 05:00-23:00 at 10 minutes = 108 steps.
        assert_eq!(grid.day_length(), 108);
    }

    #[test]
    fn decision_step_clips_at_day_end() {
        let grid = TimeGrid::default();
        assert_eq!(grid.decision_step(0.0), 1.0);
        assert_eq!(grid.decision_step(107.5), 0.5);
    }

    #[test]
    fn hhmm_formats_and_parses() {
        let grid = TimeGrid::default();
        assert_eq!(grid.hhmm(0.0), "05:00");
        assert_eq!(grid.hhmm(6.0), "06:00");
        // 6.4 steps = 64 minutes after 05:00, truncated to the minute.
        assert_eq!(grid.hhmm(6.4), "06:04");
        assert_eq!(grid.parse_hhmm("06:00"), Some(6.0));
        assert_eq!(grid.parse_hhmm("04:00"), None);
        assert_eq!(grid.parse_hhmm("garbage"), None);
    }

    #[test]
    fn frac() {
        assert_eq!(TimeGrid::frac(3.25), 0.25);
        assert_eq!(TimeGrid::frac(3.0), 0.0);
    }

    #[test]
    fn snap_lands_rounded_sums_on_day_end() {
        let grid = TimeGrid::default();
        let end = grid.day_length() as f64;
        // A step computed as t + (end − t) can be one ulp off.
        let almost = f64::from_bits(end.to_bits() - 1);
        assert_eq!(grid.snap(almost), end);
        assert_eq!(grid.snap(50.5), 50.5);
        assert_eq!(grid.snap(end), end);
    }
}

#[cfg(test)]
mod params {
    use crate::{Param, ParamSet};

    fn table() -> ParamSet {
        let mut m = std::collections::BTreeMap::new();
        m.insert("durHome".into(), Param { value: 0.5, estimate: true });
        m.insert("c1:durHome".into(), Param { value: 0.8, estimate: true });
        m.insert("travelCost".into(), Param { value: -0.1, estimate: false });
        ParamSet::new(m, 2)
    }

    #[test]
    fn class_prefix_falls_back_to_shared() {
        let p = table();
        assert_eq!(p.value(0, "durHome"), 0.5);
        assert_eq!(p.value(1, "durHome"), 0.8);
        assert_eq!(p.value(1, "travelCost"), -0.1);
    }

    #[test]
    fn missing_returns_zero() {
        let p = table();
        assert_eq!(p.value(0, "noSuchParam"), 0.0);
        // Repeated lookups keep returning zero (and only warn once).
        assert_eq!(p.value(0, "noSuchParam"), 0.0);
    }

    #[test]
    fn estimated_names_sorted_and_stable() {
        let p = table();
        assert_eq!(p.estimated_names(), vec!["c1:durHome", "durHome"]);
    }

    #[test]
    fn with_estimates_replaces_in_order() {
        let p = table();
        let q = p.with_estimates(&[1.5, 2.5]);
        assert_eq!(q.value(1, "durHome"), 1.5);
        assert_eq!(q.value(0, "durHome"), 2.5);
        assert_eq!(q.value(0, "travelCost"), -0.1);
    }
}

#[cfg(test)]
mod rng {
    use crate::{AgentRng, PersonId};

    #[test]
    fn deterministic_per_agent() {
        let mut a = AgentRng::new(7, PersonId(1));
        let mut b = AgentRng::new(7, PersonId(1));
        for _ in 0..10 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn agents_get_distinct_streams() {
        let mut a = AgentRng::new(7, PersonId(1));
        let mut b = AgentRng::new(7, PersonId(2));
        let same = (0..10).filter(|_| a.uniform() == b.uniform()).count();
        assert!(same < 10);
    }

    #[test]
    fn draw_index_hits_all_buckets() {
        let mut rng = AgentRng::new(1, PersonId(0));
        let weights = [1.0, 1.0, 2.0];
        let mut counts = [0usize; 3];
        for _ in 0..4000 {
            counts[rng.draw_index(&weights)] += 1;
        }
        assert!(counts.iter().all(|&c| c > 0));
        // The heavy bucket should dominate.
        assert!(counts[2] > counts[0] && counts[2] > counts[1]);
    }

    #[test]
    #[should_panic]
    fn draw_index_rejects_zero_mass() {
        let mut rng = AgentRng::new(1, PersonId(0));
        rng.draw_index(&[0.0, 0.0]);
    }
}
