//! Unit tests for the state-space contract.

use scaper_core::{Activity, Mode, Vehicle, ZoneId};
use scaper_world::testkit::{agent, tiny_model};

use crate::{Decision, Feasibility, Location, State, StateSpace};

fn state_at(activity: Activity, location: Location, time: f64) -> State {
    State {
        activity,
        location,
        time,
        duration: 1,
        vehicle: Vehicle::None,
        has_worked: false,
    }
}

#[cfg(test)]
mod classify {
    use super::*;

    #[test]
    fn start_state_is_good() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        assert_eq!(space.classify(&space.start_state()), Feasibility::Good);
    }

    #[test]
    fn out_of_day_is_bad() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let mut s = space.start_state();
        s.time = -0.5;
        assert_eq!(space.classify(&s), Feasibility::Bad);
        s.time = model.config.grid.day_length() as f64 + 0.25;
        assert_eq!(space.classify(&s), Feasibility::Bad);
    }

    #[test]
    fn day_end_at_home_without_work_obligation_ends() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let mut s = space.start_state();
        s.time = model.config.grid.day_length() as f64;
        assert_eq!(space.classify(&s), Feasibility::End);
        // Having worked without a workplace invalidates the terminus.
        s.has_worked = true;
        assert_eq!(space.classify(&s), Feasibility::Bad);
    }

    #[test]
    fn day_end_requires_work_done_for_workers() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(Some(ZoneId(1)));
        let space = StateSpace::new(&model.config, &a, &world);
        let mut s = space.start_state();
        s.time = model.config.grid.day_length() as f64;
        assert_eq!(space.classify(&s), Feasibility::Bad);
        s.has_worked = true;
        assert_eq!(space.classify(&s), Feasibility::End);
    }

    #[test]
    fn home_away_from_residence_is_bad() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let s = state_at(Activity::Home, Location::NonFixed(Some(ZoneId(1))), 5.0);
        assert_eq!(space.classify(&s), Feasibility::Bad);
        // A residence that is not the agent's own home is equally bad.
        let s = state_at(Activity::Home, Location::Residence(ZoneId(2)), 5.0);
        assert_eq!(space.classify(&s), Feasibility::Bad);
    }

    #[test]
    fn work_without_workzone_is_bad() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let s = state_at(Activity::Work, Location::Workplace(ZoneId(1)), 5.0);
        assert_eq!(space.classify(&s), Feasibility::Bad);
    }
}

#[cfg(test)]
mod options {
    use super::*;

    #[test]
    fn activities_offer_continue_and_end() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let mut opts = Vec::new();
        space.options(&space.start_state(), false, &mut opts);
        assert_eq!(opts, vec![Decision::Continue, Decision::End]);
    }

    #[test]
    fn depart_from_home_compressed() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(Some(ZoneId(1)));
        let space = StateSpace::new(&model.config, &a, &world);
        let s = state_at(Activity::Depart, Location::Residence(a.home_zone), 2.0);
        let mut opts = Vec::new();
        space.options(&s, false, &mut opts);
        // Per mode: workplace + one compressed NonFixed (already at home).
        assert_eq!(opts.len(), 4 * 2);
        assert!(opts.iter().all(|d| d.is_travel()));
        assert!(opts.contains(&Decision::Travel(Mode::Car, Location::Workplace(ZoneId(1)))));
        assert!(opts.contains(&Decision::Travel(Mode::Walk, Location::NonFixed(None))));
    }

    #[test]
    fn depart_exploded_lists_every_zone() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let s = state_at(Activity::Depart, Location::Residence(a.home_zone), 2.0);
        let mut opts = Vec::new();
        space.options(&s, true, &mut opts);
        // Per mode: 3 exploded zones, no work option, home excluded.
        assert_eq!(opts.len(), 4 * 3);
        assert!(opts.contains(&Decision::Travel(Mode::Bike, Location::NonFixed(Some(ZoneId(2))))));
    }

    #[test]
    fn arrive_offers_location_appropriate_starts() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(Some(ZoneId(1)));
        let space = StateSpace::new(&model.config, &a, &world);

        let mut opts = Vec::new();
        let s = state_at(Activity::Arrive, Location::Residence(a.home_zone), 3.0);
        space.options(&s, false, &mut opts);
        assert_eq!(opts, vec![Decision::Start(Activity::Home)]);

        opts.clear();
        let s = state_at(Activity::Arrive, Location::Workplace(ZoneId(1)), 3.0);
        space.options(&s, false, &mut opts);
        assert_eq!(opts, vec![Decision::Start(Activity::Work)]);

        opts.clear();
        let s = state_at(Activity::Arrive, Location::NonFixed(Some(ZoneId(2))), 3.0);
        space.options(&s, false, &mut opts);
        assert_eq!(
            opts,
            vec![Decision::Start(Activity::Shop), Decision::Start(Activity::Other)]
        );
    }
}

#[cfg(test)]
mod transitions {
    use super::*;

    #[test]
    fn travel_from_home_picks_up_vehicle() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let s = state_at(Activity::Depart, Location::Residence(a.home_zone), 2.0);

        let d = Decision::Travel(Mode::Car, Location::NonFixed(Some(ZoneId(1))));
        let next = space.next_state(&s, &d, 3.0);
        assert_eq!(next.activity, Activity::Arrive);
        assert_eq!(next.vehicle, Vehicle::Car);
        assert_eq!(next.duration, 0);

        // Returning home garages the vehicle.
        let mut away = next;
        away.activity = Activity::Depart;
        let back = space.next_state(
            &away,
            &Decision::Travel(Mode::Car, Location::Residence(a.home_zone)),
            4.0,
        );
        assert_eq!(back.vehicle, Vehicle::None);
    }

    #[test]
    fn vehicle_rides_along_between_non_home_zones() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let mut s = state_at(Activity::Depart, Location::NonFixed(Some(ZoneId(1))), 5.0);
        s.vehicle = Vehicle::Bike;
        let next = space.next_state(
            &s,
            &Decision::Travel(Mode::Walk, Location::NonFixed(Some(ZoneId(2)))),
            6.0,
        );
        assert_eq!(next.vehicle, Vehicle::Bike);
    }

    #[test]
    fn continue_caps_duration() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let cap = model.config.activities.max_duration(Activity::Home);
        let mut s = space.start_state();
        s.duration = cap;
        let next = space.next_state(&s, &Decision::Continue, s.time + 1.0);
        assert_eq!(next.duration, cap);
    }

    #[test]
    fn unmandated_work_is_sticky() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(Some(ZoneId(1)));
        let space = StateSpace::new(&model.config, &a, &world);
        let s = state_at(Activity::Arrive, Location::Workplace(ZoneId(1)), 10.0);
        let started = space.next_state(&s, &Decision::Start(Activity::Work), 11.0);
        assert!(started.has_worked);
        let left = space.next_state(&started, &Decision::End, 12.0);
        assert!(left.has_worked);
    }

    #[test]
    fn mandated_work_flips_exactly_at_the_mandate() {
        let model = tiny_model();
        let world = model.full_world();
        let mut a = agent(Some(ZoneId(1)));
        a.work_duration = Some(3); // 3 timesteps at decision_steps = 1.
        let space = StateSpace::new(&model.config, &a, &world);

        let arrive = state_at(Activity::Arrive, Location::Workplace(ZoneId(1)), 10.0);
        let s1 = space.next_state(&arrive, &Decision::Start(Activity::Work), 11.0);
        assert!(!s1.has_worked);
        let s2 = space.next_state(&s1, &Decision::Continue, 12.0);
        assert!(!s2.has_worked);
        let s3 = space.next_state(&s2, &Decision::Continue, 13.0);
        assert!(s3.has_worked, "third step completes the mandate");
        let s4 = space.next_state(&s3, &Decision::Continue, 14.0);
        assert!(!s4.has_worked, "overstaying clears the mandate");
    }
}

#[cfg(test)]
mod stepping {
    use super::*;

    #[test]
    fn end_is_instantaneous() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let s = space.start_state();
        let next = space.next_single_state(&s, &Decision::End);
        assert_eq!(next.time, s.time);
        assert_eq!(next.activity, Activity::Depart);
    }

    #[test]
    fn travel_consumes_exact_los_duration() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let s = state_at(Activity::Depart, Location::Residence(a.home_zone), 0.0);
        let d = Decision::Travel(Mode::Walk, Location::NonFixed(Some(ZoneId(2))));
        let next = space.next_single_state(&s, &d);
        // Walk 0→2 is 30 minutes = 3 timesteps, no peak blending at 05:00.
        assert_eq!(next.time, 3.0);
    }

    #[test]
    fn anchor_times_bracket_travel() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let s = state_at(Activity::Depart, Location::Residence(a.home_zone), 2.5);
        // Car 0 → all: 10..=60 min → 1..=6 steps from t = 2.5.
        let d = Decision::Travel(Mode::Car, Location::NonFixed(None));
        let (lo, hi) = space.anchor_times(&s, &d);
        assert_eq!((lo, hi), (3, 9));
    }

    #[test]
    fn anchor_times_clip_to_day_end() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let day_len = model.config.grid.day_length();
        let s = state_at(
            Activity::Depart,
            Location::Residence(a.home_zone),
            day_len as f64 - 0.5,
        );
        let d = Decision::Travel(Mode::Car, Location::NonFixed(None));
        let (_, hi) = space.anchor_times(&s, &d);
        assert_eq!(hi, day_len);
    }

    #[test]
    fn continue_anchors_are_consecutive_for_fractional_times() {
        let model = tiny_model();
        let world = model.full_world();
        let a = agent(None);
        let space = StateSpace::new(&model.config, &a, &world);
        let mut s = space.start_state();
        s.time = 4.25;
        let (lo, hi) = space.anchor_times(&s, &Decision::Continue);
        assert_eq!((lo, hi), (5, 6));
    }
}
