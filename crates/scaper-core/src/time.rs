//! The day's discrete time model.
//!
//! # Design
//!
//! Time-of-day is measured in **timesteps since DayStart** and may be
//! fractional: travel consumes its exact LOS duration, while waiting
//! decisions advance by whole decision steps.  The expected-value cache is
//! keyed at integral timesteps only; fractional times are handled by linear
//! interpolation between the bracketing integers.
//!
//! A `TimeGrid` is cheap to copy and holds no heap data.

use std::fmt;

/// The discrete time grid of one simulated day.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeGrid {
    /// Hour of day at which the model day begins (e.g. 5 = 05:00).
    pub day_start_hour: u32,
    /// Hour of day at which the model day ends (e.g. 23 = 23:00).
    pub day_end_hour: u32,
    /// Minutes per timestep (e.g. 10.0).
    pub timestep_mins: f64,
    /// Minimum advance of a `Continue`/`Start` decision, in whole timesteps.
    pub decision_steps: u32,
}

impl Default for TimeGrid {
    /// 05:00–23:00 at 10-minute steps, one timestep per decision.
    fn default() -> Self {
        Self {
            day_start_hour: 5,
            day_end_hour:   23,
            timestep_mins:  10.0,
            decision_steps: 1,
        }
    }
}

impl TimeGrid {
    /// Number of whole timesteps in the day (`DayEnd` in timestep units).
    #[inline]
    pub fn day_length(&self) -> u32 {
        let mins = (self.day_end_hour - self.day_start_hour) as f64 * 60.0;
        (mins / self.timestep_mins) as u32
    }

    /// Convert minutes to (possibly fractional) timesteps.
    #[inline]
    pub fn steps_of_mins(&self, mins: f64) -> f64 {
        mins / self.timestep_mins
    }

    /// Minutes since midnight for a time-of-day in timesteps since DayStart.
    #[inline]
    pub fn mins_of_day(&self, t: f64) -> f64 {
        self.day_start_hour as f64 * 60.0 + t * self.timestep_mins
    }

    /// The time advance of a waiting decision at time `t`: a full decision
    /// step, clipped so the day boundary is hit exactly.
    #[inline]
    pub fn decision_step(&self, t: f64) -> f64 {
        (self.decision_steps as f64).min(self.day_length() as f64 - t)
    }

    /// Fractional part of a non-negative time.
    ///
    /// Times are non-negative by construction (they advance monotonically
    /// from DayStart); a negative input is a bug upstream.
    #[inline]
    pub fn frac(t: f64) -> f64 {
        debug_assert!(t >= 0.0, "negative time-of-day: {t}");
        t - t.floor()
    }

    /// `true` when `t` lies exactly on the day-end boundary.
    #[inline]
    pub fn at_day_end(&self, t: f64) -> bool {
        t == self.day_length() as f64
    }

    /// Snap a time within rounding distance of DayEnd onto it exactly.
    ///
    /// `t + (DayEnd − t)` can round one ulp away from DayEnd; transitions
    /// snap so the end-of-day classification sees the boundary exactly.
    #[inline]
    pub fn snap(&self, t: f64) -> f64 {
        let end = self.day_length() as f64;
        if t != end && (t - end).abs() < 1e-9 { end } else { t }
    }

    /// Format a time-of-day as `HH:MM`, truncated to the minute.
    pub fn hhmm(&self, t: f64) -> String {
        let mins = self.mins_of_day(t).max(0.0) as u64;
        format!("{:02}:{:02}", (mins / 60) % 24, mins % 60)
    }

    /// Parse `HH:MM` into timesteps since DayStart.
    ///
    /// Returns `None` on malformed input or times before DayStart.
    pub fn parse_hhmm(&self, s: &str) -> Option<f64> {
        let (h, m) = s.split_once(':')?;
        let h: u32 = h.parse().ok()?;
        let m: u32 = m.parse().ok()?;
        if m >= 60 {
            return None;
        }
        let mins = (h * 60 + m) as f64 - self.day_start_hour as f64 * 60.0;
        if mins < 0.0 {
            return None;
        }
        Some(self.steps_of_mins(mins))
    }
}

impl fmt::Display for TimeGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:00-{:02}:00 @ {} min ({} steps)",
            self.day_start_hour,
            self.day_end_hour,
            self.timestep_mins,
            self.day_length()
        )
    }
}
