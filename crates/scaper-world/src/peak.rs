//! Peak-period blending.
//!
//! # Design
//!
//! LOS tensors carry separate peak and off-peak blocks for congested modes.
//! The blend weight `proportion_peak(t)` is 1 inside a peak window, 0 well
//! outside it, and cosine-smoothed across a buffer on each side, so travel
//! times are C¹-continuous in departure time.  The AM and PM windows are
//! independent; between them the function returns to 0.

/// The AM/PM peak windows, in minutes since midnight.
#[derive(Copy, Clone, Debug)]
pub struct PeakPeriods {
    pub am_start_min: f64,
    pub am_end_min:   f64,
    pub pm_start_min: f64,
    pub pm_end_min:   f64,
    /// Width of the smoothing buffer on each side of each window.
    pub buffer_min: f64,
}

impl Default for PeakPeriods {
    /// AM 07:00–09:00, PM 16:00–18:00, 30-minute buffers.
    fn default() -> Self {
        Self {
            am_start_min: 7.0 * 60.0,
            am_end_min:   9.0 * 60.0,
            pm_start_min: 16.0 * 60.0,
            pm_end_min:   18.0 * 60.0,
            buffer_min:   30.0,
        }
    }
}

impl PeakPeriods {
    /// The peak share at `min_of_day`, in `[0, 1]`.
    pub fn proportion_peak(&self, min_of_day: f64) -> f64 {
        let am = window(self.am_start_min, self.am_end_min, self.buffer_min, min_of_day);
        let pm = window(self.pm_start_min, self.pm_end_min, self.buffer_min, min_of_day);
        am.max(pm)
    }
}

/// One peak window's contribution: 1 inside `[s, e]`, 0 outside
/// `[s − b, e + b]`, cosine half-cycles across the buffers.
fn window(s: f64, e: f64, b: f64, t: f64) -> f64 {
    if t <= s - b || t >= e + b {
        0.0
    } else if t >= s && t <= e {
        1.0
    } else if t < s {
        cos_smooth((t - (s - b)) / b)
    } else {
        cos_smooth(((e + b) - t) / b)
    }
}

/// `0.5·(1 − cos(πx))` on the unit interval: 0 at 0, 1 at 1, zero slope at
/// both ends.
#[inline]
fn cos_smooth(x: f64) -> f64 {
    0.5 * (1.0 - (std::f64::consts::PI * x).cos())
}
