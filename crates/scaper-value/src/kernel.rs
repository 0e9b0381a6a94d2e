//! The interpolation kernel — the engine's hot inner loop.
//!
//! For every cell `i` of a utility accumulator, adds the linearly
//! interpolated expected value of the cell's next state:
//!
//! ```text
//! t   = min(time_i, DayLength)
//! idx = dest_offset_i + floor(t)
//! a   = t − floor(t);  b = 1 − a
//! u_i += b·ev[idx] + (a == 0 ? 0 : a·ev[idx+1])
//! ```
//!
//! The `a == 0` guard is load-bearing: the upper anchor may legitimately be
//! an unreachable `−∞` slot, and `0 · −∞` would poison the cell with NaN.
//!
//! The four (time × offset) uniformity combinations are dispatched once,
//! outside the loops, so each inner loop is branch-light and auto-vectorizes
//! with a scalar tail.  Bit-exactness between the specialized loops is not
//! promised — tests compare with ULP-level tolerance.

/// Per-cell or uniform next-state time.
#[derive(Copy, Clone, Debug)]
pub enum TimeSpec<'a> {
    Uniform(f64),
    PerCell(&'a [f64]),
}

/// Per-cell or uniform destination offset into the EV row.
#[derive(Copy, Clone, Debug)]
pub enum DestOffsets<'a> {
    Uniform(usize),
    PerCell(&'a [u32]),
}

/// Add interpolated expected values from `ev` into every cell of `u`.
///
/// # Panics
///
/// Panics (in debug) if a per-cell slice is shorter than `u`.
pub fn add_ev(u: &mut [f64], ev: &[f64], time: TimeSpec<'_>, offsets: DestOffsets<'_>, day_len: usize) {
    match (time, offsets) {
        (TimeSpec::Uniform(t), DestOffsets::Uniform(off)) => {
            let (idx, a, b) = split(t, day_len);
            let lower = ev[off + idx];
            let v = if a == 0.0 { lower } else { b * lower + a * ev[off + idx + 1] };
            for cell in u {
                *cell += v;
            }
        }

        (TimeSpec::Uniform(t), DestOffsets::PerCell(offs)) => {
            debug_assert!(offs.len() >= u.len());
            let (idx, a, b) = split(t, day_len);
            if a == 0.0 {
                for (cell, &off) in u.iter_mut().zip(offs) {
                    *cell += ev[off as usize + idx];
                }
            } else {
                for (cell, &off) in u.iter_mut().zip(offs) {
                    let base = off as usize + idx;
                    *cell += b * ev[base] + a * ev[base + 1];
                }
            }
        }

        (TimeSpec::PerCell(times), DestOffsets::Uniform(off)) => {
            debug_assert!(times.len() >= u.len());
            for (cell, &t) in u.iter_mut().zip(times) {
                let (idx, a, b) = split(t, day_len);
                let base = off + idx;
                let mut v = b * ev[base];
                if a != 0.0 {
                    v += a * ev[base + 1];
                }
                *cell += v;
            }
        }

        (TimeSpec::PerCell(times), DestOffsets::PerCell(offs)) => {
            debug_assert!(times.len() >= u.len());
            debug_assert!(offs.len() >= u.len());
            for ((cell, &t), &off) in u.iter_mut().zip(times).zip(offs) {
                let (idx, a, b) = split(t, day_len);
                let base = off as usize + idx;
                let mut v = b * ev[base];
                if a != 0.0 {
                    v += a * ev[base + 1];
                }
                *cell += v;
            }
        }
    }
}

/// Clamp to the day, split into (floor slot, upper weight, lower weight).
#[inline(always)]
fn split(t: f64, day_len: usize) -> (usize, f64, f64) {
    let t = t.min(day_len as f64);
    debug_assert!(t >= 0.0, "negative interpolation time {t}");
    let floor = t.floor();
    let a = t - floor;
    (floor as usize, a, 1.0 - a)
}
