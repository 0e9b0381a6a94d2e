//! `scaper-mat` — broadcast-shaped utility matrices.
//!
//! # Design
//!
//! Utility accumulation over a state space with an "all zones" dimension
//! needs four logical shapes: a scalar, a destination-keyed row, an
//! origin-keyed column, and a full origin × destination matrix.  A [`Mat`]
//! carries its shape plus a lazy scalar factor, so peak/off-peak LOS
//! blending can be expressed as two borrowed matrices with scales `p` and
//! `1 − p` without copying anything.
//!
//! Accumulators are rented from a [`MatPool`] and returned after use; the
//! engine's inner loops never allocate.
//!
//! Shape mismatches in the broadcast rules are programmer errors and panic.

pub mod mat;
pub mod pool;
pub mod shape;


pub use mat::Mat;
pub use pool::{BufPool, MatPool};
pub use shape::Shape;
