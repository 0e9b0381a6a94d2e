//! `scaper-world` — the per-agent view of zonal and network data.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                     |
//! |-------------|--------------------------------------------------------------|
//! | [`zones`]   | `ZoneTable` — population, employment, parking columns        |
//! | [`network`] | `LosTables` — per-mode, per-period OD tensors + extrema      |
//! | [`peak`]    | `PeakPeriods` — C¹ cosine-smoothed peak blending             |
//! | [`sample`]  | Zone importance sampling and correction matrices             |
//! | [`world`]   | `World` — the full or sampled view consumed by the engine    |
//! | [`error`]   | `WorldError`, `WorldResult`                                  |
//!
//! # Full vs sampled worlds
//!
//! A full [`World`] borrows the immutable model tensors directly; zone index
//! and `ZoneId` coincide.  A sampled world gathers the rows/columns of a
//! small zone subset into pooled buffers and carries a correction matrix
//! `C[o,d] = −ln(N·p[d])` that keeps downstream likelihoods unbiased.  Both
//! answer the same queries; the engine never branches on which kind it has.

pub mod error;
pub mod network;
pub mod peak;
pub mod sample;
pub mod world;
pub mod zones;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

#[cfg(test)]
mod tests;

pub use error::{WorldError, WorldResult};
pub use network::{Extrema, LosBlock, LosTables, Quantity, N_PERIODS, OFF_PEAK, PEAK};
pub use peak::PeakPeriods;
pub use sample::{correction_matrix, sample_zones, sampling_probs};
pub use world::{Axis, Model, World, ZoneAxis};
pub use zones::ZoneTable;
