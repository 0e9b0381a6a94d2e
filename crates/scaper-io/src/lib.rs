//! `scaper-io` — the loader and sink collaborators.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                |
//! |----------------|---------------------------------------------------------|
//! | [`loader`]     | zones, network, agents, trips, parameter CSV loaders    |
//! | [`choicesets`] | flat (de)serialization of choiceset records             |
//! | [`sink`]       | trip CSV sink (mutex-shareable), estimate output        |
//! | [`parquet`]    | Parquet trip sink (feature `parquet`)                   |
//! | [`layout`]     | `models/<folder>/{input,sim,cs,est,logs}` run layout    |
//! | [`error`]      | `IoError`, `IoResult`                                   |
//!
//! All loaders take a `Read` so tests feed them `std::io::Cursor`s; the
//! `_csv` variants open files.  Malformed input is a fatal `InputFormat`
//! error at startup, never a warning.

pub mod choicesets;
pub mod error;
pub mod layout;
pub mod loader;
pub mod sink;

#[cfg(feature = "parquet")]
pub mod parquet;


pub use choicesets::{load_choicesets_csv, write_choicesets_csv, ChoicesetFiles};
pub use error::{IoError, IoResult};
pub use layout::{RunKind, RunLayout};
pub use loader::{
    load_agents_reader, load_network_reader, load_params_reader, load_trips_reader,
    load_zones_reader, InputFiles,
};
pub use sink::{EstimateWriter, SharedTripSink, TripCsvWriter, TripRow};

#[cfg(feature = "parquet")]
pub use parquet::TripParquetWriter;
