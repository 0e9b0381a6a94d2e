//! Output sinks.
//!
//! Worker threads funnel their per-agent results through a mutex-guarded
//! sink ([`SharedTripSink`]); a producer must never hold more than one sink
//! lock at a time.  File-level times are truncated to the minute; the
//! internal representation stays exact.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use csv::Writer;

use scaper_core::TimeGrid;
use scaper_sim::Trip;
use scaper_world::World;

use crate::IoResult;

// ── TripRow ───────────────────────────────────────────────────────────────────

/// One flattened output row of the simulation format.
#[derive(Clone, Debug)]
pub struct TripRow {
    pub person: u32,
    pub latent_class: usize,
    pub activity: String,
    pub mode: String,
    pub origin: u32,
    pub dest: u32,
    pub departure: String,
    /// Whole minutes.
    pub travel_mins: u32,
    pub arrival: String,
}

impl TripRow {
    /// Flatten a trip, deriving travel and arrival times from LOS.
    pub fn from_trip(trip: &Trip, grid: &TimeGrid, world: &World<'_>) -> TripRow {
        let o = world.require_index(trip.origin);
        let d = world.require_index(trip.dest);
        let mins = world.door_to_door_mins(trip.mode, o, d, trip.depart_time);
        let arrival = trip.depart_time + grid.steps_of_mins(mins);
        TripRow {
            person: trip.person.0,
            latent_class: trip.class,
            activity: trip.activity.as_str().to_string(),
            mode: trip.mode.as_str().to_string(),
            origin: trip.origin.0,
            dest: trip.dest.0,
            departure: grid.hhmm(trip.depart_time),
            travel_mins: mins as u32,
            arrival: grid.hhmm(arrival),
        }
    }
}

// ── TripCsvWriter ─────────────────────────────────────────────────────────────

/// CSV sink for the simulation output format.
pub struct TripCsvWriter {
    writer: Writer<File>,
}

impl TripCsvWriter {
    pub fn create(path: &Path) -> IoResult<Self> {
        let mut writer = Writer::from_path(path)?;
        writer.write_record([
            "IndID",
            "LatentClass",
            "Activity",
            "Mode",
            "Origin",
            "Destination",
            "DepartureTime",
            "TravelTime",
            "ArrivalTime",
        ])?;
        Ok(Self { writer })
    }

    pub fn write_row(&mut self, row: &TripRow) -> IoResult<()> {
        self.writer.write_record(&[
            row.person.to_string(),
            row.latent_class.to_string(),
            row.activity.clone(),
            row.mode.clone(),
            row.origin.to_string(),
            row.dest.to_string(),
            row.departure.clone(),
            row.travel_mins.to_string(),
            row.arrival.clone(),
        ])?;
        Ok(())
    }

    pub fn finish(&mut self) -> IoResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

// ── SharedTripSink ────────────────────────────────────────────────────────────

/// Mutex wrapper letting Rayon workers append batches concurrently.
///
/// Output order across agents is unspecified; rows of one batch stay
/// together.
pub struct SharedTripSink {
    inner: Mutex<TripCsvWriter>,
}

impl SharedTripSink {
    pub fn new(writer: TripCsvWriter) -> Self {
        Self { inner: Mutex::new(writer) }
    }

    pub fn append(&self, rows: &[TripRow]) -> IoResult<()> {
        let mut writer = self.inner.lock().unwrap();
        for row in rows {
            writer.write_row(row)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> TripCsvWriter {
        self.inner.into_inner().unwrap()
    }
}

// ── EstimateWriter ────────────────────────────────────────────────────────────

/// CSV sink for estimation results: one row per parameter.
pub struct EstimateWriter {
    writer: Writer<File>,
}

impl EstimateWriter {
    pub fn create(path: &Path) -> IoResult<Self> {
        let mut writer = Writer::from_path(path)?;
        writer.write_record(["parameter", "value", "std_err", "estimate"])?;
        Ok(Self { writer })
    }

    /// Write the estimated parameters with their standard errors, then every
    /// fixed parameter with an empty error column.
    pub fn write_results(
        &mut self,
        params: &scaper_core::ParamSet,
        names: &[String],
        theta: &[f64],
        std_errors: &[f64],
    ) -> IoResult<()> {
        for ((name, value), err) in names.iter().zip(theta).zip(std_errors) {
            self.writer.write_record(&[
                name.clone(),
                format!("{value}"),
                format!("{err}"),
                "1".to_string(),
            ])?;
        }
        for (name, param) in params.iter() {
            if !param.estimate {
                self.writer.write_record(&[
                    name.to_string(),
                    format!("{}", param.value),
                    String::new(),
                    "0".to_string(),
                ])?;
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) -> IoResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
