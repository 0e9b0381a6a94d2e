//! CSV input loaders.
//!
//! # File formats
//!
//! **zones.csv** — one row per zone, file order defines `ZoneId`:
//!
//! ```csv
//! population,employment,parking_per_hour
//! 1200,400,1.5
//! ```
//!
//! **network.csv** — one row per (origin, dest, mode), sorted by origin then
//! destination within each mode block; peak and off-peak quantities side by
//! side.  Walk/bike rows repeat their values in the peak columns:
//!
//! ```csv
//! origin,dest,mode,time_peak,time_off,wait_peak,wait_off,access_peak,access_off,cost_peak,cost_off
//! 0,0,Car,8.2,6.5,0,0,0,0,0.4,0.4
//! ```
//!
//! **agents.csv** — one row per agent; empty `work_zone`/`work_duration`
//! mean none:
//!
//! ```csv
//! id,age,female,income,has_kids,home_zone,work_zone,owns_car,transit_card,weight,work_duration
//! 1,43,0,32000,1,12,45,1,0,1.0,48
//! ```
//!
//! **trips.csv** — observed trips, groupable by agent id, `HH:MM` departure:
//!
//! ```csv
//! id,activity,mode,origin,dest,departure
//! 1,Work,Car,12,45,07:40
//! ```
//!
//! **parameters.csv** — `parameter,value,estimate`; an `nClasses` row sets
//! the latent-class count (default 1 when absent).

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use scaper_core::{
    Activity, Agent, AgentSet, Mode, Param, ParamSet, PersonId, TimeGrid, ZoneId, N_MODES,
};
use scaper_sim::Trip;
use scaper_world::network::{LosBlock, LosTables, N_PERIODS, OFF_PEAK, PEAK};
use scaper_world::ZoneTable;

use crate::{IoError, IoResult};

// ── Input file set ────────────────────────────────────────────────────────────

/// The canonical input file names under `models/<folder>/input/`.
#[derive(Clone, Debug)]
pub struct InputFiles {
    pub zones: PathBuf,
    pub network: PathBuf,
    pub agents: PathBuf,
    pub trips: PathBuf,
    pub parameters: PathBuf,
}

impl InputFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            zones: dir.join("zones.csv"),
            network: dir.join("network.csv"),
            agents: dir.join("agents.csv"),
            trips: dir.join("trips.csv"),
            parameters: dir.join("parameters.csv"),
        }
    }
}

fn open(path: &Path) -> IoResult<std::fs::File> {
    std::fs::File::open(path).map_err(|e| {
        IoError::InputFormat(format!("cannot open {}: {e}", path.display()))
    })
}

// ── Zones ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ZoneRecord {
    population: f64,
    employment: f64,
    parking_per_hour: f64,
}

/// Load the zone table; file order defines the zone index.
pub fn load_zones_reader<R: Read>(reader: R) -> IoResult<ZoneTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut population = Vec::new();
    let mut employment = Vec::new();
    let mut parking = Vec::new();
    for record in rdr.deserialize::<ZoneRecord>() {
        let row = record.map_err(|e| IoError::InputFormat(format!("zones: {e}")))?;
        population.push(row.population);
        employment.push(row.employment);
        parking.push(row.parking_per_hour);
    }
    if population.is_empty() {
        return Err(IoError::InputFormat("zones: no rows".into()));
    }
    Ok(ZoneTable::new(population, employment, parking))
}

pub fn load_zones_csv(path: &Path) -> IoResult<ZoneTable> {
    load_zones_reader(open(path)?)
}

// ── Network ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NetworkRecord {
    origin: u32,
    dest: u32,
    mode: String,
    time_peak: f64,
    time_off: f64,
    wait_peak: f64,
    wait_off: f64,
    access_peak: f64,
    access_off: f64,
    cost_peak: f64,
    cost_off: f64,
}

/// Load the LOS tensors for `n_zones` zones.
///
/// Every mode must cover all `n²` OD pairs, sorted by origin then
/// destination; anything else is an `InputFormat` error.
pub fn load_network_reader<R: Read>(reader: R, n_zones: usize) -> IoResult<LosTables> {
    let n = n_zones;
    let mut blocks: Vec<LosBlock> = (0..N_MODES * N_PERIODS)
        .map(|_| LosBlock {
            time: vec![f64::NAN; n * n],
            wait: vec![f64::NAN; n * n],
            access: vec![f64::NAN; n * n],
            cost: vec![f64::NAN; n * n],
        })
        .collect();

    let mut last_seen: Vec<Option<(u32, u32)>> = vec![None; N_MODES];
    let mut counts = vec![0usize; N_MODES];

    let mut rdr = csv::Reader::from_reader(reader);
    for record in rdr.deserialize::<NetworkRecord>() {
        let row = record.map_err(|e| IoError::InputFormat(format!("network: {e}")))?;
        let mode = Mode::from_str(&row.mode)
            .ok_or_else(|| IoError::InputFormat(format!("network: unknown mode '{}'", row.mode)))?;
        let m = mode.index();
        if row.origin as usize >= n || row.dest as usize >= n {
            return Err(IoError::InputFormat(format!(
                "network: zone pair ({}, {}) outside the {n}-zone table",
                row.origin, row.dest
            )));
        }
        if let Some(prev) = last_seen[m] {
            if (row.origin, row.dest) <= prev {
                return Err(IoError::InputFormat(format!(
                    "network: rows for mode {mode} not sorted at ({}, {})",
                    row.origin, row.dest
                )));
            }
        }
        last_seen[m] = Some((row.origin, row.dest));
        counts[m] += 1;

        let cell = row.origin as usize * n + row.dest as usize;
        let peak = &mut blocks[m * N_PERIODS + PEAK];
        peak.time[cell] = row.time_peak;
        peak.wait[cell] = row.wait_peak;
        peak.access[cell] = row.access_peak;
        peak.cost[cell] = row.cost_peak;
        let off = &mut blocks[m * N_PERIODS + OFF_PEAK];
        off.time[cell] = row.time_off;
        off.wait[cell] = row.wait_off;
        off.access[cell] = row.access_off;
        off.cost[cell] = row.cost_off;
    }

    for mode in Mode::ALL {
        if counts[mode.index()] != n * n {
            return Err(IoError::InputFormat(format!(
                "network: mode {mode} has {} of {} OD rows",
                counts[mode.index()],
                n * n
            )));
        }
    }

    Ok(LosTables::new(n, blocks))
}

pub fn load_network_csv(path: &Path, n_zones: usize) -> IoResult<LosTables> {
    load_network_reader(open(path)?, n_zones)
}

// ── Agents ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AgentRecord {
    id: u32,
    age: f64,
    female: u8,
    income: f64,
    has_kids: u8,
    home_zone: u32,
    work_zone: Option<u32>,
    owns_car: u8,
    transit_card: u8,
    weight: f64,
    work_duration: Option<u32>,
}

pub fn load_agents_reader<R: Read>(reader: R, n_zones: usize) -> IoResult<AgentSet> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut agents = Vec::new();
    for record in rdr.deserialize::<AgentRecord>() {
        let row = record.map_err(|e| IoError::InputFormat(format!("agents: {e}")))?;
        let check = |zone: u32| -> IoResult<ZoneId> {
            if (zone as usize) < n_zones {
                Ok(ZoneId(zone))
            } else {
                Err(IoError::InputFormat(format!(
                    "agents: agent {} references zone {zone} outside the table",
                    row.id
                )))
            }
        };
        agents.push(Agent {
            id: PersonId(row.id),
            age: row.age,
            female: row.female != 0,
            income: row.income,
            has_kids: row.has_kids != 0,
            home_zone: check(row.home_zone)?,
            work_zone: row.work_zone.map(check).transpose()?,
            owns_car: row.owns_car != 0,
            transit_card: row.transit_card != 0,
            weight: row.weight,
            work_duration: row.work_duration,
        });
    }
    if agents.is_empty() {
        return Err(IoError::InputFormat("agents: no rows".into()));
    }
    Ok(AgentSet::new(agents))
}

pub fn load_agents_csv(path: &Path, n_zones: usize) -> IoResult<AgentSet> {
    load_agents_reader(open(path)?, n_zones)
}

// ── Observed trips ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TripRecord {
    id: u32,
    activity: String,
    mode: String,
    origin: u32,
    dest: u32,
    departure: String,
}

/// Load observed trips, grouped per agent and sorted by departure.
pub fn load_trips_reader<R: Read>(
    reader: R,
    grid: &TimeGrid,
) -> IoResult<BTreeMap<PersonId, Vec<Trip>>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut by_person: BTreeMap<PersonId, Vec<Trip>> = BTreeMap::new();
    for record in rdr.deserialize::<TripRecord>() {
        let row = record.map_err(|e| IoError::InputFormat(format!("trips: {e}")))?;
        let activity = Activity::from_str(&row.activity).ok_or_else(|| {
            IoError::InputFormat(format!("trips: unknown activity '{}'", row.activity))
        })?;
        let mode = Mode::from_str(&row.mode)
            .ok_or_else(|| IoError::InputFormat(format!("trips: unknown mode '{}'", row.mode)))?;
        let depart_time = grid.parse_hhmm(&row.departure).ok_or_else(|| {
            IoError::InputFormat(format!("trips: bad departure '{}'", row.departure))
        })?;
        by_person.entry(PersonId(row.id)).or_default().push(Trip {
            person: PersonId(row.id),
            class: 0,
            activity,
            mode,
            origin: ZoneId(row.origin),
            dest: ZoneId(row.dest),
            depart_time,
        });
    }
    for trips in by_person.values_mut() {
        trips.sort_by(|a, b| a.depart_time.total_cmp(&b.depart_time));
    }
    Ok(by_person)
}

pub fn load_trips_csv(path: &Path, grid: &TimeGrid) -> IoResult<BTreeMap<PersonId, Vec<Trip>>> {
    load_trips_reader(open(path)?, grid)
}

// ── Parameters ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ParamRecord {
    parameter: String,
    value: f64,
    estimate: u8,
}

/// Load the parameter table.  The `nClasses` row (conventionally first)
/// sets the latent-class count; absent means one class.
pub fn load_params_reader<R: Read>(reader: R) -> IoResult<ParamSet> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut params = BTreeMap::new();
    let mut n_classes = 1usize;
    for record in rdr.deserialize::<ParamRecord>() {
        let row = record.map_err(|e| IoError::InputFormat(format!("parameters: {e}")))?;
        if row.parameter == "nClasses" {
            n_classes = row.value as usize;
            continue;
        }
        params.insert(
            row.parameter,
            Param { value: row.value, estimate: row.estimate != 0 },
        );
    }
    Ok(ParamSet::new(params, n_classes))
}

pub fn load_params_csv(path: &Path) -> IoResult<ParamSet> {
    load_params_reader(open(path)?)
}
