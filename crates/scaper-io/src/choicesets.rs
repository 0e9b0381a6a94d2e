//! Flat choiceset (de)serialization.
//!
//! Two CSV files per run:
//!
//! - `choicesets.csv` — one row per trip of every alternative:
//!   `person,alternative,seq,class,activity,mode,origin,dest,depart_steps,correction`.
//!   Alternatives without trips (the stayed-home day) still get one marker
//!   row with `seq = -1` so their correction survives the round trip.
//!   Departures are stored as exact timestep reals — the HH:MM truncation of
//!   the human-readable outputs would break path replay.
//! - `zonesamples.csv` — one row per sampled zone slot:
//!   `person,slot,zone`.  Agents generated on the full-zone world have no
//!   rows here.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use scaper_core::{Activity, Mode, PersonId, ZoneId};
use scaper_sim::{Alternative, Choiceset, Trip};

use crate::{IoError, IoResult};

/// The file pair of one choiceset run.
#[derive(Clone, Debug)]
pub struct ChoicesetFiles {
    pub choicesets: PathBuf,
    pub zone_samples: PathBuf,
}

impl ChoicesetFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            choicesets: dir.join("choicesets.csv"),
            zone_samples: dir.join("zonesamples.csv"),
        }
    }
}

// ── Writing ───────────────────────────────────────────────────────────────────

/// Serialize choicesets to the file pair.
pub fn write_choicesets_csv(files: &ChoicesetFiles, sets: &[Choiceset]) -> IoResult<()> {
    let mut cs_writer = csv::Writer::from_path(&files.choicesets)?;
    cs_writer.write_record([
        "person",
        "alternative",
        "seq",
        "class",
        "activity",
        "mode",
        "origin",
        "dest",
        "depart_steps",
        "correction",
    ])?;

    let mut zone_writer = csv::Writer::from_path(&files.zone_samples)?;
    zone_writer.write_record(["person", "slot", "zone"])?;

    for cs in sets {
        for (slot, zone) in cs.zones.iter().enumerate() {
            zone_writer.write_record(&[
                cs.person.0.to_string(),
                slot.to_string(),
                zone.0.to_string(),
            ])?;
        }
        for (a, alternative) in cs.alternatives.iter().enumerate() {
            if alternative.trips.is_empty() {
                cs_writer.write_record(&[
                    cs.person.0.to_string(),
                    a.to_string(),
                    "-1".to_string(),
                    "0".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    format!("{}", alternative.correction),
                ])?;
                continue;
            }
            for (seq, trip) in alternative.trips.iter().enumerate() {
                cs_writer.write_record(&[
                    cs.person.0.to_string(),
                    a.to_string(),
                    seq.to_string(),
                    trip.class.to_string(),
                    trip.activity.as_str().to_string(),
                    trip.mode.as_str().to_string(),
                    trip.origin.0.to_string(),
                    trip.dest.0.to_string(),
                    format!("{}", trip.depart_time),
                    format!("{}", alternative.correction),
                ])?;
            }
        }
    }

    cs_writer.flush()?;
    zone_writer.flush()?;
    Ok(())
}

// ── Reading ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChoicesetRecord {
    person: u32,
    alternative: usize,
    seq: i64,
    class: Option<usize>,
    activity: Option<String>,
    mode: Option<String>,
    origin: Option<u32>,
    dest: Option<u32>,
    depart_steps: Option<f64>,
    correction: f64,
}

#[derive(Deserialize)]
struct ZoneSampleRecord {
    person: u32,
    slot: usize,
    zone: u32,
}

/// Deserialize the file pair back into [`Choiceset`]s.
pub fn load_choicesets_csv(files: &ChoicesetFiles) -> IoResult<Vec<Choiceset>> {
    load_choicesets_readers(
        std::fs::File::open(&files.choicesets)?,
        std::fs::File::open(&files.zone_samples)?,
    )
}

/// Reader-based variant for tests.
pub fn load_choicesets_readers<R1: Read, R2: Read>(
    choicesets: R1,
    zone_samples: R2,
) -> IoResult<Vec<Choiceset>> {
    // person → slot-ordered zone sample.
    let mut zones: BTreeMap<u32, Vec<(usize, ZoneId)>> = BTreeMap::new();
    let mut rdr = csv::Reader::from_reader(zone_samples);
    for record in rdr.deserialize::<ZoneSampleRecord>() {
        let row = record.map_err(|e| IoError::InputFormat(format!("zonesamples: {e}")))?;
        zones.entry(row.person).or_default().push((row.slot, ZoneId(row.zone)));
    }
    for sample in zones.values_mut() {
        sample.sort_by_key(|(slot, _)| *slot);
    }

    // person → alternative → (trips, correction).
    let mut sets: BTreeMap<u32, BTreeMap<usize, Alternative>> = BTreeMap::new();
    let mut rdr = csv::Reader::from_reader(choicesets);
    for record in rdr.deserialize::<ChoicesetRecord>() {
        let row = record.map_err(|e| IoError::InputFormat(format!("choicesets: {e}")))?;
        let alternative = sets
            .entry(row.person)
            .or_default()
            .entry(row.alternative)
            .or_insert_with(|| Alternative { trips: Vec::new(), correction: row.correction });
        alternative.correction = row.correction;
        if row.seq < 0 {
            continue; // trip-less marker row
        }
        let parse = |field: &str, value: Option<&str>| -> IoResult<String> {
            value
                .map(str::to_string)
                .ok_or_else(|| IoError::InputFormat(format!("choicesets: missing {field}")))
        };
        let activity = parse("activity", row.activity.as_deref())?;
        let mode = parse("mode", row.mode.as_deref())?;
        alternative.trips.push(Trip {
            person: PersonId(row.person),
            class: row.class.unwrap_or(0),
            activity: Activity::from_str(&activity).ok_or_else(|| {
                IoError::InputFormat(format!("choicesets: unknown activity '{activity}'"))
            })?,
            mode: Mode::from_str(&mode).ok_or_else(|| {
                IoError::InputFormat(format!("choicesets: unknown mode '{mode}'"))
            })?,
            origin: ZoneId(row.origin.ok_or_else(|| {
                IoError::InputFormat("choicesets: missing origin".into())
            })?),
            dest: ZoneId(row.dest.ok_or_else(|| {
                IoError::InputFormat("choicesets: missing dest".into())
            })?),
            depart_time: row.depart_steps.ok_or_else(|| {
                IoError::InputFormat("choicesets: missing depart_steps".into())
            })?,
        });
    }

    Ok(sets
        .into_iter()
        .map(|(person, alternatives)| Choiceset {
            person: PersonId(person),
            zones: zones
                .remove(&person)
                .map(|sample| sample.into_iter().map(|(_, z)| z).collect())
                .unwrap_or_default(),
            alternatives: alternatives.into_values().collect(),
        })
        .collect())
}
