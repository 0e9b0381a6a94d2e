//! The persisted run layout.
//!
//! ```text
//! models/<MODELFOLDER>/
//!   input/                zones.csv, network.csv, agents.csv, trips.csv, parameters.csv
//!   sim/YY-MM-DD/         <stem>-HHMMSS.csv
//!   cs/YY-MM-DD/          choicesets.csv, zonesamples.csv (timestamped dir)
//!   est/YY-MM-DD/         <stem>-HHMMSS.csv
//!   logs/YY-MM-DD/        <stem>-HHMMSS.log
//! ```

use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::IoResult;

/// The output family a file belongs to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RunKind {
    Sim,
    Choiceset,
    Estimate,
    Logs,
}

impl RunKind {
    fn dir_name(self) -> &'static str {
        match self {
            RunKind::Sim       => "sim",
            RunKind::Choiceset => "cs",
            RunKind::Estimate  => "est",
            RunKind::Logs      => "logs",
        }
    }
}

/// Resolves input and dated output paths under one model folder.
#[derive(Clone, Debug)]
pub struct RunLayout {
    model_dir: PathBuf,
    /// Timestamp fixed at construction so all of a run's files share it.
    stamp_date: String,
    stamp_time: String,
}

impl RunLayout {
    pub fn new(model_dir: &Path) -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self {
            model_dir: model_dir.to_path_buf(),
            stamp_date: format!(
                "{:02}-{:02}-{:02}",
                now.year() % 100,
                now.month() as u8,
                now.day()
            ),
            stamp_time: format!("{:02}{:02}{:02}", now.hour(), now.minute(), now.second()),
        }
    }

    /// The `input/` directory of this model.
    pub fn input_dir(&self) -> PathBuf {
        self.model_dir.join("input")
    }

    /// A dated, timestamped output file, creating its directories.
    pub fn output_file(&self, kind: RunKind, stem: &str, ext: &str) -> IoResult<PathBuf> {
        let dir = self.model_dir.join(kind.dir_name()).join(&self.stamp_date);
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(format!("{stem}-{}.{ext}", self.stamp_time)))
    }

    /// The dated output directory itself (choiceset runs write a file pair).
    pub fn output_dir(&self, kind: RunKind) -> IoResult<PathBuf> {
        let dir = self
            .model_dir
            .join(kind.dir_name())
            .join(&self.stamp_date)
            .join(&self.stamp_time);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
