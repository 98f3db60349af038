use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// One finished game, as written to the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: DateTime<Local>,
    pub game: String,
    pub outcome: String,
    pub score: u32,
    pub hints: u32,
    pub time_remaining: u32,
}

/// Append-only CSV log of finished games.
#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // If the log doesn't exist yet we need to emit a header
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush()?;
        Ok(())
    }

    /// All entries, newest first. A missing log is empty.
    pub fn read(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let entries = reader
            .deserialize()
            .collect::<Result<Vec<HistoryEntry>, _>>()?;
        Ok(entries
            .into_iter()
            .sorted_by(|a, b| b.date.cmp(&a.date))
            .collect())
    }

    /// Best score per game.
    pub fn best_scores(&self) -> Result<Vec<(String, u32)>, HistoryError> {
        Ok(self
            .read()?
            .into_iter()
            .into_grouping_map_by(|e| e.game.clone())
            .max_by_key(|_, e| e.score)
            .into_iter()
            .map(|(game, e)| (game, e.score))
            .sorted()
            .collect())
    }
}
