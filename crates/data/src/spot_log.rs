use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

/// Timestamp layout of the first column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// One cycle's observation of the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotRecord {
    pub timestamp: NaiveDateTime,
    pub pool_id: String,
    pub spot_price: f64,
    /// Real-valued tick, before flooring.
    pub spot_tick: f64,
}

/// Aggregate view of a spot log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotSummary {
    pub pool_id: String,
    pub records: usize,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub min_price: f64,
    pub max_price: f64,
    pub min_tick: f64,
    pub max_tick: f64,
}

/// Append-only `timestamp, pool, price, tick` file.
#[derive(Debug, Clone)]
pub struct SpotLog {
    path: PathBuf,
}

impl SpotLog {
    /// # Errors
    ///
    /// Returns an error if `path` does not end with `.dat`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.extension().and_then(|e| e.to_str()) != Some("dat") {
            bail!("spot log must end with .dat: {}", path.display());
        }
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line, creating the file and its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append(&self, record: &SpotRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open spot log: {}", self.path.display()))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(&[
            record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            record.pool_id.clone(),
            record.spot_price.to_string(),
            record.spot_tick.to_string(),
        ])?;
        writer.flush()?;

        tracing::debug!(path = %self.path.display(), pool = %record.pool_id, "Spot record appended");
        Ok(())
    }

    /// Reads every record.
    ///
    /// Accepts both `a,b,c,d` and `a, b, c, d` separators.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, a line is malformed, or
    /// lines carry more than one pool id.
    pub fn read(&self) -> Result<Vec<SpotRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .trim(Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open spot log: {}", self.path.display()))?;

        let mut records: Vec<SpotRecord> = Vec::new();
        for (line, row) in reader.deserialize::<(String, String, f64, f64)>().enumerate() {
            let (timestamp, pool_id, spot_price, spot_tick) =
                row.with_context(|| format!("Malformed spot log line {}", line + 1))?;
            let timestamp = NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT)
                .with_context(|| format!("Bad timestamp '{timestamp}' on line {}", line + 1))?;

            if let Some(first) = records.first() {
                if first.pool_id != pool_id {
                    bail!(
                        "Pool ID mismatch on line {}: expected {}, found {} (one pool per file)",
                        line + 1,
                        first.pool_id,
                        pool_id
                    );
                }
            }

            records.push(SpotRecord {
                timestamp,
                pool_id,
                spot_price,
                spot_tick,
            });
        }
        Ok(records)
    }

    /// # Errors
    ///
    /// Returns an error if the log is unreadable, invalid, or empty.
    pub fn summary(&self) -> Result<SpotSummary> {
        let records = self.read()?;
        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            bail!("spot log is empty: {}", self.path.display());
        };

        let mut summary = SpotSummary {
            pool_id: first.pool_id.clone(),
            records: records.len(),
            first: first.timestamp,
            last: last.timestamp,
            min_price: f64::INFINITY,
            max_price: f64::NEG_INFINITY,
            min_tick: f64::INFINITY,
            max_tick: f64::NEG_INFINITY,
        };
        for record in &records {
            summary.min_price = summary.min_price.min(record.spot_price);
            summary.max_price = summary.max_price.max(record.spot_price);
            summary.min_tick = summary.min_tick.min(record.spot_tick);
            summary.max_tick = summary.max_tick.max(record.spot_tick);
        }
        Ok(summary)
    }
}
