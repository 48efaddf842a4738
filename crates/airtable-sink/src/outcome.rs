//! Per-record outcome log and its CSV report.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp format of the `datetime` report column.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Create,
    Update,
    Upsert,
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Create => "create",
            OutcomeStatus::Update => "update",
            OutcomeStatus::Upsert => "upsert",
            OutcomeStatus::Error => "error",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRow {
    pub timestamp: DateTime<Utc>,
    /// Remote record id, the source-supplied id, or `batch_<i>_row_<j>`.
    pub record_id: String,
    pub status: OutcomeStatus,
    pub message: String,
}

/// Append-only log of record outcomes for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutcomeLog {
    rows: Vec<OutcomeRow>,
}

#[derive(Serialize)]
struct Manifest<'a> {
    primary_key: [&'a str; 2],
    incremental: bool,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        record_id: impl Into<String>,
        status: OutcomeStatus,
        message: impl Into<String>,
    ) {
        self.rows.push(OutcomeRow {
            timestamp: Utc::now(),
            record_id: record_id.into(),
            status,
            message: message.into(),
        });
    }

    pub fn rows(&self) -> &[OutcomeRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows with the given status.
    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.rows.iter().filter(|r| r.status == status).count()
    }

    /// Write the log as CSV with a `datetime,record_id,status,message` header.
    pub fn write_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["datetime", "record_id", "status", "message"])?;
        for row in &self.rows {
            let timestamp = row.timestamp.format(TIMESTAMP_FORMAT).to_string();
            csv_writer.write_record([
                timestamp.as_str(),
                row.record_id.as_str(),
                row.status.as_str(),
                row.message.as_str(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write the report to `path` and its manifest next to it.
    ///
    /// The manifest declares `(record_id, datetime)` as the key and asks for
    /// incremental loading, so repeated runs accumulate history.
    pub fn write_report(&self, path: &Path) -> anyhow::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory {}", parent.display())
                })?;
            }
        }

        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create outcome report {}", path.display()))?;
        self.write_csv(file)
            .with_context(|| format!("Failed to write outcome report {}", path.display()))?;

        let mut manifest_path = path.as_os_str().to_owned();
        manifest_path.push(".manifest");
        let manifest_path = PathBuf::from(manifest_path);
        let manifest = Manifest {
            primary_key: ["record_id", "datetime"],
            incremental: true,
        };
        std::fs::write(&manifest_path, serde_json::to_vec(&manifest)?)
            .with_context(|| format!("Failed to write manifest {}", manifest_path.display()))?;

        tracing::info!(
            "Wrote {} outcome rows to {}",
            self.rows.len(),
            path.display()
        );
        Ok(manifest_path)
    }
}
