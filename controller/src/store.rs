//! Persist handshake records as JSON.

use crate::{
    record::{now, HandshakeRecord},
    Error,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf};
use tokio::fs;
use tracing::warn;

/// Number of records copied into the debug dump.
pub const DEBUG_RECORDS: usize = 5;

/// Snapshot of the newest records, written next to the report.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DebugDump {
    pub timestamp: String,
    pub total_records: usize,
    pub last_5_records: Vec<HandshakeRecord>,
}

/// A capped JSON report of handshake records.
#[derive(Clone, Debug)]
pub struct Store {
    report: PathBuf,
    debug_dump: PathBuf,
    max_records: usize,
}

impl Store {
    pub fn new(report: PathBuf, debug_dump: PathBuf, max_records: usize) -> Self {
        Self {
            report,
            debug_dump,
            max_records,
        }
    }

    pub fn report(&self) -> &Path {
        &self.report
    }

    /// Load the persisted history.
    ///
    /// A missing, empty, or corrupt report yields an empty history.
    pub async fn load(&self) -> Vec<HandshakeRecord> {
        match read_records(&self.report).await {
            Ok(records) => records,
            Err(err) => {
                warn!(path = ?self.report, error = ?err, "discarding unreadable report");
                Vec::new()
            }
        }
    }

    /// Keep the newest `max_records` of `records`, then write the report and the debug dump.
    pub async fn save(&self, records: &mut Vec<HandshakeRecord>) -> Result<(), Error> {
        if records.len() > self.max_records {
            records.drain(..records.len() - self.max_records);
        }
        write_json(&self.report, records).await?;

        let dump = DebugDump {
            timestamp: now(),
            total_records: records.len(),
            last_5_records: records[records.len().saturating_sub(DEBUG_RECORDS)..].to_vec(),
        };
        write_json(&self.debug_dump, &dump).await
    }
}

/// Read a JSON array of records, treating a missing or empty file as no records.
pub async fn read_records(path: &Path) -> Result<Vec<HandshakeRecord>, Error> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await?;
    Ok(())
}
