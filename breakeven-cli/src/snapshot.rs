//! Snapshot and tick files read by the CLI.
//!
//! A snapshot is a TOML file with the symbol, the live quote, the open
//! positions and optionally the account the notifications are sent for:
//!
//! ```toml
//! symbol = "EURUSD"
//!
//! [quote]
//! bid = 1.1050
//! ask = 1.1052
//! pip_size = 0.0001
//! pip_value = 10.0
//! tick_size = 0.00001
//! digits = 5
//!
//! [[positions]]
//! id = 1
//! symbol = "EURUSD"
//! side = "long"
//! entry_price = 1.1000
//! volume = 1.0
//! gross_profit = 150.0
//! ```
//!
//! Tick files are CSV with a `timestamp,bid,ask` header and RFC 3339 times.

use breakeven_core::domain::{InstrumentQuote, Position};
use breakeven_core::engine::{DispatchStatus, EvaluationReport};
use breakeven_core::notify::AccountInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid quote: {0}")]
    Quote(#[from] breakeven_core::domain::QuoteError),
    #[error("tick file: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub symbol: String,
    pub quote: InstrumentQuote,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub account: AccountInfo,
}

impl SnapshotFile {
    pub fn from_file(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = toml::from_str(content)?;
        snapshot.quote.validate()?;
        Ok(snapshot)
    }
}

/// One market update from a tick file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
}

pub fn read_ticks(path: &Path) -> Result<Vec<Tick>, SnapshotError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut ticks = Vec::new();
    for row in reader.deserialize() {
        ticks.push(row?);
    }
    Ok(ticks)
}

/// Flat journal row, one per dispatched change.
#[derive(Debug, Serialize)]
struct JournalRow<'a> {
    at: DateTime<Utc>,
    symbol: &'a str,
    position_id: u64,
    side: &'static str,
    kind: &'static str,
    previous: f64,
    price: f64,
    status: &'static str,
    error: String,
}

/// CSV journal of every dispatch across one or more evaluations.
pub struct Journal {
    writer: csv::Writer<std::fs::File>,
}

impl Journal {
    pub fn create(path: &Path) -> Result<Self, SnapshotError> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }

    pub fn record(&mut self, report: &EvaluationReport) -> Result<(), SnapshotError> {
        for dispatch in &report.dispatches {
            let (status, error) = match &dispatch.status {
                DispatchStatus::Applied => ("applied", String::new()),
                DispatchStatus::Rejected { error } => ("rejected", error.to_string()),
            };
            self.writer.serialize(JournalRow {
                at: report.at,
                symbol: &report.symbol,
                position_id: dispatch.position_id.0,
                side: dispatch.side.label(),
                kind: dispatch.kind.short_name(),
                previous: dispatch.previous,
                price: dispatch.price,
                status,
                error,
            })?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), SnapshotError> {
        self.writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}
