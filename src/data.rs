//! Data loading and management
//!
//! Loads the premarket gap-statistics CSV into a date-indexed table, loads
//! recorded tick files for replay, and can fetch the gapper dataset over
//! HTTP. All consumers see a uniform "records for a date" slice whether the
//! date has one row or many.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use crate::{GapperRecord, Symbol, Tick};

/// Raw CSV row as published in the gapper dataset
#[derive(Debug, Deserialize)]
struct GapperRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "GAP%")]
    gap_percent: f64,
    #[serde(rename = "Premarket High")]
    premarket_high: f64,
    #[serde(rename = "Outstanding Shares", default)]
    outstanding_shares: Option<f64>,
    #[serde(rename = "Market Cap", default)]
    market_cap: Option<f64>,
}

impl From<GapperRow> for GapperRecord {
    fn from(row: GapperRow) -> Self {
        GapperRecord {
            date: row.date,
            symbol: Symbol::new(row.symbol),
            gap_percent: row.gap_percent,
            premarket_high: row.premarket_high,
            outstanding_shares: row.outstanding_shares,
            market_cap: row.market_cap,
        }
    }
}

/// Gap-statistics table indexed by date. Read-only after load.
#[derive(Debug, Default, Clone)]
pub struct GapperTable {
    by_date: BTreeMap<NaiveDate, Vec<GapperRecord>>,
}

impl GapperTable {
    /// Load the table from a CSV file
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open gapper CSV {}", path.display()))?;

        let mut records = Vec::new();
        for (i, row) in reader.deserialize::<GapperRow>().enumerate() {
            match row {
                Ok(row) => records.push(GapperRecord::from(row)),
                // A malformed row loses one candidate, not the whole table
                Err(e) => warn!(row = i + 2, error = %e, "Skipping malformed gapper row"),
            }
        }

        let table = Self::from_records(records);
        info!(
            rows = table.len(),
            dates = table.by_date.len(),
            path = %path.display(),
            "Loaded gapper table"
        );
        Ok(table)
    }

    pub fn from_records(records: impl IntoIterator<Item = GapperRecord>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<GapperRecord>> = BTreeMap::new();
        for record in records {
            by_date.entry(record.date).or_default().push(record);
        }
        GapperTable { by_date }
    }

    /// All records for a date; empty slice when the date is absent.
    /// A missing date is an ordinary no-candidates day, not an error.
    pub fn records_for(&self, date: NaiveDate) -> &[GapperRecord] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

/// Download the gapper dataset to a local file
pub fn download_gappers(url: &str, dest: impl AsRef<Path>) -> Result<()> {
    let dest = dest.as_ref();
    info!(url, dest = %dest.display(), "Downloading gapper dataset");

    let body = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()
        .context("Gapper dataset request failed")?
        .text()
        .context("Failed to read gapper dataset body")?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut file = File::create(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    file.write_all(body.as_bytes())
        .with_context(|| format!("Failed to write {}", dest.display()))?;

    info!(bytes = body.len(), "Gapper dataset saved");
    Ok(())
}

// =============================================================================
// Recorded ticks (replay input)
// =============================================================================

/// One recorded price observation: `datetime,symbol,price`
#[derive(Debug, Deserialize)]
struct TickRow {
    datetime: NaiveDateTime,
    symbol: String,
    price: f64,
}

/// A tick paired with the symbol it belongs to
#[derive(Debug, Clone)]
pub struct SymbolTick {
    pub symbol: Symbol,
    pub tick: Tick,
}

/// Load a recorded tick file, sorted by timestamp
pub fn load_ticks(path: impl AsRef<Path>) -> Result<Vec<SymbolTick>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open tick CSV {}", path.display()))?;

    let mut ticks = Vec::new();
    for (i, row) in reader.deserialize::<TickRow>().enumerate() {
        let row = row.with_context(|| format!("Malformed tick row {}", i + 2))?;
        ticks.push(SymbolTick {
            symbol: Symbol::new(row.symbol),
            tick: Tick {
                datetime: row.datetime,
                price: row.price,
            },
        });
    }
    ticks.sort_by_key(|t| t.tick.datetime);

    info!(ticks = ticks.len(), path = %path.display(), "Loaded tick file");
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, symbol: &str, gap: f64, pmh: f64) -> GapperRecord {
        GapperRecord {
            date: date.parse().unwrap(),
            symbol: Symbol::new(symbol),
            gap_percent: gap,
            premarket_high: pmh,
            outstanding_shares: None,
            market_cap: None,
        }
    }

    #[test]
    fn test_records_for_missing_date_is_empty() {
        let table = GapperTable::from_records([record("2021-01-04", "ABCD", 10.0, 20.0)]);
        let missing = NaiveDate::from_ymd_opt(2021, 1, 5).unwrap();
        assert!(table.records_for(missing).is_empty());
    }

    #[test]
    fn test_multiple_records_share_a_date() {
        let table = GapperTable::from_records([
            record("2021-01-04", "ABCD", 10.0, 20.0),
            record("2021-01-04", "EFGH", 12.0, 25.0),
            record("2021-01-05", "IJKL", 8.0, 15.0),
        ]);
        let date = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        assert_eq!(table.records_for(date).len(), 2);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_csv_parsing_with_optional_columns() {
        let csv_data = "\
Date,Symbol,GAP%,Premarket High,Outstanding Shares,Market Cap
2021-01-04,ABCD,10.5,20.0,15000000,18000000
2021-01-04,EFGH,7.2,12.5,,
";
        let dir = std::env::temp_dir().join("premarket_breakout_test_gappers");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gappers.csv");
        std::fs::write(&path, csv_data).unwrap();

        let table = GapperTable::load_csv(&path).unwrap();
        let date = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        let records = table.records_for(date);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outstanding_shares, Some(15_000_000.0));
        assert_eq!(records[1].outstanding_shares, None);
        assert_eq!(records[1].gap_percent, 7.2);
    }
}
