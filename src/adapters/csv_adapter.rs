//! CSV file bar source.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, with the header
//! `timestamp,open,high,low,close,volume`.

use crate::domain::error::ReplayError;
use crate::domain::event::DataEvent;
use crate::ports::data_port::BarSource;
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs;
use std::io;
use std::path::PathBuf;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

/// Accepts a full timestamp or a bare date (midnight).
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ReplayError> {
    let value = value.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT) {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ReplayError::Data {
            reason: format!("invalid timestamp '{}'", value),
        })
}

fn number(record: &StringRecord, index: usize, column: &str) -> Result<f64, ReplayError> {
    record
        .get(index)
        .ok_or_else(|| ReplayError::Data {
            reason: format!("missing {} column", column),
        })?
        .trim()
        .parse()
        .map_err(|e| ReplayError::Data {
            reason: format!("invalid {} value: {}", column, e),
        })
}

impl BarSource for CsvAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<DataEvent>, ReplayError> {
        let path = self.csv_path(symbol);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ReplayError::Data {
                    reason: format!("no file {}", path.display()),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| ReplayError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let timestamp_str = record.get(0).ok_or_else(|| ReplayError::Data {
                reason: "missing timestamp column".into(),
            })?;

            bars.push(DataEvent {
                symbol: symbol.to_string(),
                timestamp: parse_timestamp(timestamp_str)?,
                open: number(&record, 1, "open")?,
                high: number(&record, 2, "high")?,
                low: number(&record, 3, "low")?,
                close: number(&record, 4, "close")?,
                volume: number(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}
