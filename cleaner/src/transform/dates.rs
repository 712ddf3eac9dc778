//! Date column normalization.
//!
//! Unparsable values become [`Cell::Null`]; they never abort the job.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::DatasetResult;
use crate::models::{Cell, Dataset};
use crate::parser::is_na_value;

/// Date-only layouts, tried in order.
const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// Date-time layouts, tried in order.
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Counts from one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateStats {
    /// Values turned into timestamps (or already timestamps).
    pub parsed: usize,
    /// Empty values and NA markers.
    pub missing: usize,
    /// Other values that did not parse.
    pub invalid: usize,
}

/// Parse a date or date-time string. Offsets are converted to UTC.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, layout) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Convert one cell to a timestamp or null.
pub fn normalize_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(raw) => parse_datetime(raw).map(Cell::Timestamp).unwrap_or(Cell::Null),
        other => other.clone(),
    }
}

/// Re-type `column` in place to timestamps.
pub fn normalize_dates(dataset: &mut Dataset, column: &str) -> DatasetResult<DateStats> {
    let idx = dataset.require_column(column)?;
    let mut stats = DateStats::default();

    dataset.map_column(idx, |cell| {
        let normalized = normalize_cell(cell);
        match (cell, &normalized) {
            (_, Cell::Timestamp(_)) => stats.parsed += 1,
            (Cell::Text(raw), Cell::Null) if !is_na_value(raw) => stats.invalid += 1,
            _ => stats.missing += 1,
        }
        normalized
    });

    Ok(stats)
}
