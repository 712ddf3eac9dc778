//! Static-bounds row filter on a numeric column.

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};
use crate::models::{Cell, Dataset};
use crate::parser::is_na_value;

/// Closed interval `[min, max]`; both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Inclusive membership. A reversed range contains nothing; NaN is never inside.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Parse a numeric cell. Empty cells and NA markers (`NA`, `N/A`, `NULL`, ...)
/// are missing (`None`), not errors.
pub fn parse_number(cell: &Cell) -> Result<Option<f64>, String> {
    match cell {
        Cell::Null => Ok(None),
        Cell::Timestamp(ts) => Err(ts.to_string()),
        Cell::Text(raw) => {
            if is_na_value(raw) {
                return Ok(None);
            }
            raw.trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| raw.clone())
        }
    }
}

/// Keep the rows whose `column` value lies within `range`, in source order.
///
/// Returns a new dataset; `dataset` itself is untouched. Rows with a missing
/// value are dropped. A non-numeric value is an error naming its source line.
pub fn filter_range(dataset: &Dataset, column: &str, range: PriceRange) -> DatasetResult<Dataset> {
    let idx = dataset.require_column(column)?;

    dataset.filter_rows(|i, row| match parse_number(&row[idx]) {
        Ok(Some(value)) => Ok(range.contains(value)),
        Ok(None) => Ok(false),
        Err(value) => Err(DatasetError::InvalidNumber {
            line: dataset.line(i),
            column: column.to_string(),
            value,
        }),
    })
}
