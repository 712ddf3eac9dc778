//! The cleaning transformation: price-range filter, then date normalization.

use serde::Serialize;

use super::dates::{normalize_dates, DateStats};
use super::filter::{filter_range, PriceRange};
use crate::error::DatasetResult;
use crate::models::Dataset;

/// Numeric column filtered by the price range.
pub const PRICE_COLUMN: &str = "price";

/// Date column re-typed to timestamps.
pub const LAST_REVIEW_COLUMN: &str = "last_review";

/// Columns the cleaning step cannot run without.
pub const REQUIRED_COLUMNS: &[&str] = &[PRICE_COLUMN, LAST_REVIEW_COLUMN];

/// Row and value counts from one cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanStats {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub dropped_rows: usize,
    pub parsed_dates: usize,
    pub missing_dates: usize,
    pub invalid_dates: usize,
}

/// Cleaned dataset and its statistics.
#[derive(Debug, Clone)]
pub struct CleanResult {
    pub dataset: Dataset,
    pub stats: CleanStats,
}

/// Check the required columns right after load.
pub fn validate_columns(dataset: &Dataset) -> DatasetResult<()> {
    dataset.require_columns(REQUIRED_COLUMNS)
}

/// Drop rows outside `range`, then normalize `last_review`.
///
/// The output holds a subset of the input rows in their original order,
/// with exactly the input's columns.
pub fn clean_dataset(dataset: &Dataset, range: PriceRange) -> DatasetResult<CleanResult> {
    validate_columns(dataset)?;

    let mut cleaned = filter_range(dataset, PRICE_COLUMN, range)?;
    let DateStats { parsed, missing, invalid } = normalize_dates(&mut cleaned, LAST_REVIEW_COLUMN)?;

    let stats = CleanStats {
        input_rows: dataset.len(),
        kept_rows: cleaned.len(),
        dropped_rows: dataset.len() - cleaned.len(),
        parsed_dates: parsed,
        missing_dates: missing,
        invalid_dates: invalid,
    };

    Ok(CleanResult { dataset: cleaned, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatasetError;
    use crate::models::Cell;
    use crate::parser::{parse_csv, to_csv_string};

    const LISTINGS: &str = "\
id,name,price,last_review,reviews_per_month
1,Skylit Midtown Castle,50,2019-05-21,0.38
2,Cozy Entire Floor,150,2019-05-21,4.64
3,THE VILLAGE OF HARLEM,300,not-a-date,
";

    #[test]
    fn test_end_to_end_price_window() {
        let ds = parse_csv(LISTINGS.as_bytes()).unwrap();
        let result = clean_dataset(&ds, PriceRange::new(100.0, 200.0)).unwrap();

        assert_eq!(result.dataset.len(), 1);
        assert_eq!(result.dataset.rows()[0][0], Cell::from("2"));
        assert_eq!(result.stats.dropped_rows, 2);
        assert_eq!(
            to_csv_string(&result.dataset).unwrap(),
            "id,name,price,last_review,reviews_per_month\n2,Cozy Entire Floor,150,2019-05-21,4.64\n"
        );
    }

    #[test]
    fn test_unparsable_date_becomes_null() {
        let ds = parse_csv(LISTINGS.as_bytes()).unwrap();
        let result = clean_dataset(&ds, PriceRange::new(0.0, 1000.0)).unwrap();

        let dates: Vec<&Cell> = result.dataset.column(LAST_REVIEW_COLUMN).unwrap().collect();
        assert!(matches!(dates[0], Cell::Timestamp(_)));
        assert!(dates[2].is_null());
        assert_eq!(result.stats.invalid_dates, 1);
        assert!(to_csv_string(&result.dataset).unwrap().ends_with("300,,\n"));
    }

    #[test]
    fn test_column_set_is_preserved() {
        let ds = parse_csv(LISTINGS.as_bytes()).unwrap();
        let result = clean_dataset(&ds, PriceRange::new(500.0, 100.0)).unwrap();

        assert!(result.dataset.is_empty());
        assert_eq!(result.dataset.headers(), ds.headers());
    }

    #[test]
    fn test_na_prices_are_dropped_not_fatal() {
        let csv = "id,price,last_review\n1,150,2019-05-21\n2,NA,2019-06-01\n3,N/A,\n";
        let ds = parse_csv(csv.as_bytes()).unwrap();
        let result = clean_dataset(&ds, PriceRange::new(100.0, 200.0)).unwrap();

        assert_eq!(result.dataset.len(), 1);
        assert_eq!(result.dataset.rows()[0][0], Cell::from("1"));
        assert_eq!(result.stats.dropped_rows, 2);
    }

    #[test]
    fn test_missing_required_column_fails_fast() {
        let ds = parse_csv("id,price\n1,10\n".as_bytes()).unwrap();
        match clean_dataset(&ds, PriceRange::new(0.0, 100.0)) {
            Err(DatasetError::MissingColumn(c)) => assert_eq!(c, LAST_REVIEW_COLUMN),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_repeatable_output() {
        let ds = parse_csv(LISTINGS.as_bytes()).unwrap();
        let a = clean_dataset(&ds, PriceRange::new(0.0, 200.0)).unwrap();
        let b = clean_dataset(&ds, PriceRange::new(0.0, 200.0)).unwrap();
        assert_eq!(
            to_csv_string(&a.dataset).unwrap(),
            to_csv_string(&b.dataset).unwrap()
        );
    }
}
