//! Transformation module.
//!
//! - Filter: static-bounds range filter on a numeric column
//! - Dates: date column normalization
//! - Clean: the two steps combined, with statistics

pub mod clean;
pub mod dates;
pub mod filter;

pub use clean::*;
pub use dates::{normalize_cell, normalize_dates, parse_datetime, DateStats};
pub use filter::{filter_range, parse_number, PriceRange};
