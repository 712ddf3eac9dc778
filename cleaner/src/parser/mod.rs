//! Comma-separated file reading and writing with encoding auto-detection.
//!
//! Reads CSV into a [`Dataset`] of raw text cells and writes a [`Dataset`]
//! back out with a header row and no index column. No job-specific logic here.

use chrono::NaiveTime;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{DatasetError, DatasetResult};
use crate::models::{Cell, Dataset};

/// Output format for columns holding only midnight timestamps.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Output format for columns holding at least one timestamp with a time part.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Markers read as a missing value, in addition to the empty field.
pub const NA_VALUES: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a raw field denotes a missing value (empty or a known NA marker).
pub fn is_na_value(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty() || NA_VALUES.contains(&s)
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub dataset: Dataset,
    /// Detected encoding
    pub encoding: String,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding, dropping any BOM.
pub fn decode_content(bytes: &[u8], encoding: &str) -> DatasetResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match String::from_utf8(bytes.to_vec()) {
            Ok(s) => s,
            Err(_) => String::from_utf8_lossy(bytes).to_string(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        other => encoding_rs::Encoding::for_label(other.as_bytes())
            .unwrap_or(encoding_rs::WINDOWS_1252)
            .decode(bytes)
            .0
            .to_string(),
    };

    Ok(decoded
        .strip_prefix('\u{feff}')
        .map(str::to_string)
        .unwrap_or(decoded))
}

/// Parse comma-separated data from a reader.
///
/// The first record is the header. Blank lines are skipped; rows whose width
/// differs from the header are an error. Each row keeps the physical line
/// its record starts on.
pub fn parse_csv<R: Read>(mut reader: R) -> DatasetResult<Dataset> {
    let mut source = Vec::new();
    reader.read_to_end(&mut source)?;

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .from_reader(source.as_slice());

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(DatasetError::EmptyFile);
    }

    let mut dataset = Dataset::new(headers);
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| record_line(&source, p));
        dataset.push_record(record.iter().map(Cell::from).collect(), line)?;
    }

    Ok(dataset)
}

/// First line of the record read from `pos`.
///
/// The reader reports where it resumed, which is before any blank lines it
/// skipped; those line breaks are counted here.
fn record_line(source: &[u8], pos: &csv::Position) -> usize {
    let skipped = source
        .get(pos.byte() as usize..)
        .unwrap_or_default()
        .iter()
        .take_while(|b| matches!(b, b'\r' | b'\n'))
        .filter(|b| **b == b'\n')
        .count();
    pos.line() as usize + skipped
}

/// Parse CSV bytes with encoding auto-detection.
///
/// Valid UTF-8 is taken as-is; detection only runs for other content.
pub fn parse_bytes(bytes: &[u8]) -> DatasetResult<ParseResult> {
    if bytes.is_empty() {
        return Err(DatasetError::EmptyFile);
    }
    let encoding = if std::str::from_utf8(bytes).is_ok() {
        "utf-8".to_string()
    } else {
        detect_encoding(bytes)
    };
    let content = decode_content(bytes, &encoding)?;
    let dataset = parse_csv(content.as_bytes())?;
    Ok(ParseResult { dataset, encoding })
}

/// Parse a CSV file with encoding auto-detection.
pub fn parse_csv_file<P: AsRef<Path>>(path: P) -> DatasetResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes)
}

/// Write a dataset as CSV: header row first, no index column.
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W) -> DatasetResult<()> {
    let formats = column_formats(dataset);
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(dataset.headers())?;
    for row in dataset.rows() {
        wtr.write_record(
            row.iter()
                .zip(&formats)
                .map(|(cell, format)| render_cell(cell, format)),
        )?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a dataset to a CSV file, replacing any existing file.
pub fn write_csv_file<P: AsRef<Path>>(dataset: &Dataset, path: P) -> DatasetResult<()> {
    let file = File::create(path.as_ref())?;
    write_csv(dataset, BufWriter::new(file))
}

/// Render a dataset to an in-memory CSV string.
pub fn to_csv_string(dataset: &Dataset) -> DatasetResult<String> {
    let mut buf = Vec::new();
    write_csv(dataset, &mut buf)?;
    String::from_utf8(buf).map_err(|e| DatasetError::Encoding(e.to_string()))
}

/// Pick the timestamp format of each column.
fn column_formats(dataset: &Dataset) -> Vec<&'static str> {
    (0..dataset.headers().len())
        .map(|idx| {
            let has_time = dataset.rows().iter().any(|row| match &row[idx] {
                Cell::Timestamp(ts) => ts.time() != NaiveTime::MIN,
                _ => false,
            });
            if has_time {
                DATETIME_FORMAT
            } else {
                DATE_FORMAT
            }
        })
        .collect()
}

fn render_cell(cell: &Cell, format: &str) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Timestamp(ts) => ts.format(format).to_string(),
        Cell::Null => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_na_markers() {
        for raw in ["", "  ", "NA", "N/A", "NULL", "null", "<NA>", "None", " nan "] {
            assert!(is_na_value(raw), "{:?} should be missing", raw);
        }
        for raw in ["0", "na", "none", "cheap"] {
            assert!(!is_na_value(raw), "{:?} should not be missing", raw);
        }
    }

    #[test]
    fn test_simple_csv() {
        let ds = parse_csv("id,price\n1,50\n2,150".as_bytes()).unwrap();

        assert_eq!(ds.headers(), &["id", "price"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[1][1], Cell::from("150"));
    }

    #[test]
    fn test_quoted_values_with_commas() {
        let csv = "id,name,price\n1,\"Cozy, quiet room\",80";
        let ds = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(ds.rows()[0][1], Cell::from("Cozy, quiet room"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let ds = parse_csv("a,b\n1,2\n\n3,4\n".as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_rows_keep_their_source_line() {
        let csv = "name,price\n\"two\nlines\",10\n\n\nx,20\n";
        let ds = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0][0], Cell::from("two\nlines"));
        assert_eq!(ds.line(0), 2);
        assert_eq!(ds.line(1), 6);
    }

    #[test]
    fn test_padded_headers_kept_verbatim() {
        let ds = parse_csv("id, price \n1,50\n".as_bytes()).unwrap();
        assert_eq!(ds.headers(), &["id", " price "]);
        assert_eq!(to_csv_string(&ds).unwrap(), "id, price \n1,50\n");
    }

    #[test]
    fn test_missing_values_kept_as_empty_text() {
        let ds = parse_csv("a,b,c\n1,,3".as_bytes()).unwrap();
        assert_eq!(ds.rows()[0][1], Cell::from(""));
    }

    #[test]
    fn test_ragged_row_is_error() {
        let err = parse_csv("a,b\n1,2,3".as_bytes()).unwrap_err();
        match err {
            DatasetError::Csv { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_bytes(b""), Err(DatasetError::EmptyFile)));
        assert!(matches!(
            parse_csv("".as_bytes()),
            Err(DatasetError::EmptyFile)
        ));
    }

    #[test]
    fn test_bom_is_stripped() {
        let bytes = "\u{feff}price,last_review\n10,2019-05-21".as_bytes();
        let result = parse_bytes(bytes).unwrap();
        assert_eq!(result.dataset.headers()[0], "price");
    }

    #[test]
    fn test_latin1_file_is_detected() {
        let mut bytes = b"name,price\nCaf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b",45\n");
        let result = parse_bytes(&bytes).unwrap();
        let name = result.dataset.rows()[0][0].as_text().unwrap().to_string();
        assert!(name.starts_with("Caf"));
        assert_eq!(result.dataset.rows()[0][1], Cell::from("45"));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_write_header_and_no_index() {
        let ds = parse_csv("id,price\n1,50".as_bytes()).unwrap();
        assert_eq!(to_csv_string(&ds).unwrap(), "id,price\n1,50\n");
    }

    #[test]
    fn test_write_quotes_and_nulls() {
        let mut ds = Dataset::new(vec!["name".into(), "last_review".into()]);
        ds.push_row(vec![Cell::from("Loft, Brooklyn"), Cell::Null]).unwrap();
        assert_eq!(
            to_csv_string(&ds).unwrap(),
            "name,last_review\n\"Loft, Brooklyn\",\n"
        );
    }

    #[test]
    fn test_timestamp_column_formats() {
        let midnight = NaiveDate::from_ymd_opt(2019, 5, 21)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let afternoon = NaiveDate::from_ymd_opt(2019, 6, 1)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap();

        let mut dates = Dataset::new(vec!["d".into()]);
        dates.push_row(vec![Cell::Timestamp(midnight)]).unwrap();
        assert_eq!(to_csv_string(&dates).unwrap(), "d\n2019-05-21\n");

        dates.push_row(vec![Cell::Timestamp(afternoon)]).unwrap();
        assert_eq!(
            to_csv_string(&dates).unwrap(),
            "d\n2019-05-21 00:00:00\n2019-06-01 13:45:00\n"
        );
    }
}
