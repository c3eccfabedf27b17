//! Pipe-delimited batch file reading.
//!
//! The whole file is checked for structure (header contract, field counts,
//! CSV syntax) before any row is handed out, so a malformed file never
//! produces partial row outcomes.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord};
use imms_model::CsvRow;
use imms_model::columns::EXPECTED_HEADERS;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Field delimiter of batch files.
pub const DELIMITER: u8 = b'|';

/// A structurally valid batch: the header line and every data row.
#[derive(Debug, Clone)]
pub struct CsvBatch {
    headers: Arc<[String]>,
    rows: Vec<CsvRow>,
}

impl CsvBatch {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[CsvRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<CsvRow> {
        self.rows
    }
}

impl IntoIterator for CsvBatch {
    type Item = CsvRow;
    type IntoIter = std::vec::IntoIter<CsvRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Check a header line against the expected batch file headers.
///
/// Names must match exactly and in order.
pub fn validate_headers<S: AsRef<str>>(headers: &[S]) -> Result<()> {
    if headers.len() != EXPECTED_HEADERS.len() {
        return Err(IngestError::HeaderCount {
            expected: EXPECTED_HEADERS.len(),
            found: headers.len(),
        });
    }
    for (idx, (found, expected)) in headers.iter().zip(EXPECTED_HEADERS).enumerate() {
        if found.as_ref() != expected {
            return Err(IngestError::HeaderMismatch {
                column: idx + 1,
                expected,
                found: found.as_ref().to_string(),
            });
        }
    }
    Ok(())
}

/// Read and structurally validate a batch from any byte source.
pub fn read_batch<R: Read>(source: R) -> Result<CsvBatch> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let header_record = reader.headers()?.clone();
    if header_record.is_empty() || is_blank(&header_record) {
        return Err(IngestError::EmptyFile);
    }
    let headers: Vec<String> = header_record
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if idx == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name.to_string()
            }
        })
        .collect();
    validate_headers(&headers)?;
    let headers: Arc<[String]> = headers.into();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(IngestError::ColumnCount {
                line: record.position().map_or(0, csv::Position::line),
                expected: headers.len(),
                found: record.len(),
            });
        }
        let values = record.iter().map(str::to_string).collect();
        rows.push(CsvRow::new(rows.len(), Arc::clone(&headers), values));
    }

    debug!(rows = rows.len(), "batch file read");
    Ok(CsvBatch { headers, rows })
}

/// Read and structurally validate a batch file from disk.
pub fn read_batch_file(path: &Path) -> Result<CsvBatch> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    read_batch(file)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_line() -> String {
        EXPECTED_HEADERS.join("|")
    }

    fn data_line(unique_id: &str) -> String {
        let mut values = vec![""; EXPECTED_HEADERS.len()];
        values[9] = unique_id;
        values.join("|")
    }

    #[test]
    fn reads_rows_in_order() {
        let content = format!(
            "{}\n{}\n{}\n",
            header_line(),
            data_line("A"),
            data_line("B")
        );
        let batch = read_batch(content.as_bytes()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows()[0].get("UNIQUE_ID"), Some("A"));
        assert_eq!(batch.rows()[1].get("UNIQUE_ID"), Some("B"));
        assert_eq!(batch.rows()[1].index(), 1);
    }

    #[test]
    fn strips_utf8_bom() {
        let content = format!("\u{feff}{}\n{}\n", header_line(), data_line("A"));
        let batch = read_batch(content.as_bytes()).unwrap();
        assert_eq!(batch.headers()[0], "NHS_NUMBER");
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let batch = read_batch(header_line().as_bytes()).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = read_batch("".as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::EmptyFile));
    }

    #[test]
    fn reordered_headers_are_rejected() {
        let mut headers = EXPECTED_HEADERS.to_vec();
        headers.swap(0, 1);
        let err = validate_headers(&headers).unwrap_err();
        assert!(matches!(
            err,
            IngestError::HeaderMismatch {
                column: 1,
                expected: "NHS_NUMBER",
                ..
            }
        ));
    }

    #[test]
    fn lower_case_headers_are_rejected() {
        let headers: Vec<String> = EXPECTED_HEADERS
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();
        assert!(validate_headers(&headers).is_err());
    }

    #[test]
    fn short_data_line_aborts() {
        let content = format!("{}\n{}\nA|B\n", header_line(), data_line("A"));
        let err = read_batch(content.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::ColumnCount {
                line: 3,
                expected: 34,
                found: 2
            }
        ));
    }
}
