//! File-based ingestion tests.

use std::fs;

use imms_ingest::{IngestError, read_batch_file};
use imms_model::columns::EXPECTED_HEADERS;

fn write_batch(dir: &tempfile::TempDir, name: &str, lines: &[String]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn data_line(values: &[(usize, &str)]) -> String {
    let mut fields = vec![String::new(); EXPECTED_HEADERS.len()];
    for (idx, value) in values {
        fields[*idx] = (*value).to_string();
    }
    fields.join("|")
}

#[test]
fn reads_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_batch(
        &dir,
        "FLU_Vaccinations_v5_YGM41_20240708T12130100.csv",
        &[
            EXPECTED_HEADERS.join("|"),
            data_line(&[(9, "ID-1"), (11, "NEW")]),
            data_line(&[(9, "ID-2"), (11, "DELETE")]),
        ],
    );

    let batch = read_batch_file(&path).unwrap();
    assert_eq!(batch.len(), 2);
    let flags: Vec<_> = batch
        .rows()
        .iter()
        .map(|row| row.get("ACTION_FLAG").unwrap_or_default())
        .collect();
    assert_eq!(flags, vec!["NEW", "DELETE"]);
}

#[test]
fn quoted_fields_may_contain_delimiters() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_batch(
        &dir,
        "batch.csv",
        &[
            EXPECTED_HEADERS.join("|"),
            data_line(&[(1, "\"SARAH|JANE\""), (9, "ID-1")]),
        ],
    );

    let batch = read_batch_file(&path).unwrap();
    assert_eq!(batch.rows()[0].get("PERSON_FORENAME"), Some("SARAH|JANE"));
}

#[test]
fn missing_file_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.csv");
    let err = read_batch_file(&path).unwrap_err();
    assert!(matches!(err, IngestError::FileNotFound { path: p } if p == path));
}

#[test]
fn comma_delimited_file_fails_header_contract() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_batch(
        &dir,
        "batch.csv",
        &[EXPECTED_HEADERS.join(","), "a,b,c".to_string()],
    );
    let err = read_batch_file(&path).unwrap_err();
    assert!(matches!(
        err,
        IngestError::HeaderCount {
            expected: 34,
            found: 1
        }
    ));
}
