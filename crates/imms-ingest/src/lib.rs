//! Immunisation batch file ingestion.
//!
//! # Features
//!
//! - **Batch reading**: pipe-delimited CSV with the fixed 34-column header
//!   contract, checked in full before any row is returned
//! - **File keys**: vaccine type, supplier and timestamp from the file name
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use imms_ingest::{FileKey, OdsSupplierMap, read_batch_file};
//!
//! let key = FileKey::parse("FLU_Vaccinations_v5_YGM41_20240708T12130100.csv", &OdsSupplierMap::standard())?;
//! let batch = read_batch_file(Path::new("FLU_Vaccinations_v5_YGM41_20240708T12130100.csv"))?;
//! ```

mod error;
mod file_key;
mod reader;

// === Error Types ===
pub use error::{IngestError, Result};

// === Batch Reading ===
pub use reader::{CsvBatch, DELIMITER, read_batch, read_batch_file, validate_headers};

// === File Keys ===
pub use file_key::{FileKey, OdsSupplierMap, VALID_EXTENSIONS, VALID_VERSIONS, is_valid_timestamp};
