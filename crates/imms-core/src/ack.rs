//! Business acknowledgment file.
//!
//! One pipe-delimited line per input row, in input order, telling the
//! supplier whether the row was accepted.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use imms_model::OutcomeRecord;
use tracing::info;

use crate::error::SinkError;
use crate::ports::OutcomeSink;

pub const ACK_HEADERS: [&str; 14] = [
    "MESSAGE_HEADER_ID",
    "HEADER_RESPONSE_CODE",
    "ISSUE_SEVERITY",
    "ISSUE_CODE",
    "ISSUE_DETAILS_CODE",
    "RESPONSE_TYPE",
    "RESPONSE_CODE",
    "RESPONSE_DISPLAY",
    "RECEIVED_TIME",
    "MAILBOX_FROM",
    "LOCAL_ID",
    "IMMS_ID",
    "OPERATION_OUTCOME",
    "MESSAGE_DELIVERY",
];

const UNHANDLED_ERROR: &str = "An unhandled error occurred during batch processing";

/// `<file stem>_BusAck_<created_at>.csv`
pub fn ack_file_name(file_key: &str, created_at: &str) -> String {
    let stem = file_key.rsplit_once('.').map_or(file_key, |(stem, _)| stem);
    format!("{stem}_BusAck_{created_at}.csv")
}

/// One line of the acknowledgment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckRow {
    pub message_header_id: String,
    pub header_response_code: &'static str,
    pub issue_severity: &'static str,
    pub issue_code: &'static str,
    pub issue_details_code: &'static str,
    pub response_type: &'static str,
    pub response_code: &'static str,
    pub response_display: &'static str,
    pub received_time: String,
    pub mailbox_from: String,
    pub local_id: String,
    pub imms_id: String,
    pub operation_outcome: String,
    pub message_delivery: bool,
}

impl AckRow {
    pub fn from_record(record: &OutcomeRecord) -> Self {
        let success = record.is_success();
        let operation_outcome = match &record.diagnostics {
            None if success => String::new(),
            Some(diagnostics) if diagnostics.status_code != 500 => {
                single_line(&diagnostics.error_message)
            }
            _ => UNHANDLED_ERROR.to_string(),
        };
        let (header_response_code, issue_severity, issue_code, details, display) = if success {
            ("OK", "Information", "OK", "30001", "Success")
        } else {
            (
                "Fatal Error",
                "Fatal",
                "Fatal Error",
                "30002",
                "Business Level Response Value - Processing Error",
            )
        };
        Self {
            message_header_id: record.row_id.clone(),
            header_response_code,
            issue_severity,
            issue_code,
            issue_details_code: details,
            response_type: "Business",
            response_code: details,
            response_display: display,
            received_time: record.created_at_formatted_string.clone(),
            mailbox_from: String::new(),
            local_id: record.local_id.clone(),
            imms_id: String::new(),
            operation_outcome,
            message_delivery: success,
        }
    }

    fn fields(&self) -> [&str; 14] {
        [
            self.message_header_id.as_str(),
            self.header_response_code,
            self.issue_severity,
            self.issue_code,
            self.issue_details_code,
            self.response_type,
            self.response_code,
            self.response_display,
            self.received_time.as_str(),
            self.mailbox_from.as_str(),
            self.local_id.as_str(),
            self.imms_id.as_str(),
            self.operation_outcome.as_str(),
            if self.message_delivery { "True" } else { "False" },
        ]
    }
}

/// Collapse any run of whitespace (including line breaks) to one space.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sink writing acknowledgment lines to any writer.
pub struct AckFileSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
    path: Option<PathBuf>,
}

impl<W: Write> AckFileSink<W> {
    /// Start an acknowledgment file; the header line is written at once.
    pub fn new(writer: W) -> Result<Self, SinkError> {
        let mut writer = WriterBuilder::new()
            .delimiter(b'|')
            .has_headers(false)
            .from_writer(writer);
        writer.write_record(ACK_HEADERS)?;
        Ok(Self {
            writer,
            rows: 0,
            path: None,
        })
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// File path, when writing to disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer.into_inner().map_err(|err| SinkError::Io {
            source: err.into_error(),
        })
    }
}

impl AckFileSink<BufWriter<File>> {
    /// Create `<dir>/<ack file name>` for `file_key`.
    pub fn create(dir: &Path, file_key: &str, created_at: &str) -> Result<Self, SinkError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(ack_file_name(file_key, created_at));
        let file = File::create(&path)?;
        let mut sink = Self::new(BufWriter::new(file))?;
        sink.path = Some(path);
        Ok(sink)
    }
}

impl<W: Write> OutcomeSink for AckFileSink<W> {
    fn publish(&mut self, record: &OutcomeRecord) -> Result<(), SinkError> {
        self.writer.write_record(AckRow::from_record(record).fields())?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        if let Some(path) = &self.path {
            info!(path = %path.display(), rows = self.rows, "acknowledgment file written");
        }
        Ok(())
    }
}
