//! Batch pipeline: permissions once per batch, then validate, classify and
//! convert every row, publishing one outcome record per row in input order.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use imms_ingest::{CsvBatch, FileKey, read_batch, validate_headers};
use imms_model::columns::{self, ACTION_FLAG, UNIQUE_ID, UNIQUE_ID_URI};
use imms_model::{
    ActionFlag, CsvRow, Diagnostics, FailureReason, Operation, OutcomeRecord, PermissionSet,
    RejectionKind, RowOutcome, VaccineType,
};
use imms_validate::{ProcedureCodeTable, RecordValidator};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, info_span, warn};

use crate::classify::classify;
use crate::config::DEFAULT_LOOKUP_TIMEOUT_MS;
use crate::error::{ConversionError, LookupError, PipelineError, Result};
use crate::fhir::convert_to_immunization;
use crate::permissions::resolve_permission_set;
use crate::ports::{OutcomeSink, PermissionLookup};

/// Length of a message id derived from file contents.
pub const MESSAGE_ID_LENGTH: usize = 16;

/// Message id for a batch: leading hex digits of the SHA-256 of its bytes.
pub fn message_id_for(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(MESSAGE_ID_LENGTH);
    digest
}

/// Identity of the batch being processed, stamped on every outcome record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    pub message_id: String,
    pub file_key: String,
    pub supplier: String,
    pub created_at: String,
    /// Vaccine type declared by the file; rows for other vaccines are rejected.
    pub vaccine_type: Option<VaccineType>,
}

impl BatchContext {
    pub fn new(
        message_id: impl Into<String>,
        file_key: impl Into<String>,
        supplier: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            file_key: file_key.into(),
            supplier: supplier.into(),
            created_at: Utc::now().format("%Y%m%dT%H%M%S00").to_string(),
            vaccine_type: None,
        }
    }

    /// Context taken from a parsed file key.
    pub fn from_file_key(key: &FileKey, message_id: impl Into<String>) -> Self {
        Self::new(message_id, key.as_str(), key.supplier.clone())
            .with_created_at(key.timestamp.clone())
            .with_vaccine_type(Some(key.vaccine_type))
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    #[must_use]
    pub fn with_vaccine_type(mut self, vaccine_type: Option<VaccineType>) -> Self {
        self.vaccine_type = vaccine_type;
        self
    }

    /// `<message_id>#<row number>`
    pub fn row_id(&self, row: &CsvRow) -> String {
        format!("{}#{}", self.message_id, row.row_number())
    }
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub accepted_by_operation: BTreeMap<Operation, usize>,
    /// Keyed by diagnostics error type, e.g. `NO_PERMISSIONS`.
    pub rejected_by_kind: BTreeMap<&'static str, usize>,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &RowOutcome) {
        self.total += 1;
        match outcome {
            RowOutcome::Accepted { operation, .. } => {
                self.accepted += 1;
                *self.accepted_by_operation.entry(*operation).or_default() += 1;
            }
            RowOutcome::Rejected { kind, .. } => {
                self.rejected += 1;
                *self.rejected_by_kind.entry(kind.error_type()).or_default() += 1;
            }
        }
    }

    /// True when every row was accepted.
    pub fn all_accepted(&self) -> bool {
        self.rejected == 0
    }
}

/// Processes batches against a permission lookup.
///
/// The lookup is injected by the caller and may be shared between
/// pipelines; each batch resolves its own permission snapshot. Lookups run
/// on a worker thread so the batch never waits longer than the timeout.
#[derive(Debug, Clone)]
pub struct BatchPipeline<L> {
    lookup: Arc<L>,
    validator: RecordValidator,
    lookup_timeout: Duration,
}

impl<L: PermissionLookup + 'static> BatchPipeline<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup: Arc::new(lookup),
            validator: RecordValidator::default(),
            lookup_timeout: Duration::from_millis(DEFAULT_LOOKUP_TIMEOUT_MS),
        }
    }

    #[must_use]
    pub fn with_procedure_codes(mut self, procedure_codes: ProcedureCodeTable) -> Self {
        self.validator = RecordValidator::new(procedure_codes);
        self
    }

    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    /// Resolve the supplier's permission snapshot for one batch.
    ///
    /// Returns [`LookupError::Timeout`] as soon as the timeout expires; a
    /// lookup still running at that point is abandoned.
    pub fn resolve_permissions(&self, supplier: &str) -> Result<PermissionSet> {
        let started = Instant::now();
        let permission_strings = self.lookup_with_deadline(supplier).map_err(|source| {
            error!(supplier, error = %source, "permission lookup failed");
            PipelineError::PermissionLookup {
                supplier: supplier.to_string(),
                source,
            }
        })?;

        let permissions = resolve_permission_set(permission_strings.as_slice());
        info!(
            supplier,
            permission_count = permission_strings.len(),
            vaccine_count = permissions.vaccines().count(),
            duration_ms = started.elapsed().as_millis(),
            "permissions resolved"
        );
        Ok(permissions)
    }

    fn lookup_with_deadline(
        &self,
        supplier: &str,
    ) -> std::result::Result<Vec<String>, LookupError> {
        let timeout = self.lookup_timeout;
        let (sender, receiver) = mpsc::channel();
        let lookup = Arc::clone(&self.lookup);
        let owned_supplier = supplier.to_string();
        thread::Builder::new()
            .name("permission-lookup".into())
            .spawn(move || {
                // The receiver is gone once the deadline has passed.
                let _ = sender.send(lookup.lookup_permissions(&owned_supplier, timeout));
            })
            .map_err(|err| LookupError::Backend {
                message: format!("failed to start lookup thread: {err}"),
            })?;

        match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(LookupError::Timeout {
                supplier: supplier.to_string(),
                timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(LookupError::Backend {
                message: "lookup stopped without an answer".to_string(),
            }),
        }
    }

    /// Process rows from any source.
    ///
    /// Every row's headers must match the batch file headers exactly. The
    /// first row is checked before the permission lookup; a later row with
    /// different headers aborts the batch before its outcome is published.
    pub fn process<I, S>(&self, ctx: &BatchContext, rows: I, sink: S) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = CsvRow>,
        S: OutcomeSink,
    {
        let span = batch_span(ctx);
        let _guard = span.enter();
        let mut rows = rows.into_iter().peekable();
        if let Some(first) = rows.peek() {
            validate_headers(first.headers()).inspect_err(|err| {
                error!(error = %err, "batch rows rejected");
            })?;
        }
        let permissions = self.resolve_permissions(&ctx.supplier)?;
        let checked = rows.map(|row| {
            validate_headers(row.headers()).map(|()| row).inspect_err(|err| {
                error!(error = %err, "batch row rejected");
            })
        });
        self.process_rows(ctx, &permissions, checked, sink)
    }

    /// Process an already ingested batch.
    pub fn process_batch<S: OutcomeSink>(
        &self,
        ctx: &BatchContext,
        batch: CsvBatch,
        sink: S,
    ) -> Result<BatchSummary> {
        let span = batch_span(ctx);
        let _guard = span.enter();
        self.run_batch(ctx, batch, sink)
    }

    /// Read, check and process a batch file. Structural problems abort the
    /// batch before the permission lookup and before any row is processed.
    pub fn process_reader<R: Read, S: OutcomeSink>(
        &self,
        ctx: &BatchContext,
        reader: R,
        sink: S,
    ) -> Result<BatchSummary> {
        let span = batch_span(ctx);
        let _guard = span.enter();
        let batch = read_batch(reader).inspect_err(|err| {
            error!(error = %err, "batch file rejected");
        })?;
        self.run_batch(ctx, batch, sink)
    }

    /// Outcome of a single row against a resolved permission snapshot.
    pub fn process_row(
        &self,
        ctx: &BatchContext,
        row: &CsvRow,
        permissions: &PermissionSet,
    ) -> RowOutcome {
        RowProcessor::new(&self.validator, ctx, permissions).outcome(row)
    }

    fn run_batch<S: OutcomeSink>(
        &self,
        ctx: &BatchContext,
        batch: CsvBatch,
        sink: S,
    ) -> Result<BatchSummary> {
        let permissions = self.resolve_permissions(&ctx.supplier)?;
        if !batch.is_empty() && !any_requested_operation_permitted(&batch, ctx, &permissions) {
            warn!(
                supplier = %ctx.supplier,
                "supplier holds no permission for any operation requested in the file"
            );
        }
        self.process_rows(ctx, &permissions, batch.into_iter().map(Ok), sink)
    }

    fn process_rows<I, S>(
        &self,
        ctx: &BatchContext,
        permissions: &PermissionSet,
        rows: I,
        sink: S,
    ) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = imms_ingest::Result<CsvRow>>,
        S: OutcomeSink,
    {
        self.process_rows_with(ctx, permissions, rows, sink, |processor, row| {
            processor.evaluate(row)
        })
    }

    /// Drive `evaluate` over every row, guarding each call against panics.
    fn process_rows_with<I, S, F>(
        &self,
        ctx: &BatchContext,
        permissions: &PermissionSet,
        rows: I,
        mut sink: S,
        evaluate: F,
    ) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = imms_ingest::Result<CsvRow>>,
        S: OutcomeSink,
        F: Fn(&RowProcessor<'_>, &CsvRow) -> RowOutcome,
    {
        let started = Instant::now();
        info!(vaccine_type = ?ctx.vaccine_type, "batch processing started");

        let processor = RowProcessor::new(&self.validator, ctx, permissions);
        let mut summary = BatchSummary::default();
        for row in rows {
            let row = row?;
            let outcome = processor.guarded(&row, &evaluate);
            summary.record(&outcome);
            let record = outcome_record(ctx, &row, outcome);
            debug!(
                row_id = %record.row_id,
                operation = %record.operation_requested,
                status = ?record.status,
                "row processed"
            );
            sink.publish(&record).map_err(|source| {
                error!(row_id = %record.row_id, error = %source, "outcome sink failed");
                PipelineError::Sink {
                    row_index: row.index(),
                    source,
                }
            })?;
        }
        sink.finish().map_err(|source| {
            error!(error = %source, "outcome sink failed to finish");
            PipelineError::SinkFinish { source }
        })?;

        info!(
            total = summary.total,
            accepted = summary.accepted,
            rejected = summary.rejected,
            duration_ms = started.elapsed().as_millis(),
            "batch processing complete"
        );
        Ok(summary)
    }
}

fn batch_span(ctx: &BatchContext) -> tracing::Span {
    info_span!(
        "batch",
        message_id = %ctx.message_id,
        supplier = %ctx.supplier,
        file_key = %ctx.file_key
    )
}

/// Per-batch row evaluation with the batch's validator and permissions.
struct RowProcessor<'a> {
    validator: RecordValidator,
    permissions: &'a PermissionSet,
    ctx: &'a BatchContext,
}

impl<'a> RowProcessor<'a> {
    fn new(
        validator: &RecordValidator,
        ctx: &'a BatchContext,
        permissions: &'a PermissionSet,
    ) -> Self {
        Self {
            validator: validator.clone().with_expected_vaccine(ctx.vaccine_type),
            permissions,
            ctx,
        }
    }

    fn outcome(&self, row: &CsvRow) -> RowOutcome {
        self.guarded(row, Self::evaluate)
    }

    /// Run `evaluate` for one row. A panic while evaluating becomes an
    /// `INVALID_CONVERSION` rejection for that row only.
    fn guarded<F>(&self, row: &CsvRow, evaluate: F) -> RowOutcome
    where
        F: Fn(&Self, &CsvRow) -> RowOutcome,
    {
        match catch_unwind(AssertUnwindSafe(|| evaluate(self, row))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|message| (*message).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                error!(
                    row_id = %self.ctx.row_id(row),
                    detail = %detail,
                    "internal defect while processing row"
                );
                RowOutcome::rejected(RejectionKind::InvalidConversion, Vec::new())
            }
        }
    }

    fn evaluate(&self, row: &CsvRow) -> RowOutcome {
        let check = self.validator.check(row);
        if !check.is_valid() {
            let kind = if check.only_unique_id_failures() {
                RejectionKind::MissingUniqueId
            } else {
                RejectionKind::ValidationFailed
            };
            return RowOutcome::rejected(kind, check.failures);
        }

        let Some(vaccine) = check.vaccine_type.or(self.ctx.vaccine_type) else {
            return RowOutcome::rejected(RejectionKind::InvalidConversion, Vec::new());
        };

        let classification = match classify(row, vaccine, self.permissions) {
            Ok(classification) => classification,
            Err(invalid) => {
                return RowOutcome::rejected(
                    RejectionKind::InvalidActionFlag,
                    vec![invalid.reason()],
                );
            }
        };
        if let Some(reason) = classification.denial_reason() {
            return RowOutcome::rejected(RejectionKind::NoPermissions, vec![reason]);
        }

        match convert_to_immunization(row, vaccine) {
            Ok(resource) => RowOutcome::Accepted {
                resource,
                operation: classification.operation,
            },
            Err(err) => {
                let ConversionError::InvalidValue { column } = &err;
                let reason = FailureReason::new(columns::field_location(column), err.to_string());
                RowOutcome::rejected(RejectionKind::InvalidConversion, vec![reason])
            }
        }
    }
}

/// Outcome record published for `row`.
pub fn outcome_record(ctx: &BatchContext, row: &CsvRow, outcome: RowOutcome) -> OutcomeRecord {
    let status = outcome.status();
    let local_id = format!(
        "{}^{}",
        row.get(UNIQUE_ID).unwrap_or_default(),
        row.get(UNIQUE_ID_URI).unwrap_or_default()
    );
    let (operation_requested, fhir_json, diagnostics, reasons) = match outcome {
        RowOutcome::Accepted {
            resource,
            operation,
        } => (operation.to_string(), Some(resource), None, Vec::new()),
        RowOutcome::Rejected { kind, reasons } => (
            requested_operation(row),
            None,
            Some(Diagnostics::new(kind, &reasons)),
            reasons,
        ),
    };
    OutcomeRecord {
        row_id: ctx.row_id(row),
        row_index: row.index(),
        file_key: ctx.file_key.clone(),
        supplier: ctx.supplier.clone(),
        created_at_formatted_string: ctx.created_at.clone(),
        operation_requested,
        local_id,
        status,
        fhir_json,
        diagnostics,
        reasons,
    }
}

/// Operation named by the row's action flag, or the raw flag when it is
/// not a recognised one.
fn requested_operation(row: &CsvRow) -> String {
    let raw = row.get(ACTION_FLAG).unwrap_or_default();
    ActionFlag::parse(raw).map_or_else(|_| raw.to_string(), |flag| flag.operation().to_string())
}

fn any_requested_operation_permitted(
    batch: &CsvBatch,
    ctx: &BatchContext,
    permissions: &PermissionSet,
) -> bool {
    let requested: BTreeSet<Operation> = batch
        .rows()
        .iter()
        .filter_map(|row| ActionFlag::parse(row.get(ACTION_FLAG).unwrap_or_default()).ok())
        .map(|flag| flag.operation())
        .collect();
    let vaccines: Vec<VaccineType> = match ctx.vaccine_type {
        Some(vaccine) => vec![vaccine],
        None => permissions.vaccines().collect(),
    };
    vaccines.iter().any(|vaccine| {
        requested
            .iter()
            .any(|operation| permissions.contains(*vaccine, *operation))
    })
}

#[cfg(test)]
mod tests {
    use imms_model::columns::{EXPECTED_HEADERS, VACCINATION_PROCEDURE_CODE};
    use imms_model::OutcomeStatus;

    use super::*;
    use crate::lookup::StaticPermissionLookup;
    use crate::sinks::MemorySink;

    fn row(index: usize, overrides: &[(&str, &str)]) -> CsvRow {
        CsvRow::from_pairs(
            index,
            EXPECTED_HEADERS.iter().map(|header| {
                let value = overrides
                    .iter()
                    .find(|(column, _)| column == header)
                    .map_or("", |(_, value)| *value);
                (*header, value)
            }),
        )
    }

    fn valid_row(index: usize, flag: &str) -> CsvRow {
        row(
            index,
            &[
                (UNIQUE_ID, "ID-1"),
                (UNIQUE_ID_URI, "https://supplier.example/ids"),
                (ACTION_FLAG, flag),
                (VACCINATION_PROCEDURE_CODE, "822851000000102"),
                ("DATE_AND_TIME", "20240708T101500"),
            ],
        )
    }

    fn ctx() -> BatchContext {
        BatchContext::new("abc123", "FLU_Vaccinations_v5_YGM41_20240708T12130100.csv", "EMIS")
            .with_created_at("20240708T12130100")
            .with_vaccine_type(Some(VaccineType::Flu))
    }

    fn permissions(strings: &[&str]) -> PermissionSet {
        resolve_permission_set(strings)
    }

    #[test]
    fn message_id_is_stable() {
        let id = message_id_for(b"abc");
        assert_eq!(id, "ba7816bf8f01cfea");
        assert_eq!(id.len(), MESSAGE_ID_LENGTH);
    }

    #[test]
    fn row_ids_are_one_based() {
        assert_eq!(ctx().row_id(&valid_row(0, "NEW")), "abc123#1");
    }

    #[test]
    fn accepted_row_carries_resource() {
        let pipeline = BatchPipeline::new(StaticPermissionLookup::default());
        let outcome =
            pipeline.process_row(&ctx(), &valid_row(0, "NEW"), &permissions(&["FLU_FULL"]));
        let RowOutcome::Accepted { resource, operation } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(operation, Operation::Create);
        assert_eq!(resource["resourceType"], "Immunization");
    }

    #[test]
    fn invalid_flag_keeps_raw_value() {
        let pipeline = BatchPipeline::new(StaticPermissionLookup::default());
        let row = valid_row(0, "new");
        let outcome = pipeline.process_row(&ctx(), &row, &permissions(&["FLU_FULL"]));
        let record = outcome_record(&ctx(), &row, outcome);
        assert_eq!(record.status, OutcomeStatus::Rejected);
        assert_eq!(record.operation_requested, "new");
        assert_eq!(
            record.diagnostics.map(|d| d.error_type),
            Some("INVALID_ACTION_FLAG".to_string())
        );
    }

    #[test]
    fn missing_unique_id_has_its_own_kind() {
        let pipeline = BatchPipeline::new(StaticPermissionLookup::default());
        let row = row(
            0,
            &[
                (ACTION_FLAG, "NEW"),
                (VACCINATION_PROCEDURE_CODE, "822851000000102"),
                ("DATE_AND_TIME", "20240708T101500"),
            ],
        );
        let outcome = pipeline.process_row(&ctx(), &row, &permissions(&["FLU_FULL"]));
        assert!(matches!(
            outcome,
            RowOutcome::Rejected {
                kind: RejectionKind::MissingUniqueId,
                ..
            }
        ));
    }

    #[test]
    fn summary_counts_by_operation_and_kind() {
        let pipeline = BatchPipeline::new(
            StaticPermissionLookup::default().with_supplier("EMIS", ["FLU_CREATE"]),
        );
        let mut sink = MemorySink::new();
        let rows = vec![
            valid_row(0, "NEW"),
            valid_row(1, "DELETE"),
            valid_row(2, "NEW"),
        ];
        let summary = pipeline.process(&ctx(), rows, &mut sink).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.accepted_by_operation[&Operation::Create], 2);
        assert_eq!(summary.rejected_by_kind["NO_PERMISSIONS"], 1);
        assert!(!summary.all_accepted());
        assert_eq!(sink.records().len(), 3);
    }

    #[test]
    fn lookup_is_abandoned_at_the_deadline() {
        struct Hanging;
        impl PermissionLookup for Hanging {
            fn lookup_permissions(
                &self,
                _supplier: &str,
                _timeout: Duration,
            ) -> std::result::Result<Vec<String>, LookupError> {
                std::thread::sleep(Duration::from_secs(1));
                Ok(vec!["FLU_FULL".to_string()])
            }
        }
        let pipeline = BatchPipeline::new(Hanging).with_lookup_timeout(Duration::from_millis(5));
        let started = Instant::now();
        let err = pipeline.resolve_permissions("EMIS").unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(matches!(
            err,
            PipelineError::PermissionLookup {
                source: LookupError::Timeout { .. },
                ..
            }
        ));
    }

    #[test]
    fn panicking_lookup_is_a_backend_failure() {
        struct Broken;
        impl PermissionLookup for Broken {
            fn lookup_permissions(
                &self,
                _supplier: &str,
                _timeout: Duration,
            ) -> std::result::Result<Vec<String>, LookupError> {
                panic!("connection pool poisoned")
            }
        }
        let err = BatchPipeline::new(Broken)
            .resolve_permissions("EMIS")
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PermissionLookup {
                source: LookupError::Backend { .. },
                ..
            }
        ));
    }

    #[test]
    fn panicking_row_is_rejected_and_batch_continues() {
        let pipeline = BatchPipeline::new(StaticPermissionLookup::default());
        let mut sink = MemorySink::new();
        let rows = (0..3).map(|index| Ok(valid_row(index, "NEW")));

        let summary = pipeline
            .process_rows_with(
                &ctx(),
                &permissions(&["FLU_FULL"]),
                rows,
                &mut sink,
                |processor, row| {
                    if row.index() == 1 {
                        panic!("resource builder failed");
                    }
                    processor.evaluate(row)
                },
            )
            .unwrap();

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected_by_kind["INVALID_CONVERSION"], 1);
        let records = sink.records();
        let indexes: Vec<usize> = records.iter().map(|record| record.row_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(records[0].status, OutcomeStatus::Accepted);
        assert_eq!(records[2].status, OutcomeStatus::Accepted);

        let defect = &records[1];
        assert_eq!(defect.status, OutcomeStatus::Rejected);
        assert!(!defect.reasons.is_empty());
        let diagnostics = defect.diagnostics.as_ref().unwrap();
        assert_eq!(diagnostics.error_type, "INVALID_CONVERSION");
        assert_eq!(diagnostics.status_code, 500);
        assert!(!diagnostics.error_message.is_empty());
    }
}
