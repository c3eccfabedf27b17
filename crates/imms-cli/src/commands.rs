use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use imms_core::{
    AckFileSink, BatchContext, BatchPipeline, BatchSummary, JsonLinesSink, MultiSink,
    OutcomeSink, PermissionLookup, PipelineConfig, SinkError, get_operation_permissions,
    message_id_for,
};
use imms_ingest::FileKey;
use imms_model::{Operation, OutcomeRecord, VaccineType};
use imms_validate::{ProcedureCodeTable, is_valid_simple_snomed};
use tracing::{debug, info, warn};

use crate::cli::{CheckSnomedArgs, ConfigArgs, PermissionsArgs, ProcessArgs};
use crate::logging::redact_value;

/// Result of `imms-batch process`.
#[derive(Debug)]
pub struct ProcessResult {
    pub file: PathBuf,
    pub context: BatchContext,
    pub summary: BatchSummary,
    pub ack_file: Option<PathBuf>,
    pub outcomes: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnomedCheck {
    pub code: String,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionReport {
    pub supplier: String,
    pub operations: Vec<(VaccineType, BTreeSet<Operation>)>,
}

/// Config file (explicit or from the environment) plus an optional
/// permissions JSON file on top.
pub fn load_config(args: &ConfigArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::discover(args.config.as_deref()).context("load config")?;
    if let Some(path) = &args.permissions {
        config
            .merge_permissions_file(path)
            .with_context(|| format!("load permissions from {}", path.display()))?;
    }
    Ok(config)
}

pub fn run_process(args: &ProcessArgs) -> Result<ProcessResult> {
    let mut config = load_config(&args.config)?;
    if let Some(dir) = &args.ack_dir {
        config.ack_dir = Some(dir.clone());
    }
    let bytes = fs::read(&args.file).with_context(|| format!("read {}", args.file.display()))?;
    let ctx = batch_context(args, &config, &bytes)?;
    info!(
        file = %args.file.display(),
        message_id = %ctx.message_id,
        supplier = %ctx.supplier,
        "processing batch file"
    );

    let pipeline = BatchPipeline::new(config.permission_lookup())
        .with_lookup_timeout(config.lookup_timeout());

    let mut sinks = MultiSink::new().with(RejectionLog);
    if let Some(path) = &args.outcomes {
        if path == Path::new("-") {
            sinks.push(JsonLinesSink::new(io::stdout().lock()));
        } else {
            let file = File::create(path)
                .with_context(|| format!("create outcomes file {}", path.display()))?;
            sinks.push(JsonLinesSink::new(BufWriter::new(file)));
        }
    }
    let ack_file = if args.dry_run {
        None
    } else {
        let dir = config.ack_dir.clone().unwrap_or_else(|| {
            args.file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        });
        let sink = AckFileSink::create(&dir, &ctx.file_key, &ctx.created_at)
            .with_context(|| format!("create acknowledgment file in {}", dir.display()))?;
        let path = sink.path().map(Path::to_path_buf);
        sinks.push(sink);
        path
    };

    let summary = match pipeline.process_reader(&ctx, bytes.as_slice(), sinks) {
        Ok(summary) => summary,
        Err(err) => {
            // An acknowledgment file must cover every row or not exist.
            if let Some(path) = &ack_file
                && let Err(remove_err) = fs::remove_file(path)
            {
                warn!(
                    path = %path.display(),
                    error = %remove_err,
                    "could not remove partial acknowledgment file"
                );
            }
            return Err(err).with_context(|| format!("process {}", ctx.file_key));
        }
    };

    Ok(ProcessResult {
        file: args.file.clone(),
        context: ctx,
        summary,
        ack_file,
        outcomes: args.outcomes.clone(),
    })
}

/// Batch identity from the file name, with explicit flags taking precedence.
fn batch_context(
    args: &ProcessArgs,
    config: &PipelineConfig,
    bytes: &[u8],
) -> Result<BatchContext> {
    let file_name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", args.file.display()))?;
    let message_id = args
        .message_id
        .clone()
        .unwrap_or_else(|| message_id_for(bytes));

    let mut ctx = match FileKey::parse(file_name, &config.supplier_map()) {
        Ok(key) => BatchContext::from_file_key(&key, message_id),
        Err(err) => {
            let Some(supplier) = &args.supplier else {
                return Err(err).with_context(|| {
                    format!("cannot derive supplier from '{file_name}'; pass --supplier")
                });
            };
            warn!(file_key = file_name, error = %err, "file name is not a valid file key");
            BatchContext::new(message_id, file_name, supplier.clone())
        }
    };
    if let Some(supplier) = &args.supplier {
        ctx.supplier = supplier.clone();
    }
    if args.vaccine_type.is_some() {
        ctx.vaccine_type = args.vaccine_type;
    }
    Ok(ctx)
}

/// Logs rejected rows; the local id is redacted unless row data logging is on.
struct RejectionLog;

impl OutcomeSink for RejectionLog {
    fn publish(&mut self, record: &OutcomeRecord) -> Result<(), SinkError> {
        if !record.is_success() {
            let fields = record
                .reasons
                .iter()
                .map(|reason| reason.field_location.as_str())
                .collect::<Vec<_>>()
                .join(",");
            debug!(
                row_id = %record.row_id,
                local_id = %redact_value(&record.local_id),
                fields = %fields,
                "row rejected"
            );
        }
        Ok(())
    }
}

pub fn run_check_snomed(args: &CheckSnomedArgs) -> Vec<SnomedCheck> {
    args.codes
        .iter()
        .map(|code| SnomedCheck {
            code: code.clone(),
            valid: is_valid_simple_snomed(code),
        })
        .collect()
}

pub fn run_permissions(args: &PermissionsArgs) -> Result<PermissionReport> {
    let config = load_config(&args.config)?;
    let permission_strings = config
        .permission_lookup()
        .lookup_permissions(&args.supplier, config.lookup_timeout())
        .with_context(|| format!("look up permissions for {}", args.supplier))?;
    let vaccines = match args.vaccine_type {
        Some(vaccine) => vec![vaccine],
        None => VaccineType::ALL.to_vec(),
    };
    let operations = vaccines
        .into_iter()
        .map(|vaccine| {
            (
                vaccine,
                get_operation_permissions(vaccine, permission_strings.as_slice()),
            )
        })
        .collect();
    Ok(PermissionReport {
        supplier: args.supplier.clone(),
        operations,
    })
}

pub fn run_procedure_codes() -> Vec<(String, VaccineType)> {
    ProcedureCodeTable::standard()
        .iter()
        .map(|(code, vaccine)| (code.to_string(), vaccine))
        .collect()
}
