//! CLI argument definitions for `imms-batch`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use imms_model::VaccineType;

#[derive(Parser)]
#[command(
    name = "imms-batch",
    version,
    about = "Process immunisation batch files",
    long_about = "Validate supplier immunisation batch files, check permissions per row,\n\
                  convert accepted rows to FHIR Immunization resources and write the\n\
                  business acknowledgment file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow row values (patient data) in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process a batch file and write its acknowledgment file.
    Process(ProcessArgs),

    /// Check SNOMED CT codes.
    CheckSnomed(CheckSnomedArgs),

    /// Show the operations a supplier may perform per vaccine type.
    Permissions(PermissionsArgs),

    /// List the vaccination procedure code table.
    ProcedureCodes,
}

/// Where configuration comes from.
#[derive(Args, Clone, Default)]
pub struct ConfigArgs {
    /// TOML config file (default: $IMMS_BATCH_CONFIG).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Permissions JSON file: {"all_permissions": {"SUPPLIER": [...]}}.
    #[arg(long = "permissions", value_name = "PATH")]
    pub permissions: Option<PathBuf>,
}

#[derive(Args, Clone)]
pub struct ProcessArgs {
    /// Batch file, named <VACCINE>_Vaccinations_v5_<ODS>_<TIMESTAMP>.csv.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Supplier (default: derived from the ODS code in the file name).
    #[arg(long = "supplier")]
    pub supplier: Option<String>,

    /// Vaccine type of the file (default: derived from the file name).
    #[arg(long = "vaccine-type", value_name = "TYPE")]
    pub vaccine_type: Option<VaccineType>,

    /// Message id for row ids (default: derived from the file contents).
    #[arg(long = "message-id", value_name = "ID")]
    pub message_id: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Write outcome records as JSON lines to PATH, or to stdout with "-".
    #[arg(long = "outcomes", value_name = "PATH")]
    pub outcomes: Option<PathBuf>,

    /// Directory for the acknowledgment file (default: next to FILE).
    #[arg(long = "ack-dir", value_name = "DIR")]
    pub ack_dir: Option<PathBuf>,

    /// Process and report without writing the acknowledgment file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Args, Clone)]
pub struct CheckSnomedArgs {
    /// Codes to check.
    #[arg(value_name = "CODE", required = true)]
    pub codes: Vec<String>,
}

#[derive(Args, Clone)]
pub struct PermissionsArgs {
    #[arg(long = "supplier")]
    pub supplier: String,

    /// Only show this vaccine type.
    #[arg(long = "vaccine-type", value_name = "TYPE")]
    pub vaccine_type: Option<VaccineType>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
