//! Command tests against files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use imms_cli::cli::{CheckSnomedArgs, Cli, Command, ConfigArgs, PermissionsArgs, ProcessArgs};
use imms_cli::commands::{run_check_snomed, run_permissions, run_procedure_codes, run_process};
use imms_model::columns::EXPECTED_HEADERS;
use imms_model::{Operation, VaccineType};

const FILE_KEY: &str = "FLU_Vaccinations_v5_YGM41_20240708T12130100.csv";

fn row(unique_id: &str, flag: &str) -> String {
    let values = [
        ("NHS_NUMBER", "9449306060"),
        ("PERSON_DOB", "19800101"),
        ("DATE_AND_TIME", "20240708T101500"),
        ("UNIQUE_ID", unique_id),
        ("UNIQUE_ID_URI", "https://supplier.example/ids"),
        ("ACTION_FLAG", flag),
        ("VACCINATION_PROCEDURE_CODE", "884861000000100"),
    ];
    EXPECTED_HEADERS
        .iter()
        .map(|header| {
            values
                .iter()
                .find(|(column, _)| column == header)
                .map_or("", |(_, value)| *value)
        })
        .collect::<Vec<_>>()
        .join("|")
}

fn write_batch(dir: &Path, name: &str, rows: &[String]) -> PathBuf {
    let mut lines = vec![EXPECTED_HEADERS.join("|")];
    lines.extend(rows.iter().cloned());
    let path = dir.join(name);
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn write_permissions(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("permissions.json");
    fs::write(&path, json).unwrap();
    path
}

fn process_args(file: PathBuf, permissions: PathBuf) -> ProcessArgs {
    ProcessArgs {
        file,
        supplier: None,
        vaccine_type: None,
        message_id: Some("msg-1".to_string()),
        config: ConfigArgs {
            config: None,
            permissions: Some(permissions),
        },
        outcomes: None,
        ack_dir: None,
        dry_run: false,
    }
}

#[test]
fn parses_process_flags() {
    let cli = Cli::try_parse_from([
        "imms-batch",
        "process",
        FILE_KEY,
        "--vaccine-type",
        "flu",
        "--outcomes",
        "-",
        "--dry-run",
        "--log-data",
    ])
    .unwrap();
    assert!(cli.log_data);
    let Command::Process(args) = cli.command else {
        panic!("expected process command");
    };
    assert_eq!(args.vaccine_type, Some(VaccineType::Flu));
    assert_eq!(args.outcomes.as_deref(), Some(Path::new("-")));
    assert!(args.dry_run);
}

#[test]
fn process_writes_acknowledgment_next_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_batch(
        dir.path(),
        FILE_KEY,
        &[row("ID-1", "NEW"), row("ID-2", "DELETE")],
    );
    let permissions = write_permissions(
        dir.path(),
        r#"{"all_permissions": {"EMIS": ["FLU_CREATE"]}}"#,
    );

    let result = run_process(&process_args(file, permissions)).unwrap();

    assert_eq!(result.context.supplier, "EMIS");
    assert_eq!(result.context.vaccine_type, Some(VaccineType::Flu));
    assert_eq!(result.summary.accepted, 1);
    assert_eq!(result.summary.rejected, 1);
    let ack = result.ack_file.unwrap();
    assert_eq!(
        ack,
        dir.path()
            .join("FLU_Vaccinations_v5_YGM41_20240708T12130100_BusAck_20240708T12130100.csv")
    );
    insta::assert_snapshot!(fs::read_to_string(&ack).unwrap(), @r"
    MESSAGE_HEADER_ID|HEADER_RESPONSE_CODE|ISSUE_SEVERITY|ISSUE_CODE|ISSUE_DETAILS_CODE|RESPONSE_TYPE|RESPONSE_CODE|RESPONSE_DISPLAY|RECEIVED_TIME|MAILBOX_FROM|LOCAL_ID|IMMS_ID|OPERATION_OUTCOME|MESSAGE_DELIVERY
    msg-1#1|OK|Information|OK|30001|Business|30001|Success|20240708T12130100||ID-1^https://supplier.example/ids|||True
    msg-1#2|Fatal Error|Fatal|Fatal Error|30002|Business|30002|Business Level Response Value - Processing Error|20240708T12130100||ID-2^https://supplier.example/ids||action_flag: No permissions for requested operation: DELETE requires permission FLU_DELETE|False
    ");
}

#[test]
fn dry_run_writes_outcomes_only() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_batch(
        dir.path(),
        FILE_KEY,
        &[row("ID-1", "NEW"), row("ID-2", "UPDATE")],
    );
    let permissions = write_permissions(
        dir.path(),
        r#"{"all_permissions": {"EMIS": ["FLU_FULL"]}}"#,
    );
    let outcomes = dir.path().join("outcomes.jsonl");
    let mut args = process_args(file, permissions);
    args.dry_run = true;
    args.outcomes = Some(outcomes.clone());

    let result = run_process(&args).unwrap();

    assert!(result.summary.all_accepted());
    assert_eq!(result.summary.accepted_by_operation[&Operation::Update], 1);
    assert!(result.ack_file.is_none());
    let content = fs::read_to_string(outcomes).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("\"row_id\":\"msg-1#2\""));
}

#[test]
fn fatal_batch_leaves_no_acknowledgment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(FILE_KEY);
    fs::write(&path, "UNIQUE_ID|ACTION_FLAG\nID-1|NEW").unwrap();
    let permissions = write_permissions(
        dir.path(),
        r#"{"all_permissions": {"EMIS": ["FLU_FULL"]}}"#,
    );
    let ack_dir = dir.path().join("acks");
    let mut args = process_args(path, permissions);
    args.ack_dir = Some(ack_dir.clone());

    let err = run_process(&args).unwrap_err();

    assert!(format!("{err:#}").contains("expected 34 columns"));
    assert_eq!(fs::read_dir(&ack_dir).unwrap().count(), 0);
}

#[test]
fn unrecognised_file_name_needs_supplier() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_batch(dir.path(), "upload.csv", &[row("ID-1", "NEW")]);
    let permissions = write_permissions(
        dir.path(),
        r#"{"all_permissions": {"RAVS": ["FLU_FULL"]}}"#,
    );
    let mut args = process_args(file, permissions);
    args.dry_run = true;

    assert!(run_process(&args).is_err());

    args.supplier = Some("RAVS".to_string());
    let result = run_process(&args).unwrap();
    assert_eq!(result.context.vaccine_type, None);
    assert_eq!(result.summary.accepted, 1);
}

#[test]
fn permissions_report_per_vaccine() {
    let dir = tempfile::tempdir().unwrap();
    let permissions = write_permissions(
        dir.path(),
        r#"{"all_permissions": {"TPP": ["COVID19_FULL", "FLU_CREATE", "FLU_READ"]}}"#,
    );
    let report = run_permissions(&PermissionsArgs {
        supplier: "TPP".to_string(),
        vaccine_type: None,
        config: ConfigArgs {
            config: None,
            permissions: Some(permissions),
        },
    })
    .unwrap();

    assert_eq!(report.operations.len(), VaccineType::ALL.len());
    let covid = &report.operations[0];
    assert_eq!(covid.0, VaccineType::Covid19);
    assert_eq!(
        covid.1.iter().copied().collect::<Vec<_>>(),
        Operation::FULL.to_vec()
    );
    let flu = report
        .operations
        .iter()
        .find(|(vaccine, _)| *vaccine == VaccineType::Flu)
        .unwrap();
    assert_eq!(
        flu.1.iter().copied().collect::<Vec<_>>(),
        vec![Operation::Create, Operation::Read]
    );
}

#[test]
fn snomed_checks_report_each_code() {
    let checks = run_check_snomed(&CheckSnomedArgs {
        codes: vec!["123456001".to_string(), "123456055".to_string()],
    });
    let valid: Vec<bool> = checks.iter().map(|check| check.valid).collect();
    assert_eq!(valid, vec![true, false]);
}

#[test]
fn procedure_code_table_is_listed() {
    let codes = run_procedure_codes();
    assert!(codes.contains(&("38598009".to_string(), VaccineType::Mmr)));
    assert!(codes.iter().any(|(_, vaccine)| *vaccine == VaccineType::Rsv));
}
