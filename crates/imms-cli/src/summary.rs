use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use imms_cli::commands::{PermissionReport, ProcessResult, SnomedCheck};
use imms_model::{Operation, VaccineType};

pub fn print_process_summary(result: &ProcessResult) {
    let ctx = &result.context;
    println!("File: {}", result.file.display());
    println!("Message id: {}", ctx.message_id);
    println!("Supplier: {}", ctx.supplier);
    if let Some(vaccine) = ctx.vaccine_type {
        println!("Vaccine type: {vaccine}");
    }
    if let Some(path) = &result.ack_file {
        println!("Acknowledgment: {}", path.display());
    }
    if let Some(path) = &result.outcomes {
        println!("Outcomes: {}", path.display());
    }

    let summary = &result.summary;
    let mut table = Table::new();
    table.set_header(vec![header_cell("Outcome"), header_cell("Rows")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for operation in Operation::ALL {
        if let Some(count) = summary.accepted_by_operation.get(&operation) {
            table.add_row(vec![
                Cell::new(format!("Accepted {operation}")),
                count_cell(*count, Color::Green),
            ]);
        }
    }
    for (kind, count) in &summary.rejected_by_kind {
        table.add_row(vec![
            Cell::new(format!("Rejected {kind}")),
            count_cell(*count, Color::Red),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(summary.total).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    println!(
        "Accepted: {}  Rejected: {}",
        summary.accepted, summary.rejected
    );
}

pub fn print_snomed_checks(checks: &[SnomedCheck]) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Code"), header_cell("Valid")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for check in checks {
        let valid = if check.valid {
            Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            Cell::new("✗").fg(Color::Red).add_attribute(Attribute::Bold)
        };
        table.add_row(vec![Cell::new(&check.code), valid]);
    }
    println!("{table}");
}

pub fn print_permissions(report: &PermissionReport) {
    println!("Supplier: {}", report.supplier);
    let mut table = Table::new();
    table.set_header(vec![header_cell("Vaccine"), header_cell("Operations")]);
    apply_table_style(&mut table);
    for (vaccine, operations) in &report.operations {
        let operations = if operations.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(
                operations
                    .iter()
                    .map(Operation::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        };
        table.add_row(vec![Cell::new(vaccine), operations]);
    }
    println!("{table}");
}

pub fn print_procedure_codes(codes: &[(String, VaccineType)]) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Procedure code"), header_cell("Vaccine")]);
    apply_table_style(&mut table);
    for (code, vaccine) in codes {
        table.add_row(vec![Cell::new(code), Cell::new(vaccine)]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(80);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
