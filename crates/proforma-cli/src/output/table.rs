use colored::Colorize;
use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten, lookup, result_of, scalar_text};

const CASH_FLOW_COLUMNS: [&str; 7] = [
    "year",
    "gross_income",
    "operating_expenses",
    "interest_paid",
    "depreciation",
    "tax_due",
    "net_cash_flow",
];

const PROJECTION_COLUMNS: [&str; 4] = [
    "year",
    "property_value.base",
    "loan_balance.base",
    "net_equity.base",
];

const AMORTIZATION_COLUMNS: [&str; 6] = [
    "period",
    "opening_balance",
    "payment",
    "interest",
    "principal",
    "closing_balance",
];

/// Format output as tables using the tabled crate.
///
/// Scalars of the result are listed as dotted `Field | Value` rows; the
/// yearly cash flows, annual projections and amortization rows each get a
/// table of their own.
pub fn print_table(value: &Value) {
    let result = result_of(value);

    let mut fields = Vec::new();
    flatten("", result, &mut fields);
    if !fields.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in &fields {
            builder.push_record([key.as_str(), val.as_str()]);
        }
        println!("{}", Table::from(builder));
    }

    if let Some(Value::Array(rows)) = lookup(result, "cash_flows") {
        print_section("Cash flows", rows, &CASH_FLOW_COLUMNS);
    }
    if let Some(Value::Array(rows)) = lookup(result, "annual_projections") {
        print_section("Annual projections", rows, &PROJECTION_COLUMNS);
    }
    if let Some(Value::Array(rows)) = lookup(result, "rows") {
        print_section("Schedule", rows, &AMORTIZATION_COLUMNS);
    }

    if let Some(Value::Array(breaches)) = lookup(result, "leverage.health.breaches") {
        if !breaches.is_empty() {
            println!("\n{}", "Breaches:".yellow().bold());
            for b in breaches {
                println!(
                    "  - {} {} (value {}, threshold {})",
                    lookup(b, "metric").map(scalar_text).unwrap_or_default(),
                    lookup(b, "level").map(scalar_text).unwrap_or_default(),
                    lookup(b, "value").map(scalar_text).unwrap_or_default(),
                    lookup(b, "threshold").map(scalar_text).unwrap_or_default(),
                );
            }
        }
    }

    if let Some(Value::Array(warnings)) = lookup(value, "warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                println!("  - {}", scalar_text(w));
            }
        }
    }

    if let Some(Value::String(meth)) = lookup(value, "methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_section(title: &str, rows: &[Value], columns: &[&str]) {
    println!("\n{}", title.bold());
    if rows.is_empty() {
        println!("(empty)");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().copied());
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| lookup(row, c).map(scalar_text).unwrap_or_default())
            .collect();
        builder.push_record(cells);
    }
    println!("{}", Table::from(builder));
}
