use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use proforma_core::proforma::{amortization_schedule, compute_proforma, ProformaParams, MAX_YEARS};
use proforma_core::time_value::{irr_bisection, BisectionSettings};
use proforma_core::{with_metadata, ProformaError};

use crate::input;

/// Arguments for a full proforma run
#[derive(Args)]
pub struct ComputeArgs {
    /// Path to a JSON or YAML request (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON or YAML file overriding the model assumptions
    #[arg(long)]
    pub assumptions: Option<String>,
}

/// Arguments for a loan amortization schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Decimal,

    /// Annual interest rate as a decimal (e.g. 0.015 for 1.5%)
    #[arg(long)]
    pub annual_rate: Decimal,

    /// Loan term in years
    #[arg(long)]
    pub term_years: u32,
}

/// Arguments for a bisection IRR
#[derive(Args)]
pub struct IrrArgs {
    /// Periodic cash flows (comma-separated, e.g. "-1000,1100")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,

    /// Lower end of the search bracket
    #[arg(long, allow_hyphen_values = true)]
    pub lower: Option<Decimal>,

    /// Upper end of the search bracket
    #[arg(long)]
    pub upper: Option<Decimal>,

    /// Iteration cap
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

pub fn run_compute(args: ComputeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut params: ProformaParams = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json|file.yaml> or stdin required for compute".into());
    };

    if let Some(ref path) = args.assumptions {
        let assumptions: Value = input::file::read_document(path)?;
        tracing::debug!(path = %path, "assumptions loaded");
        params.assumptions = Some(assumptions);
    }

    let result = compute_proforma(&params).map_err(describe_error)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.term_years == 0 {
        return Err("--term-years must be at least 1".into());
    }
    if args.term_years > MAX_YEARS {
        return Err(format!("--term-years must not exceed {MAX_YEARS}").into());
    }

    let start = Instant::now();
    let schedule = amortization_schedule(args.principal, args.annual_rate, args.term_years * 12)?;
    let elapsed = start.elapsed().as_micros() as u64;

    let output = with_metadata(
        "Level-payment amortization (monthly)",
        &serde_json::json!({
            "principal": args.principal,
            "annual_rate": args.annual_rate,
            "term_years": args.term_years,
        }),
        Vec::new(),
        elapsed,
        schedule,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let defaults = BisectionSettings::default();
    let settings = BisectionSettings {
        lower: args.lower.unwrap_or(defaults.lower),
        upper: args.upper.unwrap_or(defaults.upper),
        max_iterations: args.max_iterations.unwrap_or(defaults.max_iterations),
        tolerance: defaults.tolerance,
    };

    let start = Instant::now();
    let solution = irr_bisection(&args.cash_flows, &settings)?;
    let elapsed = start.elapsed().as_micros() as u64;

    let mut warnings = Vec::new();
    if !solution.is_determined() {
        warnings.push("IRR could not be determined within the search bracket".to_string());
    }

    let output = with_metadata("Bisection IRR", &settings, warnings, elapsed, solution);
    Ok(serde_json::to_value(output)?)
}

/// Validation failures are listed one per line.
fn describe_error(err: ProformaError) -> Box<dyn std::error::Error> {
    match err {
        ProformaError::Validation(errors) => {
            let lines: Vec<String> = errors.into_iter().map(|m| format!("  - {m}")).collect();
            format!("invalid input ({} problems)\n{}", lines.len(), lines.join("\n")).into()
        }
        other => Box::new(other),
    }
}
