mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::proforma::{AmortizeArgs, ComputeArgs, IrrArgs};

/// Real-estate investment proforma calculations
#[derive(Parser)]
#[command(
    name = "proforma",
    version,
    about = "Real-estate investment proforma calculations",
    long_about = "A CLI for projecting the cash flows of a leveraged property investment \
                  with decimal precision. Models short-term rental and lease revenue, \
                  mortgage amortization, depreciation and capital-gains tax, and reports \
                  IRR, cash-on-cash return, payback, coverage ratios and a health rating."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log each computation stage to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full proforma from a JSON or YAML request
    Compute(ComputeArgs),
    /// Print a monthly amortization schedule
    Amortize(AmortizeArgs),
    /// Solve the IRR of a cash-flow series by bisection
    Irr(IrrArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("proforma_core=debug,proforma=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout carries the result; logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Compute(args) => commands::proforma::run_compute(args),
        Commands::Amortize(args) => commands::proforma::run_amortize(args),
        Commands::Irr(args) => commands::proforma::run_irr(args),
        Commands::Version => {
            println!("proforma {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
