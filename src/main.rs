use clap::{Parser, Subcommand};
use royalbit_gridcalc::cli;
use royalbit_gridcalc::config::EngineConfig;
use royalbit_gridcalc::error::GridcalcResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gridcalc")]
#[command(about = "Spreadsheet formula engine: evaluate formulas and watch a sheet recalculate.")]
#[command(long_about = "Gridcalc - Spreadsheet formula engine
Excel-style formulas | Incremental recalculation | Cycle detection

COMMANDS:
  eval        - Evaluate one formula against a few cells
  calc        - Build a sheet, apply edits, show what recalculated
  audit       - Show what a cell reads and what reads it
  functions   - List built-in functions

CELLS:
  Cells are given as CELL=VALUE. A value starting with '=' is a formula,
  so a formula cell is written with two '=' signs:
    --cell A1=50000 --cell A2=35000 --cell A3==A1-A2

EXAMPLES:
  gridcalc eval \"=2+3*4\"
  gridcalc eval \"=SUM(A1:A3)\" --cell A1=1 --cell A2=2 --cell A3=3
  gridcalc calc --cell A1=50000 --cell A2=35000 --cell A3==A1-A2 --set A2=25000
  gridcalc audit A1 --cell A1=5 --cell B1==A1*2

LOGGING:
  Set RUST_LOG (e.g. RUST_LOG=royalbit_gridcalc=debug) or pass --verbose.")]
#[command(version)]
struct Cli {
    /// Engine configuration file (YAML)
    #[arg(short, long, global = true, env = "GRIDCALC_CONFIG")]
    config: Option<PathBuf>,

    /// Log recalculation steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Evaluate a single formula.

The formula is evaluated once against the cells given with --cell. It is
not stored and nothing depends on it. Formula errors are printed as the
error value (e.g. #DIV/0!) rather than failing the command.

EXAMPLE:
  gridcalc eval \"=IF(A1>10, \\\"big\\\", \\\"small\\\")\" --cell A1=12")]
    /// Evaluate one formula
    Eval {
        /// Formula text, starting with '='
        formula: String,

        /// Cell contents as CELL=VALUE (repeatable)
        #[arg(short = 'C', long = "cell")]
        cells: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    #[command(long_about = "Build a sheet and apply edits.

Every --cell is written in order, then every --set is applied as a user
edit. For each edit the cells that were recalculated are listed in
evaluation order, followed by the final value of every cell.

EXAMPLE:
  gridcalc calc --cell A1=50000 --cell A2=35000 --cell A3==A1-A2 \\
                --set A2=25000 --set A3==A1-A2-A3")]
    /// Build a sheet, apply edits and show the recalculation
    Calc {
        /// Initial cell contents as CELL=VALUE (repeatable)
        #[arg(short = 'C', long = "cell")]
        cells: Vec<String>,

        /// Edits applied after the sheet is built, as CELL=VALUE (repeatable)
        #[arg(short, long = "set")]
        sets: Vec<String>,

        /// Print edits and cells as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the dependency chain of one cell
    Audit {
        /// Cell to audit (e.g. B2)
        cell: String,

        /// Cell contents as CELL=VALUE (repeatable)
        #[arg(short = 'C', long = "cell")]
        cells: Vec<String>,
    },

    /// List built-in functions and their arity
    Functions,
}

fn main() -> GridcalcResult<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "royalbit_gridcalc=debug"
    } else {
        "royalbit_gridcalc=warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_yaml_file(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Eval {
            formula,
            cells,
            json,
        } => cli::eval(formula, cells, json, config),

        Commands::Calc { cells, sets, json } => cli::calc(cells, sets, json, config),

        Commands::Audit { cell, cells } => cli::audit(cell, cells, config),

        Commands::Functions => cli::functions(),
    }
}
