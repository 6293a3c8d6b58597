use crate::config::EngineConfig;
use crate::core::formula::functions::BUILTINS;
use crate::core::{Engine, RecalcReport};
use crate::error::{GridcalcError, GridcalcResult};
use crate::store::{CellStore, MemoryStore};
use crate::types::{CellAddress, CellCoord, CellResult, CellState, SheetId};
use colored::Colorize;
use serde::Serialize;

/// The CLI works on a single in-memory sheet
const SHEET: SheetId = SheetId(1);

/// Parse a `A1=VALUE` assignment. Everything after the first `=` is the raw
/// input, so `A3==A1-A2` assigns the formula `=A1-A2`.
pub fn parse_assignment(text: &str) -> GridcalcResult<(CellCoord, String)> {
    let (cell, raw) = text.split_once('=').ok_or_else(|| {
        GridcalcError::InvalidReference(format!(
            "expected CELL=VALUE (e.g. A1=42 or A3==A1*2), got '{}'",
            text
        ))
    })?;
    Ok((cell.trim().parse()?, raw.to_string()))
}

/// Format a result for terminal display
fn format_result(result: &CellResult) -> String {
    match result {
        Ok(value) => value.as_text().bold().green().to_string(),
        Err(err) => err.to_string().red().to_string(),
    }
}

#[derive(Debug, Serialize)]
struct CellRow {
    cell: String,
    raw: String,
    result: CellResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<CellState>,
}

#[derive(Debug, Serialize)]
struct Edit {
    cell: String,
    raw: String,
    report: RecalcReport,
}

#[derive(Debug, Serialize)]
struct CalcOutput {
    edits: Vec<Edit>,
    cells: Vec<CellRow>,
}

/// Write one cell the way an application would: store first, then engine.
fn apply(
    engine: &Engine,
    store: &MemoryStore,
    coord: CellCoord,
    raw: &str,
) -> GridcalcResult<RecalcReport> {
    store.write(CellAddress::new(SHEET, coord), raw);
    engine.on_cell_written(store, SHEET, coord.row, coord.col, raw)
}

/// Build a sheet from `--cell` assignments, in order
fn seed(engine: &Engine, store: &MemoryStore, cells: &[String]) -> GridcalcResult<()> {
    for assignment in cells {
        let (coord, raw) = parse_assignment(assignment)?;
        apply(engine, store, coord, &raw)?;
    }
    Ok(())
}

fn sheet_rows(engine: &Engine, store: &MemoryStore) -> Vec<CellRow> {
    store
        .addresses(SHEET)
        .into_iter()
        .filter_map(|addr| {
            let cell = store.get_cell(&addr)?;
            Some(CellRow {
                cell: addr.coord.to_string(),
                result: cell.result(),
                raw: cell.value,
                state: engine.cell_state(&addr),
            })
        })
        .collect()
}

fn print_report(report: &RecalcReport) {
    if report.is_empty() {
        println!("      (no formulas affected)");
    }
    for (coord, result) in &report.recomputed {
        println!(
            "      {} -> {}",
            coord.to_string().bright_blue(),
            format_result(result)
        );
    }
    for cycle in &report.cycles {
        let members: Vec<String> = cycle.iter().map(|c| c.to_string()).collect();
        println!(
            "      {} {}",
            "⚠️  circular reference:".yellow(),
            members.join(" -> ")
        );
    }
}

/// Execute the eval command
pub fn eval(
    formula: String,
    cells: Vec<String>,
    json: bool,
    config: EngineConfig,
) -> GridcalcResult<()> {
    let engine = Engine::new(config);
    let store = MemoryStore::new();
    seed(&engine, &store, &cells)?;

    let result = engine.evaluate_formula(&store, SHEET, &formula);

    if json {
        #[derive(Serialize)]
        struct EvalOutput<'a> {
            formula: &'a str,
            result: &'a CellResult,
        }
        let output = EvalOutput {
            formula: &formula,
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} = {}", formula.bright_yellow(), format_result(&result));
    Ok(())
}

/// Execute the calc command
pub fn calc(
    cells: Vec<String>,
    sets: Vec<String>,
    json: bool,
    config: EngineConfig,
) -> GridcalcResult<()> {
    let engine = Engine::new(config);
    let store = MemoryStore::new();
    seed(&engine, &store, &cells)?;

    let mut edits = Vec::new();
    for assignment in &sets {
        let (coord, raw) = parse_assignment(assignment)?;
        let report = apply(&engine, &store, coord, &raw)?;
        edits.push(Edit {
            cell: coord.to_string(),
            raw,
            report,
        });
    }

    let rows = sheet_rows(&engine, &store);

    if json {
        let output = CalcOutput { edits, cells: rows };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "🧮 Gridcalc - Sheet".bold().green());
    println!("   Cells: {}\n", rows.len());

    for edit in &edits {
        println!(
            "   ✏️  {} := {}",
            edit.cell.bright_blue().bold(),
            edit.raw.bright_yellow()
        );
        print_report(&edit.report);
    }
    if !edits.is_empty() {
        println!();
    }

    println!("{}", "✅ Values:".bold().green());
    for row in &rows {
        if row.raw.starts_with('=') {
            println!(
                "   {} {} = {}",
                row.cell.bright_blue(),
                row.raw.bright_yellow(),
                format_result(&row.result)
            );
        } else {
            println!("   {} = {}", row.cell.bright_blue(), format_result(&row.result));
        }
    }

    Ok(())
}

/// Execute the audit command: show what a cell reads and what reads it
pub fn audit(cell: String, cells: Vec<String>, config: EngineConfig) -> GridcalcResult<()> {
    let engine = Engine::new(config);
    let store = MemoryStore::new();
    seed(&engine, &store, &cells)?;

    let coord: CellCoord = cell.trim().parse()?;
    let addr = CellAddress::new(SHEET, coord);

    println!("{}", "🔍 Gridcalc - Audit Trail".bold().green());
    println!("   Cell: {}\n", coord.to_string().bright_blue().bold());

    match store.get_cell(&addr) {
        Some(c) => {
            println!("   Raw: {}", c.value.bright_yellow());
            println!("   Value: {}", format_result(&c.result()));
        }
        None => println!("   (empty cell)"),
    }
    if let Some(state) = engine.cell_state(&addr) {
        println!("   State: {:?}", state);
    }
    println!();

    let list = |coords: Vec<CellCoord>| -> String {
        if coords.is_empty() {
            "none".dimmed().to_string()
        } else {
            coords
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
    };

    println!("{}", "🌳 Dependencies:".bold().cyan());
    println!("   Reads:   {}", list(engine.precedents(&addr)));
    println!("   Read by: {}", list(engine.dependents(&addr)));

    Ok(())
}

/// Execute the functions command
pub fn functions() -> GridcalcResult<()> {
    println!("{}", "📚 Built-in functions".bold().green());
    for spec in BUILTINS {
        println!(
            "   {:<12} {} argument(s)",
            spec.name.bright_blue(),
            spec.arity
        );
    }
    println!("\n   {} functions", BUILTINS.len());
    Ok(())
}
