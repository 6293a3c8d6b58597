//! Concurrency tests
//!
//! Sheets recalculate independently: edits to different sheets may run on
//! different threads against one engine and one store.

use royalbit_gridcalc::{CellAddress, CellCoord, Engine, MemoryStore, SheetId, Value};
use std::sync::Barrier;
use std::thread;

fn write(engine: &Engine, store: &MemoryStore, sheet: SheetId, a1: &str, raw: &str) {
    let coord: CellCoord = a1.parse().unwrap();
    store.write(CellAddress::new(sheet, coord), raw);
    engine
        .on_cell_written(store, sheet, coord.row, coord.col, raw)
        .unwrap();
}

fn value(store: &MemoryStore, sheet: SheetId, a1: &str) -> Value {
    store
        .value(&CellAddress::new(sheet, a1.parse().unwrap()))
        .unwrap()
}

/// A1..A50 hold inputs, B1 sums them, B2 derives from B1
fn build(engine: &Engine, store: &MemoryStore, sheet: SheetId) {
    for row in 1..=50 {
        write(engine, store, sheet, &format!("A{}", row), "1");
    }
    write(engine, store, sheet, "B1", "=SUM(A1:A50)");
    write(engine, store, sheet, "B2", "=B1*2");
}

#[test]
fn test_two_sheets_recalculate_in_parallel() {
    let engine = Engine::default();
    let store = MemoryStore::new();
    let sheets = [SheetId(1), SheetId(2)];
    let barrier = Barrier::new(sheets.len());

    thread::scope(|scope| {
        for (i, &sheet) in sheets.iter().enumerate() {
            let (engine, store, barrier) = (&engine, &store, &barrier);
            scope.spawn(move || {
                build(engine, store, sheet);
                barrier.wait();
                let step = (i + 1) as f64;
                for row in 1..=50 {
                    write(engine, store, sheet, &format!("A{}", row), &step.to_string());
                }
            });
        }
    });

    assert_eq!(value(&store, SheetId(1), "B1"), Value::Number(50.0));
    assert_eq!(value(&store, SheetId(1), "B2"), Value::Number(100.0));
    assert_eq!(value(&store, SheetId(2), "B1"), Value::Number(100.0));
    assert_eq!(value(&store, SheetId(2), "B2"), Value::Number(200.0));
}

#[test]
fn test_writes_to_one_sheet_are_serialized() {
    let engine = Engine::default();
    let store = MemoryStore::new();
    let sheet = SheetId(3);
    write(&engine, &store, sheet, "C1", "=SUM(A1:B10)");

    thread::scope(|scope| {
        for col in ["A", "B"] {
            let (engine, store) = (&engine, &store);
            scope.spawn(move || {
                for row in 1..=10 {
                    write(engine, store, sheet, &format!("{}{}", col, row), "2");
                }
            });
        }
    });

    // Whichever write finished last recomputed C1 over every input
    assert_eq!(value(&store, sheet, "C1"), Value::Number(40.0));
}

#[test]
fn test_sheets_do_not_see_each_other() {
    let engine = Engine::default();
    let store = MemoryStore::new();
    write(&engine, &store, SheetId(1), "A1", "5");
    write(&engine, &store, SheetId(2), "B1", "=A1+1");

    assert_eq!(value(&store, SheetId(2), "B1"), Value::Number(1.0));
    write(&engine, &store, SheetId(1), "A1", "6");
    assert_eq!(value(&store, SheetId(2), "B1"), Value::Number(1.0));
}
