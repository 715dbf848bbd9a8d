//! Command-line surface: `optimize` runs the multi-strategy engine on a
//! workload file, `objective` runs the free-objective annealer, `validate`
//! checks a catalog. The library entry points in `lib.rs` stay the real
//! interface; this is a thin operator's console around them.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use crate::catalog::{load_catalog, validate_catalog, Catalog, CatalogError};
use crate::garden::{full_unlocked, Cell, GRID_SIZE};
use crate::optimizer::{Objective, ObjectiveConfig, Workload};
use crate::output::{build_output, encode_layout, render_ascii};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Optimize,
    Objective,
    Validate,
    Describe,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("optimize") => Some(Command::Optimize),
        Some("objective") => Some(Command::Objective),
        Some("validate") => Some(Command::Validate),
        Some("describe") => Some(Command::Describe),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Optimize) => handle_optimize(args),
        Some(Command::Objective) => handle_objective(args),
        Some(Command::Validate) => handle_validate(args),
        Some(Command::Describe) => handle_describe(args),
        None => {
            eprintln!("usage: mendel <optimize|objective|validate|describe>");
            2
        }
    }
}

fn handle_optimize(args: &[String]) -> i32 {
    let (Some(catalog_path), Some(workload_path)) = (args.get(2), args.get(3)) else {
        eprintln!("usage: mendel optimize <catalog.json> <workload.json> [--seed N] [--unlocked cells.json] [--all]");
        return 2;
    };
    let Some(catalog) = load_catalog(catalog_path) else {
        eprintln!("failed to load catalog from {catalog_path}");
        return 1;
    };
    let workload = match load_workload(workload_path) {
        Ok(workload) => workload,
        Err(message) => {
            eprintln!("{message}");
            return 1;
        }
    };
    let unlocked = match unlocked_from_args(args) {
        Ok(unlocked) => unlocked,
        Err(message) => {
            eprintln!("{message}");
            return 1;
        }
    };
    let seed = parse_u64_flag(args, "--seed", 0);

    if args.iter().any(|arg| arg == "--all") {
        return print_all_strategies(catalog, &workload, &unlocked, seed);
    }

    match crate::optimize_with_breakdown(catalog, &workload, &unlocked, seed) {
        Ok((output, breakdown, strategy)) => {
            println!("strategy: {strategy}");
            println!(
                "placed {}/{} ({}%), crops {} ({} shared), synergies {}, score {:.1}",
                breakdown.placed,
                breakdown.requested,
                (breakdown.placement_rate * 100.0).round(),
                breakdown.total_crops,
                breakdown.shared_crops,
                breakdown.synergies,
                breakdown.total_score,
            );
            print!("{}", render_ascii(&output));
            println!("encoded: {}", encode_layout(&output));
            0
        }
        Err(err) => {
            eprintln!("optimize failed: {err}");
            1
        }
    }
}

fn print_all_strategies(
    catalog: Catalog,
    workload: &Workload,
    unlocked: &BTreeSet<Cell>,
    seed: u64,
) -> i32 {
    match crate::optimize_all(catalog, workload, unlocked, seed) {
        Ok(results) => {
            for (_, breakdown, strategy) in &results {
                println!(
                    "{strategy:<18} placed {}/{} score {:.1}",
                    breakdown.placed, breakdown.requested, breakdown.total_score
                );
            }
            if let Some((output, _, strategy)) = results.first() {
                println!("best: {strategy}");
                print!("{}", render_ascii(output));
            }
            0
        }
        Err(err) => {
            eprintln!("optimize failed: {err}");
            1
        }
    }
}

fn handle_objective(args: &[String]) -> i32 {
    let (Some(catalog_path), Some(allowed_path)) = (args.get(2), args.get(3)) else {
        eprintln!("usage: mendel objective <catalog.json> <allowed.json> [--profit] [--preset quick|thorough] [--seed N]");
        return 2;
    };
    let Some(catalog) = load_catalog(catalog_path) else {
        eprintln!("failed to load catalog from {catalog_path}");
        return 1;
    };
    let allowed: Vec<String> = match fs::read_to_string(allowed_path)
        .ok()
        .and_then(|data| serde_json::from_str(&data).ok())
    {
        Some(ids) => ids,
        None => {
            eprintln!("failed to load allowed pool from {allowed_path}");
            return 1;
        }
    };

    let objective = if args.iter().any(|arg| arg == "--profit") {
        Objective::MaxProfit
    } else {
        Objective::MaxCount
    };
    let config = match args
        .iter()
        .position(|arg| arg == "--preset")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
    {
        Some("quick") => ObjectiveConfig::quick(objective),
        Some("thorough") => ObjectiveConfig::thorough(objective),
        _ => ObjectiveConfig::standard(objective),
    };
    let seed = parse_u64_flag(args, "--seed", 0);
    let unlocked = match unlocked_from_args(args) {
        Ok(unlocked) => unlocked,
        Err(message) => {
            eprintln!("{message}");
            return 1;
        }
    };

    match crate::optimize_layout(catalog.clone(), &unlocked, &allowed, &config, seed) {
        Ok(outcome) => {
            println!(
                "iterations {}, placed {}, final score {:.1}, best score {:.1}",
                outcome.iterations,
                outcome.state.placements.len(),
                outcome.final_score,
                outcome.best_score,
            );
            let output = build_output(&outcome.state, &catalog);
            print!("{}", render_ascii(&output));
            0
        }
        Err(err) => {
            eprintln!("objective run failed: {err}");
            1
        }
    }
}

fn handle_validate(args: &[String]) -> i32 {
    let Some(catalog_path) = args.get(2) else {
        eprintln!("usage: mendel validate <catalog.json>");
        return 2;
    };
    let Some(catalog) = load_catalog(catalog_path) else {
        eprintln!("failed to load catalog from {catalog_path}");
        return 1;
    };
    let report = validate_catalog(&catalog);
    for diagnostic in &report.diagnostics {
        println!(
            "{}: {}: {}",
            diagnostic.severity, diagnostic.context, diagnostic.message
        );
    }
    if report.has_errors() {
        1
    } else {
        println!(
            "{} entries ok ({} diagnostics)",
            catalog.len(),
            report.diagnostics.len()
        );
        0
    }
}

fn handle_describe(args: &[String]) -> i32 {
    let (Some(catalog_path), Some(query)) = (args.get(2), args.get(3)) else {
        eprintln!("usage: mendel describe <catalog.json> <name-or-id>");
        return 2;
    };
    let Some(catalog) = load_catalog(catalog_path) else {
        eprintln!("failed to load catalog from {catalog_path}");
        return 1;
    };
    let Some((id, record)) = crate::catalog::resolve_mutation(&catalog, query) else {
        eprintln!("no mutation matches '{query}'");
        return 1;
    };
    let id = id.to_string();
    println!("{} ({id}), tier {}, size {}", record.name, record.tier, record.size);

    let mut parser = crate::catalog::CatalogParser::new(catalog);
    match parser.parse(&id) {
        Ok(parsed) => {
            if parsed.isolated {
                println!("  isolation: no crops allowed in the adjacency ring");
            }
            if parsed.special {
                println!("  special: cannot be auto-placed");
            }
            for (crop, count) in &parsed.crops {
                println!("  crop: {count} x {crop}");
            }
            for (dep, count) in &parsed.deps {
                println!("  adjacent: {count} x {dep}");
            }
            for effect in &parsed.effects {
                println!("  effect: {}", effect.as_str());
            }
            0
        }
        Err(err) => {
            eprintln!("describe failed: {err}");
            1
        }
    }
}

/// Load a workload file: a JSON object of id -> quantity. Negative
/// quantities are precondition violations; zero entries are dropped.
fn load_workload(path: &str) -> Result<Workload, String> {
    let data = fs::read_to_string(path).map_err(|err| format!("failed to read {path}: {err}"))?;
    let raw: BTreeMap<String, i64> =
        serde_json::from_str(&data).map_err(|err| format!("failed to parse {path}: {err}"))?;
    let mut workload = Workload::new();
    for (id, quantity) in raw {
        if quantity < 0 {
            return Err(CatalogError::InvalidQuantity { id, quantity }.to_string());
        }
        if quantity > 0 {
            workload.insert(id, quantity as u32);
        }
    }
    Ok(workload)
}

/// Unlocked cells from `--unlocked cells.json` (a JSON array of `[x, y]`
/// pairs), defaulting to the full board.
fn unlocked_from_args(args: &[String]) -> Result<BTreeSet<Cell>, String> {
    let Some(path) = args
        .iter()
        .position(|arg| arg == "--unlocked")
        .and_then(|i| args.get(i + 1))
    else {
        return Ok(full_unlocked());
    };
    let data = fs::read_to_string(path).map_err(|err| format!("failed to read {path}: {err}"))?;
    let pairs: Vec<(u8, u8)> =
        serde_json::from_str(&data).map_err(|err| format!("failed to parse {path}: {err}"))?;
    let mut cells = BTreeSet::new();
    for (x, y) in pairs {
        if x >= GRID_SIZE || y >= GRID_SIZE {
            return Err(format!("unlocked cell ({x},{y}) is out of range"));
        }
        cells.insert(Cell::new(x, y));
    }
    Ok(cells)
}

fn parse_u64_flag(args: &[String], flag: &str, default: u64) -> u64 {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
