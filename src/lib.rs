//! mendel: a garden-mutation layout optimizer.
//!
//! Given a catalog of mutation kinds, a bounded 10x10 plot with some cells
//! unlocked, and either a wishlist workload or a free objective, the engine
//! computes a near-optimal board: which mutation occupies which footprint,
//! which crops feed which mutations, which cells stay reserved empty.
//!
//! The two library entry points are [optimize] (workload-driven, multi-
//! strategy) and [optimize_layout] (objective-driven annealing over an
//! allowed pool). Both are deterministic for a fixed seed.

pub mod catalog;
pub mod cli;
pub mod garden;
pub mod optimizer;
pub mod output;
pub mod parallel;

use std::collections::BTreeSet;

use catalog::{Catalog, CatalogError, CatalogParser};
use garden::Cell;
use optimizer::{
    MultiStrategyOptimizer, ObjectiveConfig, ObjectiveOutcome, ScoreBreakdown, Workload,
};
use output::{build_output, empty_output, LayoutOutput};

/// Optimize a workload and return the host-facing grid projection.
pub fn optimize(
    catalog: Catalog,
    workload: &Workload,
    unlocked: &BTreeSet<Cell>,
) -> Result<LayoutOutput, CatalogError> {
    optimize_with_breakdown(catalog, workload, unlocked, 0).map(|(output, _, _)| output)
}

/// Like [optimize], but also returns the score breakdown and the name of
/// the winning strategy.
pub fn optimize_with_breakdown(
    catalog: Catalog,
    workload: &Workload,
    unlocked: &BTreeSet<Cell>,
    seed: u64,
) -> Result<(LayoutOutput, ScoreBreakdown, String), CatalogError> {
    let mut optimizer = MultiStrategyOptimizer::with_seed(catalog, seed);
    let result = optimizer.optimize(workload, unlocked)?;
    let output = if result.state.placements.is_empty() {
        empty_output(unlocked)
    } else {
        build_output(&result.state, optimizer.parser_mut().catalog())
    };
    Ok((output, result.breakdown, result.strategy))
}

/// Every strategy's projected result, fittest first.
pub fn optimize_all(
    catalog: Catalog,
    workload: &Workload,
    unlocked: &BTreeSet<Cell>,
    seed: u64,
) -> Result<Vec<(LayoutOutput, ScoreBreakdown, String)>, CatalogError> {
    let mut optimizer = MultiStrategyOptimizer::with_seed(catalog, seed);
    let results = optimizer.optimize_all(workload, unlocked)?;
    let raw_catalog = optimizer.parser_mut().catalog().clone();
    Ok(results
        .into_iter()
        .map(|result| {
            let output = if result.state.placements.is_empty() {
                empty_output(unlocked)
            } else {
                build_output(&result.state, &raw_catalog)
            };
            (output, result.breakdown, result.strategy)
        })
        .collect())
}

/// Objective-driven search over an allowed pool of mutations.
pub fn optimize_layout(
    catalog: Catalog,
    unlocked: &BTreeSet<Cell>,
    allowed: &[String],
    config: &ObjectiveConfig,
    seed: u64,
) -> Result<ObjectiveOutcome, CatalogError> {
    let mut parser = CatalogParser::new(catalog);
    optimizer::objective::optimize_layout(&mut parser, unlocked, allowed, config, seed, |_| true)
}
