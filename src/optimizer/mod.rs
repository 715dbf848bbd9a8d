//! The optimization stack: greedy construction, bulk fast path, simulated
//! annealing, a genetic layer, and the multi-strategy driver that runs them
//! all and keeps the fittest layout.

pub mod annealing;
pub mod bulk;
pub mod fitness;
pub mod genetic;
pub mod greedy;
pub mod objective;
pub mod progress;
pub mod rng;
pub mod scoring;

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{Catalog, CatalogError, CatalogParser};
use crate::garden::{Cell, State};
use crate::parallel::WorkerPool;

pub use annealing::{refine_layout, AnnealingParams};
pub use bulk::{build_bulk_layout, dominant_mutation, CropPattern};
pub use fitness::{FitnessCalculator, ScoreBreakdown};
pub use genetic::{evolve_layout, GeneticParams};
pub use greedy::{build_layout, expand_workload};
pub use objective::{
    optimize_layout, optimize_layout_batched, HistoryPoint, Objective, ObjectiveConfig,
    ObjectiveOutcome,
};
pub use progress::Progress;
pub use rng::{mix_seed, Rng};
pub use scoring::{score_placement, StrategyProfile, STRATEGY_PROFILES};

/// Requested quantities per mutation id.
pub type Workload = BTreeMap<String, u32>;

/// One strategy's final layout and its fitness breakdown.
#[derive(Debug, Clone)]
pub struct StrategyResult {
    pub strategy: String,
    pub state: State,
    pub breakdown: ScoreBreakdown,
}

/// A unit of strategy work for the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategyJob {
    Profile(usize),
    Genetic,
    Bulk,
}

impl StrategyJob {
    fn label(self) -> &'static str {
        match self {
            Self::Profile(index) => STRATEGY_PROFILES[index].name,
            Self::Genetic => "genetic",
            Self::Bulk => "bulk",
        }
    }
}

/// Runs every strategy against a workload and returns the fittest layout.
/// Owns its parser cache and a master seed; identical inputs and seed give
/// identical results.
#[derive(Debug, Clone)]
pub struct MultiStrategyOptimizer {
    parser: CatalogParser,
    seed: u64,
    annealing: AnnealingParams,
    genetic: GeneticParams,
}

impl MultiStrategyOptimizer {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_seed(catalog, 0)
    }

    pub fn with_seed(catalog: Catalog, seed: u64) -> Self {
        Self {
            parser: CatalogParser::new(catalog),
            seed,
            annealing: AnnealingParams::default(),
            genetic: GeneticParams::default(),
        }
    }

    /// Override the annealing schedule (tests and hosts with a latency cap).
    pub fn with_annealing(mut self, params: AnnealingParams) -> Self {
        self.annealing = params;
        self
    }

    pub fn parser_mut(&mut self) -> &mut CatalogParser {
        &mut self.parser
    }

    /// Best strategy only.
    pub fn optimize(
        &mut self,
        workload: &Workload,
        unlocked: &BTreeSet<Cell>,
    ) -> Result<StrategyResult, CatalogError> {
        self.optimize_with_progress(workload, unlocked, |_| true)
    }

    /// Best strategy, with the host's progress callback threaded through
    /// every annealing phase. A `false` return aborts the current phase;
    /// completed strategies still compete.
    pub fn optimize_with_progress<F>(
        &mut self,
        workload: &Workload,
        unlocked: &BTreeSet<Cell>,
        mut on_progress: F,
    ) -> Result<StrategyResult, CatalogError>
    where
        F: FnMut(&Progress) -> bool,
    {
        let mut results = self.run_jobs(workload, unlocked, &mut on_progress)?;
        Ok(results.remove(0))
    }

    /// Every strategy's result, fittest first, for side-by-side comparison.
    pub fn optimize_all(
        &mut self,
        workload: &Workload,
        unlocked: &BTreeSet<Cell>,
    ) -> Result<Vec<StrategyResult>, CatalogError> {
        self.run_jobs(workload, unlocked, &mut |_| true)
    }

    /// Like [MultiStrategyOptimizer::optimize_all], but strategies run
    /// concurrently on the worker pool. Each job derives its own seed, so
    /// the results match the sequential path exactly.
    pub fn optimize_all_with_pool(
        &self,
        workload: &Workload,
        unlocked: &BTreeSet<Cell>,
        pool: &WorkerPool,
    ) -> Result<Vec<StrategyResult>, CatalogError> {
        use rayon::prelude::*;

        if total_quantity(workload) == 0 {
            let mut parser = self.parser.clone();
            return Ok(vec![empty_result(unlocked, &mut parser)]);
        }

        let jobs = self.job_list(workload)?;
        let outcomes: Result<Vec<Option<StrategyResult>>, CatalogError> = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let mut parser = self.parser.clone();
                    run_strategy_job(
                        &mut parser,
                        *job,
                        workload,
                        unlocked,
                        self.seed,
                        &self.annealing,
                        &self.genetic,
                        &mut |_| true,
                    )
                })
                .collect()
        });
        let mut results: Vec<StrategyResult> = outcomes?.into_iter().flatten().collect();
        sort_results(&mut results);
        Ok(results)
    }

    fn job_list(&self, workload: &Workload) -> Result<Vec<StrategyJob>, CatalogError> {
        let mut jobs: Vec<StrategyJob> =
            (0..STRATEGY_PROFILES.len()).map(StrategyJob::Profile).collect();
        jobs.push(StrategyJob::Genetic);
        let mut parser = self.parser.clone();
        if bulk::dominant_mutation(&mut parser, workload)?.is_some() {
            jobs.push(StrategyJob::Bulk);
        }
        Ok(jobs)
    }

    fn run_jobs<F>(
        &mut self,
        workload: &Workload,
        unlocked: &BTreeSet<Cell>,
        on_progress: &mut F,
    ) -> Result<Vec<StrategyResult>, CatalogError>
    where
        F: FnMut(&Progress) -> bool,
    {
        if total_quantity(workload) == 0 {
            return Ok(vec![empty_result(unlocked, &mut self.parser)]);
        }

        // Fail fast on unknown ids before any strategy spends time.
        greedy::expand_workload(&mut self.parser, workload)?;

        let jobs = self.job_list(workload)?;
        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            let outcome = run_strategy_job(
                &mut self.parser,
                job,
                workload,
                unlocked,
                self.seed,
                &self.annealing,
                &self.genetic,
                on_progress,
            )?;
            if let Some(result) = outcome {
                results.push(result);
            }
        }
        sort_results(&mut results);
        Ok(results)
    }
}

fn total_quantity(workload: &Workload) -> u32 {
    workload.values().sum()
}

fn empty_result(unlocked: &BTreeSet<Cell>, parser: &mut CatalogParser) -> StrategyResult {
    let state = State::new(unlocked);
    let mut fitness = FitnessCalculator::new();
    let breakdown = fitness.evaluate(&state, 0, parser);
    StrategyResult {
        strategy: "empty".to_string(),
        state,
        breakdown,
    }
}

fn sort_results(results: &mut [StrategyResult]) {
    results.sort_by(|a, b| {
        b.breakdown
            .total_score
            .total_cmp(&a.breakdown.total_score)
            .then_with(|| a.strategy.cmp(&b.strategy))
    });
}

/// Run one strategy end to end: construct, anneal, evaluate.
#[allow(clippy::too_many_arguments)]
fn run_strategy_job<F>(
    parser: &mut CatalogParser,
    job: StrategyJob,
    workload: &Workload,
    unlocked: &BTreeSet<Cell>,
    seed: u64,
    annealing_params: &AnnealingParams,
    genetic_params: &GeneticParams,
    on_progress: &mut F,
) -> Result<Option<StrategyResult>, CatalogError>
where
    F: FnMut(&Progress) -> bool,
{
    let target = total_quantity(workload) as usize;
    let mut fitness = FitnessCalculator::new();
    let mut job_rng = Rng::new(mix_seed(seed, job.label()));

    let (profile, constructed) = match job {
        StrategyJob::Profile(index) => {
            let profile = STRATEGY_PROFILES[index];
            let state =
                greedy::build_layout(parser, workload, unlocked, &profile, &mut job_rng)?;
            (profile, state)
        }
        StrategyJob::Genetic => {
            let profile = StrategyProfile::default();
            let state = genetic::evolve_layout(
                parser,
                &mut fitness,
                workload,
                unlocked,
                &profile,
                target,
                genetic_params,
                &mut job_rng,
            )?;
            (profile, state)
        }
        StrategyJob::Bulk => {
            let profile = StrategyProfile::default();
            let Some(state) =
                bulk::build_bulk_layout(parser, workload, unlocked, &profile, &mut job_rng)?
            else {
                return Ok(None);
            };
            (profile, state)
        }
    };

    let refined = annealing::refine_layout(
        constructed,
        target,
        &profile,
        annealing_params,
        parser,
        &mut fitness,
        &mut job_rng,
        &mut *on_progress,
    );
    let breakdown = fitness.evaluate(&refined, target, parser);
    Ok(Some(StrategyResult {
        strategy: job.label().to_string(),
        state: refined,
        breakdown,
    }))
}
