//! Running a configuration over many seeds.

use std::collections::BTreeMap;

use tracing::instrument;

use crate::{
    chaos::{get_assertion_results, validate_assertion_contracts, AssertionStats},
    protocol::RecordingSink,
    SimulationConfig, SimulationResult,
};

use super::{driver::Simulation, report::SimulationReport};

/// How many iterations a batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationControl {
    /// Run exactly this many iterations.
    FixedCount(usize),
    /// Run until every `sometimes_assert!` has held at least once, or until
    /// the given number of iterations.
    UntilAllSometimesReached(usize),
}

/// Builder for batches of seeded simulation runs.
///
/// Explicit seeds from [`set_seeds`](Self::set_seeds) are used first. Further
/// iterations use `config.seed`, `config.seed + 1`, and so on, so a batch is
/// reproducible from its configuration alone.
///
/// ```rust
/// use rdt_sim::{SimulationBuilder, SimulationConfig};
///
/// let report = SimulationBuilder::new()
///     .config(SimulationConfig::default().with_max_messages(5))
///     .set_iterations(3)
///     .run()
///     .expect("valid configuration");
/// assert_eq!(report.iterations, 3);
/// assert_eq!(report.seeds_used, vec![9999, 10000, 10001]);
/// ```
#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    config: SimulationConfig,
    iteration_control: IterationControl,
    seeds: Vec<u64>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    /// A single iteration of the default configuration.
    pub fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
            iteration_control: IterationControl::FixedCount(1),
            seeds: Vec::new(),
        }
    }

    /// Set the configuration shared by every iteration.
    pub fn config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Run a fixed number of iterations.
    pub fn set_iterations(mut self, iterations: usize) -> Self {
        self.iteration_control = IterationControl::FixedCount(iterations);
        self
    }

    /// Set the iteration control strategy.
    pub fn set_iteration_control(mut self, control: IterationControl) -> Self {
        self.iteration_control = control;
        self
    }

    /// Keep running until every recorded protocol path was reached.
    pub fn run_until_all_sometimes_reached(mut self, safety_limit: usize) -> Self {
        self.iteration_control = IterationControl::UntilAllSometimesReached(safety_limit);
        self
    }

    /// Seeds for the first iterations, typically to replay a failing run.
    pub fn set_seeds(mut self, seeds: Vec<u64>) -> Self {
        self.seeds = seeds;
        self
    }

    fn seed_for(&self, iteration: usize) -> u64 {
        self.seeds
            .get(iteration)
            .copied()
            .unwrap_or_else(|| self.config.seed.wrapping_add(iteration as u64))
    }

    /// Execute the batch.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfiguration`](crate::SimulationError::InvalidConfiguration)
    /// before running anything if the configuration is invalid. Errors of
    /// individual runs are collected in the report instead.
    #[instrument(skip_all)]
    pub fn run(self) -> SimulationResult<SimulationReport> {
        self.config.validate()?;

        let limit = match self.iteration_control {
            IterationControl::FixedCount(n) | IterationControl::UntilAllSometimesReached(n) => n,
        };
        let until_reached = matches!(
            self.iteration_control,
            IterationControl::UntilAllSometimesReached(_)
        );

        let mut individual_metrics = Vec::new();
        let mut seeds_used = Vec::new();
        let mut seeds_failing = Vec::new();
        let mut successful_runs = 0;
        let mut failed_runs = 0;
        let mut assertion_results: BTreeMap<String, AssertionStats> = BTreeMap::new();

        for iteration in 0..limit {
            let seed = self.seed_for(iteration);
            seeds_used.push(seed);

            let config = self.config.clone().with_seed(seed);
            let result = Simulation::new(config, RecordingSink::new())
                .and_then(|mut simulation| simulation.run());

            for (name, stats) in get_assertion_results() {
                assertion_results.entry(name).or_default().merge(&stats);
            }

            match &result {
                Ok(metrics) => {
                    successful_runs += 1;
                    tracing::info!(
                        target: "rdt_sim::driver",
                        iteration,
                        seed,
                        delivered = metrics.receiver.delivered,
                        "iteration completed"
                    );
                }
                Err(error) => {
                    failed_runs += 1;
                    seeds_failing.push(seed);
                    tracing::error!(
                        target: "rdt_sim::driver",
                        iteration,
                        seed,
                        %error,
                        "iteration failed"
                    );
                }
            }
            individual_metrics.push(result);

            if until_reached
                && !assertion_results.is_empty()
                && validate_assertion_contracts(&assertion_results).is_empty()
            {
                tracing::debug!(
                    target: "rdt_sim::driver",
                    iterations = iteration + 1,
                    "all sometimes assertions reached"
                );
                break;
            }
        }

        if failed_runs > 0 {
            tracing::warn!(
                target: "rdt_sim::driver",
                failed_runs,
                seeds = ?seeds_failing,
                "some iterations failed"
            );
        }

        let assertion_violations = validate_assertion_contracts(&assertion_results);
        Ok(SimulationReport {
            iterations: seeds_used.len(),
            successful_runs,
            failed_runs,
            individual_metrics,
            seeds_used,
            seeds_failing,
            assertion_results,
            assertion_violations,
        })
    }
}
