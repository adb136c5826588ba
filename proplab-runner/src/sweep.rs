//! Parameter sweeps — grid expansion, seeded subsampling, parallel runs.
//!
//! Each grid point is an independent `RunConfig`; each run owns its own
//! simulator with no shared mutable state, so the sweep is an
//! embarrassingly-parallel map over configurations.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use proplab_core::feed::IndicatorFeed;

use crate::config::RunConfig;
use crate::result::BacktestResult;
use crate::runner::{run_backtest, RunError};

/// Parameter grid over the risk/level knobs.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    pub risk_fractions: Vec<f64>,
    pub stop_mults: Vec<f64>,
    pub target_mults: Vec<f64>,
    pub trail_mults: Vec<f64>,
}

impl ParamGrid {
    /// A modest default grid around the aggressive-challenge parameters.
    pub fn default_grid() -> Self {
        Self {
            risk_fractions: vec![0.01, 0.02, 0.03],
            stop_mults: vec![1.0, 1.5, 2.0],
            target_mults: vec![2.0, 3.0, 4.0],
            trail_mults: vec![2.0, 2.5],
        }
    }

    /// Total number of combinations before filtering.
    pub fn size(&self) -> usize {
        self.risk_fractions.len()
            * self.stop_mults.len()
            * self.target_mults.len()
            * self.trail_mults.len()
    }

    /// Expand the grid onto a base config.
    ///
    /// Combinations where the target multiple does not exceed the stop
    /// multiple are skipped (the trade would risk more than it can make).
    pub fn generate_configs(&self, base: &RunConfig) -> Vec<RunConfig> {
        let mut configs = Vec::new();
        for &risk in &self.risk_fractions {
            for &stop in &self.stop_mults {
                for &target in &self.target_mults {
                    if target <= stop {
                        continue;
                    }
                    for &trail in &self.trail_mults {
                        let mut config = base.clone();
                        config.strategy.risk_fraction = risk;
                        config.strategy.stop_volatility_mult = stop;
                        config.strategy.target_volatility_mult = target;
                        config.strategy.trail_volatility_mult = trail;
                        configs.push(config);
                    }
                }
            }
        }
        configs
    }

    /// Draw a reproducible random subset of the expanded grid.
    pub fn sample(&self, base: &RunConfig, n: usize, seed: u64) -> Vec<RunConfig> {
        let mut configs = self.generate_configs(base);
        let mut rng = StdRng::seed_from_u64(seed);
        configs.shuffle(&mut rng);
        configs.truncate(n);
        configs
    }
}

/// Parameter sweep executor.
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every configuration against the shared read-only feed.
    pub fn sweep(
        &self,
        feed: &IndicatorFeed,
        configs: &[RunConfig],
    ) -> Result<SweepResults, RunError> {
        let results: Vec<BacktestResult> = if self.parallel {
            configs
                .par_iter()
                .map(|config| run_backtest(config, feed))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .map(|config| run_backtest(config, feed))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults { results })
    }
}

/// Results from a parameter sweep.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
}

impl SweepResults {
    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results sorted by net profit, best first.
    pub fn sorted_by_net_profit(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| {
            b.metrics
                .net_profit
                .partial_cmp(&a.metrics.net_profit)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&BacktestResult> {
        self.sorted_by_net_profit().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.sorted_by_net_profit().into_iter().next()
    }
}
