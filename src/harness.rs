//! Timing harness and parameter sweep
//!
//! The manual repetition policy: for every configuration of a [`Sweep`] that
//! the scenario accepts, prepare fresh inputs, time one engine call, repeat
//! `repeat` times and record `sum / repeat` in the [`ResultTable`].
//! Input preparation is never timed. Engine failures abort the sweep.

use crate::engine::Engine;
use crate::error::ConfigError;
use crate::results::ResultTable;
use crate::scenario::Scenario;
use crate::stats::{format_seconds, TimingSummary};
use crate::workload::Shape;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::hint::black_box;
use std::time::{Duration, Instant};

/// Trials per configuration unless overridden
pub const DEFAULT_REPEAT: usize = 20;

/// Row counts and cardinalities swept by default
pub const DEFAULT_AXIS: [usize; 3] = [100, 100_000, 100_000_000];

/// Measure wall-clock time for a synchronous operation
pub fn measure<F, R>(f: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    (result, elapsed)
}

/// Cross product of row counts and cardinalities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sweep {
    n_rows: Vec<usize>,
    n_categories: Vec<usize>,
}

impl Sweep {
    /// Validate the axes.
    ///
    /// Every value must be positive and every feasible pair must tile
    /// evenly. Infeasible pairs (`cardinality > n_rows`) are allowed; they
    /// are skipped during the sweep.
    pub fn new(n_rows: Vec<usize>, n_categories: Vec<usize>) -> Result<Self, ConfigError> {
        if n_rows.is_empty() {
            return Err(ConfigError::EmptyAxis("n_rows"));
        }
        if n_categories.is_empty() {
            return Err(ConfigError::EmptyAxis("n_categories"));
        }
        for &rows in &n_rows {
            for &cats in &n_categories {
                if Shape::is_feasible(cats, rows) || rows == 0 || cats == 0 {
                    Shape::new(cats, rows)?;
                }
            }
        }
        Ok(Self {
            n_rows,
            n_categories,
        })
    }

    /// `[100, 100_000, 100_000_000]` on both axes
    pub fn standard() -> Self {
        Self {
            n_rows: DEFAULT_AXIS.to_vec(),
            n_categories: DEFAULT_AXIS.to_vec(),
        }
    }

    pub fn n_rows(&self) -> &[usize] {
        &self.n_rows
    }

    pub fn n_categories(&self) -> &[usize] {
        &self.n_categories
    }

    /// Every `(n_rows, cardinality)` pair, row-major
    pub fn configurations(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.n_rows
            .iter()
            .flat_map(move |&rows| self.n_categories.iter().map(move |&cats| (rows, cats)))
    }

    /// The shapes `scenario` will be timed at
    pub fn shapes_for(&self, scenario: Scenario) -> Vec<Shape> {
        self.configurations()
            .filter(|&(rows, cats)| scenario.applies(cats, rows))
            .filter_map(|(rows, cats)| Shape::new(cats, rows).ok())
            .collect()
    }
}

impl Default for Sweep {
    fn default() -> Self {
        Self::standard()
    }
}

/// Everything a sweep produced
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub table: ResultTable,
    pub summaries: Vec<TimingSummary>,
    pub skipped: Vec<(usize, usize)>,
}

/// Runs scenarios against one engine with the manual repetition policy
pub struct Harness<'e> {
    engine: &'e Engine,
    repeat: usize,
}

impl<'e> Harness<'e> {
    pub fn new(engine: &'e Engine, repeat: usize) -> Result<Self, ConfigError> {
        if repeat == 0 {
            return Err(ConfigError::ZeroRepeat);
        }
        Ok(Self { engine, repeat })
    }

    pub fn repeat(&self) -> usize {
        self.repeat
    }

    /// Time one configuration `repeat` times
    pub fn time_configuration(&self, scenario: Scenario, shape: &Shape) -> Result<Vec<Duration>> {
        let mut samples = Vec::with_capacity(self.repeat);
        for trial in 0..self.repeat {
            let workload = scenario
                .prepare(shape)
                .with_context(|| format!("Failed to prepare {} at {}", scenario, shape))?;

            let (rows, elapsed) = measure(|| workload.execute(self.engine));
            let rows = rows.with_context(|| {
                format!("{} failed at {} (trial {})", scenario, shape, trial + 1)
            })?;
            black_box(rows);

            samples.push(elapsed);
        }
        Ok(samples)
    }

    /// Sweep `scenario` across every configuration it accepts
    pub fn run(&self, scenario: Scenario, sweep: &Sweep) -> Result<SweepOutcome> {
        let mut outcome = SweepOutcome::default();

        for (rows, cats) in sweep.configurations() {
            if !scenario.applies(cats, rows) {
                debug!("Skipping {}: cardinality {} > n_rows {}", scenario, cats, rows);
                outcome.skipped.push((rows, cats));
                continue;
            }
            let shape = Shape::new(cats, rows)?;

            let samples = self.time_configuration(scenario, &shape)?;
            let total: Duration = samples.iter().sum();
            let mean = total.as_secs_f64() / self.repeat as f64;
            outcome.table.record(rows, cats, mean);

            if let Some(summary) = TimingSummary::from_samples(&shape, &samples) {
                info!(
                    "{} {}: mean {} (median {}, CV {:.2}%)",
                    scenario,
                    shape,
                    format_seconds(mean),
                    format_seconds(summary.median_secs),
                    summary.coefficient_of_variation * 100.0
                );
                outcome.summaries.push(summary);
            }
        }

        Ok(outcome)
    }
}
