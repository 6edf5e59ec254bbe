//! Statistical analysis of repeated timings
//!
//! Summarizes the per-trial durations of one configuration: mean, median,
//! standard deviation, coefficient of variation, 95% confidence interval
//! and IQR outliers.

use crate::workload::Shape;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Statistical summary of the trials of one configuration (seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSummary {
    pub n_rows: usize,
    pub cardinality: usize,
    pub num_runs: usize,
    pub mean_secs: f64,
    pub median_secs: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    pub confidence_interval_95: (f64, f64),
    pub min_secs: f64,
    pub max_secs: f64,
    pub outliers: Vec<f64>,
}

impl TimingSummary {
    /// Compute statistics from the trials of one configuration
    ///
    /// Returns `None` when there are no samples.
    pub fn from_samples(shape: &Shape, samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let times: Vec<f64> = samples.iter().map(Duration::as_secs_f64).collect();
        let n = times.len() as f64;

        // Sum then divide, so the mean matches the recorded table value
        let mean = times.iter().sum::<f64>() / n;

        let mut sorted = times.clone();
        sorted.sort_by(f64::total_cmp);
        let median = if sorted.len() % 2 == 0 {
            (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
        } else {
            sorted[sorted.len() / 2]
        };

        // Sample variance (n - 1), matching the t-distribution used below
        let df = times.len() - 1;
        let variance = if df > 0 {
            times.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / df as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();

        let cv = if mean > 0.0 { std_dev / mean } else { 0.0 };

        let margin = t_value_95(df) * (std_dev / n.sqrt());
        let ci = (mean - margin, mean + margin);

        let q1 = sorted[sorted.len() / 4];
        let q3 = sorted[3 * sorted.len() / 4];
        let iqr = q3 - q1;
        let lower_bound = q1 - 1.5 * iqr;
        let upper_bound = q3 + 1.5 * iqr;
        let outliers = times
            .iter()
            .filter(|&&x| x < lower_bound || x > upper_bound)
            .copied()
            .collect();

        Some(Self {
            n_rows: shape.n_rows(),
            cardinality: shape.cardinality(),
            num_runs: times.len(),
            mean_secs: mean,
            median_secs: median,
            std_dev,
            coefficient_of_variation: cv,
            confidence_interval_95: ci,
            min_secs: sorted[0],
            max_secs: sorted[sorted.len() - 1],
            outliers,
        })
    }

    /// Check if timings are stable (CV < 5%)
    pub fn is_stable(&self) -> bool {
        self.coefficient_of_variation < 0.05
    }
}

/// Two-sided 95% t critical value for `df` degrees of freedom.
///
/// Between tabulated rows the smaller df is used, which widens the interval.
fn t_value_95(df: usize) -> f64 {
    const TABLE: [f64; 30] = [
        12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, // 1..=10
        2.201, 2.179, 2.160, 2.145, 2.131, 2.120, 2.110, 2.101, 2.093, 2.086, // 11..=20
        2.080, 2.074, 2.069, 2.064, 2.060, 2.056, 2.052, 2.048, 2.045, 2.042, // 21..=30
    ];
    match df {
        0 => TABLE[0],
        1..=30 => TABLE[df - 1],
        31..=39 => TABLE[29],
        40..=59 => 2.021,
        60..=119 => 2.000,
        _ => 1.980,
    }
}

/// Format a duration in seconds with a readable unit
pub fn format_seconds(secs: f64) -> String {
    if secs >= 1.0 {
        format!("{:.3} s", secs)
    } else if secs >= 1e-3 {
        format!("{:.3} ms", secs * 1e3)
    } else if secs >= 1e-6 {
        format!("{:.3} µs", secs * 1e6)
    } else {
        format!("{:.0} ns", secs * 1e9)
    }
}
