//! Result table and report output
//!
//! The table maps `(n_rows, cardinality)` to the mean elapsed seconds of one
//! configuration. It serializes column-oriented, one object per cardinality
//! holding one entry per row count, with `null` where a configuration was
//! skipped:
//!
//! ```text
//! {"100": {"100": 0.0012, "100000": 0.0210},
//!  "100000": {"100": null, "100000": 0.0398}}
//! ```

use crate::error::ConfigError;
use crate::stats::{format_seconds, TimingSummary};
use anyhow::{Context, Result};
use chrono::Local;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Mean seconds keyed by `(n_rows, cardinality)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    cells: BTreeMap<(usize, usize), f64>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the measurement for one configuration
    pub fn record(&mut self, n_rows: usize, cardinality: usize, seconds: f64) {
        self.cells.insert((n_rows, cardinality), seconds);
    }

    pub fn get(&self, n_rows: usize, cardinality: usize) -> Option<f64> {
        self.cells.get(&(n_rows, cardinality)).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row counts present in the table, ascending
    pub fn row_labels(&self) -> BTreeSet<usize> {
        self.cells.keys().map(|&(rows, _)| rows).collect()
    }

    /// Cardinalities present in the table, ascending
    pub fn column_labels(&self) -> BTreeSet<usize> {
        self.cells.keys().map(|&(_, cats)| cats).collect()
    }

    /// `((n_rows, cardinality), seconds)` in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.cells.iter().map(|(&key, &secs)| (key, secs))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a table previously written by [`ResultTable::save`]
    pub fn from_json(json: &str) -> Result<Self> {
        let columns: HashMap<String, HashMap<String, Option<f64>>> =
            serde_json::from_str(json)
                .context("Result table is not a column-oriented JSON object")?;

        let mut table = Self::new();
        for (cardinality, rows) in columns {
            let cardinality: usize = cardinality
                .parse()
                .with_context(|| format!("Invalid cardinality label '{}'", cardinality))?;
            for (n_rows, seconds) in rows {
                let n_rows: usize = n_rows
                    .parse()
                    .with_context(|| format!("Invalid row label '{}'", n_rows))?;
                if let Some(seconds) = seconds {
                    table.record(n_rows, cardinality, seconds);
                }
            }
        }
        Ok(table)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        log::info!("Results saved to: {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read results from {}", path.display()))?;
        Self::from_json(&json)
    }

    /// `baseline / self` for every configuration both tables measured.
    ///
    /// Values above 1.0 mean this table is faster than the baseline.
    pub fn speedup_over(&self, baseline: &ResultTable) -> ResultTable {
        let mut speedups = ResultTable::new();
        for ((rows, cats), secs) in self.iter() {
            if let Some(base) = baseline.get(rows, cats) {
                if secs > 0.0 {
                    speedups.record(rows, cats, base / secs);
                }
            }
        }
        speedups
    }
}

impl Serialize for ResultTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows = self.row_labels();
        let columns = self.column_labels();

        let mut outer = serializer.serialize_map(Some(columns.len()))?;
        for &cats in &columns {
            let column: Column<'_> = Column {
                table: self,
                rows: &rows,
                cardinality: cats,
            };
            outer.serialize_entry(&cats.to_string(), &column)?;
        }
        outer.end()
    }
}

/// One cardinality's cells, serialized in numeric row order
struct Column<'a> {
    table: &'a ResultTable,
    rows: &'a BTreeSet<usize>,
    cardinality: usize,
}

impl Serialize for Column<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for &rows in self.rows {
            map.serialize_entry(&rows.to_string(), &self.table.get(rows, self.cardinality))?;
        }
        map.end()
    }
}

/// Check that `label` can be embedded in an output file name
pub fn validate_label(label: &str) -> Result<(), ConfigError> {
    let bad = label.is_empty()
        || label == "."
        || label == ".."
        || label.contains(['/', '\\'])
        || label.chars().any(char::is_control);
    if bad {
        return Err(ConfigError::InvalidLabel(label.to_string()));
    }
    Ok(())
}

/// `<dir>/categorical_bench_<label>.json`
pub fn output_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("categorical_bench_{}.json", label))
}

/// `<dir>/categorical_bench_<label>.md`
pub fn report_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("categorical_bench_{}.md", label))
}

/// Render a markdown report of one sweep
pub fn generate_report(
    scenario: &str,
    label: &str,
    device_info: &str,
    table: &ResultTable,
    summaries: &[TimingSummary],
) -> String {
    let mut report = String::new();

    report.push_str("# Categorical Benchmark Results\n\n");
    report.push_str(&format!(
        "**Date:** {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    report.push_str(&format!("**Label:** {}\n", label));
    report.push_str(&format!("**Scenario:** {}\n", scenario));
    report.push_str(&format!("**Device:** {}\n", device_info));
    report.push_str("\n---\n\n");

    report.push_str("## Mean Latency (rows × cardinality)\n\n");
    let columns = table.column_labels();
    report.push_str("| rows \\ cats |");
    for cats in &columns {
        report.push_str(&format!(" {} |", cats));
    }
    report.push_str("\n|---|");
    for _ in &columns {
        report.push_str("---|");
    }
    report.push('\n');
    for rows in table.row_labels() {
        report.push_str(&format!("| {} |", rows));
        for &cats in &columns {
            match table.get(rows, cats) {
                Some(secs) => report.push_str(&format!(" {} |", format_seconds(secs))),
                None => report.push_str(" - |"),
            }
        }
        report.push('\n');
    }

    if !summaries.is_empty() {
        report.push_str("\n## Detailed Results\n\n");
        report.push_str("| Rows | Cats | Runs | Mean | Median | Std Dev | CV | 95% CI | Range | Stable |\n");
        report.push_str("|------|------|------|------|--------|---------|----|--------|-------|--------|\n");
        for s in summaries {
            report.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {:.2}% | [{}, {}] | [{}, {}] | {} |\n",
                s.n_rows,
                s.cardinality,
                s.num_runs,
                format_seconds(s.mean_secs),
                format_seconds(s.median_secs),
                format_seconds(s.std_dev),
                s.coefficient_of_variation * 100.0,
                format_seconds(s.confidence_interval_95.0.max(0.0)),
                format_seconds(s.confidence_interval_95.1),
                format_seconds(s.min_secs),
                format_seconds(s.max_secs),
                if s.is_stable() { "yes" } else { "no" },
            ));
        }

        let outliers: usize = summaries.iter().map(|s| s.outliers.len()).sum();
        if outliers > 0 {
            report.push_str(&format!("\n{} outlier trial(s) detected.\n", outliers));
        }
    }

    report
}

/// Write a markdown report to `path`
pub fn save_report(report: &str, path: &Path) -> Result<()> {
    std::fs::write(path, report)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    log::info!("Report saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ResultTable {
        let mut table = ResultTable::new();
        table.record(100, 100, 0.5);
        table.record(100_000, 100, 1.5);
        table.record(100_000, 100_000, 2.0);
        table
    }

    #[test]
    fn test_json_layout() {
        let json = sample_table().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"100":{"100":0.5,"100000":1.5},"100000":{"100":null,"100000":2.0}}"#
        );
    }

    #[test]
    fn test_keys_sort_numerically() {
        let mut table = ResultTable::new();
        table.record(20, 2, 1.0);
        table.record(100, 2, 1.0);
        let json = table.to_json().unwrap();
        assert_eq!(json, r#"{"2":{"20":1.0,"100":1.0}}"#);
    }

    #[test]
    fn test_json_parse_back() {
        let table = sample_table();
        let parsed = ResultTable::from_json(&table.to_json().unwrap()).unwrap();
        assert_eq!(parsed, table);
        assert_eq!(parsed.get(100, 100_000), None);
    }

    #[test]
    fn test_from_json_rejects_bad_labels() {
        assert!(ResultTable::from_json(r#"{"abc":{"1":1.0}}"#).is_err());
        assert!(ResultTable::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_speedup_over() {
        let before = sample_table();
        let mut after = ResultTable::new();
        after.record(100, 100, 0.25);
        after.record(100_000, 100, 3.0);
        after.record(5, 5, 1.0);

        let speedup = after.speedup_over(&before);
        assert_eq!(speedup.len(), 2);
        assert_eq!(speedup.get(100, 100), Some(2.0));
        assert_eq!(speedup.get(100_000, 100), Some(0.5));
    }

    #[test]
    fn test_validate_label() {
        assert!(validate_label("before").is_ok());
        assert!(validate_label("after-v2.1").is_ok());
        assert_eq!(validate_label(""), Err(ConfigError::InvalidLabel(String::new())));
        assert!(validate_label("a/b").is_err());
        assert!(validate_label("a\\b").is_err());
        assert!(validate_label("..").is_err());
    }

    #[test]
    fn test_output_paths() {
        let dir = Path::new("/tmp/out");
        assert_eq!(
            output_path(dir, "before"),
            PathBuf::from("/tmp/out/categorical_bench_before.json")
        );
        assert_eq!(
            report_path(dir, "after"),
            PathBuf::from("/tmp/out/categorical_bench_after.md")
        );
    }

    #[test]
    fn test_report_contains_table() {
        let report = generate_report("fillna", "before", "fixed", &sample_table(), &[]);
        assert!(report.contains("**Scenario:** fillna"));
        assert!(report.contains("| 100 | 500.000 ms | - |"));
        assert!(report.contains("| 100000 | 1.500 s | 2.000 s |"));
    }
}
