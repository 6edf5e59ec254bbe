//! Benchmark scenarios
//!
//! Each scenario pairs an applicability predicate with an untimed input
//! preparation step and exactly one timed engine call. Adding a scenario
//! means adding a variant here; the sweep driver does not change.

use crate::column::{CategoricalColumn, Labels};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::frame::Frame;
use crate::workload::{self, Shape};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix applied to colliding right-hand column names in the join scenario
pub const JOIN_RSUFFIX: &str = "_r";

/// One benchmarked categorical operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Scenario {
    /// `set_categories` onto shifted float labels (type promotion)
    SetCategoriesWorst,
    /// `set_categories` onto shifted integer labels
    SetCategoriesAvg,
    /// Left join of two frames carrying the categorical key
    Join,
    /// Concatenation of two categorical columns
    Concat,
    /// Sorting a categorical column
    SortValues,
    /// Filling missing rows from a replacement column
    Fillna,
}

impl Scenario {
    /// Every scenario, in report order
    pub const ALL: [Scenario; 6] = [
        Scenario::SetCategoriesWorst,
        Scenario::SetCategoriesAvg,
        Scenario::Join,
        Scenario::Concat,
        Scenario::SortValues,
        Scenario::Fillna,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::SetCategoriesWorst => "set_categories_worst",
            Scenario::SetCategoriesAvg => "set_categories_avg",
            Scenario::Join => "join",
            Scenario::Concat => "concat",
            Scenario::SortValues => "sort_values",
            Scenario::Fillna => "fillna",
        }
    }

    /// Whether the scenario can run at `(cardinality, n_rows)`.
    ///
    /// Every current scenario needs at least one row per category.
    pub fn applies(self, cardinality: usize, n_rows: usize) -> bool {
        Shape::is_feasible(cardinality, n_rows)
    }

    /// Build fresh inputs for one trial
    pub fn prepare(self, shape: &Shape) -> Result<Workload, EngineError> {
        Ok(match self {
            Scenario::SetCategoriesWorst => {
                let input = workload::remap_worst_case(shape)?;
                Workload::SetCategories {
                    column: input.column,
                    new_categories: input.new_categories,
                }
            }
            Scenario::SetCategoriesAvg => {
                let input = workload::remap_average_case(shape)?;
                Workload::SetCategories {
                    column: input.column,
                    new_categories: input.new_categories,
                }
            }
            Scenario::Join => {
                let input = workload::join_input(shape)?;
                Workload::Join {
                    lhs: input.lhs,
                    rhs: input.rhs,
                }
            }
            Scenario::Concat => {
                let input = workload::concat_input(shape)?;
                Workload::Concat {
                    lhs: input.lhs,
                    rhs: input.rhs,
                }
            }
            Scenario::SortValues => Workload::SortValues {
                column: workload::sort_input(shape)?,
            },
            Scenario::Fillna => {
                let input = workload::fillna_input(shape)?;
                Workload::Fillna {
                    column: input.column,
                    replacement: input.replacement,
                }
            }
        })
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Prepared inputs for one timed call
#[derive(Debug, Clone)]
pub enum Workload {
    SetCategories {
        column: CategoricalColumn,
        new_categories: Labels,
    },
    Join {
        lhs: Frame,
        rhs: Frame,
    },
    Concat {
        lhs: CategoricalColumn,
        rhs: CategoricalColumn,
    },
    SortValues {
        column: CategoricalColumn,
    },
    Fillna {
        column: CategoricalColumn,
        replacement: CategoricalColumn,
    },
}

impl Workload {
    /// Run the single engine call this workload was built for.
    ///
    /// Returns the number of rows produced.
    pub fn execute(&self, engine: &Engine) -> Result<usize, EngineError> {
        match self {
            Workload::SetCategories {
                column,
                new_categories,
            } => engine.set_categories(column, new_categories).map(|c| c.len()),
            Workload::Join { lhs, rhs } => engine.join(lhs, rhs, JOIN_RSUFFIX).map(|f| f.len()),
            Workload::Concat { lhs, rhs } => engine.concat(&[lhs, rhs]).map(|c| c.len()),
            Workload::SortValues { column } => engine.sort_values(column).map(|c| c.len()),
            Workload::Fillna {
                column,
                replacement,
            } => engine.fillna(column, replacement).map(|c| c.len()),
        }
    }
}
