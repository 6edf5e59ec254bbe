//! Synthetic workload generation
//!
//! Every input is built by tiling the integer range `[0, cardinality)` up to
//! the requested row count, so a column of shape `(c, n)` holds each of its
//! `c` categories exactly `n / c` times:
//!
//! ```text
//! cardinality = 3, n_rows = 9
//! base:   [0, 1, 2]
//! tiled:  [0, 1, 2, 0, 1, 2, 0, 1, 2]
//! ```
//!
//! Generators are pure functions of the [`Shape`]. They only panic on
//! allocation failure; shape validation happens in [`Shape::new`].

use crate::column::{CategoricalColumn, Labels};
use crate::error::{ConfigError, EngineError};
use crate::frame::{Column, Frame};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A (cardinality, row count) benchmark configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Shape {
    cardinality: usize,
    n_rows: usize,
}

impl Shape {
    /// Validate a configuration.
    ///
    /// Both dimensions must be positive, `cardinality <= n_rows`, and
    /// `n_rows` must be a multiple of `cardinality` so tiling is exact.
    pub fn new(cardinality: usize, n_rows: usize) -> Result<Self, ConfigError> {
        if cardinality == 0 || n_rows == 0 {
            return Err(ConfigError::ZeroDimension {
                cardinality,
                n_rows,
            });
        }
        if !Self::is_feasible(cardinality, n_rows) {
            return Err(ConfigError::Infeasible {
                cardinality,
                n_rows,
            });
        }
        if n_rows % cardinality != 0 {
            return Err(ConfigError::UnevenTiling {
                cardinality,
                n_rows,
            });
        }
        Ok(Self {
            cardinality,
            n_rows,
        })
    }

    /// Whether enough rows exist to realize the cardinality
    #[inline]
    pub fn is_feasible(cardinality: usize, n_rows: usize) -> bool {
        cardinality <= n_rows
    }

    /// Number of distinct categories
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// How many times the category range repeats
    pub fn repetitions(&self) -> usize {
        self.n_rows / self.cardinality
    }

    fn half(&self) -> i64 {
        (self.cardinality / 2) as i64
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rows={} cats={}", self.n_rows, self.cardinality)
    }
}

/// Repeat `base` end-to-end until `len` elements exist
pub fn tile<T: Copy>(base: &[T], len: usize) -> Vec<T> {
    if base.is_empty() {
        return Vec::new();
    }
    base.iter().copied().cycle().take(len).collect()
}

/// Input for a category remap
#[derive(Debug, Clone)]
pub struct RemapInput {
    pub column: CategoricalColumn,
    pub new_categories: Labels,
}

/// Two frames sharing a categorical key
#[derive(Debug, Clone)]
pub struct JoinInput {
    pub lhs: Frame,
    pub rhs: Frame,
}

/// Two independently built columns
#[derive(Debug, Clone)]
pub struct ConcatInput {
    pub lhs: CategoricalColumn,
    pub rhs: CategoricalColumn,
}

/// A column with missing rows plus its replacement
#[derive(Debug, Clone)]
pub struct FillnaInput {
    pub column: CategoricalColumn,
    pub replacement: CategoricalColumn,
}

/// The tiled categorical column every scenario starts from
pub fn categorical_column(shape: &Shape) -> Result<CategoricalColumn, EngineError> {
    let values = Labels::arange_i64(0, shape.cardinality as i64).tile(shape.n_rows);
    CategoricalColumn::encode(&values)
}

fn shifted_range(shape: &Shape) -> (i64, i64) {
    let start = shape.half();
    (start, start + shape.cardinality as i64)
}

/// Remap where the new categories are `f32` (forces type promotion).
///
/// ```text
/// old categories: [0, 1, 2, 3, 4]      old codes: [0, 1, 2, 3, 4]
/// new categories: [2.0, 3.0, ..., 6.0] new codes: [-1, -1, 0, 1, 2]
/// ```
pub fn remap_worst_case(shape: &Shape) -> Result<RemapInput, EngineError> {
    let (start, end) = shifted_range(shape);
    Ok(RemapInput {
        column: categorical_column(shape)?,
        new_categories: Labels::arange_f32(start, end),
    })
}

/// Remap where the new categories keep the integer type
pub fn remap_average_case(shape: &Shape) -> Result<RemapInput, EngineError> {
    let (start, end) = shifted_range(shape);
    Ok(RemapInput {
        column: categorical_column(shape)?,
        new_categories: Labels::arange_i64(start, end),
    })
}

/// Left frame `{key, lpayload}` and right frame `{key reversed, rpayload}`
pub fn join_input(shape: &Shape) -> Result<JoinInput, EngineError> {
    let key = categorical_column(shape)?;
    let payload: Vec<Option<i64>> = (0..shape.n_rows as i64).map(Some).collect();

    let rhs = Frame::with_range_index(shape.n_rows)
        .with_column("key", Column::Categorical(key.reversed()))?
        .with_column("rpayload", Column::Int64(payload.clone()))?;
    let lhs = Frame::with_range_index(shape.n_rows)
        .with_column("key", Column::Categorical(key))?
        .with_column("lpayload", Column::Int64(payload))?;

    Ok(JoinInput { lhs, rhs })
}

pub fn concat_input(shape: &Shape) -> Result<ConcatInput, EngineError> {
    Ok(ConcatInput {
        lhs: categorical_column(shape)?,
        rhs: categorical_column(shape)?,
    })
}

pub fn sort_input(shape: &Shape) -> Result<CategoricalColumn, EngineError> {
    categorical_column(shape)
}

/// Narrow the categories to `[0, cardinality / 2)` so the upper half of the
/// rows go missing, and pair it with a replacement of constant code 0.
pub fn fillna_input(shape: &Shape) -> Result<FillnaInput, EngineError> {
    let narrowed = Labels::arange_i64(0, shape.half());
    let column = categorical_column(shape)?.set_categories(&narrowed)?;
    let replacement = CategoricalColumn::from_codes(narrowed, vec![0; shape.n_rows])?;
    Ok(FillnaInput {
        column,
        replacement,
    })
}
