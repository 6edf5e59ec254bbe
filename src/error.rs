//! Error types for benchmark configuration and engine operations.

use crate::column::LabelType;
use thiserror::Error;

/// Errors raised while validating benchmark configuration.
///
/// All of these are fatal at startup.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A cardinality or row count of zero was requested.
    #[error("cardinality and row count must be positive (got cardinality={cardinality}, n_rows={n_rows})")]
    ZeroDimension {
        /// Requested cardinality.
        cardinality: usize,
        /// Requested row count.
        n_rows: usize,
    },

    /// The row count cannot be produced by tiling the category range.
    #[error("n_rows={n_rows} is not a multiple of cardinality={cardinality}")]
    UnevenTiling {
        /// Requested cardinality.
        cardinality: usize,
        /// Requested row count.
        n_rows: usize,
    },

    /// Cardinality exceeds the row count.
    #[error("cardinality={cardinality} exceeds n_rows={n_rows}")]
    Infeasible {
        /// Requested cardinality.
        cardinality: usize,
        /// Requested row count.
        n_rows: usize,
    },

    /// Pool fraction outside `(0, 1]`.
    #[error("pool fraction must be in (0, 1], got {0}")]
    InvalidPoolFraction(f64),

    /// Zero repetitions requested.
    #[error("repeat count must be at least 1")]
    ZeroRepeat,

    /// A sweep axis has no values.
    #[error("sweep axis '{0}' is empty")]
    EmptyAxis(&'static str),

    /// Output label cannot be used in a file name.
    #[error("invalid output label '{0}': must be non-empty and contain no path separators")]
    InvalidLabel(String),
}

/// Errors raised by the dataframe engine.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// A reservation would exceed the memory pool.
    #[error("out of memory: requested {requested} bytes, {available} bytes available in pool")]
    OutOfMemory {
        /// Bytes requested (aligned).
        requested: u64,
        /// Bytes still free in the pool.
        available: u64,
    },

    /// Two operands have different row counts.
    #[error("length mismatch: {left} rows vs {right} rows")]
    LengthMismatch {
        /// Left operand length.
        left: usize,
        /// Right operand length.
        right: usize,
    },

    /// Label storage types cannot be combined.
    #[error("label type mismatch: {left:?} vs {right:?}")]
    LabelTypeMismatch {
        /// Left label type.
        left: LabelType,
        /// Right label type.
        right: LabelType,
    },

    /// Operands must share an identical category set.
    #[error("categorical operands have different categories")]
    CategoriesMismatch,

    /// A category list contains the same label twice.
    #[error("categories must be unique (duplicate at position {0})")]
    DuplicateCategories(usize),

    /// Category count does not fit the code type.
    #[error("{0} categories exceed the code range")]
    TooManyCategories(usize),

    /// A code points outside the category set.
    #[error("code {code} out of range for {cardinality} categories")]
    InvalidCode {
        /// Offending code.
        code: i32,
        /// Number of categories.
        cardinality: usize,
    },

    /// Concatenation needs at least one input.
    #[error("nothing to concatenate")]
    EmptyConcat,

    /// Column name already present and no suffix to disambiguate.
    #[error("column '{0}' already exists")]
    ColumnNameCollision(String),
}
