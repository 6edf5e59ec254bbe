//! Host dataframe engine
//!
//! The operations the harness measures. Each call reserves its working set
//! from the engine's [`MemoryPool`] for its duration, so an undersized pool
//! surfaces as [`EngineError::OutOfMemory`] exactly where a device allocator
//! would fail.

use crate::column::{CategoricalColumn, LabelType, Labels};
use crate::error::EngineError;
use crate::frame::Frame;
use crate::pool::{MemoryPool, PoolConfig};
use log::debug;

// Approximate footprint of one hash table slot (key + position)
const HASH_ENTRY_BYTES: u64 = 16;
const CODE_BYTES: u64 = 4;

/// Categorical dataframe engine bound to one memory pool
#[derive(Debug)]
pub struct Engine {
    pool: MemoryPool,
}

impl Engine {
    /// Create an engine; `config` applies to every allocation it makes
    pub fn new(config: PoolConfig) -> Self {
        if config.pool {
            debug!("Engine pool: {} bytes", config.initial_pool_size);
        } else {
            debug!("Engine pool disabled");
        }
        Self {
            pool: MemoryPool::new(config),
        }
    }

    pub fn pool(&self) -> &MemoryPool {
        &self.pool
    }

    /// Run one trivial allocation through the array path and one through
    /// the dataframe path so one-time setup costs stay out of timed regions.
    pub fn warm_up(&self) -> Result<(), EngineError> {
        const WARM_UP_LEN: u64 = 3;

        let _array_bytes = self.pool.reserve(WARM_UP_LEN * LabelType::Int64.width())?;
        let array = Labels::arange_i64(1, WARM_UP_LEN as i64 + 1);

        let _series_bytes = self
            .pool
            .reserve(WARM_UP_LEN * CODE_BYTES + array.size_bytes())?;
        let series = CategoricalColumn::encode(&array)?;

        debug!(
            "Warm-up complete (array {} values, series {} rows, {} bytes peak)",
            array.len(),
            series.len(),
            self.pool.peak()
        );
        Ok(())
    }

    /// Remap `column` onto `new_categories`
    pub fn set_categories(
        &self,
        column: &CategoricalColumn,
        new_categories: &Labels,
    ) -> Result<CategoricalColumn, EngineError> {
        let _scratch = self.pool.reserve(
            column.len() as u64 * CODE_BYTES
                + column.cardinality() as u64 * CODE_BYTES
                + new_categories.len() as u64 * HASH_ENTRY_BYTES
                + new_categories.size_bytes(),
        )?;
        column.set_categories(new_categories)
    }

    /// Left join on the row index, suffixing colliding right column names
    pub fn join(&self, lhs: &Frame, rhs: &Frame, rsuffix: &str) -> Result<Frame, EngineError> {
        let _table = self.pool.reserve(rhs.len() as u64 * HASH_ENTRY_BYTES)?;
        let plan = lhs.plan_left_join(rhs);
        let _output = self
            .pool
            .reserve(plan.len() as u64 * lhs.joined_row_width(rhs))?;
        lhs.materialize_join(rhs, &plan, rsuffix)
    }

    /// Stack columns vertically
    pub fn concat(&self, columns: &[&CategoricalColumn]) -> Result<CategoricalColumn, EngineError> {
        let (first, rest) = columns.split_first().ok_or(EngineError::EmptyConcat)?;
        let _output = self
            .pool
            .reserve(columns.iter().map(|c| c.size_bytes()).sum())?;
        rest.iter()
            .try_fold((*first).clone(), |acc, next| acc.concat(next))
    }

    pub fn sort_values(
        &self,
        column: &CategoricalColumn,
    ) -> Result<CategoricalColumn, EngineError> {
        let _output = self.pool.reserve(column.len() as u64 * CODE_BYTES)?;
        Ok(column.sort_values())
    }

    pub fn fillna(
        &self,
        column: &CategoricalColumn,
        replacement: &CategoricalColumn,
    ) -> Result<CategoricalColumn, EngineError> {
        let _output = self.pool.reserve(column.len() as u64 * CODE_BYTES)?;
        column.fillna(replacement)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(PoolConfig::disabled())
    }
}
