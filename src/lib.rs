//! Categorical column benchmark harness
//!
//! Times a fixed set of categorical-column operations across a sweep of
//! `(n_rows, cardinality)` configurations and writes one result table per
//! run, labeled so that two runs (e.g. before and after an engine change)
//! can be compared.
//!
//! ```text
//! Sweep → Shape → Scenario::prepare (untimed) → Workload::execute (timed) → ResultTable
//! ```
//!
//! The engine allocates from a [`pool::MemoryPool`] sized at a fraction of
//! the free memory a [`device::MemoryInfo`] backend reports.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use categorical_bench::{Engine, Harness, PoolConfig, Scenario, Sweep};
//!
//! # fn main() -> anyhow::Result<()> {
//! let engine = Engine::new(PoolConfig::from_free_memory(8 << 30, 0.95)?);
//! engine.warm_up()?;
//!
//! let harness = Harness::new(&engine, 20)?;
//! let outcome = harness.run(Scenario::Fillna, &Sweep::standard())?;
//! outcome.table.save("categorical_bench_before.json".as_ref())?;
//! # Ok(())
//! # }
//! ```

pub mod column;
pub mod device;
pub mod engine;
pub mod error;
pub mod frame;
pub mod harness;
pub mod pool;
pub mod results;
pub mod scenario;
pub mod stats;
pub mod workload;

pub use column::{CategoricalColumn, LabelType, Labels, MISSING_CODE};
pub use engine::Engine;
pub use error::{ConfigError, EngineError};
pub use frame::{Column, Frame};
pub use harness::{Harness, Sweep, SweepOutcome};
pub use pool::{MemoryPool, PoolConfig};
pub use results::ResultTable;
pub use scenario::{Scenario, Workload};
pub use stats::TimingSummary;
pub use workload::Shape;
