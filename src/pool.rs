//! Memory pool configuration and accounting
//!
//! The pool is sized once at startup from the free memory a device reports
//! and handed to the [`Engine`](crate::engine::Engine) explicitly. Operations
//! reserve their working set from it for their duration; a reservation that
//! does not fit fails with [`EngineError::OutOfMemory`].

use crate::error::{ConfigError, EngineError};
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Pool sizes and reservations are multiples of this many bytes
pub const POOL_ALIGNMENT: u64 = 256;

/// Share of free device memory given to the pool by default
pub const DEFAULT_POOL_FRACTION: f64 = 0.95;

const MANTISSA_BITS: u32 = 52;
const MANTISSA_MASK: u64 = (1 << MANTISSA_BITS) - 1;

/// `floor(bytes * fraction)` computed exactly for `fraction` in `(0, 1]`.
///
/// The fraction is split into its binary mantissa and exponent so the
/// product is an integer multiply and shift; no rounding step can push the
/// result above the real product.
fn scale_floor(bytes: u64, fraction: f64) -> u64 {
    let bits = fraction.to_bits();
    let biased = ((bits >> MANTISSA_BITS) & 0x7ff) as i32;
    let (mantissa, exponent) = if biased == 0 {
        (bits & MANTISSA_MASK, -1074)
    } else {
        ((bits & MANTISSA_MASK) | (1 << MANTISSA_BITS), biased - 1075)
    };

    // fraction <= 1 keeps the exponent negative and the result <= bytes
    let shift = exponent.unsigned_abs();
    if shift >= u128::BITS {
        return 0;
    }
    ((bytes as u128 * mantissa as u128) >> shift) as u64
}

/// Round `bytes` down to the pool alignment
#[inline]
pub fn align_down(bytes: u64) -> u64 {
    bytes - bytes % POOL_ALIGNMENT
}

/// Round `bytes` up to the pool alignment
#[inline]
pub fn align_up(bytes: u64) -> u64 {
    bytes.div_ceil(POOL_ALIGNMENT) * POOL_ALIGNMENT
}

/// Whether a pool is used and how large it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub pool: bool,
    pub initial_pool_size: u64,
}

impl PoolConfig {
    /// No pool: reservations are tracked but never refused
    pub fn disabled() -> Self {
        Self {
            pool: false,
            initial_pool_size: 0,
        }
    }

    /// Pool of exactly `bytes` (rounded down to the alignment)
    pub fn with_size(bytes: u64) -> Self {
        Self {
            pool: true,
            initial_pool_size: align_down(bytes),
        }
    }

    /// Pool sized at `fraction` of `free_bytes`, rounded down to a multiple of 256.
    ///
    /// The result never exceeds `fraction * free_bytes`.
    ///
    /// # Example
    ///
    /// ```
    /// use categorical_bench::pool::PoolConfig;
    ///
    /// let config = PoolConfig::from_free_memory(10_000, 0.95).unwrap();
    /// assert_eq!(config.initial_pool_size, 9_472); // 9_500 rounded down to 256
    /// ```
    pub fn from_free_memory(free_bytes: u64, fraction: f64) -> Result<Self, ConfigError> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::InvalidPoolFraction(fraction));
        }
        Ok(Self::with_size(scale_floor(free_bytes, fraction)))
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Tracks bytes reserved by in-flight engine operations
#[derive(Debug)]
pub struct MemoryPool {
    config: PoolConfig,
    in_use: Cell<u64>,
    peak: Cell<u64>,
}

impl MemoryPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            in_use: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Pool capacity, `None` when no pool is configured
    pub fn capacity(&self) -> Option<u64> {
        self.config.pool.then_some(self.config.initial_pool_size)
    }

    /// Bytes currently reserved
    pub fn in_use(&self) -> u64 {
        self.in_use.get()
    }

    /// Highest reservation level seen
    pub fn peak(&self) -> u64 {
        self.peak.get()
    }

    /// Reserve `bytes` until the returned guard is dropped
    pub fn reserve(&self, bytes: u64) -> Result<Reservation<'_>, EngineError> {
        let requested = align_up(bytes);
        let in_use = self.in_use.get();
        if let Some(capacity) = self.capacity() {
            let available = capacity.saturating_sub(in_use);
            if requested > available {
                return Err(EngineError::OutOfMemory {
                    requested,
                    available,
                });
            }
        }

        let in_use = in_use + requested;
        self.in_use.set(in_use);
        self.peak.set(self.peak.get().max(in_use));
        Ok(Reservation {
            pool: self,
            bytes: requested,
        })
    }
}

/// Bytes held in a [`MemoryPool`], released on drop
#[derive(Debug)]
pub struct Reservation<'a> {
    pool: &'a MemoryPool,
    bytes: u64,
}

impl Reservation<'_> {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.pool.in_use.set(self.pool.in_use.get() - self.bytes);
    }
}
