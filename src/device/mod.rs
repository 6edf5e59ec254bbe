//! Device memory queries
//!
//! The pool is sized from the free memory a device reports. Backends:
//!
//! - [`FixedMemory`]: a caller-provided byte count (CLI override, tests)
//! - `NvmlDevice`: NVIDIA Management Library (feature `nvml`)
//! - `CudaDevice`: CUDA driver API (feature `cuda`)

use anyhow::Result;

#[cfg(feature = "cuda")]
mod cuda;
#[cfg(feature = "nvml")]
mod nvml;

#[cfg(feature = "cuda")]
pub use cuda::CudaDevice;
#[cfg(feature = "nvml")]
pub use nvml::NvmlDevice;

/// Source of the free-memory figure used to size the pool
pub trait MemoryInfo {
    /// Currently free device memory in bytes
    fn free_memory(&self) -> Result<u64>;

    /// Human-readable device description for logs and reports
    fn describe(&self) -> String;
}

/// A fixed free-memory figure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedMemory(pub u64);

impl MemoryInfo for FixedMemory {
    fn free_memory(&self) -> Result<u64> {
        Ok(self.0)
    }

    fn describe(&self) -> String {
        format!("fixed ({} bytes free)", self.0)
    }
}

/// The best device backend compiled in, or `None` if there is none.
///
/// NVML is preferred because it does not create a context on the device.
#[allow(unused_variables, unreachable_code)]
pub fn default_source(device: u32) -> Result<Option<Box<dyn MemoryInfo>>> {
    #[cfg(feature = "nvml")]
    {
        return Ok(Some(Box::new(NvmlDevice::new(device)?)));
    }

    #[cfg(all(feature = "cuda", not(feature = "nvml")))]
    {
        return Ok(Some(Box::new(CudaDevice::new(device as i32)?)));
    }

    Ok(None)
}
