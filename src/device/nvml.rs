//! Free-memory query through NVML

use super::MemoryInfo;
use anyhow::{Context, Result};
use nvml_wrapper::Nvml;

/// An NVML-managed device, looked up by index on every query
pub struct NvmlDevice {
    nvml: Nvml,
    index: u32,
}

impl NvmlDevice {
    pub fn new(index: u32) -> Result<Self> {
        let nvml = Nvml::init().context("Failed to initialize NVML")?;
        // Fail early on a bad index rather than at the first query
        nvml.device_by_index(index)
            .with_context(|| format!("NVML device {} not found", index))?;
        Ok(Self { nvml, index })
    }
}

impl MemoryInfo for NvmlDevice {
    fn free_memory(&self) -> Result<u64> {
        let device = self.nvml.device_by_index(self.index)?;
        let memory = device
            .memory_info()
            .context("Failed to query device memory")?;
        log::debug!(
            "NVML device {}: {} of {} bytes free",
            self.index,
            memory.free,
            memory.total
        );
        Ok(memory.free)
    }

    fn describe(&self) -> String {
        let name = self
            .nvml
            .device_by_index(self.index)
            .and_then(|d| d.name())
            .unwrap_or_else(|_| "unknown".to_string());
        format!("{} (NVML device {})", name, self.index)
    }
}
