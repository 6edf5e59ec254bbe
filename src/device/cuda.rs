//! Free-memory query through the CUDA driver API

use super::MemoryInfo;
use anyhow::{Context, Result};
use cuda_driver_sys::*;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

/// A CUDA device with its own context
pub struct CudaDevice {
    context: CUcontext,
    device: CUdevice,
    ordinal: i32,
}

impl CudaDevice {
    /// Initialize CUDA and create a context on device `ordinal`
    pub fn new(ordinal: i32) -> Result<Self> {
        unsafe {
            check_cuda(cuInit(0)).context("Failed to initialize CUDA")?;

            let mut device = 0;
            check_cuda(cuDeviceGet(&mut device, ordinal))
                .with_context(|| format!("Failed to get CUDA device {}", ordinal))?;

            let mut context = ptr::null_mut();
            check_cuda(cuCtxCreate_v2(&mut context, 0, device))
                .context("Failed to create CUDA context")?;

            Ok(Self {
                context,
                device,
                ordinal,
            })
        }
    }

    /// Device name as reported by the driver
    pub fn name(&self) -> Result<String> {
        let mut name = vec![0 as c_char; 256];
        unsafe {
            check_cuda(cuDeviceGetName(name.as_mut_ptr(), name.len() as i32, self.device))?;
            Ok(CStr::from_ptr(name.as_ptr()).to_string_lossy().into_owned())
        }
    }
}

impl MemoryInfo for CudaDevice {
    fn free_memory(&self) -> Result<u64> {
        let mut free = 0usize;
        let mut total = 0usize;
        unsafe {
            check_cuda(cuCtxSetCurrent(self.context))?;
            check_cuda(cuMemGetInfo_v2(&mut free, &mut total))
                .context("Failed to query device memory")?;
        }
        log::debug!("CUDA device {}: {} of {} bytes free", self.ordinal, free, total);
        Ok(free as u64)
    }

    fn describe(&self) -> String {
        let name = self.name().unwrap_or_else(|_| "unknown".to_string());
        format!("{} (CUDA device {})", name, self.ordinal)
    }
}

impl Drop for CudaDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = cuCtxDestroy_v2(self.context);
        }
    }
}

/// Check CUDA result and convert to anyhow error
unsafe fn check_cuda(result: CUresult) -> Result<()> {
    if result != CUresult::CUDA_SUCCESS {
        let mut error_str = ptr::null();
        cuGetErrorString(result, &mut error_str);
        let error_msg = if !error_str.is_null() {
            CStr::from_ptr(error_str).to_string_lossy().into_owned()
        } else {
            format!("CUDA error code: {:?}", result)
        };
        anyhow::bail!("CUDA error: {}", error_msg);
    }
    Ok(())
}
