//! Device and numeric-precision resolution.

use candle_core::{DType, Device};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::{InferError, Result};

/// Execution device as requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceRequest {
    #[default]
    Cpu,
    Cuda,
    Mps,
}

impl FromStr for DeviceRequest {
    type Err = InferError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(DeviceRequest::Cpu),
            "cuda" => Ok(DeviceRequest::Cuda),
            "mps" | "metal" => Ok(DeviceRequest::Mps),
            other => Err(InferError::Device(format!(
                "unknown device '{other}' (expected cpu, cuda, or mps)"
            ))),
        }
    }
}

impl fmt::Display for DeviceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceRequest::Cpu => write!(f, "cpu"),
            DeviceRequest::Cuda => write!(f, "cuda"),
            DeviceRequest::Mps => write!(f, "mps"),
        }
    }
}

/// A resolved device together with the precision weights run at on it.
#[derive(Debug, Clone)]
pub struct Compute {
    pub device: Device,
    pub dtype: DType,
}

impl Compute {
    fn cpu() -> Self {
        Compute {
            device: Device::Cpu,
            dtype: DType::F32,
        }
    }
}

/// Resolve a requested device to whatever this process can actually use.
///
/// Requests for an unavailable accelerator downgrade to CPU with a warning
/// rather than failing; precision follows the resolved device (BF16 on CUDA,
/// F16 on Metal, F32 on CPU).
pub fn resolve_device(request: DeviceRequest) -> Result<Compute> {
    let compute = match request {
        DeviceRequest::Cpu => Compute::cpu(),
        DeviceRequest::Cuda => {
            if candle_core::utils::cuda_is_available() {
                match Device::new_cuda(0) {
                    Ok(device) => Compute {
                        device,
                        dtype: DType::BF16,
                    },
                    Err(e) => {
                        warn!("CUDA device 0 failed to initialize ({e}), falling back to CPU");
                        Compute::cpu()
                    }
                }
            } else {
                warn!("CUDA requested but not available, falling back to CPU");
                Compute::cpu()
            }
        }
        DeviceRequest::Mps => {
            if candle_core::utils::metal_is_available() {
                match Device::new_metal(0) {
                    Ok(device) => Compute {
                        device,
                        dtype: DType::F16,
                    },
                    Err(e) => {
                        warn!("Metal device failed to initialize ({e}), falling back to CPU");
                        Compute::cpu()
                    }
                }
            } else {
                warn!("MPS requested but not available, falling back to CPU");
                Compute::cpu()
            }
        }
    };

    info!(device = ?compute.device, dtype = ?compute.dtype, "resolved compute");
    Ok(compute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_tokens() {
        assert_eq!("cpu".parse::<DeviceRequest>().unwrap(), DeviceRequest::Cpu);
        assert_eq!("CUDA".parse::<DeviceRequest>().unwrap(), DeviceRequest::Cuda);
        assert_eq!("mps".parse::<DeviceRequest>().unwrap(), DeviceRequest::Mps);
        assert!("tpu".parse::<DeviceRequest>().is_err());
    }

    #[test]
    fn cpu_request_resolves_to_f32() {
        let compute = resolve_device(DeviceRequest::Cpu).unwrap();
        assert!(matches!(compute.device, Device::Cpu));
        assert_eq!(compute.dtype, DType::F32);
    }

    #[cfg(not(any(feature = "cuda", feature = "metal")))]
    #[test]
    fn accelerator_request_falls_back_to_cpu() {
        for request in [DeviceRequest::Cuda, DeviceRequest::Mps] {
            let compute = resolve_device(request).unwrap();
            assert!(matches!(compute.device, Device::Cpu));
            assert_eq!(compute.dtype, DType::F32);
        }
    }
}
