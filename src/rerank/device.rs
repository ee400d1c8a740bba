use candle_core::Device;
use tracing::debug;

#[cfg(any(feature = "metal", feature = "cuda"))]
use tracing::{info, warn};

use super::RerankError;

/// Picks the cross-encoder device: Metal, then CUDA, then CPU.
///
/// GPU failures are logged and fall through to the next backend. With
/// `require_gpu` set, ending up on CPU is an error instead.
pub fn select_device(require_gpu: bool) -> Result<Device, RerankError> {
    #[allow(unused_mut)]
    let mut failures: Vec<String> = Vec::new();

    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            info!("Reranker using Metal");
            return Ok(device);
        }
        Err(e) => {
            warn!(error = %e, "Metal device unavailable");
            failures.push(format!("metal: {e}"));
        }
    }

    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(device) => {
            info!("Reranker using CUDA");
            return Ok(device);
        }
        Err(e) => {
            warn!(error = %e, "CUDA device unavailable");
            failures.push(format!("cuda: {e}"));
        }
    }

    let reason = if failures.is_empty() {
        "no GPU backend compiled".to_string()
    } else {
        failures.join("; ")
    };

    if require_gpu {
        return Err(RerankError::DeviceUnavailable {
            device: "gpu".to_string(),
            reason,
        });
    }

    debug!(reason = %reason, "Reranker using CPU");
    Ok(Device::Cpu)
}
