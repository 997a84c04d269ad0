//! RHI error types.
//!
//! Failed Vulkan calls on the frame path are reported as
//! [`RhiError::Vulkan`], which names the operation, the source location of
//! the call and the returned status code. Attach that context with
//! [`VkResultExt::context`].

use std::panic::Location;

use ash::vk;
use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// A Vulkan call failed
    #[error("{operation} failed at {location} with {result:?}")]
    Vulkan {
        operation: &'static str,
        location: &'static Location<'static>,
        result: vk::Result,
    },

    /// Vulkan error without call-site context
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] vk::Result),

    /// Failed to load the Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    /// No GPU supports the required features
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// Shader loading error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Window surface creation error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Out-of-bounds or otherwise invalid buffer access
    #[error("Buffer error: {0}")]
    BufferError(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RhiError {
    /// The Vulkan status code, if this error carries one.
    pub fn vk_result(&self) -> Option<vk::Result> {
        match self {
            RhiError::Vulkan { result, .. } | RhiError::VulkanError(result) => Some(*result),
            _ => None,
        }
    }
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

/// Attach the failing operation and caller location to a raw Vulkan result.
pub trait VkResultExt<T> {
    fn context(self, operation: &'static str) -> RhiResult<T>;
}

impl<T> VkResultExt<T> for Result<T, vk::Result> {
    #[track_caller]
    fn context(self, operation: &'static str) -> RhiResult<T> {
        let location = Location::caller();
        self.map_err(|result| RhiError::Vulkan {
            operation,
            location,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_records_call_site() {
        let failed: Result<(), vk::Result> = Err(vk::Result::ERROR_DEVICE_LOST);
        let line = line!() + 1;
        let err = failed.context("vkQueueSubmit").unwrap_err();

        match &err {
            RhiError::Vulkan {
                operation,
                location,
                result,
            } => {
                assert_eq!(*operation, "vkQueueSubmit");
                assert_eq!(location.file(), file!());
                assert_eq!(location.line(), line);
                assert_eq!(*result, vk::Result::ERROR_DEVICE_LOST);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let message = err.to_string();
        assert!(message.starts_with("vkQueueSubmit failed at "));
        assert!(message.contains(file!()));
        assert!(message.contains("ERROR_DEVICE_LOST"));
    }

    #[test]
    fn test_context_passes_success_through() {
        let ok: Result<u64, vk::Result> = Ok(7);
        assert_eq!(ok.context("vkGetSemaphoreCounterValue").unwrap(), 7);
    }

    #[test]
    fn test_vk_result_accessor() {
        let err = RhiError::from(vk::Result::ERROR_OUT_OF_DATE_KHR);
        assert_eq!(err.vk_result(), Some(vk::Result::ERROR_OUT_OF_DATE_KHR));
        assert_eq!(RhiError::NoSuitableGpu.vk_result(), None);
    }
}
