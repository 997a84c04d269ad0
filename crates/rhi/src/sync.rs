//! Synchronization primitives.
//!
//! - [`Semaphore`] - binary semaphore for GPU-to-GPU ordering (swapchain
//!   acquire and present)
//! - [`TimelineSemaphore`] - monotonically increasing 64-bit counter the
//!   host can read and wait on; used as the frame fence
//!
//! # Timeline semaphores as fences
//!
//! A timeline semaphore carries a payload that only ever grows. The host
//! submits work and then asks the queue to signal the next value; once the
//! payload read back from the device is at least that value, every batch
//! submitted before the signal has finished executing.
//!
//! ```no_run
//! use std::sync::Arc;
//! use raymarch_rhi::device::Device;
//! use raymarch_rhi::sync::TimelineSemaphore;
//!
//! # fn example(device: Arc<Device>) -> Result<(), raymarch_rhi::RhiError> {
//! let timeline = TimelineSemaphore::new(device.clone(), 0)?;
//!
//! device.signal_timeline(&timeline, 1)?;
//! if timeline.completed_value()? < 1 {
//!     timeline.wait(1, u64::MAX)?;
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiResult, VkResultExt};

/// Binary semaphore.
///
/// Created unsignaled. Used to order swapchain image acquisition before
/// rendering, and rendering before presentation.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe {
            device
                .handle()
                .create_semaphore(&create_info, None)
                .context("vkCreateSemaphore")?
        };

        debug!("Created semaphore");

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed semaphore");
    }
}

/// Timeline semaphore.
///
/// The payload starts at `initial_value` and is raised by queue signal
/// operations. Values must be signalled in increasing order.
///
/// # Thread Safety
///
/// Reading the counter and waiting are host operations that Vulkan allows
/// from any thread; the handle is immutable after creation.
pub struct TimelineSemaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl TimelineSemaphore {
    /// Creates a timeline semaphore with the given starting payload.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails, e.g. when the device
    /// was created without the `timelineSemaphore` feature.
    pub fn new(device: Arc<Device>, initial_value: u64) -> RhiResult<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);

        let semaphore = unsafe {
            device
                .handle()
                .create_semaphore(&create_info, None)
                .context("vkCreateSemaphore")?
        };

        debug!("Created timeline semaphore (initial value {})", initial_value);

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }

    /// Returns the highest value the device has signalled so far.
    ///
    /// Non-blocking.
    pub fn completed_value(&self) -> RhiResult<u64> {
        unsafe {
            self.device
                .handle()
                .get_semaphore_counter_value(self.semaphore)
                .context("vkGetSemaphoreCounterValue")
        }
    }

    /// Blocks until the payload reaches `value`.
    ///
    /// # Arguments
    ///
    /// * `value` - Payload to wait for
    /// * `timeout` - Timeout in nanoseconds. Use `u64::MAX` for no timeout.
    ///
    /// # Errors
    ///
    /// Returns the `TIMEOUT` status as an error if the timeout expires, or
    /// the device error (e.g. `ERROR_DEVICE_LOST`) if the wait fails.
    pub fn wait(&self, value: u64, timeout: u64) -> RhiResult<()> {
        let semaphores = [self.semaphore];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);

        unsafe {
            self.device
                .handle()
                .wait_semaphores(&wait_info, timeout)
                .context("vkWaitSemaphores")
        }
    }
}

impl Drop for TimelineSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed timeline semaphore");
    }
}
