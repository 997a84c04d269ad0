//! Vulkan backing for the frame traits.
//!
//! - [`FrameCommands`]: a transient command pool with one primary command
//!   buffer, plus the semaphore the slot's swapchain acquire signals
//! - [`UniformRegion`]: a host-visible uniform buffer and the descriptor
//!   set that binds it
//! - [`VulkanQueue`]: the graphics queue with a timeline semaphore as its
//!   fence counter

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use raymarch_rhi::buffer::{Buffer, BufferUsage};
use raymarch_rhi::command::{CommandBuffer, CommandPool};
use raymarch_rhi::descriptor::{DescriptorPool, DescriptorSetLayout, write_uniform_buffer};
use raymarch_rhi::device::Device;
use raymarch_rhi::sync::{Semaphore, TimelineSemaphore};
use raymarch_rhi::{RhiError, RhiResult};

use crate::constants::PassConstants;
use crate::frame_resource::{CommandAllocator, ConstantRegion, FrameResource};
use crate::scheduler::FrameQueue;

/// A frame slot backed by Vulkan objects.
pub type GpuFrame = FrameResource<FrameCommands, UniformRegion>;

/// Per-slot command recording state.
pub struct FrameCommands {
    // Field order is drop order: the buffer handle goes with its pool.
    command_buffer: CommandBuffer,
    pool: CommandPool,
    image_available: Semaphore,
    /// Semaphore of the swapchain image this frame renders to; set while
    /// recording, cleared on reset.
    render_finished: vk::Semaphore,
}

impl FrameCommands {
    pub fn new(device: &Arc<Device>) -> RhiResult<Self> {
        let pool = CommandPool::new(device.clone(), device.queue_families().graphics)?;
        let command_buffer = CommandBuffer::new(device.clone(), &pool)?;
        let image_available = Semaphore::new(device.clone())?;

        Ok(Self {
            command_buffer,
            pool,
            image_available,
            render_finished: vk::Semaphore::null(),
        })
    }

    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }

    /// Signalled by the swapchain once the acquired image is writable.
    #[inline]
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available.handle()
    }

    #[inline]
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished
    }

    pub fn set_render_finished(&mut self, semaphore: vk::Semaphore) {
        self.render_finished = semaphore;
    }
}

impl CommandAllocator for FrameCommands {
    fn reset(&mut self) -> RhiResult<()> {
        self.render_finished = vk::Semaphore::null();
        self.pool.reset(false)
    }
}

/// Per-slot uniform buffer and the descriptor set pointing at it.
pub struct UniformRegion {
    buffer: Buffer,
    descriptor_set: vk::DescriptorSet,
}

impl UniformRegion {
    /// Allocates a buffer sized for [`PassConstants`] and binds it to
    /// `descriptor_set` at binding 0.
    pub fn new(device: &Arc<Device>, descriptor_set: vk::DescriptorSet) -> RhiResult<Self> {
        let buffer = Buffer::new(
            device.clone(),
            BufferUsage::Uniform,
            PassConstants::SIZE as vk::DeviceSize,
        )?;
        write_uniform_buffer(device, descriptor_set, 0, buffer.handle(), buffer.size());

        Ok(Self {
            buffer,
            descriptor_set,
        })
    }

    #[inline]
    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

impl ConstantRegion for UniformRegion {
    fn capacity(&self) -> usize {
        self.buffer.size() as usize
    }

    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> RhiResult<()> {
        self.buffer.write_data(offset as vk::DeviceSize, bytes)
    }
}

/// Creates `count` frame slots, each with its own descriptor set from
/// `pool`.
pub fn create_frames(
    device: &Arc<Device>,
    pool: &DescriptorPool,
    layout: &DescriptorSetLayout,
    count: usize,
) -> RhiResult<Vec<GpuFrame>> {
    let layouts = vec![layout.handle(); count];
    let sets = pool.allocate(&layouts)?;

    let frames = sets
        .into_iter()
        .map(|set| {
            Ok(FrameResource::new(
                FrameCommands::new(device)?,
                UniformRegion::new(device, set)?,
            ))
        })
        .collect::<RhiResult<Vec<_>>>()?;

    debug!("Created {} frame slots", frames.len());
    Ok(frames)
}

/// Graphics queue with a timeline semaphore fence.
pub struct VulkanQueue {
    device: Arc<Device>,
    timeline: TimelineSemaphore,
}

impl VulkanQueue {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let timeline = TimelineSemaphore::new(device.clone(), 0)?;
        Ok(Self { device, timeline })
    }

    #[inline]
    pub fn timeline(&self) -> &TimelineSemaphore {
        &self.timeline
    }
}

impl FrameQueue for VulkanQueue {
    type Allocator = FrameCommands;

    fn completed_value(&self) -> RhiResult<u64> {
        self.timeline.completed_value()
    }

    /// Waits on the slot's acquire semaphore at color output and signals
    /// the image's render-finished semaphore.
    fn submit(&mut self, commands: &FrameCommands) -> RhiResult<()> {
        if commands.render_finished == vk::Semaphore::null() {
            return Err(RhiError::SwapchainError(
                "frame submitted without a target image".to_string(),
            ));
        }

        let wait_semaphores = [commands.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [commands.command_buffer.handle()];
        let signal_semaphores = [commands.render_finished];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // SAFETY: the command buffer was fully recorded by the frame's record
        // closure and both semaphores are owned by live objects.
        unsafe { self.device.submit_graphics(&[submit_info], vk::Fence::null()) }
    }

    fn signal(&mut self, value: u64) -> RhiResult<()> {
        self.device.signal_timeline(&self.timeline, value)
    }

    fn wait_for_value(&self, value: u64) -> RhiResult<()> {
        self.timeline.wait(value, u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_frame_queue<Q: FrameQueue<Allocator = FrameCommands>>() {}
    fn assert_constant_region<C: ConstantRegion>() {}

    #[test]
    fn test_vulkan_types_implement_frame_traits() {
        assert_frame_queue::<VulkanQueue>();
        assert_constant_region::<UniformRegion>();
    }
}
