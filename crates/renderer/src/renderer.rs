//! Main renderer orchestration.
//!
//! This module provides the [`Renderer`] struct that owns every Vulkan
//! object and drives the [`FrameScheduler`] once per frame.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use raymarch_core::Config;
use raymarch_platform::{Surface, Window};
use raymarch_rhi::buffer::{Buffer, BufferUsage};
use raymarch_rhi::command::CommandBuffer;
use raymarch_rhi::descriptor::{DescriptorPool, DescriptorSetLayout, uniform_buffer_binding};
use raymarch_rhi::device::Device;
use raymarch_rhi::instance::Instance;
use raymarch_rhi::physical_device::select_physical_device;
use raymarch_rhi::pipeline::{CullMode, GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use raymarch_rhi::shader::{Shader, ShaderStage};
use raymarch_rhi::swapchain::Swapchain;
use raymarch_rhi::sync::Semaphore;
use raymarch_rhi::vertex::{QUAD_INDICES, QUAD_VERTICES, QuadVertex};
use raymarch_rhi::{RhiError, RhiResult, VkResultExt};
use raymarch_scene::{CameraInput, FlyCamera, FractalParams};

use crate::gpu::{UniformRegion, VulkanQueue, create_frames};
use crate::scheduler::FrameScheduler;

/// Handles the fullscreen fractal draw needs, copied out of the renderer so
/// recording does not borrow it.
#[derive(Clone, Copy, Debug)]
struct FractalPass {
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    vertex_buffer: vk::Buffer,
    index_buffer: vk::Buffer,
    index_count: u32,
}

/// The swapchain image a frame renders into.
#[derive(Clone, Copy, Debug)]
struct RenderTarget {
    image: vk::Image,
    view: vk::ImageView,
    extent: vk::Extent2D,
}

/// Owns every Vulkan resource of the demo.
///
/// # Resource Destruction Order
///
/// 1. Flush the frame scheduler and wait for the device to go idle
/// 2. Frame slots, timeline semaphore and per-image semaphores
/// 3. Quad buffers, pipeline and descriptor objects
/// 4. Swapchain, then surface
/// 5. Device, then instance
///
/// ManuallyDrop is used to enforce that order.
pub struct Renderer {
    instance: ManuallyDrop<Instance>,
    device: ManuallyDrop<Arc<Device>>,
    surface: ManuallyDrop<Surface>,
    swapchain: ManuallyDrop<Swapchain>,

    descriptor_set_layout: ManuallyDrop<DescriptorSetLayout>,
    descriptor_pool: ManuallyDrop<DescriptorPool>,
    pipeline: ManuallyDrop<Pipeline>,
    pipeline_layout: ManuallyDrop<PipelineLayout>,

    vertex_buffer: ManuallyDrop<Buffer>,
    index_buffer: ManuallyDrop<Buffer>,

    /// One per swapchain image; presentation waits on the image's own
    /// semaphore.
    render_finished: Vec<Semaphore>,
    scheduler: ManuallyDrop<FrameScheduler<VulkanQueue, UniformRegion>>,

    swapchain_dirty: bool,
    width: u32,
    height: u32,
}

impl Renderer {
    /// Creates the renderer for `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if any Vulkan resource creation fails or the shader
    /// binaries cannot be loaded.
    pub fn new(window: &Window, config: &Config) -> RhiResult<Self> {
        let width = window.width();
        let height = window.height();
        let frames_in_flight = config.renderer.frames_in_flight;

        info!("Initializing Vulkan renderer ({}x{})", width, height);

        let surface_extensions = window
            .required_extensions()
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;
        let instance = Instance::new(
            &config.window.title,
            config.renderer.validation,
            &surface_extensions,
        )?;
        if config.renderer.validation && !instance.has_validation() {
            debug!("Validation requested but the layer is not installed");
        }

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical_device_info)?;

        let swapchain = Swapchain::new(&instance, device.clone(), surface.handle(), width, height)?;

        let descriptor_set_layout = DescriptorSetLayout::new(
            device.clone(),
            &[uniform_buffer_binding(
                0,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            )],
        )?;
        let pool_sizes = [vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(frames_in_flight as u32)];
        let descriptor_pool =
            DescriptorPool::new(device.clone(), frames_in_flight as u32, &pool_sizes)?;

        let (pipeline, pipeline_layout) =
            Self::create_pipeline(&device, config, &descriptor_set_layout, swapchain.format())?;

        let vertex_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&QUAD_VERTICES),
        )?;
        let index_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Index,
            bytemuck::cast_slice(&QUAD_INDICES),
        )?;

        let frames = create_frames(
            &device,
            &descriptor_pool,
            &descriptor_set_layout,
            frames_in_flight,
        )?;
        let queue = VulkanQueue::new(device.clone())?;

        let extent = swapchain.extent();
        let camera = FlyCamera::from_config(&config.camera, aspect_ratio(extent));
        let fractal = FractalParams::from_config(&config.fractal);
        let scheduler = FrameScheduler::new(queue, frames, camera, fractal);

        let render_finished = create_semaphores(&device, swapchain.image_count())?;

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight",
            swapchain.image_count(),
            frames_in_flight
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            device: ManuallyDrop::new(device),
            surface: ManuallyDrop::new(surface),
            swapchain: ManuallyDrop::new(swapchain),
            descriptor_set_layout: ManuallyDrop::new(descriptor_set_layout),
            descriptor_pool: ManuallyDrop::new(descriptor_pool),
            pipeline: ManuallyDrop::new(pipeline),
            pipeline_layout: ManuallyDrop::new(pipeline_layout),
            vertex_buffer: ManuallyDrop::new(vertex_buffer),
            index_buffer: ManuallyDrop::new(index_buffer),
            render_finished,
            scheduler: ManuallyDrop::new(scheduler),
            swapchain_dirty: false,
            width,
            height,
        })
    }

    fn create_pipeline(
        device: &Arc<Device>,
        config: &Config,
        descriptor_set_layout: &DescriptorSetLayout,
        color_format: vk::Format,
    ) -> RhiResult<(Pipeline, PipelineLayout)> {
        let renderer = &config.renderer;
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            &renderer.vertex_shader,
            ShaderStage::Vertex,
            &renderer.vertex_entry,
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            &renderer.fragment_shader,
            ShaderStage::Fragment,
            &renderer.fragment_entry,
        )?;

        let layout = PipelineLayout::new(device.clone(), &[descriptor_set_layout.handle()])?;

        // The quad faces the camera in clip space; both windings must draw.
        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .vertex_binding(QuadVertex::binding_description())
            .vertex_attributes(&QuadVertex::attribute_descriptions())
            .cull_mode(CullMode::None)
            .color_attachment_format(color_format)
            .build(device.clone(), &layout)?;

        Ok((pipeline, layout))
    }

    /// Handles a window resize.
    ///
    /// The swapchain is rebuilt at the start of the next rendered frame. A
    /// zero-sized (minimized) window suspends rendering until it grows
    /// again.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }

        debug!(
            "Resize: {}x{} -> {}x{}",
            self.width, self.height, width, height
        );
        self.width = width;
        self.height = height;

        if width > 0 && height > 0 {
            self.swapchain_dirty = true;
            self.scheduler
                .set_aspect_ratio(width as f32 / height as f32);
        }
    }

    /// Drains in-flight frames and rebuilds the swapchain at the current
    /// window size.
    fn recreate_swapchain(&mut self) -> RhiResult<()> {
        self.scheduler.flush()?;

        self.swapchain.recreate(
            &self.instance,
            self.surface.handle(),
            self.width,
            self.height,
        )?;

        // The image count may have changed
        self.render_finished = create_semaphores(&self.device, self.swapchain.image_count())?;

        self.scheduler
            .set_aspect_ratio(aspect_ratio(self.swapchain.extent()));
        self.swapchain_dirty = false;
        Ok(())
    }

    /// Renders one frame.
    ///
    /// Returns `false` when no frame was submitted and `input` went unused:
    /// while the window is minimized, or when an out-of-date swapchain is
    /// rebuilt and the frame dropped.
    ///
    /// # Errors
    ///
    /// Any other Vulkan failure is fatal and returned to the caller.
    pub fn render_frame(&mut self, dt: f32, input: &CameraInput) -> RhiResult<bool> {
        if self.width == 0 || self.height == 0 {
            return Ok(false);
        }

        if self.swapchain_dirty {
            debug!("Recreating swapchain before acquire");
            self.recreate_swapchain()?;
        }

        self.scheduler.on_frame_begin()?;

        let image_available = self.scheduler.current_frame().allocator().image_available();
        let acquired = self.swapchain.acquire_next_image(image_available);
        let (image_index, suboptimal) = match acquired {
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                // The ring has already advanced and reset this slot, so the
                // dropped frame still consumes it. Its fence stays retired.
                debug!("Swapchain out of date on acquire");
                self.recreate_swapchain()?;
                return Ok(false);
            }
            other => other.context("vkAcquireNextImageKHR")?,
        };

        self.scheduler.on_update(dt, input)?;

        let pass = self.fractal_pass();
        let target = RenderTarget {
            image: self.swapchain.image(image_index as usize),
            view: self.swapchain.image_view(image_index as usize),
            extent: self.swapchain.extent(),
        };
        let render_finished = self.render_finished[image_index as usize].handle();

        self.scheduler.on_frame_end(|frame| {
            let (commands, constants) = frame.parts_mut();
            commands.set_render_finished(render_finished);
            record_fractal_pass(
                commands.command_buffer(),
                &pass,
                &target,
                constants.descriptor_set(),
            )
        })?;

        let presented =
            self.swapchain
                .present(self.device.present_queue(), image_index, render_finished);
        match presented {
            Ok(present_suboptimal) => {
                if suboptimal || present_suboptimal {
                    debug!("Swapchain suboptimal, scheduling recreation");
                    self.swapchain_dirty = true;
                }
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("Swapchain out of date on present");
                self.swapchain_dirty = true;
            }
            Err(result) => return Err::<bool, _>(result).context("vkQueuePresentKHR"),
        }

        Ok(true)
    }

    fn fractal_pass(&self) -> FractalPass {
        FractalPass {
            pipeline: self.pipeline.handle(),
            layout: self.pipeline_layout.handle(),
            vertex_buffer: self.vertex_buffer.handle(),
            index_buffer: self.index_buffer.handle(),
            index_count: QUAD_INDICES.len() as u32,
        }
    }

    /// Frame scheduler, for reading camera and fractal state.
    pub fn scheduler(&self) -> &FrameScheduler<VulkanQueue, UniformRegion> {
        &self.scheduler
    }

    /// Returns the current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.scheduler.flush() {
            error!("Failed to flush frames during renderer drop: {}", e);
        }
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during renderer drop: {}", e);
        }

        self.render_finished.clear();

        unsafe {
            ManuallyDrop::drop(&mut self.scheduler);
            ManuallyDrop::drop(&mut self.vertex_buffer);
            ManuallyDrop::drop(&mut self.index_buffer);
            ManuallyDrop::drop(&mut self.pipeline);
            ManuallyDrop::drop(&mut self.pipeline_layout);
            ManuallyDrop::drop(&mut self.descriptor_pool);
            ManuallyDrop::drop(&mut self.descriptor_set_layout);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.surface);
            // Last Arc<Device> reference
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}

fn aspect_ratio(extent: vk::Extent2D) -> f32 {
    if extent.height == 0 {
        1.0
    } else {
        extent.width as f32 / extent.height as f32
    }
}

fn create_semaphores(device: &Arc<Device>, count: usize) -> RhiResult<Vec<Semaphore>> {
    (0..count).map(|_| Semaphore::new(device.clone())).collect()
}

/// Records the fullscreen quad into `cmd`, transitioning the target image
/// for rendering and back for presentation.
fn record_fractal_pass(
    cmd: &CommandBuffer,
    pass: &FractalPass,
    target: &RenderTarget,
    descriptor_set: vk::DescriptorSet,
) -> RhiResult<()> {
    cmd.begin()?;

    cmd.transition_color_image(
        target.image,
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    );

    let color_attachment = vk::RenderingAttachmentInfo::default()
        .image_view(target.view)
        .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .clear_value(vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        });

    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: target.extent,
    };
    let rendering_info = vk::RenderingInfo::default()
        .render_area(render_area)
        .layer_count(1)
        .color_attachments(std::slice::from_ref(&color_attachment));

    cmd.begin_rendering(&rendering_info);

    cmd.set_viewport(&vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: target.extent.width as f32,
        height: target.extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    });
    cmd.set_scissor(&render_area);

    cmd.bind_graphics_pipeline(pass.pipeline);
    cmd.bind_graphics_descriptor_set(pass.layout, 0, descriptor_set);
    cmd.bind_vertex_buffer(0, pass.vertex_buffer);
    cmd.bind_index_buffer(pass.index_buffer, vk::IndexType::UINT16);
    cmd.draw_indexed(pass.index_count);

    cmd.end_rendering();

    cmd.transition_color_image(
        target.image,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        vk::ImageLayout::PRESENT_SRC_KHR,
    );

    cmd.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio() {
        let extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        assert!((aspect_ratio(extent) - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(
            aspect_ratio(vk::Extent2D {
                width: 800,
                height: 0
            }),
            1.0
        );
    }

    #[test]
    fn test_default_frames_in_flight() {
        assert_eq!(
            Config::default().renderer.frames_in_flight,
            crate::FRAMES_IN_FLIGHT
        );
    }

    #[test]
    fn test_quad_draws_two_triangles() {
        assert_eq!(QUAD_INDICES.len() % 3, 0);
        assert_eq!(QUAD_INDICES.len() / 3, 2);
    }
}
