//! CPU/GPU frame pipelining.
//!
//! The [`FrameScheduler`] lets the CPU build up to `N` frames ahead of the
//! GPU. Every frame goes through the same three calls:
//!
//! ```text
//! on_frame_begin   advance ring -> wait for slot's fence -> reset slot
//! on_update        camera + fractal update -> write PassConstants
//! on_frame_end     record -> submit -> signal ++fence -> stamp slot
//! ```
//!
//! The only place the CPU blocks is the retire-wait in
//! [`on_frame_begin`](FrameScheduler::on_frame_begin), and only when the
//! slot about to be reused still has GPU work outstanding. Fence values are
//! signalled in submission order, so comparing a slot's fence against the
//! queue's completed value is enough to know it is free.
//!
//! # Example
//!
//! ```no_run
//! use raymarch_renderer::scheduler::{FrameQueue, FrameScheduler};
//! use raymarch_renderer::frame_resource::ConstantRegion;
//! use raymarch_scene::CameraInput;
//!
//! # fn example<Q: FrameQueue, C: ConstantRegion>(
//! #     scheduler: &mut FrameScheduler<Q, C>,
//! # ) -> Result<(), raymarch_rhi::RhiError> {
//! scheduler.on_frame_begin()?;
//! scheduler.on_update(1.0 / 60.0, &CameraInput::default())?;
//! let fence = scheduler.on_frame_end(|_frame| Ok(()))?;
//! # let _ = fence;
//! # Ok(())
//! # }
//! ```

use tracing::{debug, trace};

use raymarch_rhi::RhiResult;
use raymarch_scene::{CameraInput, FlyCamera, FractalParams};

use crate::constants::PassConstants;
use crate::frame_ring::FrameRing;
use crate::frame_resource::{CommandAllocator, ConstantRegion, FrameResource};

/// The queue frames are submitted to, plus its fence counter.
pub trait FrameQueue {
    type Allocator: CommandAllocator;

    /// Highest fence value the GPU has completed. Non-blocking.
    fn completed_value(&self) -> RhiResult<u64>;

    /// Submits the work recorded in `allocator`.
    fn submit(&mut self, allocator: &Self::Allocator) -> RhiResult<()>;

    /// Signals `value` once everything submitted so far has completed.
    fn signal(&mut self, value: u64) -> RhiResult<()>;

    /// Blocks until the completed value reaches `value`. No timeout.
    fn wait_for_value(&self, value: u64) -> RhiResult<()>;
}

/// Slot type used by a scheduler over queue `Q` and region `C`.
pub type SchedulerFrame<Q, C> = FrameResource<<Q as FrameQueue>::Allocator, C>;

/// Drives the frame ring and owns the per-frame simulation state.
pub struct FrameScheduler<Q: FrameQueue, C> {
    queue: Q,
    ring: FrameRing<SchedulerFrame<Q, C>>,
    /// Last value handed to `signal`.
    fence_value: u64,
    camera: FlyCamera,
    fractal: FractalParams,
}

impl<Q: FrameQueue, C: ConstantRegion> FrameScheduler<Q, C> {
    /// # Panics
    ///
    /// Panics if `frames` is empty.
    pub fn new(
        queue: Q,
        frames: Vec<SchedulerFrame<Q, C>>,
        camera: FlyCamera,
        fractal: FractalParams,
    ) -> Self {
        debug!("Frame scheduler created with {} slots", frames.len());
        Self {
            queue,
            ring: FrameRing::new(frames),
            fence_value: 0,
            camera,
            fractal,
        }
    }

    /// Advances to the next slot, waits for it to retire and resets it.
    ///
    /// # Errors
    ///
    /// Any queue failure is returned as-is; the frame cannot proceed.
    pub fn on_frame_begin(&mut self) -> RhiResult<()> {
        self.ring.advance();
        let index = self.ring.index();
        let fence = self.ring.current().fence();

        if fence != 0 {
            let completed = self.queue.completed_value()?;
            if completed < fence {
                debug!(slot = index, fence, completed, "Waiting for frame slot to retire");
                self.queue.wait_for_value(fence)?;
            }
        }

        trace!(slot = index, "Frame begin");
        self.ring.current_mut().reset()
    }

    /// Updates the camera and fractal from `input` and uploads this
    /// frame's constants into the current slot.
    ///
    /// The uploaded power is the value before this frame's growth is
    /// applied.
    pub fn on_update(&mut self, dt: f32, input: &CameraInput) -> RhiResult<PassConstants> {
        self.camera.update(dt, input);
        self.fractal.apply_growth_steps(input.growth_steps);

        let constants = PassConstants::new(&self.camera, &self.fractal);
        self.ring.current_mut().write_constants(&constants)?;

        self.fractal.integrate(dt);
        Ok(constants)
    }

    /// Records the frame through `record`, submits it and stamps the slot
    /// with a fresh fence value.
    ///
    /// Returns the fence value that retires this frame. If recording,
    /// submission or the signal fails, the slot keeps its old fence and the
    /// counter does not move.
    pub fn on_frame_end<F>(&mut self, record: F) -> RhiResult<u64>
    where
        F: FnOnce(&mut SchedulerFrame<Q, C>) -> RhiResult<()>,
    {
        let frame = self.ring.current_mut();
        record(&mut *frame)?;

        self.queue.submit(frame.allocator())?;

        let fence = self.fence_value + 1;
        self.queue.signal(fence)?;
        self.fence_value = fence;
        frame.stamp(fence);

        trace!(fence, "Frame submitted");
        Ok(fence)
    }

    /// Signals a new fence value and blocks until the GPU reaches it.
    ///
    /// Afterwards every slot is retired.
    pub fn flush(&mut self) -> RhiResult<()> {
        let fence = self.fence_value + 1;
        self.queue.signal(fence)?;
        self.fence_value = fence;

        if self.queue.completed_value()? < self.fence_value {
            debug!(fence = self.fence_value, "Flushing queue");
            self.queue.wait_for_value(self.fence_value)?;
        }
        Ok(())
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.ring.index()
    }

    /// Fence value of the current slot's last submission.
    #[inline]
    pub fn current_fence(&self) -> u64 {
        self.ring.current().fence()
    }

    /// Last fence value signalled on the queue.
    #[inline]
    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn current_frame(&self) -> &SchedulerFrame<Q, C> {
        self.ring.current()
    }

    pub fn frames(&self) -> impl Iterator<Item = &SchedulerFrame<Q, C>> {
        self.ring.iter()
    }

    #[inline]
    pub fn camera(&self) -> &FlyCamera {
        &self.camera
    }

    #[inline]
    pub fn fractal(&self) -> &FractalParams {
        &self.fractal
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.camera.set_aspect(aspect);
    }

    #[inline]
    pub fn queue(&self) -> &Q {
        &self.queue
    }
}
