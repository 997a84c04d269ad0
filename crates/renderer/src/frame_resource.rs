//! Per-frame resource slots.
//!
//! A [`FrameResource`] bundles everything the CPU writes while building one
//! frame: the command allocator that recording draws from and the constant
//! region the shaders read. Once the frame is submitted the slot is stamped
//! with the fence value that retires it, and it must not be touched again
//! until the queue reports that value complete.
//!
//! The slot is generic over the [`CommandAllocator`] and [`ConstantRegion`]
//! traits so the scheduling logic can be driven by the Vulkan backing in
//! [`crate::gpu`] or by in-memory doubles in tests.

use bytemuck::Pod;

use raymarch_rhi::RhiResult;

/// Backing memory for recorded commands.
pub trait CommandAllocator {
    /// Discards everything recorded so far and recycles the memory.
    ///
    /// Must only be called once the GPU has finished with the previous
    /// recording.
    fn reset(&mut self) -> RhiResult<()>;
}

/// CPU-writable, GPU-readable block of per-frame constants.
pub trait ConstantRegion {
    /// Size of the region in bytes.
    fn capacity(&self) -> usize;

    /// Copies `bytes` into the region starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write runs past [`capacity`](Self::capacity).
    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> RhiResult<()>;
}

/// One slot of the frame ring.
///
/// `fence` is zero until the slot's first submission.
#[derive(Debug)]
pub struct FrameResource<A, C> {
    allocator: A,
    constants: C,
    fence: u64,
}

impl<A: CommandAllocator, C: ConstantRegion> FrameResource<A, C> {
    pub fn new(allocator: A, constants: C) -> Self {
        Self {
            allocator,
            constants,
            fence: 0,
        }
    }

    /// Recycles the command allocator.
    ///
    /// The caller guarantees the slot is retired; this is not checked.
    pub fn reset(&mut self) -> RhiResult<()> {
        self.allocator.reset()
    }

    /// Writes `data` at the start of the constant region.
    pub fn write_constants<T: Pod>(&mut self, data: &T) -> RhiResult<()> {
        self.constants.write_bytes(0, bytemuck::bytes_of(data))
    }

    /// Records the fence value of the submission that last used this slot.
    pub fn stamp(&mut self, fence: u64) {
        self.fence = fence;
    }

    #[inline]
    pub fn fence(&self) -> u64 {
        self.fence
    }

    /// Whether the slot has been submitted at least once and that
    /// submission has completed.
    #[inline]
    pub fn is_retired(&self, completed: u64) -> bool {
        self.fence != 0 && self.fence <= completed
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    #[inline]
    pub fn constants(&self) -> &C {
        &self.constants
    }

    /// Both halves at once, for recording that reads constants while
    /// writing commands.
    #[inline]
    pub fn parts_mut(&mut self) -> (&mut A, &mut C) {
        (&mut self.allocator, &mut self.constants)
    }
}
