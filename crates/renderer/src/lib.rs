//! Frame pipelining and the fractal renderer.
//!
//! This crate orchestrates the rendering process:
//! - Per-frame resource slots and the ring that cycles them
//! - The frame scheduler that keeps the CPU at most `N` frames ahead
//! - Vulkan backing for the scheduler's traits
//! - The [`Renderer`] that draws the fractal every frame

pub mod constants;
pub mod frame_resource;
pub mod frame_ring;
pub mod gpu;
pub mod renderer;
pub mod scheduler;

pub use constants::PassConstants;
pub use frame_resource::{CommandAllocator, ConstantRegion, FrameResource};
pub use frame_ring::FrameRing;
pub use renderer::Renderer;
pub use scheduler::{FrameQueue, FrameScheduler};

/// Default number of frames that can be in flight simultaneously.
pub const FRAMES_IN_FLIGHT: usize = 3;
