//! Platform layer for the ray-marching demo.
//!
//! - Window creation via winit
//! - Vulkan surface creation from raw window handles
//! - Input state and the demo's key bindings

mod input;
mod window;

pub use input::{Action, InputState, KeyCode, MouseButton};
pub use window::{Surface, Window, required_surface_extensions};
