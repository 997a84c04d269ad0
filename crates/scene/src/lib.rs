//! Scene state for the ray-marching demo.
//!
//! - Free-flying camera with spherical orientation
//! - Fractal parameters animated over time

pub mod camera;
pub mod fractal;

pub use camera::{CameraInput, FlyCamera, PHI_MARGIN, Projection};
pub use fractal::FractalParams;
