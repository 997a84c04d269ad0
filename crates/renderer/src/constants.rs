//! Per-pass shader constants.
//!
//! This structure must match the HLSL `cbPass` cbuffer (register b0) in
//! `shaders/fractal.hlsl` exactly. The shader multiplies row vectors
//! (`mul(v, M)`), so matrices are uploaded transposed relative to glam's
//! column-vector convention.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use raymarch_scene::{FlyCamera, FractalParams};

/// Constants uploaded once per frame into the slot's constant region.
///
/// # Memory Layout
///
/// - Offset 0: world (64 bytes)
/// - Offset 64: world-view (64 bytes)
/// - Offset 128: inverse world-view (64 bytes)
/// - Offset 192: world-view-projection (64 bytes)
/// - Offset 256: camera position (12 bytes) + aspect ratio (4 bytes)
/// - Offset 272: fractal color (12 bytes) + darkness (4 bytes)
/// - Offset 288: fractal power (4 bytes) + padding (12 bytes)
/// - Total size: 304 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PassConstants {
    pub world: Mat4,
    pub world_view: Mat4,
    pub inv_world_view: Mat4,
    pub world_view_proj: Mat4,
    pub camera_position: Vec3,
    pub aspect_ratio: f32,
    pub color: Vec3,
    pub darkness: f32,
    pub fractal_power: f32,
    pub _padding: [f32; 3],
}

impl PassConstants {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Builds the constants for one frame from the camera and the current
    /// fractal parameters.
    pub fn new(camera: &FlyCamera, fractal: &FractalParams) -> Self {
        let world = Mat4::IDENTITY;
        let world_view = camera.view_matrix() * world;
        let world_view_proj = camera.projection_matrix() * world_view;

        Self {
            world: world.transpose(),
            world_view: world_view.transpose(),
            inv_world_view: world_view.inverse().transpose(),
            world_view_proj: world_view_proj.transpose(),
            camera_position: camera.position,
            aspect_ratio: camera.projection.aspect,
            color: fractal.color,
            darkness: fractal.darkness,
            fractal_power: fractal.power,
            _padding: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn test_pass_constants_size() {
        // 4 Mat4 (4 * 64) + 3 * 16 bytes of packed scalars
        assert_eq!(PassConstants::SIZE, 304);
    }

    #[test]
    fn test_pass_constants_alignment() {
        assert_eq!(std::mem::align_of::<PassConstants>(), 16);
    }

    #[test]
    fn test_pass_constants_offsets() {
        assert_eq!(offset_of!(PassConstants, world), 0);
        assert_eq!(offset_of!(PassConstants, world_view), 64);
        assert_eq!(offset_of!(PassConstants, inv_world_view), 128);
        assert_eq!(offset_of!(PassConstants, world_view_proj), 192);
        assert_eq!(offset_of!(PassConstants, camera_position), 256);
        assert_eq!(offset_of!(PassConstants, aspect_ratio), 268);
        assert_eq!(offset_of!(PassConstants, color), 272);
        assert_eq!(offset_of!(PassConstants, darkness), 284);
        assert_eq!(offset_of!(PassConstants, fractal_power), 288);
    }

    #[test]
    fn test_matrices_uploaded_transposed() {
        let camera = FlyCamera::default();
        let fractal = FractalParams::default();
        let constants = PassConstants::new(&camera, &fractal);

        let view = camera.view_matrix();
        let proj = camera.projection_matrix();

        assert_eq!(constants.world, Mat4::IDENTITY);
        assert_eq!(constants.world_view, view.transpose());
        assert_eq!(constants.world_view_proj, (proj * view).transpose());
    }

    #[test]
    fn test_inverse_world_view() {
        let camera = FlyCamera::default();
        let constants = PassConstants::new(&camera, &FractalParams::default());

        // Both sides transposed, so the product is still the identity.
        let product = constants.world_view * constants.inv_world_view;
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn test_scalar_fields_copied() {
        let camera = FlyCamera::default();
        let fractal = FractalParams {
            power: 9.5,
            growth_rate: 0.02,
            color: Vec3::new(0.5, 0.25, 1.0),
            darkness: 42.0,
        };
        let constants = PassConstants::new(&camera, &fractal);

        assert_eq!(constants.camera_position, camera.position);
        assert_eq!(constants.aspect_ratio, camera.projection.aspect);
        assert_eq!(constants.color, fractal.color);
        assert_eq!(constants.darkness, 42.0);
        assert_eq!(constants.fractal_power, 9.5);
        assert_eq!(constants._padding, [0.0; 3]);
    }
}
