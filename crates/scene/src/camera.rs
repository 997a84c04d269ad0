//! Free-flying camera driven by spherical angles.

use std::f32::consts::PI;

use glam::{Mat4, Vec3};
use raymarch_core::CameraConfig;

/// Smallest distance kept between `phi` and either pole.
pub const PHI_MARGIN: f32 = 0.1;

/// Perspective projection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    /// Left-handed perspective with the Vulkan Y flip applied.
    pub fn matrix(&self) -> Mat4 {
        let mut proj = Mat4::perspective_lh(self.fov_y, self.aspect, self.near, self.far);
        // Flip Y for Vulkan coordinate system
        proj.y_axis.y *= -1.0;
        proj
    }
}

/// Movement and look input for a single frame.
///
/// Axes are -1, 0 or +1. `look_delta` is the mouse drag in pixels and is
/// zero unless the look button is held.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraInput {
    /// Forward (+1) / backward (-1)
    pub vertical: f32,
    /// Strafe along `right()` (+1) or against it (-1)
    pub horizontal: f32,
    /// Ascend (+1) / descend (-1) along world up
    pub elevation: f32,
    pub slow_motion: bool,
    pub look_delta: (f32, f32),
    /// Net growth-rate steps requested this frame
    pub growth_steps: i32,
}

/// Camera with position and (theta, phi) orientation.
///
/// `theta` is the azimuth in the XZ plane and `phi` the polar angle from +Y.
#[derive(Clone, Debug)]
pub struct FlyCamera {
    pub position: Vec3,
    theta: f32,
    phi: f32,
    pub projection: Projection,
    pub horizontal_speed: f32,
    pub vertical_speed: f32,
    pub slow_motion_factor: f32,
    /// Degrees per pixel of mouse drag
    pub mouse_sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 1.0)
    }
}

impl FlyCamera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            position: Vec3::from_array(config.position),
            theta: config.theta,
            phi: 0.0,
            projection: Projection {
                fov_y: config.fov_y,
                aspect,
                near: config.near,
                far: config.far,
            },
            horizontal_speed: config.horizontal_speed,
            vertical_speed: config.vertical_speed,
            slow_motion_factor: config.slow_motion_factor,
            mouse_sensitivity: config.mouse_sensitivity,
        };
        camera.set_phi(config.phi);
        camera
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    /// Set the polar angle, clamped away from the poles.
    pub fn set_phi(&mut self, phi: f32) {
        self.phi = phi.clamp(PHI_MARGIN, PI - PHI_MARGIN);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection.aspect = aspect;
    }

    /// Unit view direction.
    pub fn forward(&self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vec3::new(sin_phi * cos_theta, cos_phi, sin_phi * sin_theta)
    }

    /// `forward × up`, normalized. In this left-handed setup it points to
    /// the viewer's left.
    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Rotate by a mouse drag of `dx`, `dy` pixels.
    pub fn look(&mut self, dx: f32, dy: f32) {
        let d_theta = (self.mouse_sensitivity * dx).to_radians();
        let d_phi = (self.mouse_sensitivity * dy).to_radians();
        self.theta -= d_theta;
        self.set_phi(self.phi + d_phi);
    }

    /// Integrate one frame of movement and look input.
    pub fn update(&mut self, dt: f32, input: &CameraInput) {
        let (dx, dy) = input.look_delta;
        if dx != 0.0 || dy != 0.0 {
            self.look(dx, dy);
        }

        let forward = self.forward();
        let right = self.right();

        let horizontal_step = self.horizontal_speed * dt;
        let vertical_step = self.vertical_speed * dt;
        let mut delta = forward * (input.vertical * horizontal_step)
            + right * (input.horizontal * horizontal_step)
            + Vec3::Y * (input.elevation * vertical_step);

        if input.slow_motion {
            delta *= self.slow_motion_factor;
        }

        self.position += delta;
    }

    /// View matrix (left-handed).
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_lh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_initial_state() {
        let camera = FlyCamera::default();
        assert_eq!(camera.position, Vec3::new(3.0, 0.0, -3.0));
        assert_eq!(camera.theta(), 0.75 * PI);
        assert_eq!(camera.phi(), 0.5 * PI);

        // Looks back toward the origin.
        let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
        assert!(approx_eq(camera.forward(), expected));
    }

    #[test]
    fn test_right_is_perpendicular_and_horizontal() {
        let camera = FlyCamera::default();
        let right = camera.right();
        assert!(right.dot(camera.forward()).abs() < 1e-6);
        assert!(right.y.abs() < 1e-6);
        assert!((right.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_phi_clamped_for_extreme_drags() {
        let mut camera = FlyCamera::default();
        for dy in [1.0e6, -1.0e6, 720.0, -720.0, 0.5] {
            camera.look(0.0, dy);
            assert!(camera.phi() >= PHI_MARGIN);
            assert!(camera.phi() <= PI - PHI_MARGIN);
        }

        camera.look(0.0, 1.0e6);
        assert_eq!(camera.phi(), PI - PHI_MARGIN);
        camera.look(0.0, -1.0e6);
        assert_eq!(camera.phi(), PHI_MARGIN);
    }

    #[test]
    fn test_look_directions() {
        let mut camera = FlyCamera::default();
        let theta = camera.theta();
        let phi = camera.phi();

        camera.look(4.0, 8.0);
        assert!((camera.theta() - (theta - 1.0_f32.to_radians())).abs() < 1e-6);
        assert!((camera.phi() - (phi + 2.0_f32.to_radians())).abs() < 1e-6);
    }

    #[test]
    fn test_theta_unbounded() {
        let mut camera = FlyCamera::default();
        camera.look(-1440.0 * 4.0, 0.0);
        assert!(camera.theta() > 2.0 * PI);
    }

    #[test]
    fn test_forward_movement() {
        let mut camera = FlyCamera::default();
        let start = camera.position;
        let forward = camera.forward();

        camera.update(
            2.0,
            &CameraInput {
                vertical: 1.0,
                ..Default::default()
            },
        );
        assert!(approx_eq(camera.position, start + forward * 2.0));
    }

    #[test]
    fn test_slow_motion_scales_all_axes() {
        let mut fast = FlyCamera::default();
        let mut slow = FlyCamera::default();
        let input = CameraInput {
            vertical: 1.0,
            horizontal: -1.0,
            elevation: 1.0,
            ..Default::default()
        };

        fast.update(1.0, &input);
        slow.update(
            1.0,
            &CameraInput {
                slow_motion: true,
                ..input
            },
        );

        let start = Vec3::new(3.0, 0.0, -3.0);
        assert!(approx_eq((slow.position - start) * 10.0, fast.position - start));
    }

    #[test]
    fn test_elevation_uses_world_up() {
        let mut camera = FlyCamera::default();
        camera.look(0.0, 200.0);
        camera.update(
            0.5,
            &CameraInput {
                elevation: -1.0,
                ..Default::default()
            },
        );
        assert!(approx_eq(camera.position, Vec3::new(3.0, -0.5, -3.0)));
    }

    #[test]
    fn test_view_matrix_maps_eye_to_origin() {
        let camera = FlyCamera::default();
        let eye = camera.view_matrix().transform_point3(camera.position);
        assert!(eye.length() < 1e-5);

        // A point ahead of the camera lands on +Z in view space.
        let ahead = camera
            .view_matrix()
            .transform_point3(camera.position + camera.forward() * 5.0);
        assert!(approx_eq(ahead, Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_projection_flips_y() {
        let projection = Projection {
            fov_y: 0.25 * PI,
            aspect: 1.0,
            near: 1.0,
            far: 1000.0,
        };
        let flipped = projection.matrix();
        let plain = Mat4::perspective_lh(0.25 * PI, 1.0, 1.0, 1000.0);
        assert_eq!(flipped.y_axis.y, -plain.y_axis.y);
        assert_eq!(flipped.x_axis, plain.x_axis);
    }
}
