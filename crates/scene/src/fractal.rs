//! Fractal parameters uploaded to the ray-marching shader.

use glam::Vec3;
use raymarch_core::FractalConfig;

/// Growth-rate change per key-down event.
pub const GROWTH_STEP: f32 = 0.01;

/// Lower bound of the fractal power.
pub const MIN_POWER: f32 = 1.0;

/// Power, its rate of change, and shading constants.
#[derive(Clone, Debug, PartialEq)]
pub struct FractalParams {
    pub power: f32,
    /// Units of power per second. Never reset and not bounded.
    pub growth_rate: f32,
    pub color: Vec3,
    pub darkness: f32,
}

impl Default for FractalParams {
    fn default() -> Self {
        Self::from_config(&FractalConfig::default())
    }
}

impl FractalParams {
    pub fn from_config(config: &FractalConfig) -> Self {
        Self {
            power: config.power.max(MIN_POWER),
            growth_rate: 0.0,
            color: Vec3::from_array(config.color),
            darkness: config.darkness,
        }
    }

    pub fn increase_growth(&mut self) {
        self.growth_rate += GROWTH_STEP;
    }

    pub fn decrease_growth(&mut self) {
        self.growth_rate -= GROWTH_STEP;
    }

    /// Apply a signed number of growth steps.
    pub fn apply_growth_steps(&mut self, steps: i32) {
        for _ in 0..steps.unsigned_abs() {
            if steps > 0 {
                self.increase_growth();
            } else {
                self.decrease_growth();
            }
        }
    }

    /// Advance the power by `growth_rate * dt`, floored at [`MIN_POWER`].
    pub fn integrate(&mut self, dt: f32) {
        self.power = (self.power + self.growth_rate * dt).max(MIN_POWER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = FractalParams::default();
        assert_eq!(params.power, 8.0);
        assert_eq!(params.growth_rate, 0.0);
        assert_eq!(params.color, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(params.darkness, 150.0);
    }

    #[test]
    fn test_three_increments_grow_power() {
        let mut params = FractalParams::default();
        params.apply_growth_steps(3);
        assert!((params.growth_rate - 0.03).abs() < 1e-6);

        params.integrate(1.0);
        assert!((params.power - 8.03).abs() < 1e-5);
        params.integrate(1.0);
        assert!((params.power - 8.06).abs() < 1e-5);
    }

    #[test]
    fn test_power_never_below_floor() {
        let mut params = FractalParams::default();
        params.apply_growth_steps(-500);
        assert!((params.growth_rate + 5.0).abs() < 1e-4);

        for _ in 0..10 {
            params.integrate(1.0);
            assert!(params.power >= MIN_POWER);
        }
        assert_eq!(params.power, MIN_POWER);
    }

    #[test]
    fn test_growth_rate_is_not_capped() {
        let mut params = FractalParams::default();
        for _ in 0..10_000 {
            params.increase_growth();
        }
        assert!(params.growth_rate > 99.0);
    }

    #[test]
    fn test_opposite_steps_cancel() {
        let mut params = FractalParams::default();
        params.apply_growth_steps(2);
        params.apply_growth_steps(-2);
        assert!(params.growth_rate.abs() < 1e-6);
        params.apply_growth_steps(0);
        assert!(params.growth_rate.abs() < 1e-6);
    }
}
