//! Configuration management (`raymarch.toml`).
//!
//! Every section and field has a default, so a missing file or a partial
//! file both produce a usable configuration.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "raymarch.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_ENV_VAR: &str = "RAYMARCH_CONFIG";

const MAX_FRAMES_IN_FLIGHT: usize = 8;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Window settings
    #[serde(default)]
    pub window: WindowConfig,
    /// Renderer and frame pipelining settings
    #[serde(default)]
    pub renderer: RendererConfig,
    /// Initial camera state and movement tuning
    #[serde(default)]
    pub camera: CameraConfig,
    /// Initial fractal parameters
    #[serde(default)]
    pub fractal: FractalConfig,
}

/// Window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Initial client width in pixels (default: 800)
    #[serde(default = "default_width")]
    pub width: u32,
    /// Initial client height in pixels (default: 600)
    #[serde(default = "default_height")]
    pub height: u32,
    /// Window title; frame statistics are appended to it
    #[serde(default = "default_title")]
    pub title: String,
}

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Number of frame resource slots in the ring (default: 3)
    #[serde(default = "default_frames_in_flight")]
    pub frames_in_flight: usize,
    /// Enable Vulkan validation layers (default: on in debug builds)
    #[serde(default = "default_validation")]
    pub validation: bool,
    /// Compiled SPIR-V vertex shader
    #[serde(default = "default_vertex_shader")]
    pub vertex_shader: PathBuf,
    /// Compiled SPIR-V fragment shader
    #[serde(default = "default_fragment_shader")]
    pub fragment_shader: PathBuf,
    #[serde(default = "default_vertex_entry")]
    pub vertex_entry: String,
    #[serde(default = "default_fragment_entry")]
    pub fragment_entry: String,
}

/// Camera configuration. Angles are in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_position")]
    pub position: [f32; 3],
    /// Azimuth around +Y (default: 3π/4)
    #[serde(default = "default_theta")]
    pub theta: f32,
    /// Polar angle from +Y (default: π/2)
    #[serde(default = "default_phi")]
    pub phi: f32,
    /// Vertical field of view (default: π/4)
    #[serde(default = "default_fov_y")]
    pub fov_y: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// Forward/strafe speed in units per second (default: 1.0)
    #[serde(default = "default_speed")]
    pub horizontal_speed: f32,
    /// Ascend/descend speed in units per second (default: 1.0)
    #[serde(default = "default_speed")]
    pub vertical_speed: f32,
    /// Speed multiplier while slow motion is held (default: 0.1)
    #[serde(default = "default_slow_motion_factor")]
    pub slow_motion_factor: f32,
    /// Degrees of rotation per pixel of mouse drag (default: 0.25)
    #[serde(default = "default_mouse_sensitivity")]
    pub mouse_sensitivity: f32,
}

/// Fractal configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalConfig {
    /// Initial fractal power (default: 8.0)
    #[serde(default = "default_power")]
    pub power: f32,
    /// Base surface color (default: magenta)
    #[serde(default = "default_color")]
    pub color: [f32; 3],
    /// Shading darkness factor (default: 150.0)
    #[serde(default = "default_darkness")]
    pub darkness: f32,
}

fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_title() -> String {
    "Ray Marching".to_string()
}

fn default_frames_in_flight() -> usize {
    3
}
fn default_validation() -> bool {
    cfg!(debug_assertions)
}
fn default_vertex_shader() -> PathBuf {
    PathBuf::from("shaders/spirv/fractal.vert.spv")
}
fn default_fragment_shader() -> PathBuf {
    PathBuf::from("shaders/spirv/fractal.frag.spv")
}
fn default_vertex_entry() -> String {
    "VS".to_string()
}
fn default_fragment_entry() -> String {
    "PS".to_string()
}

fn default_camera_position() -> [f32; 3] {
    [3.0, 0.0, -3.0]
}
fn default_theta() -> f32 {
    0.75 * PI
}
fn default_phi() -> f32 {
    0.5 * PI
}
fn default_fov_y() -> f32 {
    0.25 * PI
}
fn default_near() -> f32 {
    1.0
}
fn default_far() -> f32 {
    1000.0
}
fn default_speed() -> f32 {
    1.0
}
fn default_slow_motion_factor() -> f32 {
    0.1
}
fn default_mouse_sensitivity() -> f32 {
    0.25
}

fn default_power() -> f32 {
    8.0
}
fn default_color() -> [f32; 3] {
    [1.0, 0.0, 1.0]
}
fn default_darkness() -> f32 {
    150.0
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: default_frames_in_flight(),
            validation: default_validation(),
            vertex_shader: default_vertex_shader(),
            fragment_shader: default_fragment_shader(),
            vertex_entry: default_vertex_entry(),
            fragment_entry: default_fragment_entry(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: default_camera_position(),
            theta: default_theta(),
            phi: default_phi(),
            fov_y: default_fov_y(),
            near: default_near(),
            far: default_far(),
            horizontal_speed: default_speed(),
            vertical_speed: default_speed(),
            slow_motion_factor: default_slow_motion_factor(),
            mouse_sensitivity: default_mouse_sensitivity(),
        }
    }
}

impl Default for FractalConfig {
    fn default() -> Self {
        Self {
            power: default_power(),
            color: default_color(),
            darkness: default_darkness(),
        }
    }
}

impl Config {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    ///
    /// A file that exists but fails to parse or validate is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::info!("Loading config from {}", path.display());
                Self::from_toml_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Path of the config file, honouring [`CONFIG_ENV_VAR`].
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        let frames = self.renderer.frames_in_flight;
        if !(1..=MAX_FRAMES_IN_FLIGHT).contains(&frames) {
            return Err(Error::Config(format!(
                "frames_in_flight must be between 1 and {MAX_FRAMES_IN_FLIGHT}, got {frames}"
            )));
        }

        let camera = &self.camera;
        if camera.near <= 0.0 || camera.near >= camera.far {
            return Err(Error::Config(format!(
                "camera planes must satisfy 0 < near < far, got near={} far={}",
                camera.near, camera.far
            )));
        }
        if camera.fov_y <= 0.0 || camera.fov_y >= PI {
            return Err(Error::Config(format!(
                "camera fov_y must be in (0, π), got {}",
                camera.fov_y
            )));
        }

        if self.fractal.power < 1.0 {
            return Err(Error::Config(format!(
                "fractal power must be at least 1.0, got {}",
                self.fractal.power
            )));
        }

        Ok(())
    }
}
