//! Core utilities for the ray-marching demo.
//!
//! This crate provides foundational types shared by every other crate:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timing and statistics
//! - Configuration loaded from `raymarch.toml`

mod config;
mod error;
mod logging;
mod timer;

pub use config::{
    CONFIG_ENV_VAR, CameraConfig, Config, DEFAULT_CONFIG_PATH, FractalConfig, RendererConfig,
    WindowConfig,
};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::{FrameStats, FrameStatsSample, Timer};
