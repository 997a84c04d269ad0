//! Ray-Marching Fractal Demo - Main Entry Point
//!
//! Renders a Mandelbulb by ray marching in a fragment shader, with the CPU
//! building up to three frames ahead of the GPU.
//!
//! Controls: W/S forward and back, A/D strafe, E/Q up and down, Left Shift
//! slow motion, Right/Left arrow speed up or slow down the fractal's power
//! growth, left mouse drag to look around, Escape to quit.

mod controls;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::WindowId;

use raymarch_core::{Config, FrameStats, Timer};
use raymarch_platform::{Action, InputState, Window};
use raymarch_renderer::Renderer;

struct App {
    config: Config,
    window: Option<Window>,
    renderer: Option<Renderer>,
    input: InputState,
    timer: Timer,
    stats: FrameStats,
    /// Set when the run ends because of an unrecoverable error.
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            renderer: None,
            input: InputState::new(),
            timer: Timer::new(),
            stats: FrameStats::new(),
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let dt = self.timer.delta_secs();

        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let camera_input = controls::camera_input(&self.input);
        let rendered = match renderer.render_frame(dt, &camera_input) {
            Ok(rendered) => rendered,
            Err(e) => {
                self.fail(event_loop, anyhow!(e).context("Fatal render error"));
                return;
            }
        };
        controls::end_frame(&mut self.input, rendered);

        if let Some(sample) = self.stats.record(dt)
            && let Some(window) = &self.window
        {
            window.set_stats(sample.fps, sample.ms_per_frame);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(event_loop, &self.config.window) {
            Ok(window) => window,
            Err(e) => {
                self.fail(event_loop, anyhow!(e).context("Failed to create window"));
                return;
            }
        };

        match Renderer::new(&window, &self.config) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
                self.timer.reset();
            }
            Err(e) => {
                self.fail(event_loop, anyhow!(e).context("Failed to create renderer"));
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                debug!("Window resized to {}x{}", size.width, size.height);
                if let Some(window) = self.window.as_mut() {
                    let was_minimized = window.is_minimized();
                    window.resize(size.width, size.height);
                    if was_minimized && !window.is_minimized() {
                        self.timer.reset();
                    }
                }
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(false) => {
                self.input.release_all();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => {
                        if Action::from_key(key) == Some(Action::Quit) {
                            info!("Escape pressed, shutting down");
                            event_loop.exit();
                            return;
                        }
                        self.input.on_key_pressed(key, event.repeat);
                    }
                    ElementState::Released => self.input.on_key_released(key),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.input.on_mouse_pressed(button.into()),
                ElementState::Released => self.input.on_mouse_released(button.into()),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .on_mouse_moved(position.x as f32, position.y as f32);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Renderer before window: the surface must go first.
        self.renderer = None;
        self.window = None;
    }
}

fn main() -> Result<()> {
    raymarch_core::init_logging();

    let config_path = Config::path_from_env();
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    info!("Starting ray-marching demo (config: {})", config_path.display());

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
