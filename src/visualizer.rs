//! The visualizer builder and its event loop.
//!
//! ```ignore
//! use particle_bloom::prelude::*;
//!
//! Visualizer::new()
//!     .with_particle_count(1 << 18)
//!     .with_bloom(BloomSettings { threshold: 1.0, intensity: 0.4 })
//!     .run()?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::error::{GpuError, VisualizerError};
use crate::gpu::{BloomSettings, GpuSetup, GpuState, OrbitCamera};
use crate::input::{Command, Input, InputAction};
use crate::noise::{NoiseVolume, DEFAULT_NOISE_SIZE};
use crate::shader_utils::{Fragments, ShaderSet, ShaderSources};
use crate::spawn::{ParticleSnapshot, ResetLayout, DEFAULT_HEART_SCALE};
use crate::state::{ShapeController, ShapeTimings};
use crate::time::Time;
use crate::uniforms::{ForceSettings, ShaderParams};

/// A particle visualizer builder.
///
/// Use method chaining to configure, then call `.run()` to start.
#[derive(Debug, Clone)]
pub struct Visualizer {
    particle_count: u32,
    start_layout: ResetLayout,
    reset_layout: ResetLayout,
    timings: ShapeTimings,
    forces: ForceSettings,
    bloom: BloomSettings,
    noise_size: u32,
    seed: Option<u64>,
    shader_dir: Option<PathBuf>,
    window_size: (u32, u32),
    title: String,
}

impl Visualizer {
    /// Create a visualizer with default settings.
    pub fn new() -> Self {
        Self {
            particle_count: 1 << 20,
            start_layout: ResetLayout::Heart {
                scale: DEFAULT_HEART_SCALE,
            },
            reset_layout: ResetLayout::default(),
            timings: ShapeTimings::default(),
            forces: ForceSettings::default(),
            bloom: BloomSettings::default(),
            noise_size: DEFAULT_NOISE_SIZE,
            seed: None,
            shader_dir: None,
            window_size: (800, 600),
            title: "Particle Bloom".to_string(),
        }
    }

    /// Set the number of particles (at least one).
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count.max(1);
        self
    }

    /// Set the layout the particles start in. Defaults to the heart.
    pub fn with_start_layout(mut self, layout: ResetLayout) -> Self {
        self.start_layout = layout;
        self
    }

    /// Set the layout the reset key restores. Defaults to a uniform cube.
    pub fn with_reset_layout(mut self, layout: ResetLayout) -> Self {
        self.reset_layout = layout;
        self
    }

    /// Set how long the absorb and shape states last.
    pub fn with_timings(mut self, timings: ShapeTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Set damping, noise and attractor constants.
    pub fn with_forces(mut self, forces: ForceSettings) -> Self {
        self.forces = forces;
        self
    }

    /// Set the bloom threshold and intensity.
    pub fn with_bloom(mut self, bloom: BloomSettings) -> Self {
        self.bloom = bloom;
        self
    }

    /// Set the edge length of the noise volume (at least one).
    pub fn with_noise_size(mut self, size: u32) -> Self {
        self.noise_size = size.max(1);
        self
    }

    /// Seed the random generator used for noise and resets.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load shader templates from a directory instead of the built-in ones.
    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = Some(dir.into());
        self
    }

    /// Set the initial window size in logical pixels.
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    /// Set the window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    fn start_snapshot<R: Rng + ?Sized>(&self, rng: &mut R) -> ParticleSnapshot {
        ParticleSnapshot::from_layout(self.start_layout, self.particle_count, rng)
    }

    fn reset_snapshot<R: Rng + ?Sized>(&self, rng: &mut R) -> ParticleSnapshot {
        ParticleSnapshot::from_layout(self.reset_layout, self.particle_count, rng)
    }

    /// Resolve the shader programs this visualizer would run with.
    pub fn shader_set(&self) -> Result<ShaderSet, GpuError> {
        let sources = match &self.shader_dir {
            Some(dir) => ShaderSources::load_dir(dir),
            None => ShaderSources::embedded(),
        };
        Ok(sources.prepare(&Fragments::standard())?)
    }

    /// Run the visualizer. Blocks until the window is closed.
    pub fn run(self) -> Result<(), VisualizerError> {
        let shaders = self.shader_set()?;

        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let noise = NoiseVolume::generate(self.noise_size, &mut rng);
        let initial = self.start_snapshot(&mut rng);

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App::new(self, shaders, noise, initial, rng);
        event_loop.run_app(&mut app)?;

        match app.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

struct App {
    config: Visualizer,
    shaders: ShaderSet,
    noise: NoiseVolume,
    initial: Option<ParticleSnapshot>,
    rng: SmallRng,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    controller: ShapeController,
    camera: OrbitCamera,
    input: Input,
    time: Time,
    animate: bool,
    fatal: Option<VisualizerError>,
}

impl App {
    fn new(
        config: Visualizer,
        shaders: ShaderSet,
        noise: NoiseVolume,
        initial: ParticleSnapshot,
        rng: SmallRng,
    ) -> Self {
        let controller = ShapeController::new(config.timings, config.forces.attractor());
        Self {
            config,
            shaders,
            noise,
            initial: Some(initial),
            rng,
            window: None,
            gpu_state: None,
            controller,
            camera: OrbitCamera::new(),
            input: Input::new(),
            time: Time::new(),
            animate: true,
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: VisualizerError) {
        log::error!("{}", err);
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn create_gpu(&mut self, window: Arc<Window>) -> Result<GpuState, GpuError> {
        let empty = ParticleSnapshot::heart(0, DEFAULT_HEART_SCALE);
        let particles = self.initial.as_ref().unwrap_or(&empty);
        pollster::block_on(GpuState::new(
            window,
            GpuSetup {
                shaders: &self.shaders,
                particles,
                noise: &self.noise,
                bloom: self.config.bloom,
            },
        ))
    }

    fn apply(&mut self, event_loop: &ActiveEventLoop, action: InputAction) {
        match action {
            InputAction::Command(command) => self.command(event_loop, command),
            InputAction::Orbit(delta) => self.camera.orbit(delta),
            InputAction::Pan(delta) => self.camera.pan(delta),
            InputAction::Zoom(lines) => self.camera.zoom(lines),
        }
    }

    fn command(&mut self, event_loop: &ActiveEventLoop, command: Command) {
        match command {
            Command::ToggleAnimation => {
                self.animate = !self.animate;
                log::info!("animation {}", if self.animate { "on" } else { "off" });
            }
            Command::ToggleAttractor => {
                let enabled = self.controller.toggle_attractor();
                log::info!("attractor {}", if enabled { "on" } else { "off" });
            }
            Command::Reset => {
                self.controller.reset();
                let snapshot = self.config.reset_snapshot(&mut self.rng);
                if let Some(gpu_state) = &self.gpu_state {
                    gpu_state.reset_particles(&snapshot);
                }
                log::info!("particles reset");
            }
            Command::Form(target) => {
                self.controller.begin_absorb(target);
                log::info!("forming {:?}", target);
            }
            Command::Quit => event_loop.exit(),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let delta = self.time.update();
        let frame = self.controller.tick(delta);

        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };
        let minimized = self
            .window
            .as_ref()
            .map(|w| {
                let size = w.inner_size();
                size.width == 0 || size.height == 0
            })
            .unwrap_or(true);
        if minimized {
            return;
        }

        let (width, height) = gpu_state.size();
        let params = ShaderParams::compose(
            self.camera.view_matrix(),
            self.camera.projection_matrix(width, height),
            &frame,
            &self.config.forces,
            self.config.particle_count,
        );

        match gpu_state.render(&params, self.animate) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => gpu_state.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("skipped frame: {}", e),
        }

        if self.time.fps_updated() {
            log::debug!("{:.1} fps", self.time.fps());
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, err.into()),
        };
        self.window = Some(window.clone());

        match self.create_gpu(window.clone()) {
            Ok(gpu_state) => {
                self.gpu_state = Some(gpu_state);
                // The GPU holds its own copy from here on.
                self.initial = None;
                window.request_redraw();
            }
            Err(err) => self.fail(event_loop, err.into()),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size.width, physical_size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            other => {
                if let Some(action) = self.input.handle_event(&other) {
                    self.apply(event_loop, action);
                }
            }
        }
    }
}
