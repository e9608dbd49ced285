//! GPU side of the visualizer.
//!
//! [`GpuState`] owns the device and every GPU resource. One frame is one
//! command encoder:
//!
//! ```text
//! write params ─▶ [compute: simulation] ─▶ render: particles ─▶ [bloom passes] ─▶ present
//! ```
//!
//! The compute pass is ended before the particle pass begins, which is the
//! ordering point that makes the kernel's writes visible to the vertex stage.

pub mod bloom;
pub mod camera;
pub mod diagnostics;
pub mod kernel;
pub mod noise_texture;
pub mod particles;
pub mod render;
pub mod target;

use std::sync::Arc;

use winit::window::Window;

pub use bloom::BloomSettings;
use bloom::BloomCompositor;
pub use camera::OrbitCamera;
use kernel::SimulationKernel;
use particles::ParticleBuffers;
use render::ParticleRenderer;

use crate::error::GpuError;
use crate::noise::NoiseVolume;
use crate::shader_utils::ShaderSet;
use crate::spawn::ParticleSnapshot;
use crate::uniforms::ShaderParams;
use noise_texture::NoiseTexture;

/// Compute workgroup width of the simulation kernel.
pub const WORKGROUP_SIZE: u32 = 128;

/// Format of the off-screen scene and every bloom image.
pub const SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Everything the GPU side is built from.
pub struct GpuSetup<'a> {
    pub shaders: &'a ShaderSet,
    pub particles: &'a ParticleSnapshot,
    pub noise: &'a NoiseVolume,
    pub bloom: BloomSettings,
}

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    params_buffer: wgpu::Buffer,
    particles: ParticleBuffers,
    _noise: NoiseTexture,
    kernel: Option<SimulationKernel>,
    renderer: ParticleRenderer,
    bloom: Option<BloomCompositor>,
    kernel_warned: bool,
}

impl GpuState {
    /// Open the device and build every pipeline.
    ///
    /// Only a missing adapter, device or surface, or a rejected particle
    /// renderer, is an error. A rejected kernel or bloom stage is logged and
    /// left out.
    pub async fn new(window: Arc<Window>, setup: GpuSetup<'_>) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::UnsupportedSurface)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shader Params"),
            size: ShaderParams::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        particles::check_capacity(&device.limits(), setup.particles.len() as u32)?;
        let particles = ParticleBuffers::new(&device, setup.particles);
        let noise = NoiseTexture::new(&device, &queue, setup.noise);

        let kernel = setup.shaders.kernel.as_deref().and_then(|source| {
            SimulationKernel::new(&device, source, &params_buffer, &particles, &noise)
                .map_err(|err| log::warn!("simulation disabled: {}", err))
                .ok()
        });

        let mut bloom = setup.shaders.bloom.as_ref().and_then(|sources| {
            BloomCompositor::new(&device, sources, setup.bloom, surface_format)
                .map_err(|err| log::warn!("bloom disabled: {}", err))
                .ok()
        });
        if let Some(bloom) = bloom.as_mut() {
            bloom.resize(&device, size.width, size.height);
        }

        // Without bloom the particles go straight to the surface.
        let render_format = if bloom.is_some() { SCENE_FORMAT } else { surface_format };
        let renderer = ParticleRenderer::new(
            &device,
            &setup.shaders.render,
            &params_buffer,
            &particles,
            render_format,
        )?;

        log::info!(
            "{} particles, simulation {}, bloom {}",
            particles.count(),
            if kernel.is_some() { "on" } else { "off" },
            if bloom.is_some() { "on" } else { "off" },
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            params_buffer,
            particles,
            _noise: noise,
            kernel,
            renderer,
            bloom,
            kernel_warned: false,
        })
    }

    /// Current surface size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Follow a framebuffer resize. Zero-area sizes release the bloom images
    /// and leave the surface as it was.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
        if let Some(bloom) = self.bloom.as_mut() {
            bloom.resize(&self.device, width, height);
        }
    }

    /// Overwrite the particle store.
    pub fn reset_particles(&self, snapshot: &ParticleSnapshot) {
        self.particles.upload(&self.queue, snapshot);
    }

    /// Record, submit and present one frame.
    pub fn render(&mut self, params: &ShaderParams, animate: bool) -> Result<(), wgpu::SurfaceError> {
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        diagnostics::begin_frame(&self.device);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        if animate {
            match &self.kernel {
                Some(kernel) => kernel.dispatch(&mut encoder),
                None if !self.kernel_warned => {
                    log::warn!("no simulation kernel; particles stay where they are");
                    self.kernel_warned = true;
                }
                None => {}
            }
        }

        match &self.bloom {
            Some(bloom) => {
                if let Some(scene) = bloom.scene_view() {
                    self.renderer.draw(&mut encoder, scene, &self.particles);
                    bloom.composite(&mut encoder, &view);
                }
            }
            None => self.renderer.draw(&mut encoder, &view, &self.particles),
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        diagnostics::end_frame(&self.device);
        output.present();

        Ok(())
    }

    /// Reconfigure the surface after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}
