//! Error types for the visualizer.
//!
//! Shader preparation, GPU initialisation and the window/event-loop layer each
//! get their own enum. Only [`VisualizerError`] is fatal; the other two are
//! turned into degraded features by the component that owns the failing part.

use std::fmt;

use thiserror::Error;

/// The shader programs the visualizer is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    /// Particle sprite vertex + fragment stages.
    ParticleRender,
    /// Per-particle compute update.
    SimulationKernel,
    /// Bright-pass extraction.
    BloomExtract,
    /// Pyramid downsample.
    BloomDownsample,
    /// Bilateral pyramid upsample.
    BloomUpsample,
    /// Final scene + bloom composite.
    BloomCombine,
}

impl ShaderProgram {
    /// Every program, in load order.
    pub const ALL: [ShaderProgram; 6] = [
        ShaderProgram::ParticleRender,
        ShaderProgram::SimulationKernel,
        ShaderProgram::BloomExtract,
        ShaderProgram::BloomDownsample,
        ShaderProgram::BloomUpsample,
        ShaderProgram::BloomCombine,
    ];

    /// File name used when loading sources from a directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ShaderProgram::ParticleRender => "particle.wgsl",
            ShaderProgram::SimulationKernel => "update.wgsl",
            ShaderProgram::BloomExtract => "bloom_extract.wgsl",
            ShaderProgram::BloomDownsample => "bloom_downsample.wgsl",
            ShaderProgram::BloomUpsample => "bloom_upsample.wgsl",
            ShaderProgram::BloomCombine => "bloom_combine.wgsl",
        }
    }
}

impl fmt::Display for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderProgram::ParticleRender => "particle render",
            ShaderProgram::SimulationKernel => "simulation kernel",
            ShaderProgram::BloomExtract => "bloom extract",
            ShaderProgram::BloomDownsample => "bloom downsample",
            ShaderProgram::BloomUpsample => "bloom upsample",
            ShaderProgram::BloomCombine => "bloom combine",
        };
        f.write_str(name)
    }
}

/// Errors raised while loading, resolving or validating shader source.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// No source text was provided for the program.
    #[error("no source for the {program} program")]
    Missing { program: ShaderProgram },

    /// A `{{` marker without its closing `}}`.
    #[error("{program}: unterminated insertion point at byte {offset}")]
    Unterminated { program: ShaderProgram, offset: usize },

    /// The template names an insertion point nobody provides.
    #[error("{program}: unknown insertion point `{name}`")]
    UnknownInsertion { program: ShaderProgram, name: String },

    /// The template lacks an insertion point the program depends on.
    #[error("{program}: required insertion point `{name}` is absent")]
    MissingInsertion { program: ShaderProgram, name: String },

    /// WGSL front-end rejected the resolved source.
    #[error("{program}: WGSL parse error:\n{message}")]
    Parse { program: ShaderProgram, message: String },

    /// The parsed module failed validation.
    #[error("{program}: WGSL validation error: {message}")]
    Validation { program: ShaderProgram, message: String },
}

impl ShaderError {
    /// The program the error concerns.
    pub fn program(&self) -> ShaderProgram {
        match self {
            ShaderError::Missing { program }
            | ShaderError::Unterminated { program, .. }
            | ShaderError::UnknownInsertion { program, .. }
            | ShaderError::MissingInsertion { program, .. }
            | ShaderError::Parse { program, .. }
            | ShaderError::Validation { program, .. } => *program,
        }
    }
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    /// The surface reports no usable texture format.
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,

    /// The particle store would not fit in the device's buffer limits.
    #[error("{count} particles exceed this device's limit of {max}")]
    TooManyParticles { count: u32, max: u32 },

    /// A shader could not be prepared.
    #[error(transparent)]
    Shader(#[from] ShaderError),

    /// The device rejected a pipeline or resource created for `label`.
    #[error("device rejected {label}: {source}")]
    Pipeline {
        label: &'static str,
        #[source]
        source: wgpu::Error,
    },
}

/// Errors that end a visualizer run.
#[derive(Debug, Error)]
pub enum VisualizerError {
    /// Failed to create event loop.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Failed to create window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    /// GPU initialization failed.
    #[error("GPU initialisation failed: {0}")]
    Gpu(#[from] GpuError),
}
