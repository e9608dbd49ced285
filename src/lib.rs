//! # Particle Bloom
//!
//! A GPU particle visualizer: about a million point sprites driven by a
//! compute kernel, drawn additively into an HDR scene and finished with a
//! five-stage bloom.
//!
//! ## Quick Start
//!
//! ```ignore
//! use particle_bloom::prelude::*;
//!
//! fn main() -> Result<(), VisualizerError> {
//!     Visualizer::new()
//!         .with_particle_count(1 << 20)
//!         .with_bloom(BloomSettings { threshold: 1.2, intensity: 0.3 })
//!         .run()
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Simulation
//!
//! Every frame the kernel advances each particle once. In the free state the
//! particles drift through a tiling 3D noise volume and, when enabled, are
//! pulled toward an attractor that wanders along a slow Lissajous path.
//!
//! ### Shapes
//!
//! Pressing `H` or `S` first draws every particle into the centre
//! ([`ParticleState::Absorbing`]) and then lays them out on a heart or a
//! five-pointed star. The CPU side of this is the [`ShapeController`]; it
//! produces one [`FrameState`] per frame that is packed into
//! [`ShaderParams`] for the GPU.
//!
//! ### Bloom
//!
//! The scene is rendered into a 16-bit float target. Pixels brighter than a
//! threshold are extracted, downsampled through a four-level pyramid, merged
//! back up with a bilateral filter and added onto the scene. The image sizes
//! are described by [`PyramidLayout`].
//!
//! ### Shaders
//!
//! WGSL sources are templates with `{{name}}` insertion points. The built-in
//! sources can be replaced from a directory; see [`ShaderSources`]. A broken
//! kernel or bloom program is logged and skipped rather than fatal.
//!
//! ## Controls
//!
//! | Input      | Action                              |
//! |------------|-------------------------------------|
//! | Space      | pause / resume the simulation       |
//! | A          | toggle the attractor                |
//! | R          | reset to a uniform cube             |
//! | H / S      | form a heart / a star               |
//! | Escape     | quit                                |
//! | left drag  | orbit the camera                    |
//! | right drag | pan                                 |
//! | wheel      | zoom                                |

pub mod error;
mod gpu;
pub mod input;
pub mod noise;
pub mod pyramid;
pub mod shader_utils;
pub mod spawn;
pub mod state;
pub mod time;
pub mod uniforms;
mod visualizer;

pub use error::{GpuError, ShaderError, ShaderProgram, VisualizerError};
pub use glam::{Mat4, Vec2, Vec3, Vec4};
pub use gpu::{BloomSettings, OrbitCamera, SCENE_FORMAT, WORKGROUP_SIZE};
pub use gpu::kernel::workgroup_count;
pub use noise::NoiseVolume;
pub use pyramid::{Pyramid, PyramidImage, PyramidLayout};
pub use shader_utils::{Fragments, ShaderSet, ShaderSources};
pub use spawn::{ParticleSnapshot, ResetLayout};
pub use state::{FrameState, ParticleState, ShapeController, ShapeTarget, ShapeTimings};
pub use uniforms::{ForceSettings, ShaderParams};
pub use visualizer::Visualizer;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use particle_bloom::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::VisualizerError;
    pub use crate::gpu::{BloomSettings, OrbitCamera};
    pub use crate::input::{Command, Input, InputAction};
    pub use crate::state::{AttractorSettings, ParticleState, ShapeController, ShapeTarget, ShapeTimings};
    pub use crate::time::Time;
    pub use crate::uniforms::ForceSettings;
    pub use crate::visualizer::Visualizer;
    pub use crate::{Vec2, Vec3, Vec4};
}
