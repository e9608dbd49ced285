//! Per-frame shader parameter block.
//!
//! [`ShaderParams`] is uploaded once per frame and read by the simulation
//! kernel, the particle vertex stage and nothing else. Its layout follows WGSL
//! uniform rules: three `mat4x4<f32>`, one `vec4<f32>`, then scalars packed
//! four to a 16-byte row. The WGSL declaration lives in
//! [`SHADER_PARAMS_WGSL`](crate::shader_utils::SHADER_PARAMS_WGSL).

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::state::{AttractorSettings, FrameState};

/// Force-field constants that do not change per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSettings {
    /// Velocity multiplier applied after each integration step.
    pub damping: f32,
    /// Scale from world position to noise lookup coordinates.
    pub noise_freq: f32,
    /// Turbulence acceleration per step.
    pub noise_strength: f32,
    /// Attractor pull while enabled.
    pub attractor_strength: f32,
    /// Attractor orbit speed in radians per second.
    pub attractor_speed: f32,
}

impl ForceSettings {
    /// The attractor part, as the state controller wants it.
    pub fn attractor(&self) -> AttractorSettings {
        AttractorSettings {
            strength: self.attractor_strength,
            speed: self.attractor_speed,
        }
    }
}

impl Default for ForceSettings {
    fn default() -> Self {
        Self {
            damping: 0.95,
            noise_freq: 10.0,
            noise_strength: 0.001,
            attractor_strength: 0.0002,
            attractor_speed: 0.2,
        }
    }
}

/// GPU image of the per-frame parameters. 256 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShaderParams {
    pub model_view: [[f32; 4]; 4],
    pub model_view_projection: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// `xyz` position, `w` strength.
    pub attractor: [f32; 4],
    pub num_particles: u32,
    pub sprite_size: f32,
    pub damping: f32,
    pub particle_scale: f32,
    pub noise_freq: f32,
    pub noise_strength: f32,
    pub particle_state: u32,
    pub state_time: f32,
    pub heart_scale: f32,
    pub state_duration: f32,
    pub _padding: [f32; 2],
}

impl ShaderParams {
    /// Size of the uniform buffer in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Assemble the block for one frame. The model transform is identity.
    pub fn compose(
        view: Mat4,
        projection: Mat4,
        frame: &FrameState,
        forces: &ForceSettings,
        num_particles: u32,
    ) -> Self {
        Self {
            model_view: view.to_cols_array_2d(),
            model_view_projection: (projection * view).to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            attractor: frame.attractor.to_array(),
            num_particles,
            sprite_size: frame.sprite_size,
            damping: forces.damping,
            particle_scale: frame.particle_scale,
            noise_freq: forces.noise_freq,
            noise_strength: forces.noise_strength,
            particle_state: frame.state.code(),
            state_time: frame.state_time,
            heart_scale: frame.heart_scale,
            state_duration: frame.state_duration,
            _padding: [0.0; 2],
        }
    }
}
