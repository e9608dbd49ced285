//! CPU-side particle layouts.
//!
//! The GPU particle store is filled from a [`ParticleSnapshot`]: two parallel
//! arrays of `vec4` (position with `w = 1`, velocity with `w = 0`). The same
//! closed-form target curves the simulation kernel steers toward live here so
//! they can be checked without a device.

use std::f32::consts::TAU;

use glam::Vec4;
use rand::Rng;

/// Number of indices emitted per particle quad (two triangles).
pub const INDICES_PER_PARTICLE: u32 = 6;

/// Half extent of the cube used by the default reset.
pub const DEFAULT_RESET_EXTENT: f32 = 0.5;

/// Heart size used at start-up and by the shape states.
pub const DEFAULT_HEART_SCALE: f32 = 0.3;

const STAR_OUTER_RADIUS: f32 = 1.0;
const STAR_INNER_RADIUS: f32 = 0.382;
const STAR_SEGMENT: f32 = TAU / 5.0;
const STAR_HALF_SEGMENT: f32 = STAR_SEGMENT * 0.5;

/// Bulk layouts the particle store can be reset to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResetLayout {
    /// Independent uniform samples in `[-half_extent, half_extent]` per axis.
    Uniform { half_extent: f32 },
    /// Particles spread along the heart curve.
    Heart { scale: f32 },
}

impl Default for ResetLayout {
    fn default() -> Self {
        ResetLayout::Uniform {
            half_extent: DEFAULT_RESET_EXTENT,
        }
    }
}

/// Quad index list for `count` particles.
///
/// Particle `i` owns corners `4i..4i+4`; its two triangles are
/// `(4i, 4i+1, 4i+2)` and `(4i, 4i+2, 4i+3)`.
pub fn quad_indices(count: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(count as usize * INDICES_PER_PARTICLE as usize);
    for i in 0..count {
        let base = i << 2;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    indices
}

/// Point on the heart curve for particle `index` of `count`.
///
/// With `u = 2π·index/count`: `x = 16 sin³u`,
/// `y = 13 cos u − 5 cos 2u − 2 cos 3u − cos 4u`, both scaled by `scale/20`,
/// and `z = sin 2u · (scale/20) · 0.5`.
pub fn heart_position(index: u32, count: u32, scale: f32) -> Vec4 {
    let t = index as f32 / count as f32;
    let u = t * TAU;
    let s = u.sin();

    let x = 16.0 * s * s * s;
    let y = 13.0 * u.cos() - 5.0 * (2.0 * u).cos() - 2.0 * (3.0 * u).cos() - (4.0 * u).cos();

    let k = scale / 20.0;
    let z = (2.0 * u).sin() * k * 0.5;

    Vec4::new(x * k, y * k, z, 1.0)
}

/// Point on the five-pointed star for particle `index` of `count`.
///
/// The radius falls linearly from the outer to the inner radius over the
/// first half of each fifth of a turn and climbs back over the second half.
pub fn star_position(index: u32, count: u32, scale: f32) -> Vec4 {
    let t = index as f32 / count as f32;
    let u = t * TAU;

    let segment = u.rem_euclid(STAR_SEGMENT);
    let radius = if segment < STAR_HALF_SEGMENT {
        lerp(STAR_OUTER_RADIUS, STAR_INNER_RADIUS, segment / STAR_HALF_SEGMENT)
    } else {
        lerp(
            STAR_INNER_RADIUS,
            STAR_OUTER_RADIUS,
            (segment - STAR_HALF_SEGMENT) / STAR_HALF_SEGMENT,
        )
    };

    let s = scale * 0.5;
    Vec4::new(
        u.cos() * radius * s,
        u.sin() * radius * s,
        (3.0 * u).sin() * s * 0.3,
        1.0,
    )
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Host copy of the particle state, ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSnapshot {
    /// `xyz` position, `w = 1`.
    pub positions: Vec<Vec4>,
    /// `xyz` velocity, `w = 0`.
    pub velocities: Vec<Vec4>,
}

impl ParticleSnapshot {
    /// Build the snapshot for `layout`.
    pub fn from_layout<R: Rng + ?Sized>(layout: ResetLayout, count: u32, rng: &mut R) -> Self {
        match layout {
            ResetLayout::Uniform { half_extent } => Self::uniform(count, half_extent, rng),
            ResetLayout::Heart { scale } => Self::heart(count, scale),
        }
    }

    /// Positions sampled uniformly in the cube `[-half_extent, half_extent]³`.
    pub fn uniform<R: Rng + ?Sized>(count: u32, half_extent: f32, rng: &mut R) -> Self {
        let h = half_extent.abs();
        let positions = (0..count)
            .map(|_| {
                Vec4::new(
                    rng.gen_range(-h..=h),
                    rng.gen_range(-h..=h),
                    rng.gen_range(-h..=h),
                    1.0,
                )
            })
            .collect();
        Self {
            positions,
            velocities: vec![Vec4::ZERO; count as usize],
        }
    }

    /// Positions on the heart curve.
    pub fn heart(count: u32, scale: f32) -> Self {
        let positions = (0..count).map(|i| heart_position(i, count, scale)).collect();
        Self {
            positions,
            velocities: vec![Vec4::ZERO; count as usize],
        }
    }

    /// Number of particles in the snapshot.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the snapshot holds no particles.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
