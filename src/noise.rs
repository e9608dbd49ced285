//! Procedural noise volume.
//!
//! A cubic lattice of random signed-normalized RGBA texels. It is generated
//! once, uploaded as a 3D texture and sampled by the simulation kernel with
//! repeating trilinear filtering. [`NoiseVolume::sample`] mirrors that lookup
//! on the CPU.

use glam::{Vec3, Vec4};
use rand::Rng;

/// Edge length of the default lattice.
pub const DEFAULT_NOISE_SIZE: u32 = 16;

/// Immutable `size³` lattice of RGBA8 snorm texels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseVolume {
    size: u32,
    /// Texels in x-fastest order, four signed bytes each.
    texels: Vec<[i8; 4]>,
}

impl NoiseVolume {
    /// Fill a `size³` lattice from `rng`.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn generate<R: Rng + ?Sized>(size: u32, rng: &mut R) -> Self {
        assert!(size > 0, "noise volume size must be non-zero");
        let len = (size as usize).pow(3);
        let texels = (0..len).map(|_| rng.gen::<[i8; 4]>()).collect();
        Self { size, texels }
    }

    /// Lattice edge length.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Raw texel bytes in upload order.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Texel at integer lattice coordinates, wrapping in every axis.
    pub fn texel(&self, x: i64, y: i64, z: i64) -> Vec4 {
        let n = self.size as i64;
        let (x, y, z) = (x.rem_euclid(n), y.rem_euclid(n), z.rem_euclid(n));
        let t = self.texels[((z * n + y) * n + x) as usize];
        Vec4::new(snorm(t[0]), snorm(t[1]), snorm(t[2]), snorm(t[3]))
    }

    /// Repeating trilinear sample at normalized coordinates.
    ///
    /// One unit in `uvw` spans the whole lattice; texel centres sit at
    /// `(i + 0.5) / size`, as with a GPU sampler.
    pub fn sample(&self, uvw: Vec3) -> Vec4 {
        let p = uvw * self.size as f32 - Vec3::splat(0.5);
        let base = p.floor();
        let f = p - base;
        let (x0, y0, z0) = (base.x as i64, base.y as i64, base.z as i64);

        let mut out = Vec4::ZERO;
        for dz in 0..2 {
            let wz = if dz == 0 { 1.0 - f.z } else { f.z };
            for dy in 0..2 {
                let wy = if dy == 0 { 1.0 - f.y } else { f.y };
                for dx in 0..2 {
                    let wx = if dx == 0 { 1.0 - f.x } else { f.x };
                    out += self.texel(x0 + dx, y0 + dy, z0 + dz) * (wx * wy * wz);
                }
            }
        }
        out
    }
}

/// GPU snorm8 decode: `max(b / 127, -1)`.
#[inline]
fn snorm(b: i8) -> f32 {
    (b as f32 / 127.0).max(-1.0)
}
