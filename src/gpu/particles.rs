//! GPU particle store.
//!
//! Positions and velocities live in two storage buffers of `vec4<f32>`, one
//! element per particle. The index buffer is built once from
//! [`quad_indices`](crate::spawn::quad_indices) and never changes.

use wgpu::util::DeviceExt;

use crate::error::GpuError;
use crate::spawn::{quad_indices, ParticleSnapshot, INDICES_PER_PARTICLE};

/// Bytes per particle in each storage buffer.
const PARTICLE_STRIDE: u64 = 16;

/// Largest particle count whose buffers fit within `limits`.
///
/// Bounded by the storage binding size (positions, velocities), the buffer
/// size (indices, 24 bytes per particle) and 32-bit index addressing.
pub fn max_particles(limits: &wgpu::Limits) -> u32 {
    let storage = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size)
        / PARTICLE_STRIDE;
    let indices = limits.max_buffer_size / (u64::from(INDICES_PER_PARTICLE) * 4);
    let addressable = u64::from(u32::MAX / INDICES_PER_PARTICLE);
    storage.min(indices).min(addressable) as u32
}

/// Fail unless a store of `count` particles fits on a device with `limits`.
pub fn check_capacity(limits: &wgpu::Limits, count: u32) -> Result<(), GpuError> {
    let max = max_particles(limits);
    if count > max {
        return Err(GpuError::TooManyParticles { count, max });
    }
    Ok(())
}

pub struct ParticleBuffers {
    positions: wgpu::Buffer,
    velocities: wgpu::Buffer,
    indices: wgpu::Buffer,
    count: u32,
}

impl ParticleBuffers {
    /// Allocate the store and fill it from `snapshot`.
    pub fn new(device: &wgpu::Device, snapshot: &ParticleSnapshot) -> Self {
        let count = snapshot.len() as u32;

        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Positions"),
            contents: bytemuck::cast_slice(&snapshot.positions),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

        let velocities = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Velocities"),
            contents: bytemuck::cast_slice(&snapshot.velocities),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Indices"),
            contents: bytemuck::cast_slice(&quad_indices(count)),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            positions,
            velocities,
            indices,
            count,
        }
    }

    /// Overwrite every particle with `snapshot`.
    ///
    /// The queue stages both arrays and applies them before the next
    /// submission, so no pass ever sees half a reset.
    pub fn upload(&self, queue: &wgpu::Queue, snapshot: &ParticleSnapshot) {
        if snapshot.len() != self.count as usize {
            log::warn!(
                "ignoring reset with {} particles, store holds {}",
                snapshot.len(),
                self.count
            );
            return;
        }
        queue.write_buffer(&self.positions, 0, bytemuck::cast_slice(&snapshot.positions));
        queue.write_buffer(&self.velocities, 0, bytemuck::cast_slice(&snapshot.velocities));
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn positions(&self) -> &wgpu::Buffer {
        &self.positions
    }

    pub fn velocities(&self) -> &wgpu::Buffer {
        &self.velocities
    }

    pub fn indices(&self) -> &wgpu::Buffer {
        &self.indices
    }

    /// Number of indices drawn per frame.
    pub fn index_count(&self) -> u32 {
        self.count * INDICES_PER_PARTICLE
    }
}
