//! Simulation kernel: the per-particle compute update.

use super::diagnostics;
use super::noise_texture::NoiseTexture;
use super::particles::ParticleBuffers;
use super::WORKGROUP_SIZE;
use crate::error::GpuError;

/// Workgroups needed to cover `num_particles`, at least one.
pub fn workgroup_count(num_particles: u32) -> u32 {
    num_particles.div_ceil(WORKGROUP_SIZE).max(1)
}

/// Compute pipeline plus the bindings it runs with.
pub struct SimulationKernel {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    workgroups: u32,
}

impl SimulationKernel {
    /// Build the kernel from resolved WGSL.
    ///
    /// Fails if the device rejects the module or the pipeline; the caller
    /// keeps rendering without it.
    pub fn new(
        device: &wgpu::Device,
        source: &str,
        params: &wgpu::Buffer,
        particles: &ParticleBuffers,
        noise: &NoiseTexture,
    ) -> Result<Self, GpuError> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Simulation Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let (pipeline, bind_group) = diagnostics::capture(device, "simulation kernel", || {
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Simulation Bind Group"),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: particles.positions().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: particles.velocities().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(noise.view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::Sampler(noise.sampler()),
                    },
                ],
            });

            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Simulation Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Simulation Pipeline Layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Simulation Pipeline"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

            (pipeline, bind_group)
        })?;

        Ok(Self {
            pipeline,
            bind_group,
            workgroups: workgroup_count(particles.count()),
        })
    }

    /// Record one update over every particle.
    ///
    /// The pass ends before this returns; any render pass recorded after it on
    /// the same encoder sees the written positions.
    pub fn dispatch(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Simulation Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(self.workgroups, 1, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShaderProgram;
    use crate::noise::NoiseVolume;
    use crate::shader_utils::{Fragments, ShaderSources};
    use crate::spawn::{heart_position, star_position, ParticleSnapshot, DEFAULT_HEART_SCALE};
    use crate::state::{FrameState, ParticleState, ShapeController, ShapeTarget, ShapeTimings};
    use crate::uniforms::{ForceSettings, ShaderParams};
    use glam::{Mat4, Vec4};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const COUNT: u32 = 512;
    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_workgroup_count_rounds_up() {
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(128), 1);
        assert_eq!(workgroup_count(129), 2);
        assert_eq!(workgroup_count(1 << 20), 8192);
    }

    #[test]
    fn test_workgroup_count_never_zero() {
        assert_eq!(workgroup_count(0), 1);
    }

    // ========================================================================
    // Kernel on a real device. Skipped when no adapter is available.
    // ========================================================================

    struct Harness {
        device: wgpu::Device,
        queue: wgpu::Queue,
        params: wgpu::Buffer,
        particles: ParticleBuffers,
        kernel: SimulationKernel,
        _noise: NoiseTexture,
    }

    impl Harness {
        fn new(snapshot: &ParticleSnapshot) -> Option<Self> {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
            let adapter =
                pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())).ok()?;
            let (device, queue) =
                pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()?;

            let mut rng = SmallRng::seed_from_u64(11);
            let noise = NoiseTexture::new(&device, &queue, &NoiseVolume::generate(16, &mut rng));
            let params = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Test Params"),
                size: ShaderParams::SIZE,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let particles = ParticleBuffers::new(&device, snapshot);
            let source = ShaderSources::embedded()
                .resolve(ShaderProgram::SimulationKernel, &Fragments::standard())
                .unwrap();
            let kernel = SimulationKernel::new(&device, &source, &params, &particles, &noise).unwrap();

            Some(Self {
                device,
                queue,
                params,
                particles,
                kernel,
                _noise: noise,
            })
        }

        fn step(&self, params: &ShaderParams) {
            self.queue
                .write_buffer(&self.params, 0, bytemuck::bytes_of(params));
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
            self.kernel.dispatch(&mut encoder);
            self.queue.submit(std::iter::once(encoder.finish()));
        }

        fn read(&self, buffer: &wgpu::Buffer) -> Vec<Vec4> {
            let size = buffer.size();
            let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Test Readback"),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
            encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
            self.queue.submit(std::iter::once(encoder.finish()));

            let slice = staging.slice(..);
            slice.map_async(wgpu::MapMode::Read, |_| {});
            let _ = self.device.poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            });

            let values = {
                let data = slice.get_mapped_range();
                bytemuck::cast_slice::<u8, [f32; 4]>(&data)
                    .iter()
                    .map(|v| Vec4::from_array(*v))
                    .collect()
            };
            staging.unmap();
            values
        }

        fn positions(&self) -> Vec<Vec4> {
            self.read(self.particles.positions())
        }

        fn velocities(&self) -> Vec<Vec4> {
            self.read(self.particles.velocities())
        }
    }

    fn uniform_snapshot() -> ParticleSnapshot {
        ParticleSnapshot::uniform(COUNT, 0.5, &mut SmallRng::seed_from_u64(5))
    }

    fn compose(frame: &FrameState, forces: &ForceSettings) -> ShaderParams {
        ShaderParams::compose(Mat4::IDENTITY, Mat4::IDENTITY, frame, forces, COUNT)
    }

    fn max_error(positions: &[Vec4], goal: impl Fn(u32) -> Vec4) -> f32 {
        positions
            .iter()
            .enumerate()
            .map(|(i, p)| (*p - goal(i as u32)).truncate().length())
            .fold(0.0, f32::max)
    }

    /// Absorb toward `target` and run the shape state to its end, sampling
    /// the error against `goal` once per simulated second of the shape.
    fn form_shape(harness: &Harness, target: ShapeTarget, goal: impl Fn(u32) -> Vec4) -> Vec<f32> {
        let forces = ForceSettings::default();
        let mut controller = ShapeController::default();
        controller.begin_absorb(target);

        let mut errors = Vec::new();
        let mut shape_frames = 0;
        for _ in 0..1000 {
            let frame = controller.tick(DT);
            if frame.state == ParticleState::Normal {
                break;
            }
            if frame.state == ParticleState::from(target) {
                if shape_frames % 60 == 0 {
                    errors.push(max_error(&harness.positions(), &goal));
                }
                shape_frames += 1;
            }
            harness.step(&compose(&frame, &forces));
        }
        assert_eq!(controller.state(), ParticleState::Normal);
        errors.push(max_error(&harness.positions(), &goal));
        errors
    }

    fn assert_settles(errors: &[f32]) {
        for pair in errors.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-5, "error grew: {errors:?}");
        }
        let last = *errors.last().unwrap();
        assert!(last < 1e-4, "did not reach the shape: {errors:?}");
    }

    #[test]
    fn test_kernel_forms_heart() {
        let Some(harness) = Harness::new(&uniform_snapshot()) else {
            return;
        };
        let errors = form_shape(&harness, ShapeTarget::Heart, |i| {
            heart_position(i, COUNT, DEFAULT_HEART_SCALE)
        });
        assert_settles(&errors);
    }

    #[test]
    fn test_kernel_forms_star() {
        let Some(harness) = Harness::new(&uniform_snapshot()) else {
            return;
        };
        let errors = form_shape(&harness, ShapeTarget::Star, |i| {
            star_position(i, COUNT, DEFAULT_HEART_SCALE)
        });
        assert_settles(&errors);
    }

    #[test]
    fn test_normal_drift_is_small_noise() {
        let snapshot = uniform_snapshot();
        let Some(harness) = Harness::new(&snapshot) else {
            return;
        };
        let mut controller = ShapeController::default();
        controller.reset();
        let frame = controller.tick(DT);
        assert_eq!(frame.attractor.w, 0.0);

        let forces = ForceSettings::default();
        harness.step(&compose(&frame, &forces));

        let positions = harness.positions();
        let velocities = harness.velocities();
        // fBm amplitude is below one per axis, then damped.
        let bound = forces.noise_strength * 3f32.sqrt();

        assert!(velocities.iter().any(|v| v.truncate().length() > 0.0));
        for ((p, start), v) in positions.iter().zip(&snapshot.positions).zip(&velocities) {
            let moved = (*p - *start).truncate().length();
            assert!(moved <= bound, "moved {moved}");
            assert!(v.truncate().length() <= bound);
            assert_eq!(v.w, 0.0);
        }
    }

    #[test]
    fn test_attractor_pulls_particles_in() {
        let snapshot = uniform_snapshot();
        let Some(harness) = Harness::new(&snapshot) else {
            return;
        };
        let forces = ForceSettings {
            noise_strength: 0.0,
            attractor_strength: 0.01,
            ..ForceSettings::default()
        };
        let mut controller = ShapeController::new(ShapeTimings::default(), forces.attractor());
        controller.reset();
        controller.toggle_attractor();
        let frame = controller.tick(DT);
        assert!(frame.attractor.w > 0.0);

        harness.step(&compose(&frame, &forces));

        let center = frame.attractor.truncate();
        for (p, start) in harness.positions().iter().zip(&snapshot.positions) {
            let before = (start.truncate() - center).length();
            let after = (p.truncate() - center).length();
            assert!(after < before, "{before} -> {after}");
        }
    }
}
