//! Bloom compositor.
//!
//! Eight full-screen passes per frame, always in this order:
//!
//! 1. extract: scene → downsample 0, keeping `max(colour - threshold, 0)`
//! 2. downsample: level k → level k+1, for k = 0, 1, 2
//! 3. upsample: (downsample 3 | upsample i-1) + downsample 2-i → upsample i
//! 4. combine: scene + upsample 2 · intensity → presented surface
//!
//! Pipelines live as long as the compositor. The image pyramid, the bind
//! groups that point into it and the quad are rebuilt together on every resize.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::diagnostics;
use super::target::RenderTarget;
use super::SCENE_FORMAT;
use crate::error::GpuError;
use crate::pyramid::{self, Pyramid, PyramidImage, PyramidLayout, DOWNSAMPLE_LEVELS, UPSAMPLE_STAGES};
use crate::shader_utils::BloomSources;

/// Bloom tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    /// Colour above this value feeds the glow.
    pub threshold: f32,
    /// Weight of the glow in the final composite.
    pub intensity: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            threshold: 1.2,
            intensity: 0.3,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct BloomUniform {
    texel_size: [f32; 2],
    threshold: f32,
    intensity: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct QuadVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

/// Two triangles covering clip space; uv has its origin top-left.
const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
];

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Extract,
    Downsample,
    Upsample,
    Combine,
}

/// Where a pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Image(PyramidImage),
    Surface,
}

struct Pass {
    stage: Stage,
    output: Output,
    bind_group: wgpu::BindGroup,
    _params: wgpu::Buffer,
}

/// Pyramid images, the per-pass bindings into them and the quad the passes draw.
struct BloomTargets {
    images: Pyramid<RenderTarget>,
    passes: Vec<Pass>,
    quad: wgpu::Buffer,
}

/// The five-stage bloom post-process.
pub struct BloomCompositor {
    settings: BloomSettings,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    extract: wgpu::RenderPipeline,
    downsample: wgpu::RenderPipeline,
    upsample: wgpu::RenderPipeline,
    combine: wgpu::RenderPipeline,
    targets: Option<BloomTargets>,
}

impl BloomCompositor {
    /// Build every bloom pipeline. Image resources are created by [`resize`](Self::resize).
    pub fn new(
        device: &wgpu::Device,
        sources: &BloomSources,
        settings: BloomSettings,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, GpuError> {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bloom Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Bind Group Layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let build = |label: &'static str, source: &str, format: wgpu::TextureFormat| {
            diagnostics::capture(device, label, || {
                create_pass_pipeline(device, &pipeline_layout, label, source, format)
            })
        };

        let extract = build("bloom extract", &sources.extract, SCENE_FORMAT)?;
        let downsample = build("bloom downsample", &sources.downsample, SCENE_FORMAT)?;
        let upsample = build("bloom upsample", &sources.upsample, SCENE_FORMAT)?;
        let combine = build("bloom combine", &sources.combine, surface_format)?;

        Ok(Self {
            settings,
            bind_group_layout,
            sampler,
            extract,
            downsample,
            upsample,
            combine,
            targets: None,
        })
    }

    /// Release the current pyramid and build one for `width`×`height`.
    /// A zero-area size leaves no pyramid until the next non-empty resize.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let Self {
            settings,
            bind_group_layout,
            sampler,
            targets,
            ..
        } = self;

        let built = pyramid::rebuild(targets, width, height, |layout| {
            BloomTargets::new(device, bind_group_layout, sampler, *settings, layout)
        });
        if built {
            log::debug!("bloom pyramid rebuilt at {}x{}", width, height);
        }
    }

    /// Full-resolution scene target the particle pass renders into.
    pub fn scene_view(&self) -> Option<&wgpu::TextureView> {
        self.targets.as_ref().map(|t| t.images.scene().view())
    }

    /// Record all bloom passes, ending with the composite into `surface`.
    pub fn composite(&self, encoder: &mut wgpu::CommandEncoder, surface: &wgpu::TextureView) {
        let Some(targets) = &self.targets else {
            return;
        };

        for pass in &targets.passes {
            let (label, pipeline) = match pass.stage {
                Stage::Extract => ("Bloom Extract Pass", &self.extract),
                Stage::Downsample => ("Bloom Downsample Pass", &self.downsample),
                Stage::Upsample => ("Bloom Upsample Pass", &self.upsample),
                Stage::Combine => ("Bloom Combine Pass", &self.combine),
            };
            let view = match pass.output {
                Output::Image(image) => targets.images.get(image).view(),
                Output::Surface => surface,
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &pass.bind_group, &[]);
            render_pass.set_vertex_buffer(0, targets.quad.slice(..));
            render_pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
        }
    }
}

impl BloomTargets {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        settings: BloomSettings,
        pyramid_layout: PyramidLayout,
    ) -> Self {
        let images = Pyramid::build(pyramid_layout, |image, extent| {
            let label = match image {
                PyramidImage::Scene => "Bloom Scene".to_string(),
                PyramidImage::Downsample(level) => format!("Bloom Downsample {}", level),
                PyramidImage::Upsample(stage) => format!("Bloom Upsample {}", stage),
            };
            RenderTarget::new(device, &label, extent, SCENE_FORMAT)
        });

        let mut passes = Vec::with_capacity(2 + DOWNSAMPLE_LEVELS + UPSAMPLE_STAGES);
        let mut add = |stage: Stage, primary: PyramidImage, secondary: PyramidImage, output: Output| {
            let texel_size = match output {
                Output::Image(image) => images.get(image).texel_size(),
                Output::Surface => images.scene().texel_size(),
            };
            let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bloom Params"),
                contents: bytemuck::bytes_of(&BloomUniform {
                    texel_size,
                    threshold: settings.threshold,
                    intensity: settings.intensity,
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Bloom Bind Group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(images.get(primary).view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(images.get(secondary).view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: params.as_entire_binding(),
                    },
                ],
            });
            passes.push(Pass {
                stage,
                output,
                bind_group,
                _params: params,
            });
        };

        add(
            Stage::Extract,
            PyramidImage::Scene,
            PyramidImage::Scene,
            Output::Image(PyramidImage::Downsample(0)),
        );
        for level in 1..DOWNSAMPLE_LEVELS {
            let source = PyramidImage::downsample_source(level);
            add(
                Stage::Downsample,
                source,
                source,
                Output::Image(PyramidImage::Downsample(level)),
            );
        }
        for stage in 0..UPSAMPLE_STAGES {
            add(
                Stage::Upsample,
                PyramidImage::upsample_source(stage),
                PyramidImage::upsample_detail(stage),
                Output::Image(PyramidImage::Upsample(stage)),
            );
        }
        add(
            Stage::Combine,
            PyramidImage::Scene,
            PyramidImage::Upsample(UPSAMPLE_STAGES - 1),
            Output::Surface,
        );

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bloom Quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            images,
            passes,
            quad,
        }
    }
}

fn create_pass_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    label: &str,
    source: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &QUAD_ATTRIBUTES,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_utils::{Fragments, ShaderSources};

    const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    fn device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())).ok()?;
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()
    }

    fn compositor(device: &wgpu::Device) -> BloomCompositor {
        let set = ShaderSources::embedded()
            .prepare(&Fragments::standard())
            .unwrap();
        BloomCompositor::new(device, &set.bloom.unwrap(), BloomSettings::default(), SURFACE_FORMAT)
            .unwrap()
    }

    #[test]
    fn test_resize_rebuilds_every_frame_resource() {
        let Some((device, _queue)) = device() else {
            return;
        };
        let mut bloom = compositor(&device);
        assert!(bloom.scene_view().is_none());

        for (w, h) in [(64, 48), (0, 48), (200, 120)] {
            bloom.resize(&device, w, h);
        }

        let targets = bloom.targets.as_ref().unwrap();
        assert_eq!(targets.images.layout().extent(), (200, 120));
        assert_eq!(targets.passes.len(), 2 + DOWNSAMPLE_LEVELS + UPSAMPLE_STAGES);
        assert_eq!(
            targets.quad.size(),
            std::mem::size_of_val(&QUAD_VERTICES) as wgpu::BufferAddress
        );
        assert!(targets.quad.usage().contains(wgpu::BufferUsages::VERTEX));
    }

    #[test]
    fn test_zero_area_drops_quad_with_images() {
        let Some((device, _queue)) = device() else {
            return;
        };
        let mut bloom = compositor(&device);
        bloom.resize(&device, 64, 48);
        assert!(bloom.targets.is_some());

        bloom.resize(&device, 64, 0);
        assert!(bloom.targets.is_none());
        assert!(bloom.scene_view().is_none());
    }

    #[test]
    fn test_composite_after_resize_is_valid() {
        let Some((device, _queue)) = device() else {
            return;
        };
        let mut bloom = compositor(&device);
        bloom.resize(&device, 64, 48);
        bloom.resize(&device, 96, 72);

        let surface = RenderTarget::new(&device, "Test Surface", (96, 72), SURFACE_FORMAT);
        let recorded = diagnostics::capture(&device, "bloom composite", || {
            let mut encoder =
                device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
            bloom.composite(&mut encoder, surface.view());
            encoder.finish()
        });
        assert!(recorded.is_ok());
    }
}
