//! Owned off-screen colour targets.

/// A 2D colour texture usable as render attachment and sampled input.
///
/// Dropping it destroys the device texture immediately instead of waiting for
/// the last handle to go away.
#[derive(Debug)]
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    extent: (u32, u32),
}

impl RenderTarget {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        extent: (u32, u32),
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: extent.0,
                height: extent.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            extent,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Size of one texel in UV units.
    pub fn texel_size(&self) -> [f32; 2] {
        [1.0 / self.extent.0 as f32, 1.0 / self.extent.1 as f32]
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}
