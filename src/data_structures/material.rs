//! Materials: texture + sampler + bind group triples.
//!
//! A [`Material`] packages the GPU bindings a draw call needs. The bind group
//! is always built against a layout handed in by the renderer so that every
//! material stays compatible with the pipelines, no matter where it was
//! created. Two layouts exist:
//!
//! - standard, 2 bindings: color texture + sampler
//! - terrain, 5 bindings: base texture + sampler, GHI heatmap texture +
//!   sampler, and the renderer's selection-quad uniform

use anyhow::{Result, bail};

use crate::data_structures::texture::{Texture, heatmap_pixels};

/// GPU bindings for one material. Immutable after construction; only the
/// texel contents of a dynamic heatmap may be rewritten in place.
#[derive(Debug)]
pub struct Material {
    pub texture: Texture,
    pub ghi_texture: Option<Texture>,
    pub bind_group: wgpu::BindGroup,
    heatmap_size: Option<(u32, u32)>,
}

impl Material {
    /// Standard 2-binding material: one color texture and its sampler.
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, texture: Texture) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
            label: Some("material_bind_group"),
        });

        Self {
            texture,
            ghi_texture: None,
            bind_group,
            heatmap_size: None,
        }
    }

    /// Standard material over a 1x1 solid color texture.
    pub fn from_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        rgba: [u8; 4],
        label: &str,
    ) -> Self {
        Self::new(device, layout, Texture::from_color(device, queue, rgba, label))
    }

    /// Standard material from encoded image bytes (PNG, JPEG, ...).
    pub fn from_image_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        bytes: &[u8],
        label: &str,
    ) -> Result<Self> {
        let texture = Texture::from_bytes(device, queue, bytes, label)?;
        Ok(Self::new(device, layout, texture))
    }

    /// Terrain 5-binding material: base texture, GHI heatmap and the shared
    /// selection-quad uniform buffer owned by the renderer.
    pub fn new_terrain(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        base: Texture,
        ghi: Texture,
        ghi_size: (u32, u32),
        selection_quad: &wgpu::Buffer,
    ) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&base.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&base.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&ghi.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&ghi.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: selection_quad.as_entire_binding(),
                },
            ],
            label: Some("terrain_material_bind_group"),
        });

        Self {
            texture: base,
            ghi_texture: Some(ghi),
            bind_group,
            heatmap_size: Some(ghi_size),
        }
    }

    /// Replace the GHI heatmap contents with a new set of samples.
    ///
    /// The sample grid must match the heatmap's original dimensions. Only
    /// terrain materials carry a heatmap; calling this on a standard
    /// material is an error.
    pub fn write_heatmap(&self, queue: &wgpu::Queue, values: &[f32]) -> Result<()> {
        let (Some((width, height)), Some(ghi)) = (self.heatmap_size, &self.ghi_texture) else {
            bail!("material has no GHI heatmap to rewrite");
        };
        let pixels = heatmap_pixels(values, width, height)?;
        ghi.write_pixels(queue, &pixels)
    }
}
