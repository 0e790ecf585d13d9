//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! and constructors for the texture sources the engine renders from: decoded
//! images, solid colors, GHI heatmap data and raw pixel bytes, plus the depth
//! textures the render passes attach to.

use anyhow::{Result, bail};
use image::GenericImageView;

/// A GPU texture with its view and sampler.
///
/// Bound to shaders through a [`crate::data_structures::material::Material`].
/// Color textures are created in sRGB, data textures (heatmaps, raw pixels)
/// in linear space.
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    size: wgpu::Extent3d,
}

impl Texture {
    /// Depth buffer format used by every depth attachment in the engine.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture sized to the current output surface.
    ///
    /// Must be recreated whenever the surface changes size; the renderer does
    /// this in its resize path.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            size,
        }
    }

    /// Decode image file bytes (PNG, JPEG, ...) into a texture.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
    ) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(device, queue, &img, Some(label)))
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
    ) -> Self {
        let dimensions = img.dimensions();
        let rgba = img.to_rgba8();
        Self::upload_rgba(
            device,
            queue,
            &rgba,
            dimensions.0,
            dimensions.1,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            label,
        )
    }

    /// A 1x1 texture filled with a single RGBA color.
    pub fn from_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
    ) -> Self {
        Self::upload_rgba(
            device,
            queue,
            &rgba,
            1,
            1,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            Some(label),
        )
    }

    /// Turn a grid of normalized GHI samples into a heatmap texture.
    ///
    /// Each value is clamped to 0..1 and mapped through [`ghi_ramp`]. Fails
    /// when the sample count doesn't match the given dimensions.
    pub fn from_heatmap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        values: &[f32],
        width: u32,
        height: u32,
        label: &str,
    ) -> Result<Self> {
        let pixels = heatmap_pixels(values, width, height)?;
        Ok(Self::upload_rgba(
            device,
            queue,
            &pixels,
            width,
            height,
            wgpu::TextureFormat::Rgba8Unorm,
            Some(label),
        ))
    }

    /// Upload raw RGBA pixel bytes as a linear-space texture.
    pub fn from_raw_pixels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Result<Self> {
        let expected = (width * height * 4) as usize;
        if pixels.len() != expected {
            bail!(
                "pixel data length {} does not match {}x{} RGBA = {}",
                pixels.len(),
                width,
                height,
                expected
            );
        }
        Ok(Self::upload_rgba(
            device,
            queue,
            pixels,
            width,
            height,
            wgpu::TextureFormat::Rgba8Unorm,
            Some(label),
        ))
    }

    /// Rewrite the full texel contents in place.
    ///
    /// Used for dynamic materials whose data changes per timestep, e.g. a
    /// GHI heatmap scrubbing through the day. The byte count must match the
    /// texture's original dimensions.
    pub fn write_pixels(&self, queue: &wgpu::Queue, pixels: &[u8]) -> Result<()> {
        let expected = (self.size.width * self.size.height * 4) as usize;
        if pixels.len() != expected {
            bail!(
                "pixel data length {} does not match texture size {}x{}",
                pixels.len(),
                self.size.width,
                self.size.height
            );
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.size.width),
                rows_per_image: Some(self.size.height),
            },
            self.size,
        );
        Ok(())
    }

    fn upload_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            size,
        }
    }
}

/// Convert normalized GHI samples to RGBA bytes, validating dimensions.
pub fn heatmap_pixels(values: &[f32], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected = (width * height) as usize;
    if values.len() != expected {
        bail!(
            "heatmap data length {} does not match {}x{} = {}",
            values.len(),
            width,
            height,
            expected
        );
    }
    let mut pixels = Vec::with_capacity(expected * 4);
    for value in values {
        pixels.extend_from_slice(&ghi_ramp(*value));
    }
    Ok(pixels)
}

/// Map a normalized GHI value to its heatmap color.
///
/// Below the midpoint the ramp runs blue to green; above it red ramps in
/// while green holds, passing through yellow. Input is clamped to 0..1,
/// alpha is always opaque.
pub fn ghi_ramp(value: f32) -> [u8; 4] {
    let t = value.clamp(0.0, 1.0);
    if t < 0.5 {
        let g = (t * 2.0 * 255.0).round() as u8;
        let b = ((1.0 - t * 2.0) * 255.0).round() as u8;
        [0, g, b, 255]
    } else {
        let r = ((t * 2.0 - 1.0) * 255.0).round() as u8;
        [r, 255, 0, 255]
    }
}

#[cfg(test)]
mod tests {
    use super::{ghi_ramp, heatmap_pixels};

    #[test]
    fn ramp_endpoints_and_midpoints() {
        assert_eq!(ghi_ramp(0.0), [0, 0, 255, 255]);
        assert_eq!(ghi_ramp(0.25), [0, 128, 128, 255]);
        assert_eq!(ghi_ramp(0.5), [0, 255, 0, 255]);
        assert_eq!(ghi_ramp(0.75), [128, 255, 0, 255]);
        assert_eq!(ghi_ramp(1.0), [255, 255, 0, 255]);
    }

    #[test]
    fn ramp_clamps_out_of_range_input() {
        assert_eq!(ghi_ramp(-3.0), ghi_ramp(0.0));
        assert_eq!(ghi_ramp(7.5), ghi_ramp(1.0));
    }

    #[test]
    fn heatmap_rejects_mismatched_dimensions() {
        let err = heatmap_pixels(&[0.0; 5], 2, 3).unwrap_err();
        assert!(err.to_string().contains("2x3"));
    }
}
