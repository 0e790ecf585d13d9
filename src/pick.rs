//! World-position picking.
//!
//! The picking pass renders the scene's geometry into an off-screen float
//! target storing world positions, then copies the single pixel under the
//! query coordinate into a small read-back buffer and maps it
//! asynchronously. The target is cleared to a sentinel far below any real
//! coordinate, so a miss is detected from the read-back value itself;
//! queries outside the surface never reach the GPU at all.

use anyhow::{Context as _, Result};

use crate::data_structures::texture::Texture;
use crate::pipelines::pick::PICK_FORMAT;
use crate::renderer::{Renderer, partition_by_type};
use crate::scene::RenderData;

/// Clear value of the picking target. Any alpha at or below zero in the
/// read-back means the ray hit nothing.
pub const PICK_CLEAR: f64 = -10_000.0;

/// Off-screen target and read-back buffer for picking, recreated on resize.
#[derive(Debug)]
pub(crate) struct PickTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub readback: wgpu::Buffer,
}

impl PickTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pick Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pick Depth Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Texture::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        // One Rgba32Float pixel.
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pick Readback Buffer"),
            size: 16,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            texture,
            view,
            depth_view,
            readback,
        }
    }
}

/// Map a read-back buffer and wait for the GPU to finish with it.
///
/// The mapping has to be requested before the device poll, and the poll has
/// to happen before awaiting the channel, otherwise the wait never resolves.
pub(crate) async fn map_buffer_read(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<()> {
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    #[cfg(target_arch = "wasm32")]
    device
        .poll(wgpu::PollType::Poll)
        .context("device poll failed")?;
    #[cfg(not(target_arch = "wasm32"))]
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })
        .context("device poll failed")?;
    rx.receive()
        .await
        .context("buffer mapping callback dropped")?
        .context("buffer mapping failed")?;
    Ok(())
}

impl Renderer {
    /// Recover the world position under surface coordinate (x, y).
    ///
    /// Returns `Ok(None)` for coordinates outside the surface (no GPU work
    /// is issued) and for queries that hit no geometry. The read-back buffer
    /// must not be re-entered while a pick is in flight; picking is part of
    /// the single-threaded frame loop.
    pub async fn pick_world_position(
        &self,
        data: &RenderData<'_>,
        x: f64,
        y: f64,
    ) -> Result<Option<[f32; 3]>> {
        let (width, height) = (self.config.width, self.config.height);
        if x < 0.0 || y < 0.0 || x >= width as f64 || y >= height as f64 {
            return Ok(None);
        }

        self.upload_frame_data(data)?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pick Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.pick_target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: PICK_CLEAR,
                            g: PICK_CLEAR,
                            b: PICK_CLEAR,
                            a: PICK_CLEAR,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.pick_target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

            // Billboards are picked as the world geometry they stand on, so
            // they go through the standard-layout pick pipeline.
            let (standard, terrain, billboard) = partition_by_type(&data.objects);
            if !standard.is_empty() || !billboard.is_empty() {
                render_pass.set_pipeline(&self.pipelines.pick_standard);
                for (index, object) in standard.iter().chain(billboard.iter()) {
                    object.draw_geometry(&mut render_pass, *index);
                }
            }
            if !terrain.is_empty() {
                render_pass.set_pipeline(&self.pipelines.pick_terrain);
                for (index, object) in &terrain {
                    object.draw_geometry(&mut render_pass, *index);
                }
            }
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.pick_target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: x as u32,
                    y: y as u32,
                    z: 0,
                },
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.pick_target.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: None,
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        map_buffer_read(&self.device, &self.pick_target.readback).await?;
        let pixel = {
            let data = self.pick_target.readback.slice(..).get_mapped_range();
            let pixel: [f32; 4] = *bytemuck::from_bytes(&data[..16]);
            pixel
        };
        self.pick_target.readback.unmap();

        if pixel[3] <= 0.0 {
            return Ok(None);
        }
        Ok(Some([pixel[0], pixel[1], pixel[2]]))
    }
}
