//! Compute-based vertex selection over terrain meshes.
//!
//! A two-phase count-then-write compaction: phase 1 counts the terrain
//! vertices inside a caller-supplied quad with an atomic counter, phase 2
//! reuses the counter as a write cursor so every qualifying thread claims a
//! unique output slot. The output buffer is sized exactly to the counted
//! length and allocated fresh per call, since that length changes with every
//! invocation. Membership is exact; output order is not guaranteed.

use anyhow::{Result, ensure};

use crate::data_structures::mesh::{MeshData, VertexLayout};
use crate::pick::map_buffer_read;
use crate::pipelines::select::{SelectPipelines, mk_select_pipelines};
use crate::renderer::Renderer;

/// Threads per workgroup of the selection kernels; dispatches are sized
/// `ceil(vertex_count / this)`.
pub const SELECT_WORKGROUP_SIZE: u32 = 64;

/// CPU mirror of the selection kernel's uniform: the packed quad and the
/// vertex count, padded to uniform alignment.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SelectParams {
    quad: [[f32; 4]; 2],
    vertex_count: u32,
    _padding: [u32; 3],
}

/// Owns the selection compute pipelines and the small persistent buffers
/// shared by every selection call.
#[derive(Debug)]
pub struct VertexSelector {
    pipelines: SelectPipelines,
    params: wgpu::Buffer,
    counter: wgpu::Buffer,
    counter_staging: wgpu::Buffer,
}

impl VertexSelector {
    pub fn new(device: &wgpu::Device) -> Self {
        let pipelines = mk_select_pipelines(device);
        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Select Params Buffer"),
            size: std::mem::size_of::<SelectParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let counter = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Select Counter Buffer"),
            size: 4,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let counter_staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Select Counter Staging Buffer"),
            size: 4,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            pipelines,
            params,
            counter,
            counter_staging,
        }
    }

    /// Collect the world positions of every terrain vertex inside `quad`
    /// (four planar points in the XZ plane).
    ///
    /// Returns `Ok(None)` when nothing falls inside the quad; phase 2 is
    /// skipped entirely in that case. Only terrain-layout meshes carry the
    /// storage-capable vertex buffers this kernel reads.
    pub async fn select_in_quad(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mesh: &MeshData,
        quad: [[f32; 2]; 4],
    ) -> Result<Option<Vec<[f32; 3]>>> {
        ensure!(
            mesh.layout == VertexLayout::Terrain,
            "vertex selection requires a terrain-layout mesh, got {:?}",
            mesh.layout
        );
        if mesh.num_vertices == 0 {
            return Ok(None);
        }

        let params = SelectParams {
            quad: [
                [quad[0][0], quad[0][1], quad[1][0], quad[1][1]],
                [quad[2][0], quad[2][1], quad[3][0], quad[3][1]],
            ],
            vertex_count: mesh.num_vertices,
            _padding: [0; 3],
        };
        queue.write_buffer(&self.params, 0, bytemuck::bytes_of(&params));

        let workgroups = mesh.num_vertices.div_ceil(SELECT_WORKGROUP_SIZE);

        // Phase 1: count qualifying vertices.
        queue.write_buffer(&self.counter, 0, &[0u8; 4]);
        let count_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.pipelines.count_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: mesh.vertex_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.counter.as_entire_binding(),
                },
            ],
            label: Some("select_count_bind_group"),
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Select Count Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Select Count Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines.count);
            pass.set_bind_group(0, &count_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&self.counter, 0, &self.counter_staging, 0, 4);
        queue.submit(std::iter::once(encoder.finish()));

        map_buffer_read(device, &self.counter_staging).await?;
        let count = {
            let data = self.counter_staging.slice(..).get_mapped_range();
            u32::from_le_bytes([data[0], data[1], data[2], data[3]])
        };
        self.counter_staging.unmap();

        if count == 0 {
            return Ok(None);
        }

        // Phase 2: the counter becomes the write cursor; the output and its
        // read-back buffer are transient because their size is the count.
        queue.write_buffer(&self.counter, 0, &[0u8; 4]);
        let output_size = count as u64 * 16;
        let output = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Select Output Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Select Readback Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let write_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.pipelines.write_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: mesh.vertex_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.counter.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: output.as_entire_binding(),
                },
            ],
            label: Some("select_write_bind_group"),
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Select Write Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Select Write Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines.write);
            pass.set_bind_group(0, &write_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&output, 0, &readback, 0, output_size);
        queue.submit(std::iter::once(encoder.finish()));

        map_buffer_read(device, &readback).await?;
        let positions = {
            let data = readback.slice(..).get_mapped_range();
            let values: &[f32] = bytemuck::cast_slice(&data);
            values
                .chunks_exact(4)
                .map(|chunk| [chunk[0], chunk[1], chunk[2]])
                .collect::<Vec<_>>()
        };
        readback.unmap();

        Ok(Some(positions))
    }
}

impl Renderer {
    /// See [`VertexSelector::select_in_quad`].
    pub async fn select_vertices_in_quad(
        &self,
        mesh: &MeshData,
        quad: [[f32; 2]; 4],
    ) -> Result<Option<Vec<[f32; 3]>>> {
        self.selector
            .select_in_quad(&self.device, &self.queue, mesh, quad)
            .await
    }
}
