//! GPU mesh data and the two interleaved vertex layouts.
//!
//! Everything drawn by the engine uses one of two fixed vertex formats:
//!
//! - [`MeshVertex`]: position + UV, 20 bytes per vertex, for standard and
//!   billboard geometry
//! - [`TerrainVertex`]: position + normal + UV, 32 bytes per vertex, for
//!   terrain geometry
//!
//! A mesh, its material and the pipeline drawing it must all agree on the
//! layout in use; [`MeshData`] records which one its buffers were built with.

use anyhow::{Result, bail};
use wgpu::util::DeviceExt;

/// Types that can describe their vertex buffer layout to a pipeline.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Standard interleaved vertex: position and texture coordinates.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for MeshVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Terrain interleaved vertex: position, normal and texture coordinates.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for TerrainVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<TerrainVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Which of the two interleaved vertex formats a mesh was built with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    Standard,
    Terrain,
}

impl VertexLayout {
    pub fn floats_per_vertex(&self) -> u32 {
        match self {
            VertexLayout::Standard => 5,
            VertexLayout::Terrain => 8,
        }
    }

    pub fn stride(&self) -> u64 {
        self.floats_per_vertex() as u64 * 4
    }

    pub fn desc(&self) -> wgpu::VertexBufferLayout<'static> {
        match self {
            VertexLayout::Standard => MeshVertex::desc(),
            VertexLayout::Terrain => TerrainVertex::desc(),
        }
    }

    /// Terrain vertex buffers double as storage bindings for the compute
    /// selection pass; standard meshes are only ever drawn.
    fn buffer_usage(&self) -> wgpu::BufferUsages {
        match self {
            VertexLayout::Standard => wgpu::BufferUsages::VERTEX,
            VertexLayout::Terrain => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
        }
    }
}

/// GPU-resident mesh: a vertex buffer, an optional index buffer and the
/// layout they were packed with.
///
/// Meshes are created by the factories in [`crate::resources`] and are not
/// garbage collected: GPU memory is only released by an explicit
/// [`destroy`](Self::destroy) call.
#[derive(Debug)]
pub struct MeshData {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<wgpu::Buffer>,
    pub num_vertices: u32,
    pub num_indices: u32,
    pub layout: VertexLayout,
}

impl MeshData {
    /// Upload standard-layout vertices (and optionally indices).
    pub fn from_standard_vertices(
        device: &wgpu::Device,
        vertices: &[MeshVertex],
        indices: Option<&[u32]>,
        label: &str,
    ) -> Self {
        Self::upload(
            device,
            bytemuck::cast_slice(vertices),
            vertices.len() as u32,
            indices,
            VertexLayout::Standard,
            label,
        )
    }

    /// Upload terrain-layout vertices (and optionally indices).
    pub fn from_terrain_vertices(
        device: &wgpu::Device,
        vertices: &[TerrainVertex],
        indices: Option<&[u32]>,
        label: &str,
    ) -> Self {
        Self::upload(
            device,
            bytemuck::cast_slice(vertices),
            vertices.len() as u32,
            indices,
            VertexLayout::Terrain,
            label,
        )
    }

    /// Upload a raw float array interpreted in the given layout.
    ///
    /// Fails when the array length is not a multiple of the layout's
    /// floats-per-vertex count.
    pub fn from_raw_arrays(
        device: &wgpu::Device,
        vertices: &[f32],
        indices: Option<&[u32]>,
        layout: VertexLayout,
        label: &str,
    ) -> Result<Self> {
        let floats = layout.floats_per_vertex();
        if vertices.len() as u32 % floats != 0 {
            bail!(
                "vertex array for {:?} has {} floats, not a multiple of {}",
                layout,
                vertices.len(),
                floats
            );
        }
        Ok(Self::upload(
            device,
            bytemuck::cast_slice(vertices),
            vertices.len() as u32 / floats,
            indices,
            layout,
            label,
        ))
    }

    fn upload(
        device: &wgpu::Device,
        vertex_bytes: &[u8],
        num_vertices: u32,
        indices: Option<&[u32]>,
        layout: VertexLayout,
        label: &str,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", label)),
            contents: vertex_bytes,
            usage: layout.buffer_usage(),
        });
        let index_buffer = indices.map(|indices| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", label)),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_vertices,
            num_indices: indices.map_or(0, |indices| indices.len() as u32),
            layout,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }

    /// Release the GPU buffers. The mesh must not be drawn afterwards.
    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
        if let Some(index_buffer) = &self.index_buffer {
            index_buffer.destroy();
        }
    }
}
