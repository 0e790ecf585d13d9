//! Instanced meshes: many copies of one mesh in a single draw call.
//!
//! [`InstancePool`] is the CPU side: a pool of transforms with a packed
//! matrix mirror and a dirty flag, capacity fixed at construction.
//! [`InstancedMesh`] pairs a pool with one or more (mesh, material) submeshes
//! and a GPU buffer of matching capacity, and draws all live instances of
//! each submesh in one call.

use std::sync::Arc;

use cgmath::Vector3;
use wgpu::util::DeviceExt;

use crate::data_structures::{material::Material, mesh::MeshData, mesh::VertexLayout};
use crate::pipelines::Pipelines;
use crate::transform::Transform;

/// Partial update for a single instance slot; `None` fields are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstancePatch {
    pub position: Option<Vector3<f32>>,
    pub rotation: Option<Vector3<f32>>,
    pub scale: Option<Vector3<f32>>,
}

/// Fixed-capacity pool of per-instance transforms with a packed CPU mirror.
///
/// The mirror holds one column-major 4x4 matrix per live instance and is only
/// re-packed when something changed since the last [`pack`](Self::pack).
#[derive(Debug)]
pub struct InstancePool {
    transforms: Vec<Transform>,
    mirror: Vec<[[f32; 4]; 4]>,
    capacity: usize,
    dirty: bool,
}

impl InstancePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            transforms: Vec::with_capacity(capacity),
            mirror: vec![[[0.0; 4]; 4]; capacity],
            capacity,
            dirty: false,
        }
    }

    /// Append an instance and return its index, or `None` once the pool is at
    /// capacity. The pool never grows.
    pub fn add(&mut self, transform: Transform) -> Option<usize> {
        if self.transforms.len() >= self.capacity {
            log::warn!(
                "instance pool is full ({} instances), instance not added",
                self.capacity
            );
            return None;
        }
        self.transforms.push(transform);
        self.dirty = true;
        Some(self.transforms.len() - 1)
    }

    /// Append several instances; returns how many actually fit.
    pub fn add_many(&mut self, transforms: impl IntoIterator<Item = Transform>) -> usize {
        let mut added = 0;
        for transform in transforms {
            if self.add(transform).is_none() {
                break;
            }
            added += 1;
        }
        added
    }

    /// Patch a subset of an instance's fields. Returns false for an invalid
    /// index.
    pub fn update(&mut self, index: usize, patch: InstancePatch) -> bool {
        let Some(transform) = self.transforms.get_mut(index) else {
            return false;
        };
        if let Some(position) = patch.position {
            transform.set_position(position);
        }
        if let Some(rotation) = patch.rotation {
            transform.set_rotation(rotation);
        }
        if let Some(scale) = patch.scale {
            transform.set_scale(scale);
        }
        self.dirty = true;
        true
    }

    /// Swap-remove the instance at `index`.
    ///
    /// O(1): the last live slot is moved into `index`, so any externally held
    /// index referring to the previously-last slot is invalidated. Returns
    /// false for an invalid index.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.transforms.len() {
            return false;
        }
        self.transforms.swap_remove(index);
        self.dirty = true;
        true
    }

    pub fn get(&self, index: usize) -> Option<&Transform> {
        self.transforms.get(index)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Re-pack live matrices into the mirror if anything changed.
    ///
    /// Returns the packed live prefix when a re-pack happened, `None` when
    /// the mirror was already current. Upload cost is bounded by the live
    /// instance count, not the pool capacity.
    pub fn pack(&mut self) -> Option<&[[[f32; 4]; 4]]> {
        if !self.dirty {
            return None;
        }
        for (slot, transform) in self.mirror.iter_mut().zip(self.transforms.iter()) {
            *slot = transform.model_matrix().into();
        }
        self.dirty = false;
        Some(&self.mirror[..self.transforms.len()])
    }
}

/// One or more submeshes drawn with true GPU instancing from a shared
/// transform pool.
#[derive(Debug)]
pub struct InstancedMesh {
    submeshes: Vec<(Arc<MeshData>, Arc<Material>)>,
    pool: InstancePool,
    instance_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pub visible: bool,
}

impl InstancedMesh {
    /// Create a batch with a fixed maximum instance count.
    ///
    /// The bind group mirrors the renderer's frame bind group layout with the
    /// batch's own instance buffer in the model-matrix slot; during this
    /// batch's draws it replaces the shared frame group.
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        frame_uniforms: &wgpu::Buffer,
        submeshes: Vec<(Arc<MeshData>, Arc<Material>)>,
        max_instances: usize,
    ) -> Self {
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Matrix Buffer"),
            contents: &vec![0u8; max_instances.max(1) * 64],
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instance_buffer.as_entire_binding(),
                },
            ],
            label: Some("instance_bind_group"),
        });

        Self {
            submeshes,
            pool: InstancePool::new(max_instances),
            instance_buffer,
            bind_group,
            visible: true,
        }
    }

    pub fn add_instance(&mut self, transform: Transform) -> Option<usize> {
        self.pool.add(transform)
    }

    pub fn add_instances(&mut self, transforms: impl IntoIterator<Item = Transform>) -> usize {
        self.pool.add_many(transforms)
    }

    pub fn update_instance(&mut self, index: usize, patch: InstancePatch) -> bool {
        self.pool.update(index, patch)
    }

    /// Swap-remove; see [`InstancePool::remove`] for the index invalidation
    /// this implies.
    pub fn remove_instance(&mut self, index: usize) -> bool {
        self.pool.remove(index)
    }

    pub fn instance_count(&self) -> usize {
        self.pool.len()
    }

    pub fn max_instances(&self) -> usize {
        self.pool.capacity()
    }

    /// Upload the packed matrices if instances changed since the last call.
    /// No-op on a clean pool; uploads exactly the live prefix otherwise.
    pub fn update_buffer(&mut self, queue: &wgpu::Queue) {
        if let Some(packed) = self.pool.pack() {
            if !packed.is_empty() {
                queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(packed));
            }
        }
    }

    /// Draw every live instance of every submesh, one call per submesh.
    ///
    /// Substitutes the batch's own bind group for the frame group; the
    /// renderer restores the frame group afterwards. Skips entirely when the
    /// batch is empty or invisible.
    pub fn draw_all(&self, render_pass: &mut wgpu::RenderPass<'_>, pipelines: &Pipelines) {
        let live = self.pool.len() as u32;
        if live == 0 || !self.visible {
            return;
        }
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        for (mesh, material) in &self.submeshes {
            match mesh.layout {
                VertexLayout::Standard => render_pass.set_pipeline(&pipelines.standard),
                VertexLayout::Terrain => render_pass.set_pipeline(&pipelines.terrain),
            }
            render_pass.set_bind_group(1, &material.bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            match &mesh.index_buffer {
                Some(index_buffer) => {
                    render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..mesh.num_indices, 0, 0..live);
                }
                None => render_pass.draw(0..mesh.num_vertices, 0..live),
            }
        }
    }

    /// Release the instance buffer and every submesh's buffers.
    pub fn destroy(&self) {
        self.instance_buffer.destroy();
        for (mesh, _) in &self.submeshes {
            mesh.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_beyond_capacity() {
        let mut pool = InstancePool::new(2);
        assert_eq!(pool.add(Transform::new()), Some(0));
        assert_eq!(pool.add(Transform::new()), Some(1));
        assert_eq!(pool.add(Transform::new()), None);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn add_many_stops_at_capacity() {
        let mut pool = InstancePool::new(3);
        let added = pool.add_many((0..5).map(|_| Transform::new()));
        assert_eq!(added, 3);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn remove_swaps_with_last_slot() {
        let mut pool = InstancePool::new(4);
        for x in 0..4 {
            pool.add(Transform::from_position(Vector3::new(x as f32, 0.0, 0.0)));
        }
        assert!(pool.remove(1));
        assert_eq!(pool.len(), 3);
        // Slot 1 now holds what used to be the last instance.
        assert_eq!(pool.get(1).unwrap().position().x, 3.0);
        assert!(!pool.remove(3));
    }

    #[test]
    fn pack_is_noop_when_clean() {
        let mut pool = InstancePool::new(2);
        pool.add(Transform::from_position(Vector3::new(1.0, 2.0, 3.0)));
        let packed = pool.pack().expect("dirty pool should re-pack");
        assert_eq!(packed.len(), 1);
        // Translation lands in the last column of the packed matrix.
        assert_eq!(packed[0][3][0], 1.0);
        assert_eq!(packed[0][3][1], 2.0);
        assert_eq!(packed[0][3][2], 3.0);
        assert!(pool.pack().is_none());

        pool.update(
            0,
            InstancePatch {
                position: Some(Vector3::new(5.0, 0.0, 0.0)),
                ..Default::default()
            },
        );
        let packed = pool.pack().expect("patched pool should re-pack");
        assert_eq!(packed[0][3][0], 5.0);
    }

    #[test]
    fn update_ignores_invalid_index() {
        let mut pool = InstancePool::new(1);
        assert!(!pool.update(0, InstancePatch::default()));
        pool.add(Transform::new());
        pool.pack();
        assert!(!pool.is_dirty());
        assert!(pool.update(0, InstancePatch::default()));
        assert!(pool.is_dirty());
    }
}
