//! Renderable scene objects.
//!
//! A [`RenderableObject`] ties a mesh to a material and a transform, carries
//! a visibility flag and a render-type tag, and optionally a per-frame update
//! hook. Objects don't own their mesh or material in the GPU-lifetime sense;
//! several objects can share the same `Arc`ed resources and the explicit
//! destroy call releases them.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::data_structures::{material::Material, mesh::MeshData};
use crate::transform::Transform;

static NEXT_OBJECT_ID: AtomicU32 = AtomicU32::new(1);

/// Which pipeline an object is drawn with. Drives the renderer's draw
/// batching; a closed set, new render styles get a new variant here plus a
/// pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenderType {
    Standard,
    Terrain,
    Billboard,
}

/// Per-frame behavior hook. May mutate the object's transform, visibility or
/// material reference; `dt` is the frame delta in seconds.
pub type UpdateHook = Box<dyn FnMut(&mut RenderableObject, f32)>;

/// A single drawable object in a scene.
///
/// Ids come from a process-wide monotonic counter and are never reused, even
/// after the object is destroyed.
pub struct RenderableObject {
    id: u32,
    pub mesh: Arc<MeshData>,
    pub material: Arc<Material>,
    pub transform: Transform,
    pub visible: bool,
    pub render_type: RenderType,
    update_hook: Option<UpdateHook>,
}

impl RenderableObject {
    pub fn new(mesh: Arc<MeshData>, material: Arc<Material>, render_type: RenderType) -> Self {
        Self {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            mesh,
            material,
            transform: Transform::new(),
            visible: true,
            render_type,
            update_hook: None,
        }
    }

    pub fn with_update<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut RenderableObject, f32) + 'static,
    {
        self.update_hook = Some(Box::new(hook));
        self
    }

    pub fn set_update_hook(&mut self, hook: Option<UpdateHook>) {
        self.update_hook = hook;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Run the per-frame hook, if any. Called once per frame by the scene.
    pub fn update(&mut self, dt: f32) {
        // The hook borrows the whole object, so it is taken out for the call
        // and restored afterwards unless the hook replaced it.
        if let Some(mut hook) = self.update_hook.take() {
            hook(self, dt);
            if self.update_hook.is_none() {
                self.update_hook = Some(hook);
            }
        }
    }

    /// Bind the material and draw the mesh.
    ///
    /// `instance_offset` is passed as the draw's first instance and indexes
    /// this object's model matrix in the renderer's shared object buffer.
    pub fn bind_and_draw(&self, render_pass: &mut wgpu::RenderPass<'_>, instance_offset: u32) {
        render_pass.set_bind_group(1, &self.material.bind_group, &[]);
        self.draw_geometry(render_pass, instance_offset);
    }

    /// Issue the draw calls without touching material bindings. Used by the
    /// picking pass, whose pipelines bind no material.
    pub fn draw_geometry(&self, render_pass: &mut wgpu::RenderPass<'_>, instance_offset: u32) {
        render_pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        match &self.mesh.index_buffer {
            Some(index_buffer) => {
                render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(
                    0..self.mesh.num_indices,
                    0,
                    instance_offset..instance_offset + 1,
                );
            }
            None => {
                render_pass.draw(0..self.mesh.num_vertices, instance_offset..instance_offset + 1);
            }
        }
    }

    /// Release the mesh's GPU buffers. Terminal: the object must not be drawn
    /// or updated afterwards.
    pub fn destroy(&self) {
        self.mesh.destroy();
    }
}

impl Debug for RenderableObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderableObject")
            .field("id", &self.id)
            .field("visible", &self.visible)
            .field("render_type", &self.render_type)
            .field("has_update_hook", &self.update_hook.is_some())
            .finish()
    }
}
