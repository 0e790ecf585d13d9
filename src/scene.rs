//! Scene: object ownership, per-frame updates and render snapshots.
//!
//! A [`Scene`] owns every renderable object in an id-keyed table plus the
//! instanced batches and the camera. Each frame the application calls
//! [`update`](Scene::update) to advance object hooks and the camera, then
//! [`render_data`](Scene::render_data) for the snapshot handed to the
//! renderer.

use std::collections::HashMap;

use cgmath::Matrix4;
use instant::{Duration, Instant};

use crate::camera::{Camera, CameraController};
use crate::data_structures::{instanced::InstancedMesh, object::RenderableObject};

/// Ephemeral per-frame snapshot: the view matrix, the currently visible
/// objects in stable enumeration order, and the instanced batches.
///
/// The object order is load-bearing: the renderer uploads model matrices in
/// exactly this order and derives each draw's instance offset from the list
/// position.
pub struct RenderData<'a> {
    pub view: Matrix4<f32>,
    pub objects: Vec<&'a RenderableObject>,
    pub instanced: Vec<&'a mut InstancedMesh>,
}

/// Owns objects, instanced batches and the camera.
pub struct Scene {
    objects: HashMap<u32, RenderableObject>,
    // Insertion order of object ids; drives snapshot enumeration.
    order: Vec<u32>,
    instanced: Vec<InstancedMesh>,
    pub camera: Camera,
    controller: Option<Box<dyn CameraController>>,
    last_update: Option<Instant>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            objects: HashMap::new(),
            order: Vec::new(),
            instanced: Vec::new(),
            camera,
            controller: None,
            last_update: None,
        }
    }

    pub fn set_controller(&mut self, controller: Box<dyn CameraController>) {
        self.controller = Some(controller);
    }

    /// Take ownership of an object; returns its id.
    pub fn add(&mut self, object: RenderableObject) -> u32 {
        let id = object.id();
        self.order.push(id);
        self.objects.insert(id, object);
        id
    }

    /// Remove an object from the scene without destroying its GPU resources.
    pub fn remove(&mut self, object: &RenderableObject) -> Option<RenderableObject> {
        self.remove_by_id(object.id())
    }

    /// Remove by id without destroying GPU resources.
    pub fn remove_by_id(&mut self, id: u32) -> Option<RenderableObject> {
        self.order.retain(|entry| *entry != id);
        self.objects.remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<&RenderableObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut RenderableObject> {
        self.objects.get_mut(&id)
    }

    pub fn has(&self, id: u32) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn add_instanced(&mut self, batch: InstancedMesh) -> usize {
        self.instanced.push(batch);
        self.instanced.len() - 1
    }

    pub fn instanced_mut(&mut self, index: usize) -> Option<&mut InstancedMesh> {
        self.instanced.get_mut(index)
    }

    /// Advance the scene by the wall-clock time since the previous call
    /// (zero on the very first call): run every object's update hook, then
    /// the camera controller. Returns the frame delta.
    pub fn update(&mut self) -> Duration {
        let now = Instant::now();
        let dt = self
            .last_update
            .map(|last| now - last)
            .unwrap_or(Duration::ZERO);
        self.last_update = Some(now);

        let dt_secs = dt.as_secs_f32();
        for id in &self.order {
            if let Some(object) = self.objects.get_mut(id) {
                object.update(dt_secs);
            }
        }

        if let Some(controller) = &mut self.controller {
            controller.update(&mut self.camera, dt);
        }

        dt
    }

    /// Snapshot the view matrix and the visible objects for the renderer.
    ///
    /// Invisible objects are excluded here, not skipped at draw time, so
    /// they cost the renderer nothing. Enumeration follows insertion order.
    pub fn render_data(&mut self) -> RenderData<'_> {
        let view = self.camera.view_matrix();
        let objects = {
            let table = &self.objects;
            self.order
                .iter()
                .filter_map(|id| table.get(id))
                .filter(|object| object.visible)
                .collect()
        };
        let instanced = self.instanced.iter_mut().collect();

        RenderData {
            view,
            objects,
            instanced,
        }
    }

    /// Destroy every object's and batch's GPU resources, then empty the
    /// scene. A bulk teardown, not a mere dereference.
    pub fn clear(&mut self) {
        for object in self.objects.values() {
            object.destroy();
        }
        self.objects.clear();
        self.order.clear();
        for batch in &self.instanced {
            batch.destroy();
        }
        self.instanced.clear();
    }
}
