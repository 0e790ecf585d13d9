//! solscape
//!
//! A wgpu-based engine for visualizing terrain and solar-irradiance (GHI)
//! data. The crate exposes a small surface for constructing GPU meshes and
//! materials, composing them into a scene and rendering the scene with a
//! fixed multi-pass pipeline: depth pre-pass, main color pass, and the
//! auxiliary world-position picking and compute vertex-selection passes.
//!
//! High-level modules
//! - `camera`: camera type, controller seam and the view/projection uniform
//! - `transform`: position/rotation/scale with cached model matrices
//! - `data_structures`: engine data models (meshes, materials, textures,
//!   objects, instanced batches)
//! - `scene`: object ownership, per-frame updates and render snapshots
//! - `renderer`: central GPU state; owns device, pipelines and frame passes
//! - `pick`: world-position picking with async read-back
//! - `select`: two-phase compute selection of terrain vertices
//! - `pipelines`: render/compute pipeline definitions and their shaders
//! - `resources`: mesh factories and texture/document loading
//!

pub mod camera;
pub mod data_structures;
pub mod pick;
pub mod pipelines;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod select;
pub mod transform;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Set up the `log` backend: `env_logger` on native, the browser console on
/// wasm. Call once before constructing a [`renderer::Renderer`]; capacity
/// warnings and GPU setup messages go through this logger.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }
}

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
pub use winit::dpi::PhysicalPosition;
