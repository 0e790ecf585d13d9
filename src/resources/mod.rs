//! Factories for meshes and textures.
//!
//! Geometry generation is split in two layers: pure CPU builders returning
//! vertex/index vectors, and thin GPU wrappers turning those into
//! [`crate::data_structures::mesh::MeshData`]. The split keeps geometry
//! testable without a device.

pub mod gltf;
pub mod mesh;
pub mod texture;

pub use mesh::{heightmap_terrain, plane, quad, subdivided_quad, triangle};
pub use texture::{load_binary, load_texture};
