//! Imported geometry from glTF documents.
//!
//! Only the geometry is consumed here: positions, texture coordinates and
//! indices per primitive, re-packed into the engine's standard vertex layout.
//! Materials, animations and node hierarchies in the document are ignored;
//! texturing imported meshes is the caller's business.

use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::data_structures::mesh::{MeshData, MeshVertex};
use crate::resources::texture::load_binary;

/// Load every mesh primitive of a glTF file as a standard-layout mesh.
///
/// External `.bin` buffers referenced by URI are fetched through the same
/// asset source as the document itself.
pub async fn load_gltf_meshes(file_name: &str, device: &wgpu::Device) -> Result<Vec<MeshData>> {
    let bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)?;

    let mut buffer_data: HashMap<usize, Vec<u8>> = HashMap::new();
    let mut uri_fetches = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                if let Some(blob) = gltf.blob.as_deref() {
                    buffer_data.insert(buffer.index(), blob.to_vec());
                }
            }
            gltf::buffer::Source::Uri(uri) => {
                let index = buffer.index();
                uri_fetches.push(async move { (index, load_binary(uri).await) });
            }
        }
    }
    // External .bin buffers are independent files and fetch concurrently.
    for (index, bytes) in futures::future::join_all(uri_fetches).await {
        buffer_data.insert(index, bytes?);
    }

    meshes_from_document(&gltf.document, &buffer_data, device, file_name)
}

fn meshes_from_document(
    document: &gltf::Document,
    buffer_data: &HashMap<usize, Vec<u8>>,
    device: &wgpu::Device,
    file_name: &str,
) -> Result<Vec<MeshData>> {
    let mut meshes = Vec::new();

    for mesh in document.meshes() {
        let mesh_name = mesh.name().unwrap_or("unnamed mesh");
        for (primitive_index, primitive) in mesh.primitives().enumerate() {
            let reader = primitive
                .reader(|buffer| buffer_data.get(&buffer.index()).map(|data| data.as_slice()));

            let Some(positions) = reader.read_positions() else {
                bail!(
                    "{}: mesh '{}' primitive {} has no position data",
                    file_name,
                    mesh_name,
                    primitive_index
                );
            };
            let mut vertices: Vec<MeshVertex> = positions
                .map(|position| MeshVertex {
                    position,
                    // Overwritten below when the primitive carries UVs.
                    tex_coords: [0.0, 0.0],
                })
                .collect();

            if let Some(tex_coords) = reader.read_tex_coords(0).map(|uvs| uvs.into_f32()) {
                for (vertex, uv) in vertices.iter_mut().zip(tex_coords) {
                    vertex.tex_coords = uv;
                }
            }

            let indices: Option<Vec<u32>> =
                reader.read_indices().map(|indices| indices.into_u32().collect());

            meshes.push(MeshData::from_standard_vertices(
                device,
                &vertices,
                indices.as_deref(),
                &format!("{} {}", file_name, mesh_name),
            ));
        }
    }

    Ok(meshes)
}
