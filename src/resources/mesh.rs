//! Mesh geometry builders.
//!
//! Primitive shapes, a bilinear subdivided quad and the heightmap terrain
//! factory. Each `*_geometry` function is pure CPU; the same-named wrapper
//! without the suffix uploads the result to the GPU.

use anyhow::{Result, bail};
use cgmath::{InnerSpace, Vector3, Zero};

use crate::data_structures::mesh::{MeshData, MeshVertex, TerrainVertex};

/// Normals shorter than this after quadrant accumulation are considered
/// degenerate and replaced with straight up.
const NORMAL_EPSILON: f32 = 0.001;

/// A unit triangle in the XY plane.
pub fn triangle_geometry() -> (Vec<MeshVertex>, Vec<u32>) {
    let vertices = vec![
        MeshVertex {
            position: [-0.5, -0.5, 0.0],
            tex_coords: [0.0, 1.0],
        },
        MeshVertex {
            position: [0.5, -0.5, 0.0],
            tex_coords: [1.0, 1.0],
        },
        MeshVertex {
            position: [0.0, 0.5, 0.0],
            tex_coords: [0.5, 0.0],
        },
    ];
    (vertices, vec![0, 1, 2])
}

pub fn triangle(device: &wgpu::Device) -> MeshData {
    let (vertices, indices) = triangle_geometry();
    MeshData::from_standard_vertices(device, &vertices, Some(&indices), "triangle")
}

/// A unit quad in the XY plane, two triangles.
pub fn quad_geometry() -> (Vec<MeshVertex>, Vec<u32>) {
    let vertices = vec![
        MeshVertex {
            position: [-0.5, 0.5, 0.0],
            tex_coords: [0.0, 0.0],
        },
        MeshVertex {
            position: [-0.5, -0.5, 0.0],
            tex_coords: [0.0, 1.0],
        },
        MeshVertex {
            position: [0.5, 0.5, 0.0],
            tex_coords: [1.0, 0.0],
        },
        MeshVertex {
            position: [0.5, -0.5, 0.0],
            tex_coords: [1.0, 1.0],
        },
    ];
    (vertices, vec![0, 1, 2, 2, 1, 3])
}

pub fn quad(device: &wgpu::Device) -> MeshData {
    let (vertices, indices) = quad_geometry();
    MeshData::from_standard_vertices(device, &vertices, Some(&indices), "quad")
}

/// A flat XZ plane of the given extent centered at the origin.
pub fn plane_geometry(extent: f32) -> (Vec<MeshVertex>, Vec<u32>) {
    let half = extent * 0.5;
    let vertices = vec![
        MeshVertex {
            position: [-half, 0.0, -half],
            tex_coords: [0.0, 0.0],
        },
        MeshVertex {
            position: [-half, 0.0, half],
            tex_coords: [0.0, 1.0],
        },
        MeshVertex {
            position: [half, 0.0, -half],
            tex_coords: [1.0, 0.0],
        },
        MeshVertex {
            position: [half, 0.0, half],
            tex_coords: [1.0, 1.0],
        },
    ];
    (vertices, vec![0, 1, 2, 2, 1, 3])
}

pub fn plane(device: &wgpu::Device, extent: f32) -> MeshData {
    let (vertices, indices) = plane_geometry(extent);
    MeshData::from_standard_vertices(device, &vertices, Some(&indices), "plane")
}

/// Bilinearly subdivide a quad given by four corner points.
///
/// Corners are expected in the order top-left, top-right, bottom-left,
/// bottom-right. Produces an (n+1)x(n+1) vertex grid and two triangles per
/// cell, wound (top-left, bottom-left, top-right) / (top-right, bottom-left,
/// bottom-right).
pub fn subdivided_quad_geometry(
    corners: &[[f32; 3]],
    subdivisions: u32,
) -> Result<(Vec<MeshVertex>, Vec<u32>)> {
    if corners.len() != 4 {
        bail!("subdivided quad needs exactly 4 corner points, got {}", corners.len());
    }
    if subdivisions == 0 {
        bail!("subdivided quad needs at least 1 subdivision");
    }

    let side = subdivisions + 1;
    let mut vertices = Vec::with_capacity((side * side) as usize);
    let [tl, tr, bl, br] = [
        Vector3::from(corners[0]),
        Vector3::from(corners[1]),
        Vector3::from(corners[2]),
        Vector3::from(corners[3]),
    ];

    for row in 0..side {
        let v = row as f32 / subdivisions as f32;
        let left = tl + (bl - tl) * v;
        let right = tr + (br - tr) * v;
        for col in 0..side {
            let u = col as f32 / subdivisions as f32;
            let position = left + (right - left) * u;
            vertices.push(MeshVertex {
                position: position.into(),
                tex_coords: [u, v],
            });
        }
    }

    let mut indices = Vec::with_capacity((subdivisions * subdivisions * 6) as usize);
    for row in 0..subdivisions {
        for col in 0..subdivisions {
            let top_left = row * side + col;
            let top_right = top_left + 1;
            let bottom_left = top_left + side;
            let bottom_right = bottom_left + 1;
            indices.extend_from_slice(&[
                top_left,
                bottom_left,
                top_right,
                top_right,
                bottom_left,
                bottom_right,
            ]);
        }
    }

    Ok((vertices, indices))
}

pub fn subdivided_quad(
    device: &wgpu::Device,
    corners: &[[f32; 3]],
    subdivisions: u32,
) -> Result<MeshData> {
    let (vertices, indices) = subdivided_quad_geometry(corners, subdivisions)?;
    Ok(MeshData::from_standard_vertices(
        device,
        &vertices,
        Some(&indices),
        "subdivided quad",
    ))
}

/// Build terrain geometry from a heightmap grid.
///
/// The width x height grid is mapped onto an `extent` x `extent` XZ footprint
/// centered at the origin, heights scaled by `height_scale` on +Y. UVs run
/// (0,0) at grid corner (0,0) to (1,1) at the opposite corner. Per-vertex
/// normals sum the cross products of the up-to-4 adjacent edge quadrants and
/// fall back to straight up when the sum is degenerate.
pub fn heightmap_geometry(
    heights: &[f32],
    width: u32,
    height: u32,
    height_scale: f32,
    extent: f32,
) -> Result<(Vec<TerrainVertex>, Vec<u32>)> {
    if width < 2 || height < 2 {
        bail!("heightmap grid must be at least 2x2, got {}x{}", width, height);
    }
    let expected = (width * height) as usize;
    if heights.len() != expected {
        bail!(
            "heightmap length {} does not match {}x{} = {}",
            heights.len(),
            width,
            height,
            expected
        );
    }

    let position = |row: u32, col: u32| -> Vector3<f32> {
        let x = (col as f32 / (width - 1) as f32 - 0.5) * extent;
        let z = (row as f32 / (height - 1) as f32 - 0.5) * extent;
        let y = heights[(row * width + col) as usize] * height_scale;
        Vector3::new(x, y, z)
    };

    let mut vertices = Vec::with_capacity(expected);
    for row in 0..height {
        for col in 0..width {
            let p = position(row, col);

            // Edge vectors to the four grid neighbors, where present.
            let left = (col > 0).then(|| position(row, col - 1) - p);
            let right = (col + 1 < width).then(|| position(row, col + 1) - p);
            let up = (row > 0).then(|| position(row - 1, col) - p);
            let down = (row + 1 < height).then(|| position(row + 1, col) - p);

            let mut normal = Vector3::zero();
            if let (Some(right), Some(up)) = (right, up) {
                normal += right.cross(up);
            }
            if let (Some(up), Some(left)) = (up, left) {
                normal += up.cross(left);
            }
            if let (Some(left), Some(down)) = (left, down) {
                normal += left.cross(down);
            }
            if let (Some(down), Some(right)) = (down, right) {
                normal += down.cross(right);
            }
            let normal = if normal.magnitude() < NORMAL_EPSILON {
                Vector3::unit_y()
            } else {
                normal.normalize()
            };

            vertices.push(TerrainVertex {
                position: p.into(),
                normal: normal.into(),
                tex_coords: [
                    col as f32 / (width - 1) as f32,
                    row as f32 / (height - 1) as f32,
                ],
            });
        }
    }

    let mut indices = Vec::with_capacity(((width - 1) * (height - 1) * 6) as usize);
    for row in 0..height - 1 {
        for col in 0..width - 1 {
            let top_left = row * width + col;
            let top_right = top_left + 1;
            let bottom_left = top_left + width;
            let bottom_right = bottom_left + 1;
            indices.extend_from_slice(&[
                top_left,
                bottom_left,
                top_right,
                top_right,
                bottom_left,
                bottom_right,
            ]);
        }
    }

    Ok((vertices, indices))
}

pub fn heightmap_terrain(
    device: &wgpu::Device,
    heights: &[f32],
    width: u32,
    height: u32,
    height_scale: f32,
    extent: f32,
) -> Result<MeshData> {
    let (vertices, indices) = heightmap_geometry(heights, width, height, height_scale, extent)?;
    Ok(MeshData::from_terrain_vertices(
        device,
        &vertices,
        Some(&indices),
        "heightmap terrain",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT_CORNERS: [[f32; 3]; 4] = [
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
    ];

    #[test]
    fn subdivided_quad_counts() {
        let (vertices, indices) = subdivided_quad_geometry(&UNIT_CORNERS, 1).unwrap();
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
        assert_eq!(indices, vec![0, 2, 1, 1, 2, 3]);

        let (vertices, indices) = subdivided_quad_geometry(&UNIT_CORNERS, 4).unwrap();
        assert_eq!(vertices.len(), 25);
        assert_eq!(indices.len(), 96);
    }

    #[test]
    fn subdivided_quad_interpolates_corners() {
        let (vertices, _) = subdivided_quad_geometry(&UNIT_CORNERS, 2).unwrap();
        // Grid center sits at the bilinear midpoint.
        assert_eq!(vertices[4].position, [0.5, 0.5, 0.0]);
        assert_eq!(vertices[4].tex_coords, [0.5, 0.5]);
    }

    #[test]
    fn subdivided_quad_rejects_wrong_corner_count() {
        let err = subdivided_quad_geometry(&UNIT_CORNERS[..3], 1).unwrap_err();
        assert!(err.to_string().contains("4 corner points"));
    }

    #[test]
    fn heightmap_counts_and_uvs() {
        let heights = vec![0.0; 12];
        let (vertices, indices) = heightmap_geometry(&heights, 4, 3, 1.0, 10.0).unwrap();
        assert_eq!(vertices.len(), 12);
        assert_eq!(indices.len(), 6 * 3 * 2);
        assert_eq!(vertices[0].tex_coords, [0.0, 0.0]);
        assert_eq!(vertices[11].tex_coords, [1.0, 1.0]);
    }

    #[test]
    fn heightmap_footprint_is_centered() {
        let heights = vec![0.25; 9];
        let (vertices, _) = heightmap_geometry(&heights, 3, 3, 2.0, 8.0).unwrap();
        assert_eq!(vertices[0].position, [-4.0, 0.5, -4.0]);
        assert_eq!(vertices[8].position, [4.0, 0.5, 4.0]);
        assert_eq!(vertices[4].position, [0.0, 0.5, 0.0]);
    }

    #[test]
    fn flat_heightmap_normals_point_up() {
        let heights = vec![0.5; 16];
        let (vertices, _) = heightmap_geometry(&heights, 4, 4, 3.0, 6.0).unwrap();
        for vertex in &vertices {
            assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn heightmap_rejects_length_mismatch() {
        let err = heightmap_geometry(&[0.0; 5], 4, 3, 1.0, 10.0).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
