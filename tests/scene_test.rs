mod common;

use std::sync::Arc;

use solscape::data_structures::{
    material::Material,
    mesh::{MeshData, VertexLayout},
    object::{RenderType, RenderableObject},
    texture::Texture,
};
use solscape::renderer::BindGroupLayouts;
use solscape::resources::mesh::{heightmap_terrain, quad};
use solscape::scene::Scene;
use solscape::camera::Camera;

use common::request_test_device;

fn test_scene() -> Scene {
    Scene::new(Camera::new(
        (0.0, 5.0, 10.0),
        cgmath::Deg(-90.0),
        cgmath::Deg(-30.0),
    ))
}

fn solid_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layouts: &BindGroupLayouts,
) -> Arc<Material> {
    let texture = Texture::from_color(device, queue, [200, 40, 40, 255], "test color");
    Arc::new(Material::new(device, &layouts.standard_material, texture))
}

#[tokio::test(flavor = "current_thread")]
async fn mesh_round_trip_counts() {
    let Some((device, _queue)) = request_test_device().await else {
        return;
    };

    // 2 standard-layout vertices from 10 raw floats.
    let standard =
        MeshData::from_raw_arrays(&device, &[0.0; 10], Some(&[0, 1, 0]), VertexLayout::Standard, "s")
            .unwrap();
    assert_eq!(standard.num_vertices, 2);
    assert_eq!(standard.num_indices, 3);
    assert!(standard.is_indexed());

    // 3 terrain-layout vertices from 24 raw floats, non-indexed.
    let terrain =
        MeshData::from_raw_arrays(&device, &[0.0; 24], None, VertexLayout::Terrain, "t").unwrap();
    assert_eq!(terrain.num_vertices, 3);
    assert_eq!(terrain.num_indices, 0);
    assert!(!terrain.is_indexed());

    // A 4x3 heightmap grid: W*H vertices, 6*(W-1)*(H-1) indices.
    let heights = vec![0.1; 12];
    let grid = heightmap_terrain(&device, &heights, 4, 3, 1.0, 10.0).unwrap();
    assert_eq!(grid.num_vertices, 12);
    assert_eq!(grid.num_indices, 36);

    let err = MeshData::from_raw_arrays(&device, &[0.0; 7], None, VertexLayout::Standard, "bad");
    assert!(err.is_err());

    standard.destroy();
    terrain.destroy();
    grid.destroy();
}

#[tokio::test(flavor = "current_thread")]
async fn render_data_filters_invisible_objects_in_insertion_order() {
    let Some((device, queue)) = request_test_device().await else {
        return;
    };
    let layouts = BindGroupLayouts::new(&device);
    let material = solid_material(&device, &queue, &layouts);
    let mesh = Arc::new(quad(&device));

    let mut scene = test_scene();
    let a = scene.add(RenderableObject::new(
        mesh.clone(),
        material.clone(),
        RenderType::Standard,
    ));
    let b = scene.add(RenderableObject::new(
        mesh.clone(),
        material.clone(),
        RenderType::Billboard,
    ));
    let c = scene.add(RenderableObject::new(
        mesh.clone(),
        material.clone(),
        RenderType::Standard,
    ));
    scene.get_mut(b).unwrap().visible = false;

    assert!(scene.has(b));
    let data = scene.render_data();
    let ids: Vec<u32> = data.objects.iter().map(|object| object.id()).collect();
    assert_eq!(ids, vec![a, c]);

    // Toggling visibility back restores the full insertion order.
    scene.get_mut(b).unwrap().visible = true;
    let data = scene.render_data();
    let ids: Vec<u32> = data.objects.iter().map(|object| object.id()).collect();
    assert_eq!(ids, vec![a, b, c]);

    scene.clear();
    assert!(scene.is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn update_hook_runs_once_per_frame() {
    let Some((device, queue)) = request_test_device().await else {
        return;
    };
    let layouts = BindGroupLayouts::new(&device);
    let material = solid_material(&device, &queue, &layouts);
    let mesh = Arc::new(quad(&device));

    let mut scene = test_scene();
    let id = scene.add(
        RenderableObject::new(mesh, material, RenderType::Standard).with_update(
            |object, _dt| {
                object
                    .transform
                    .translate(cgmath::Vector3::new(1.0, 0.0, 0.0));
            },
        ),
    );

    scene.update();
    scene.update();
    let position = scene.get(id).unwrap().transform.position();
    assert_eq!(position.x, 2.0);
}

#[tokio::test(flavor = "current_thread")]
async fn instanced_mesh_respects_capacity_and_uploads_live_prefix() {
    let Some((device, queue)) = request_test_device().await else {
        return;
    };
    let layouts = BindGroupLayouts::new(&device);
    let material = solid_material(&device, &queue, &layouts);
    let mesh = Arc::new(quad(&device));

    let frame_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("test frame uniforms"),
        size: 128,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut batch = solscape::data_structures::instanced::InstancedMesh::new(
        &device,
        &layouts.frame,
        &frame_uniforms,
        vec![(mesh, material)],
        2,
    );
    assert_eq!(batch.add_instance(Default::default()), Some(0));
    assert_eq!(batch.add_instance(Default::default()), Some(1));
    assert_eq!(batch.add_instance(Default::default()), None);
    assert_eq!(batch.instance_count(), 2);

    batch.update_buffer(&queue);
    assert!(batch.remove_instance(0));
    assert_eq!(batch.instance_count(), 1);
    batch.update_buffer(&queue);
}
