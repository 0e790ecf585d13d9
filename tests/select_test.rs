mod common;

use solscape::resources::mesh::heightmap_terrain;
use solscape::select::VertexSelector;

use common::request_test_device;

/// Quad covering x in [0.25, 2], all z, of a 3x3 grid spanning -1..1.
const RIGHT_COLUMN_QUAD: [[f32; 2]; 4] = [[0.25, -2.0], [2.0, -2.0], [2.0, 2.0], [0.25, 2.0]];

#[tokio::test(flavor = "current_thread")]
async fn selection_collects_vertices_inside_quad() {
    let Some((device, queue)) = request_test_device().await else {
        return;
    };
    let selector = VertexSelector::new(&device);

    // 3x3 grid over a 2.0 extent: vertex x/z coordinates are -1, 0, 1.
    let heights = vec![0.5; 9];
    let terrain = heightmap_terrain(&device, &heights, 3, 3, 1.0, 2.0).unwrap();

    let selected = selector
        .select_in_quad(&device, &queue, &terrain, RIGHT_COLUMN_QUAD)
        .await
        .unwrap()
        .expect("the x = 1 column lies inside the quad");

    assert_eq!(selected.len(), 3);
    for position in &selected {
        assert_eq!(position[0], 1.0);
        assert_eq!(position[1], 0.5);
    }
    let mut zs: Vec<f32> = selected.iter().map(|position| position[2]).collect();
    zs.sort_by(f32::total_cmp);
    assert_eq!(zs, vec![-1.0, 0.0, 1.0]);

    terrain.destroy();
}

#[tokio::test(flavor = "current_thread")]
async fn selection_count_is_idempotent() {
    let Some((device, queue)) = request_test_device().await else {
        return;
    };
    let selector = VertexSelector::new(&device);

    let heights = vec![0.0; 16];
    let terrain = heightmap_terrain(&device, &heights, 4, 4, 1.0, 6.0).unwrap();

    let first = selector
        .select_in_quad(&device, &queue, &terrain, RIGHT_COLUMN_QUAD)
        .await
        .unwrap();
    let second = selector
        .select_in_quad(&device, &queue, &terrain, RIGHT_COLUMN_QUAD)
        .await
        .unwrap();
    assert_eq!(
        first.as_ref().map(Vec::len),
        second.as_ref().map(Vec::len)
    );

    terrain.destroy();
}

#[tokio::test(flavor = "current_thread")]
async fn selection_misses_return_no_result() {
    let Some((device, queue)) = request_test_device().await else {
        return;
    };
    let selector = VertexSelector::new(&device);

    let heights = vec![0.0; 9];
    let terrain = heightmap_terrain(&device, &heights, 3, 3, 1.0, 2.0).unwrap();

    // A quad entirely outside the terrain footprint selects nothing.
    let far_away = [[10.0, 10.0], [12.0, 10.0], [12.0, 12.0], [10.0, 12.0]];
    let selected = selector
        .select_in_quad(&device, &queue, &terrain, far_away)
        .await
        .unwrap();
    assert!(selected.is_none());

    terrain.destroy();
}

#[tokio::test(flavor = "current_thread")]
async fn selection_rejects_standard_layout_meshes() {
    let Some((device, queue)) = request_test_device().await else {
        return;
    };
    let selector = VertexSelector::new(&device);
    let mesh = solscape::resources::mesh::quad(&device);

    let result = selector
        .select_in_quad(&device, &queue, &mesh, RIGHT_COLUMN_QUAD)
        .await;
    assert!(result.is_err());

    mesh.destroy();
}
