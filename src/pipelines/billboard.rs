use crate::data_structures::{
    mesh::{MeshVertex, Vertex},
    texture::Texture,
};
use crate::pipelines::mk_render_pipeline;
use crate::renderer::BindGroupLayouts;

/// Billboards use the standard vertex layout and material but strip the
/// rotational part of the model-view so the quad always faces the camera.
/// Alpha blending and no culling, since billboard textures usually carry
/// transparency.
pub fn mk_billboard_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    layouts: &BindGroupLayouts,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Billboard Pipeline Layout"),
        bind_group_layouts: &[&layouts.frame, &layouts.standard_material],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Billboard Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("billboard.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(Texture::DEPTH_FORMAT),
        None,
        &[MeshVertex::desc()],
        shader,
    )
}
