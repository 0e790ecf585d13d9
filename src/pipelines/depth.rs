use crate::data_structures::{
    mesh::{MeshVertex, TerrainVertex, Vertex},
    texture::Texture,
};
use crate::renderer::BindGroupLayouts;

/// Depth-only pipelines for the pre-pass, one per vertex layout.
///
/// Both share one shader: the vertex stage reads only the position attribute,
/// so the layouts differ purely in stride.
pub fn mk_depth_pipelines(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
) -> (wgpu::RenderPipeline, wgpu::RenderPipeline) {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Depth Pre-Pass Pipeline Layout"),
        bind_group_layouts: &[&layouts.frame],
        push_constant_ranges: &[],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Depth Pre-Pass Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("depth.wgsl").into()),
    });

    let mk = |vertex_layout: wgpu::VertexBufferLayout| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some("Depth Pre-Pass Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Texture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        })
    };

    (mk(MeshVertex::desc()), mk(TerrainVertex::desc()))
}
