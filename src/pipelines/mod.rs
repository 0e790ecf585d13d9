//! Render and compute pipeline construction.
//!
//! One module per pipeline, each with its WGSL source next to it. The shader
//! interfaces (bind group indices, buffer layouts, vertex formats) are part
//! of the wire contract with [`crate::renderer`]; changing a binding here
//! requires the matching layout change there.

pub mod billboard;
pub mod depth;
pub mod pick;
pub mod select;
pub mod standard;
pub mod terrain;

use crate::renderer::BindGroupLayouts;

/// Every render pipeline the frame passes switch between, created once at
/// renderer initialization.
#[derive(Debug)]
pub struct Pipelines {
    pub standard: wgpu::RenderPipeline,
    pub terrain: wgpu::RenderPipeline,
    pub billboard: wgpu::RenderPipeline,
    pub depth_standard: wgpu::RenderPipeline,
    pub depth_terrain: wgpu::RenderPipeline,
    pub pick_standard: wgpu::RenderPipeline,
    pub pick_terrain: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        layouts: &BindGroupLayouts,
    ) -> Self {
        let (depth_standard, depth_terrain) = depth::mk_depth_pipelines(device, layouts);
        let (pick_standard, pick_terrain) = pick::mk_pick_pipelines(device, layouts);
        Self {
            standard: standard::mk_standard_pipeline(device, config, layouts),
            terrain: terrain::mk_terrain_pipeline(device, config, layouts),
            billboard: billboard::mk_billboard_pipeline(device, config, layouts),
            depth_standard,
            depth_terrain,
            pick_standard,
            pick_terrain,
        }
    }
}

/// Shared fixed-function state for the color pipelines.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    cull_mode: Option<wgpu::Face>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
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
}
