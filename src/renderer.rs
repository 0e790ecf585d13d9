//! The renderer: GPU device ownership, pipelines and the frame passes.
//!
//! [`Renderer::new`] runs the strict one-time setup sequence (device and
//! surface, bind group layouts, shared buffers, depth resources, pipelines,
//! the frame bind group, picking and compute resources). Per frame,
//! [`Renderer::render`] consumes a scene snapshot and issues the main color
//! pass; the depth pre-pass, picking and vertex selection are auxiliary
//! passes with their own submissions in [`crate::pick`] and [`crate::select`].

use std::sync::Arc;

use anyhow::{Context as _, Result, ensure};
use cgmath::Deg;
use instant::Instant;
use winit::window::Window;

use crate::camera::{FrameUniform, OPENGL_TO_WGPU_MATRIX};
use crate::data_structures::{
    instanced::InstancedMesh,
    material::Material,
    mesh::MeshData,
    object::{RenderType, RenderableObject},
    texture::Texture,
};
use crate::pick::PickTarget;
use crate::pipelines::Pipelines;
use crate::scene::RenderData;
use crate::select::VertexSelector;

/// Slot budget of the shared object-matrix buffer. A frame with more visible
/// objects than this fails its render call instead of overflowing the buffer.
pub const MAX_OBJECTS: usize = 1024;

const FOV_Y_DEG: f32 = 45.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 500.0;

/// The bind group layouts making up the shader wire contract.
///
/// - `frame`: binding 0 the 128-byte view/projection uniform, binding 1 the
///   object model-matrix storage buffer
/// - `standard_material`: texture + sampler
/// - `terrain_material`: base texture + sampler, GHI texture + sampler and
///   the selection-quad uniform
#[derive(Debug)]
pub struct BindGroupLayouts {
    pub frame: wgpu::BindGroupLayout,
    pub standard_material: wgpu::BindGroupLayout,
    pub terrain_material: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
            label: Some("frame_bind_group_layout"),
        });

        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        };
        let sampler_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let standard_material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[texture_entry(0), sampler_entry(1)],
            label: Some("standard_material_bind_group_layout"),
        });

        let terrain_material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                texture_entry(2),
                sampler_entry(3),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
            label: Some("terrain_material_bind_group_layout"),
        });

        Self {
            frame,
            standard_material,
            terrain_material,
        }
    }
}

/// CPU mirror of the 48-byte selection-quad uniform: four packed 2-D points,
/// an enabled flag, the renderer-driven time value and padding.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SelectionQuadUniform {
    pub points: [[f32; 4]; 2],
    pub enabled: f32,
    pub time: f32,
    pub _padding: [f32; 2],
}

#[derive(Debug)]
pub struct Renderer {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub layouts: BindGroupLayouts,
    pub pipelines: Pipelines,
    pub clear_color: wgpu::Color,
    pub(crate) depth_texture: Texture,
    pub(crate) frame_uniforms: wgpu::Buffer,
    pub(crate) object_matrices: wgpu::Buffer,
    pub(crate) frame_bind_group: wgpu::BindGroup,
    pub(crate) selection_quad_buffer: wgpu::Buffer,
    selection_quad: SelectionQuadUniform,
    pub(crate) pick_target: PickTarget,
    pub(crate) selector: VertexSelector,
    started: Instant,
}

impl Renderer {
    /// One-time GPU setup. Failing to acquire an adapter or device is fatal
    /// for the renderer; there is no software fallback.
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create the render surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter found")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to acquire a GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let layouts = BindGroupLayouts::new(&device);

        let frame_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let object_matrices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Matrix Buffer"),
            size: (MAX_OBJECTS * 64) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let selection_quad = SelectionQuadUniform {
            points: [[0.0; 4]; 2],
            enabled: 0.0,
            time: 0.0,
            _padding: [0.0; 2],
        };
        let selection_quad_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Selection Quad Buffer"),
            size: std::mem::size_of::<SelectionQuadUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&selection_quad_buffer, 0, bytemuck::bytes_of(&selection_quad));

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        let pipelines = Pipelines::new(&device, &config, &layouts);

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.frame,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: object_matrices.as_entire_binding(),
                },
            ],
            label: Some("frame_bind_group"),
        });

        let pick_target = PickTarget::new(&device, config.width, config.height);
        let selector = VertexSelector::new(&device);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            layouts,
            pipelines,
            clear_color: wgpu::Color {
                r: 0.06,
                g: 0.08,
                b: 0.12,
                a: 1.0,
            },
            depth_texture,
            frame_uniforms,
            object_matrices,
            frame_bind_group,
            selection_quad_buffer,
            selection_quad,
            pick_target,
            selector,
            started: Instant::now(),
        })
    }

    /// Recreate every surface-size-dependent resource. Must be called when
    /// the output surface changes size; zero-sized requests are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.pick_target = PickTarget::new(&self.device, width, height);
    }

    /// Enable the selection overlay quad rendered onto terrain.
    pub fn set_selection_quad(&mut self, points: [[f32; 2]; 4]) {
        self.selection_quad.points = pack_quad(points);
        self.selection_quad.enabled = 1.0;
        self.queue.write_buffer(
            &self.selection_quad_buffer,
            0,
            bytemuck::bytes_of(&self.selection_quad),
        );
    }

    pub fn clear_selection_quad(&mut self) {
        self.selection_quad.enabled = 0.0;
        self.queue.write_buffer(
            &self.selection_quad_buffer,
            0,
            bytemuck::bytes_of(&self.selection_quad),
        );
    }

    /// The uniform buffer terrain materials bind at slot 4; see
    /// [`crate::data_structures::material::Material::new_terrain`].
    pub fn selection_quad_buffer(&self) -> &wgpu::Buffer {
        &self.selection_quad_buffer
    }

    /// Create an instanced batch whose bind group mirrors the frame layout
    /// with its own instance buffer.
    pub fn create_instanced_mesh(
        &self,
        submeshes: Vec<(Arc<MeshData>, Arc<Material>)>,
        max_instances: usize,
    ) -> InstancedMesh {
        InstancedMesh::new(
            &self.device,
            &self.layouts.frame,
            &self.frame_uniforms,
            submeshes,
            max_instances,
        )
    }

    /// The projection is derived from the current surface dimensions on
    /// every call; the canvas may have been resized between frames.
    fn projection_matrix(&self) -> cgmath::Matrix4<f32> {
        let aspect = self.config.width as f32 / self.config.height as f32;
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(FOV_Y_DEG), aspect, Z_NEAR, Z_FAR)
    }

    /// Upload the frame's view/projection matrices and every object's model
    /// matrix, in snapshot enumeration order. That order is what the draw
    /// calls' instance offsets index, so it must not change within a frame.
    pub(crate) fn upload_frame_data(&self, data: &RenderData<'_>) -> Result<()> {
        ensure!(
            data.objects.len() <= MAX_OBJECTS,
            "frame has {} objects but the object buffer holds {}",
            data.objects.len(),
            MAX_OBJECTS
        );

        let uniform = FrameUniform {
            // View at byte offset 0, projection at byte offset 64.
            view: data.view.into(),
            proj: self.projection_matrix().into(),
        };
        self.queue
            .write_buffer(&self.frame_uniforms, 0, bytemuck::bytes_of(&uniform));

        let matrices: Vec<[[f32; 4]; 4]> = data
            .objects
            .iter()
            .map(|object| object.transform.model_matrix().into())
            .collect();
        if !matrices.is_empty() {
            self.queue
                .write_buffer(&self.object_matrices, 0, bytemuck::cast_slice(&matrices));
        }

        Ok(())
    }

    /// Render one frame: uniforms and matrices up, then the main color pass
    /// batched by render type, then the instanced batches. Exactly one
    /// command buffer is submitted.
    pub fn render(&mut self, data: &mut RenderData<'_>) -> Result<()> {
        self.selection_quad.time = self.started.elapsed().as_secs_f32();
        if self.selection_quad.enabled > 0.5 {
            self.queue.write_buffer(
                &self.selection_quad_buffer,
                0,
                bytemuck::bytes_of(&self.selection_quad),
            );
        }

        self.upload_frame_data(data)?;
        for batch in data.instanced.iter_mut() {
            batch.update_buffer(&self.queue);
        }

        let output = self
            .surface
            .get_current_texture()
            .context("failed to acquire the next surface texture")?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

            // One pipeline switch per render type; the object's position in
            // the snapshot is its index into the object-matrix buffer.
            let (standard, terrain, billboard) = partition_by_type(&data.objects);
            if !standard.is_empty() {
                render_pass.set_pipeline(&self.pipelines.standard);
                for (index, object) in &standard {
                    object.bind_and_draw(&mut render_pass, *index);
                }
            }
            if !terrain.is_empty() {
                render_pass.set_pipeline(&self.pipelines.terrain);
                for (index, object) in &terrain {
                    object.bind_and_draw(&mut render_pass, *index);
                }
            }
            if !billboard.is_empty() {
                render_pass.set_pipeline(&self.pipelines.billboard);
                for (index, object) in &billboard {
                    object.bind_and_draw(&mut render_pass, *index);
                }
            }

            // Instanced batches swap in their own bind group for the span of
            // their draws; the frame group is restored after each.
            for batch in data.instanced.iter() {
                batch.draw_all(&mut render_pass, &self.pipelines);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        self.window.request_redraw();

        Ok(())
    }

    /// Auxiliary depth-only pre-pass over standard and terrain objects, with
    /// its own command buffer.
    pub fn depth_prepass(&self, data: &RenderData<'_>) -> Result<()> {
        self.upload_frame_data(data)?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Depth Pre-Pass Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Depth Pre-Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

            let (standard, terrain, _) = partition_by_type(&data.objects);
            if !standard.is_empty() {
                render_pass.set_pipeline(&self.pipelines.depth_standard);
                for (index, object) in &standard {
                    object.draw_geometry(&mut render_pass, *index);
                }
            }
            if !terrain.is_empty() {
                render_pass.set_pipeline(&self.pipelines.depth_terrain);
                for (index, object) in &terrain {
                    object.draw_geometry(&mut render_pass, *index);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

/// Split the snapshot into per-pipeline batches, remembering each object's
/// snapshot index for the instance-offset contract.
pub(crate) fn partition_by_type<'a>(
    objects: &[&'a RenderableObject],
) -> (
    Vec<(u32, &'a RenderableObject)>,
    Vec<(u32, &'a RenderableObject)>,
    Vec<(u32, &'a RenderableObject)>,
) {
    let mut standard = Vec::new();
    let mut terrain = Vec::new();
    let mut billboard = Vec::new();
    for (index, object) in objects.iter().enumerate() {
        let entry = (index as u32, *object);
        match object.render_type {
            RenderType::Standard => standard.push(entry),
            RenderType::Terrain => terrain.push(entry),
            RenderType::Billboard => billboard.push(entry),
        }
    }
    (standard, terrain, billboard)
}

fn pack_quad(points: [[f32; 2]; 4]) -> [[f32; 4]; 2] {
    [
        [points[0][0], points[0][1], points[1][0], points[1][1]],
        [points[2][0], points[2][1], points[3][0], points[3][1]],
    ]
}
