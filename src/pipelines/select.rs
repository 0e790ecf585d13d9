/// Compute pipelines for the two-phase vertex selection.
///
/// Both entry points live in one module and share bindings 0..2; only the
/// write phase statically uses the output buffer, so the count pipeline gets
/// the smaller layout.
#[derive(Debug)]
pub struct SelectPipelines {
    pub count: wgpu::ComputePipeline,
    pub write: wgpu::ComputePipeline,
    pub count_layout: wgpu::BindGroupLayout,
    pub write_layout: wgpu::BindGroupLayout,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn mk_select_pipelines(device: &wgpu::Device) -> SelectPipelines {
    let count_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            storage_entry(0, true),
            uniform_entry(1),
            storage_entry(2, false),
        ],
        label: Some("select_count_bind_group_layout"),
    });
    let write_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            storage_entry(0, true),
            uniform_entry(1),
            storage_entry(2, false),
            storage_entry(3, false),
        ],
        label: Some("select_write_bind_group_layout"),
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Select Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("select.wgsl").into()),
    });

    let count_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Select Count Pipeline Layout"),
        bind_group_layouts: &[&count_layout],
        push_constant_ranges: &[],
    });
    let write_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Select Write Pipeline Layout"),
        bind_group_layouts: &[&write_layout],
        push_constant_ranges: &[],
    });

    let count = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Select Count Pipeline"),
        layout: Some(&count_pipeline_layout),
        module: &shader,
        entry_point: Some("cs_count"),
        compilation_options: Default::default(),
        cache: None,
    });
    let write = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Select Write Pipeline"),
        layout: Some(&write_pipeline_layout),
        module: &shader,
        entry_point: Some("cs_write"),
        compilation_options: Default::default(),
        cache: None,
    });

    SelectPipelines {
        count,
        write,
        count_layout,
        write_layout,
    }
}
