//! Shared test helpers.
//!
//! GPU tests run against a headless device. On machines without a usable
//! adapter (most CI runners) `request_test_device` returns `None` and the
//! tests pass vacuously instead of failing the suite.

pub async fn request_test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = match instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
    {
        Ok(adapter) => adapter,
        Err(_) => {
            eprintln!("skipping GPU test: no adapter available");
            return None;
        }
    };
    match adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("test device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await
    {
        Ok(pair) => Some(pair),
        Err(error) => {
            eprintln!("skipping GPU test: no device ({error})");
            None
        }
    }
}
