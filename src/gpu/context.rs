use std::sync::Arc;

use wgpu::{Adapter, Device, Instance, Queue, Surface, SurfaceConfiguration};
use winit::window::Window;

use crate::gpu::error::{GpuError, GpuResult};

/// GPU context holding the wgpu instance, adapter, device, and queue.
///
/// Created without a surface so the compute engine and the tests can run
/// headless; the windowed app attaches a surface with
/// [`GpuContext::create_surface`] once it has a window.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

impl GpuContext {
    /// Creates a new GPU context, preferring a discrete adapter.
    pub fn new() -> GpuResult<Self> {
        pollster::block_on(Self::new_async())
    }

    pub async fn new_async() -> GpuResult<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::AdapterNotFound)?;

        let info = adapter.get_info();
        log::info!("Using GPU: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("cae-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Creates and configures a presentation surface for the given window.
    pub fn create_surface(
        &self,
        window: Arc<Window>,
    ) -> GpuResult<(Surface<'static>, SurfaceConfiguration)> {
        let surface = self.instance.create_surface(window.clone())?;
        let size = window.inner_size();
        let config = surface
            .get_default_config(&self.adapter, size.width.max(1), size.height.max(1))
            .ok_or(GpuError::SurfaceUnsupported)?;
        surface.configure(&self.device, &config);
        Ok((surface, config))
    }
}
