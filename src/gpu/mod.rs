//! wgpu-backed simulation: context, ping-pong textures, compute stepper and
//! the full-screen presenter.

mod presenter;
mod stepper;
mod surfaces;

use std::sync::Arc;

use winit::window::Window;

use crate::error::{Result, SmoothLifeError};

pub use presenter::{preferred_target_format, PresentUniforms, Presenter};
pub use stepper::{GpuStepper, KernelUniforms, WORKGROUP_SIZE};
pub use surfaces::{StateSurfaces, STATE_FORMAT};

/// Device and queue shared by every GPU object of a run. Built once at
/// startup and dropped at shutdown; nothing relies on ambient binding state.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Context without a presentation surface (tests, `headless_run`).
    pub async fn headless() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
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
            .ok_or_else(|| SmoothLifeError::Gpu("no suitable adapter found".into()))?;
        Self::from_adapter(instance, adapter).await
    }

    /// Context plus a surface for `window`; the adapter must be able to
    /// present to it.
    pub async fn for_window(window: Arc<Window>) -> Result<(Self, wgpu::Surface<'static>)> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| SmoothLifeError::Gpu(format!("create_surface: {e}")))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| SmoothLifeError::Gpu("no adapter compatible with the window".into()))?;
        let ctx = Self::from_adapter(instance, adapter).await?;
        Ok((ctx, surface))
    }

    async fn from_adapter(instance: wgpu::Instance, adapter: wgpu::Adapter) -> Result<Self> {
        log::info!("Using adapter: {:?}", adapter.get_info());

        let downlevel = adapter.get_downlevel_capabilities();
        if !downlevel
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(SmoothLifeError::Gpu(
                "adapter does not support compute shaders".into(),
            ));
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("SmoothLife Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| SmoothLifeError::Gpu(format!("request_device: {e}")))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    pub fn max_surface_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Runs `f` inside an error scope and turns validation/OOM errors into
    /// `SmoothLifeError::Allocation` tagged with `what`.
    pub(crate) fn checked<T>(&self, what: &str, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = oom {
            return Err(SmoothLifeError::Allocation(format!("{what}: out of memory: {err}")));
        }
        if let Some(err) = validation {
            return Err(SmoothLifeError::Allocation(format!("{what}: {err}")));
        }
        Ok(value)
    }
}

/// Prelude concatenated in front of every program.
pub(crate) const SHARED_WGSL: &str = include_str!("../../shaders/shared.wgsl");
