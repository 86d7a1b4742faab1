use thiserror::Error;

/// Errors surfaced while bringing up the GPU. Failures after initialisation
/// (allocation, kernel launch) are reported through wgpu's uncaptured-error
/// handler and are fatal.
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    AdapterNotFound,

    #[error("failed to request GPU device: {0}")]
    DeviceRequestFailed(#[from] wgpu::RequestDeviceError),

    #[error("failed to create rendering surface: {0}")]
    SurfaceCreationFailed(#[from] wgpu::CreateSurfaceError),

    #[error("surface is not supported by the adapter")]
    SurfaceUnsupported,
}

/// Result type for GPU operations.
pub type GpuResult<T> = Result<T, GpuError>;
