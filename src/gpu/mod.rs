mod buffers;
mod compute;
mod context;
mod error;
mod render;

pub use buffers::{CaBuffer, OutputBuffer, RenderParams};
pub use compute::{StepParams, StepPipeline};
pub use context::GpuContext;
pub use error::{GpuError, GpuResult};
pub use render::RenderPipeline;
