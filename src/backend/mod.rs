//! Device backends
//!
//! - [`software`]: CPU reference rasteriser, used by tests and demos
//! - [`wgpu_recorder`]: records the command stream and encodes wgpu render passes

pub mod software;
pub mod wgpu_recorder;

pub use software::{SoftwareDevice, SoftwareTechnique};
pub use wgpu_recorder::{PassResolver, PipelineKey, WgpuRecorder};
