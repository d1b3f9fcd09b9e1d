//! Software backend
//!
//! A CPU rasteriser implementing [`DeviceContext`](crate::renderer::core::DeviceContext).
//! It executes the same state sequence as a GPU would, which makes pixel-level
//! behaviour of the render cores (stencil masks, overlap handling, restored
//! bindings) testable without a graphics adapter.

mod device;
mod geometry;
mod program;
mod raster;
pub mod shaders;
mod technique;

pub use device::{Command, SoftwareDevice};
pub use geometry::Geometry;
pub use program::{FragmentInput, FragmentProgram, UniformStore};
pub use technique::{SoftwareTechnique, reference_technique, states};
