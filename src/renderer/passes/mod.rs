//! Post-effect render cores.
//!
//! - [`CrossSectionCore`]: plane clipping with stencil-masked section fill
//! - [`XRayEffectCore`]: translucent silhouettes for tagged nodes
//! - [`DepthPrepass`]: depth-only replay of opaque nodes

pub mod cross_section;
pub mod depth_prepass;
pub mod xray;

pub use cross_section::{CrossSectionCore, MAX_CLIP_PLANES};
pub use depth_prepass::DepthPrepass;
pub use xray::{NodeEffectRecord, XRayEffectCore, XRayStats};
