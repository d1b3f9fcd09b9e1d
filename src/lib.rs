#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! # Myth PostFx
//!
//! Stencil-driven post-processing render cores:
//!
//! - **Cross-section**: clips meshes against up to four planes and fills the
//!   exposed interior with a solid section colour.
//! - **X-ray**: draws translucent silhouettes of tagged nodes on top of the
//!   frame, resolving overlaps so each pixel is tinted once.
//!
//! Cores talk to an immediate-mode [`DeviceContext`], save and restore the
//! caller's pipeline state with a [`StateGuard`], and borrow transient
//! depth-stencil buffers from a [`DepthStencilPool`].

pub mod backend;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod settings;

pub use errors::{PostFxError, Result};
pub use renderer::core::{DeviceContext, RenderCore, StateGuard, Technique};
pub use renderer::graph::{DepthStencilPool, FrameContext, RenderBuffer};
pub use renderer::passes::{CrossSectionCore, DepthPrepass, XRayEffectCore};
pub use scene::{EffectNode, MeshNode};
pub use settings::PostFxSettings;
