//! Render-core building blocks shared by every post effect.
//!
//! - [`DeviceContext`]: immediate-mode command surface implemented by backends
//! - [`StateGuard`]: scoped save/restore of pipeline state
//! - [`Technique`] / [`ShaderPass`] / [`ConstantBuffer`]: technique boundary
//! - [`UniformBlock`]: upload + change detection helper
//! - [`RenderCore`]: attach / detach / render capability trait

pub mod device;
pub mod render_core;
pub mod state;
pub mod state_guard;
pub mod technique;
pub mod uniform_block;
pub mod view;

pub use device::{DeviceContext, GeometryId, MeshDraw, Viewport};
pub use render_core::RenderCore;
pub use state::{ClearFlags, DepthStencilMode, RasterizerState};
pub use state_guard::StateGuard;
pub use technique::{
    BufferDesc, BufferId, ConstantBuffer, PassId, PassState, ShaderPass, Technique, buffer_names,
    pass_names, technique_names,
};
pub use uniform_block::UniformBlock;
pub use view::{DepthStencilView, RenderTargetView, TargetBinding, TargetDesc, ViewId, ViewToken};
