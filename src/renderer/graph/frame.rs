//! Per-frame render context
//!
//! `FrameContext` bundles what every render core needs for one frame: the
//! device context, the render buffer, the depth-stencil pool and the scene
//! node lists.

use crate::renderer::core::{DepthStencilView, DeviceContext, RenderTargetView};
use crate::renderer::graph::transient_pool::DepthStencilPool;
use crate::scene::EffectNode;

/// Frame-level render buffer description owned by the host.
#[derive(Clone, Debug)]
pub struct RenderBuffer {
    pub width: u32,
    pub height: u32,
    /// Sample count of the main colour buffer. Values above 1 mean MSAA.
    pub color_sample_count: u32,
    /// Primary depth-stencil buffer (shares the colour buffer's sample count).
    pub depth_stencil: DepthStencilView,
    /// Single-sample target post effects draw into.
    pub post_process_target: RenderTargetView,
}

impl RenderBuffer {
    #[inline]
    #[must_use]
    pub fn is_multisampled(&self) -> bool {
        self.color_sample_count > 1
    }
}

/// Everything a [`RenderCore`](crate::renderer::core::RenderCore) may touch during one render call.
pub struct FrameContext<'a> {
    pub device: &'a mut dyn DeviceContext,
    pub buffer: &'a RenderBuffer,
    pub depth_pool: &'a mut DepthStencilPool,
    /// Nodes considered by post effects (tagged or not).
    pub post_effect_nodes: &'a [&'a dyn EffectNode],
    /// Opaque nodes replayed by the depth prepass.
    pub opaque_nodes: &'a [&'a dyn EffectNode],
}

impl<'a> FrameContext<'a> {
    pub fn new(
        device: &'a mut dyn DeviceContext,
        buffer: &'a RenderBuffer,
        depth_pool: &'a mut DepthStencilPool,
    ) -> Self {
        Self {
            device,
            buffer,
            depth_pool,
            post_effect_nodes: &[],
            opaque_nodes: &[],
        }
    }

    #[must_use]
    pub fn with_post_effect_nodes(mut self, nodes: &'a [&'a dyn EffectNode]) -> Self {
        self.post_effect_nodes = nodes;
        self
    }

    #[must_use]
    pub fn with_opaque_nodes(mut self, nodes: &'a [&'a dyn EffectNode]) -> Self {
        self.opaque_nodes = nodes;
        self
    }
}
