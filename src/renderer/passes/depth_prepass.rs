//! Depth Prepass
//!
//! Rebuilds scene depth into a caller-bound depth-stencil buffer by replaying
//! the opaque nodes with a depth-only pass. Used by the X-ray effect when the
//! primary depth buffer is multisampled and cannot be bound next to the
//! single-sample post-process target.
//!
//! # Data Flow
//! ```text
//! FrameContext.opaque_nodes → DepthPrepass → bound depth-stencil (depth only)
//! ```
//!
//! Each node is drawn with its own technique's `DepthPrepass` pass. When a
//! node's technique has none, the pass resolved from the technique the
//! prepass was attached to is used instead; nodes with neither are skipped.

use crate::errors::Result;
use crate::renderer::core::{DeviceContext, RenderCore, ShaderPass, StateGuard, Technique, pass_names};
use crate::renderer::graph::FrameContext;
use crate::scene::EffectNode;

#[derive(Debug, Default)]
pub struct DepthPrepass {
    fallback: Option<ShaderPass>,
    attached: bool,
}

impl DepthPrepass {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass used for nodes whose technique has no depth prepass.
    #[must_use]
    pub fn fallback_pass(&self) -> Option<&ShaderPass> {
        self.fallback.as_ref()
    }

    /// Draws `nodes` depth-only into the currently bound depth-stencil buffer.
    /// Returns the number of nodes drawn.
    pub fn render_nodes(&self, device: &mut dyn DeviceContext, nodes: &[&dyn EffectNode]) -> usize {
        let mut drawn = 0;
        for node in nodes {
            let Some(pass) = node
                .technique()
                .pass(pass_names::DEPTH_PREPASS)
                .or_else(|| self.fallback.clone())
            else {
                log::trace!("DepthPrepass: '{}' has no depth pass, skipped", node.label());
                continue;
            };
            device.bind_pass(&pass);
            device.set_depth_stencil_state(pass.depth_stencil(), 0);
            node.render(device);
            drawn += 1;
        }
        drawn
    }
}

impl RenderCore for DepthPrepass {
    fn name(&self) -> &str {
        "DepthPrepass"
    }

    fn attach(&mut self, technique: &dyn Technique) -> Result<()> {
        self.fallback = technique.pass(pass_names::DEPTH_PREPASS);
        if self.fallback.is_none() {
            log::debug!(
                "DepthPrepass: technique '{}' has no fallback depth pass",
                technique.name()
            );
        }
        self.attached = true;
        Ok(())
    }

    fn detach(&mut self) {
        self.fallback = None;
        self.attached = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn on_render(&mut self, frame: &mut FrameContext<'_>) {
        let mut device = StateGuard::new(&mut *frame.device);
        let drawn = self.render_nodes(&mut *device, frame.opaque_nodes);
        log::debug!("DepthPrepass: {drawn}/{} opaque nodes", frame.opaque_nodes.len());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::software::{Geometry, SoftwareDevice, SoftwareTechnique, reference_technique, shaders};
    use crate::renderer::core::{MeshDraw, PassState, Technique};
    use crate::resources::color;
    use crate::scene::MeshNode;

    #[test]
    fn test_fallback_pass_used_when_node_has_none() {
        let mut device = SoftwareDevice::new(16, 16);
        device.set_view_projection(glam::Mat4::orthographic_rh(-2.0, 2.0, -2.0, 2.0, -2.0, 2.0));
        let depth = device.create_depth_stencil_default();
        device.set_output_targets(Some(&depth), &[]);
        device.clear_depth_stencil(&depth, crate::renderer::core::ClearFlags::DEPTH, 1.0, 0);

        let host = reference_technique(&mut device, "Host");
        let bare: Arc<dyn Technique> = Arc::new(SoftwareTechnique::new("Bare"));
        let geometry = device.add_geometry(Geometry::cube(glam::Vec3::ZERO, 1.0, color::WHITE));
        let node = MeshNode::new("cube", bare, MeshDraw::new(geometry));

        let mut prepass = DepthPrepass::new();
        prepass.attach(host.as_ref()).unwrap();
        assert!(prepass.fallback_pass().is_some());

        let nodes: [&dyn EffectNode; 1] = [&node];
        assert_eq!(prepass.render_nodes(&mut device, &nodes), 1);
        assert!(device.depth_at(&depth, 8, 8) < 1.0);
        assert!((device.depth_at(&depth, 0, 0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_nodes_without_any_pass_are_skipped() {
        let mut device = SoftwareDevice::new(4, 4);
        let bare: Arc<dyn Technique> = Arc::new(SoftwareTechnique::new("Bare"));
        let node = MeshNode::new("a", bare.clone(), MeshDraw::new(crate::renderer::core::GeometryId(1)));

        let with_pass = SoftwareTechnique::new("Depth");
        with_pass.add_pass(device.register_pass(
            pass_names::DEPTH_PREPASS,
            PassState {
                color_writes: wgpu::ColorWrites::empty(),
                ..PassState::default()
            },
            shaders::depth_only,
        ));
        let other = MeshNode::new("b", Arc::new(with_pass), MeshDraw::new(crate::renderer::core::GeometryId(1)));

        let mut prepass = DepthPrepass::new();
        prepass.attach(bare.as_ref()).unwrap();
        assert!(prepass.fallback_pass().is_none());

        let nodes: [&dyn EffectNode; 2] = [&node, &other];
        assert_eq!(prepass.render_nodes(&mut device, &nodes), 1);
    }
}
