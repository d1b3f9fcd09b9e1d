//! X-Ray Post-Effect Core
//!
//! Draws a translucent silhouette for every scene node tagged with the
//! effect name into the post-process target.
//!
//! # Modes
//!
//! - **Single pass**: every tagged node is drawn once with `EffectMeshXRayP2`,
//!   stencil test forced to `Always`. Overlapping nodes blend over each other.
//! - **Double pass**: phase 1 marks visible pixels in the stencil buffer with
//!   `EffectMeshXRayP1` (no colour); phase 2 replays the recorded nodes with
//!   `EffectMeshXRayP2` at reference 1. Each pixel is coloured by the first
//!   recorded node covering it, so overlaps never double-blend.
//!
//! # MSAA
//!
//! A multisampled primary depth buffer cannot be bound next to the
//! single-sample post-process target. In that case a single-sample buffer is
//! leased from the frame's [`DepthStencilPool`](crate::renderer::graph::DepthStencilPool),
//! filled by the [`DepthPrepass`] and returned before `render` finishes.

use glam::Vec4;

use crate::errors::Result;
use crate::renderer::core::{
    BufferDesc, ClearFlags, DepthStencilView, DeviceContext, RenderCore, StateGuard, Technique,
    UniformBlock, Viewport, buffer_names, pass_names, technique_names,
};
use crate::renderer::graph::FrameContext;
use crate::renderer::passes::DepthPrepass;
use crate::resources::{BorderEffectUniforms, ChangeTracker, color};
use crate::scene::EffectNode;
use crate::settings::XRaySettings;

/// A tagged node recorded in phase 1, replayed in phase 2.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeEffectRecord {
    /// Index into the frame's post-effect node list.
    pub node_index: usize,
    /// Resolved overlay colour.
    pub color: Vec4,
    /// Phase 1 found no marking pass; the node is already counted as skipped.
    pub missing_pass: bool,
}

/// Counters of the last rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct XRayStats {
    /// Nodes carrying the effect tag.
    pub tagged: usize,
    /// Colour draws issued.
    pub drawn: usize,
    /// Tagged nodes missing at least one of the passes they needed.
    pub skipped: usize,
}

#[derive(Debug)]
pub struct XRayEffectCore {
    effect_name: String,
    color: Vec4,
    double_pass: bool,
    clear_target: bool,
    depth_format: wgpu::TextureFormat,

    border: UniformBlock<BorderEffectUniforms>,
    prepass: DepthPrepass,
    attached: bool,

    /// Reused across frames, emptied after every double-pass frame.
    records: Vec<NodeEffectRecord>,
    stats: XRayStats,
    tracker: ChangeTracker,
}

impl Default for XRayEffectCore {
    fn default() -> Self {
        Self::new()
    }
}

impl XRayEffectCore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            effect_name: technique_names::POST_EFFECT_MESH_XRAY.to_string(),
            color: color::BLUE,
            double_pass: false,
            clear_target: true,
            depth_format: wgpu::TextureFormat::Depth32FloatStencil8,
            border: UniformBlock::new(BorderEffectUniforms::default()),
            prepass: DepthPrepass::new(),
            attached: false,
            records: Vec::new(),
            stats: XRayStats::default(),
            tracker: ChangeTracker::new(),
        }
    }

    /// Builds a core from settings. Fails on an unparseable colour.
    pub fn from_settings(settings: &XRaySettings) -> Result<Self> {
        let mut core = Self::new();
        core.set_effect_name(settings.effect_name.clone());
        core.set_color(settings.color()?);
        core.set_double_pass(settings.double_pass);
        core.set_outline_fading_factor(settings.outline_fading_factor);
        core.set_clear_target(settings.clear_target);
        core.set_depth_format(settings.depth_format.into());
        Ok(core)
    }

    // === Properties ===

    #[must_use]
    pub fn effect_name(&self) -> &str {
        &self.effect_name
    }

    pub fn set_effect_name(&mut self, name: impl Into<String>) {
        self.tracker.set(&mut self.effect_name, name.into());
    }

    /// Default overlay colour for nodes without a `"Color"` attribute.
    #[must_use]
    pub fn color(&self) -> Vec4 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec4) {
        self.tracker.set(&mut self.color, color);
    }

    #[must_use]
    pub fn double_pass(&self) -> bool {
        self.double_pass
    }

    pub fn set_double_pass(&mut self, double_pass: bool) {
        self.tracker.set(&mut self.double_pass, double_pass);
    }

    #[must_use]
    pub fn outline_fading_factor(&self) -> f32 {
        self.border.get().params.x
    }

    pub fn set_outline_fading_factor(&mut self, factor: f32) {
        self.tracker.set(&mut self.border.get_mut().params.x, factor);
    }

    #[must_use]
    pub fn clear_target(&self) -> bool {
        self.clear_target
    }

    /// Whether the post-process target is cleared to transparent before drawing.
    pub fn set_clear_target(&mut self, clear: bool) {
        self.tracker.set(&mut self.clear_target, clear);
    }

    #[must_use]
    pub fn depth_format(&self) -> wgpu::TextureFormat {
        self.depth_format
    }

    /// Format of the pooled depth-stencil buffer used under MSAA.
    pub fn set_depth_format(&mut self, format: wgpu::TextureFormat) {
        self.tracker.set(&mut self.depth_format, format);
    }

    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    #[inline]
    #[must_use]
    pub fn last_frame_stats(&self) -> XRayStats {
        self.stats
    }

    /// Number of constant-buffer uploads issued so far.
    #[inline]
    #[must_use]
    pub fn upload_count(&self) -> u64 {
        self.border.upload_count()
    }

    // === Passes ===

    /// Uploads `color` unless it is what the buffer already holds.
    fn apply_color(&mut self, device: &mut dyn DeviceContext, color: Vec4) {
        self.border.get_mut().color = color;
        self.border.sync(device);
    }

    fn render_single_pass(&mut self, device: &mut dyn DeviceContext, nodes: &[&dyn EffectNode]) {
        for node in nodes {
            let Some(effect) = node.post_effect(&self.effect_name) else {
                continue;
            };
            self.stats.tagged += 1;
            let color = effect.resolve_color(self.color);
            self.apply_color(device, color);

            let Some(pass) = node.technique().pass(pass_names::EFFECT_MESH_XRAY_P2) else {
                log::trace!("XRay: '{}' has no {} pass, skipped", node.label(), pass_names::EFFECT_MESH_XRAY_P2);
                self.stats.skipped += 1;
                continue;
            };
            let depth_stencil = pass
                .depth_stencil()
                .with_stencil(wgpu::CompareFunction::Always, wgpu::StencilOperation::IncrementClamp);
            device.bind_pass(&pass);
            device.set_depth_stencil_state(&depth_stencil, 0);
            node.render(device);
            self.stats.drawn += 1;
        }
    }

    fn render_double_pass(
        &mut self,
        device: &mut dyn DeviceContext,
        depth_stencil: &DepthStencilView,
        nodes: &[&dyn EffectNode],
    ) {
        device.clear_depth_stencil(depth_stencil, ClearFlags::STENCIL, 1.0, 0);
        self.records.clear();

        // Phase 1: mark visible pixels, record every tagged node.
        for (node_index, node) in nodes.iter().enumerate() {
            let Some(effect) = node.post_effect(&self.effect_name) else {
                continue;
            };
            self.stats.tagged += 1;
            let pass = node.technique().pass(pass_names::EFFECT_MESH_XRAY_P1);
            self.records.push(NodeEffectRecord {
                node_index,
                color: effect.resolve_color(self.color),
                missing_pass: pass.is_none(),
            });

            let Some(pass) = pass else {
                log::trace!("XRay: '{}' has no {} pass, skipped", node.label(), pass_names::EFFECT_MESH_XRAY_P1);
                self.stats.skipped += 1;
                continue;
            };
            device.bind_pass(&pass);
            device.set_depth_stencil_state(pass.depth_stencil(), 0);
            node.render(device);
        }

        // Phase 2: colour only where stencil == 1.
        let records = std::mem::take(&mut self.records);
        for record in &records {
            let node = nodes[record.node_index];
            self.apply_color(device, record.color);

            let Some(pass) = node.technique().pass(pass_names::EFFECT_MESH_XRAY_P2) else {
                log::trace!("XRay: '{}' has no {} pass, skipped", node.label(), pass_names::EFFECT_MESH_XRAY_P2);
                if !record.missing_pass {
                    self.stats.skipped += 1;
                }
                continue;
            };
            device.bind_pass(&pass);
            device.set_depth_stencil_state(pass.depth_stencil(), 1);
            node.render(device);
            self.stats.drawn += 1;
        }

        self.records = records;
        self.records.clear();
    }
}

impl RenderCore for XRayEffectCore {
    fn name(&self) -> &str {
        "XRay"
    }

    fn attach(&mut self, technique: &dyn Technique) -> Result<()> {
        self.detach();

        let buffer = technique.register_buffer(&BufferDesc::of::<BorderEffectUniforms>(
            buffer_names::BORDER_EFFECT_CB,
        ))?;
        self.prepass.attach(technique)?;
        self.border.bind(buffer);
        self.attached = true;
        log::debug!("XRay attached to '{}'", technique.name());
        Ok(())
    }

    fn detach(&mut self) {
        self.prepass.detach();
        self.border.unbind();
        self.attached = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn update_model_struct(&mut self) {
        self.border.get_mut().color = self.color;
    }

    fn on_render(&mut self, frame: &mut FrameContext<'_>) {
        self.stats = XRayStats::default();

        let buffer = frame.buffer;
        let nodes = frame.post_effect_nodes;
        let opaque_nodes = frame.opaque_nodes;
        let multisampled = buffer.is_multisampled();

        let mut device = StateGuard::new(&mut *frame.device);
        self.border.sync(&mut *device);

        let lease = if multisampled {
            frame.depth_pool.ensure_extent(buffer.width, buffer.height);
            Some(frame.depth_pool.lease(&mut *device, self.depth_format))
        } else {
            None
        };
        let depth_stencil = lease.as_deref().unwrap_or(&buffer.depth_stencil);

        let target = &buffer.post_process_target;
        if self.clear_target {
            device.clear_render_target(target, color::TRANSPARENT);
        }
        device.set_output_targets(Some(depth_stencil), std::slice::from_ref(target));
        device.set_viewport(Viewport::new(buffer.width, buffer.height));

        if multisampled {
            // The MSAA depth buffer cannot be used here; rebuild depth single-sampled.
            device.clear_depth_stencil(depth_stencil, ClearFlags::DEPTH, 1.0, 0);
            self.prepass.render_nodes(&mut *device, opaque_nodes);
        }

        if self.double_pass {
            self.render_double_pass(&mut *device, depth_stencil, nodes);
        } else {
            self.render_single_pass(&mut *device, nodes);
        }

        if let Some(lease) = lease {
            device.reset_targets();
            drop(lease);
        }

        log::debug!(
            "XRay: {} tagged, {} drawn, {} skipped ({})",
            self.stats.tagged,
            self.stats.drawn,
            self.stats.skipped,
            if self.double_pass { "double pass" } else { "single pass" }
        );
    }
}
