//! Cross-Section Mesh Core
//!
//! Clips a mesh against up to four planes and fills the cut with a solid
//! colour. The clipping itself happens in the shaders; this core sequences
//! the passes around the shared depth-stencil buffer:
//!
//! ```text
//! upload ClipParamsCB
//! MeshDefault   (normal raster)            → colour + depth
//! clear stencil = 0
//! Backface      (front-cull, DS only, ref 1) → stencil marks the cut
//! ScreenQuad    (strip, 4 verts, ref 1)      → section colour where stencil == 1
//! ```
//!
//! Every step runs under a [`StateGuard`], so the caller's targets and state
//! are restored on all exit paths, including the early return when no
//! depth-stencil buffer is bound.

use glam::{Mat4, Vec4};

use crate::errors::Result;
use crate::renderer::core::{
    BufferDesc, ClearFlags, MeshDraw, RasterizerState, RenderCore, ShaderPass, StateGuard,
    Technique, UniformBlock, buffer_names, pass_names, technique::require_pass,
};
use crate::renderer::graph::FrameContext;
use crate::resources::{ChangeTracker, ClipParamsUniforms, color};
use crate::settings::CrossSectionSettings;

/// Number of clip planes supported by the shader passes.
pub const MAX_CLIP_PLANES: usize = 4;

#[derive(Debug)]
struct CrossSectionPasses {
    mesh: ShaderPass,
    backface: ShaderPass,
    screen_quad: ShaderPass,
}

#[derive(Debug)]
pub struct CrossSectionCore {
    section_color: Vec4,
    planes_enabled: [bool; MAX_CLIP_PLANES],
    plane_params: Mat4,
    geometry: Option<MeshDraw>,

    raster_state: RasterizerState,
    backface_raster_state: RasterizerState,

    clip_params: UniformBlock<ClipParamsUniforms>,
    passes: Option<CrossSectionPasses>,
    tracker: ChangeTracker,
}

impl Default for CrossSectionCore {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossSectionCore {
    #[must_use]
    pub fn new() -> Self {
        let raster_state = RasterizerState::default();
        Self {
            section_color: color::FIREBRICK,
            planes_enabled: [false; MAX_CLIP_PLANES],
            plane_params: Mat4::ZERO,
            geometry: None,
            backface_raster_state: RasterizerState::backface_of(&raster_state),
            raster_state,
            clip_params: UniformBlock::new(ClipParamsUniforms::default()),
            passes: None,
            tracker: ChangeTracker::new(),
        }
    }

    /// Builds a core from settings. Fails on an unparseable section colour.
    pub fn from_settings(settings: &CrossSectionSettings) -> Result<Self> {
        let mut core = Self::new();
        core.set_section_color(settings.section_color()?);
        core.set_planes_enabled(settings.planes_enabled);
        for (index, plane) in settings.planes.iter().enumerate() {
            core.set_plane(index, Vec4::from_array(*plane));
        }
        Ok(core)
    }

    // === Properties ===

    #[inline]
    #[must_use]
    pub fn section_color(&self) -> Vec4 {
        self.section_color
    }

    pub fn set_section_color(&mut self, color: Vec4) {
        self.tracker.set(&mut self.section_color, color);
    }

    #[inline]
    #[must_use]
    pub fn planes_enabled(&self) -> [bool; MAX_CLIP_PLANES] {
        self.planes_enabled
    }

    pub fn set_plane_enabled(&mut self, index: usize, enabled: bool) {
        let Some(slot) = self.planes_enabled.get_mut(index) else {
            log::warn!("CrossSection: clip plane index {index} out of range");
            return;
        };
        self.tracker.set(slot, enabled);
    }

    pub fn set_planes_enabled(&mut self, enabled: [bool; MAX_CLIP_PLANES]) {
        self.tracker.set(&mut self.planes_enabled, enabled);
    }

    /// Plane matrix; column *i* is plane *i* as `(nx, ny, nz, d)`.
    #[inline]
    #[must_use]
    pub fn plane_params(&self) -> Mat4 {
        self.plane_params
    }

    pub fn set_plane_params(&mut self, planes: Mat4) {
        self.tracker.set(&mut self.plane_params, planes);
    }

    /// Sets plane `index` to `(nx, ny, nz, d)`.
    pub fn set_plane(&mut self, index: usize, plane: Vec4) {
        if index >= MAX_CLIP_PLANES {
            log::warn!("CrossSection: clip plane index {index} out of range");
            return;
        }
        let mut columns = self.plane_params.to_cols_array_2d();
        columns[index] = plane.to_array();
        self.set_plane_params(Mat4::from_cols_array_2d(&columns));
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> Option<&MeshDraw> {
        self.geometry.as_ref()
    }

    pub fn set_geometry(&mut self, geometry: Option<MeshDraw>) {
        self.tracker.set(&mut self.geometry, geometry);
    }

    #[inline]
    #[must_use]
    pub fn rasterizer_state(&self) -> &RasterizerState {
        &self.raster_state
    }

    #[inline]
    #[must_use]
    pub fn backface_rasterizer_state(&self) -> &RasterizerState {
        &self.backface_raster_state
    }

    /// Replaces the normal raster state and derives the back-face state from it.
    pub fn set_rasterizer_state(&mut self, state: RasterizerState) {
        if self.tracker.set(&mut self.raster_state, state) {
            self.backface_raster_state = RasterizerState::backface_of(&self.raster_state);
        }
    }

    /// Change tracker bumped by every setter that actually changed a value.
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Payload uploaded on the last render.
    #[inline]
    #[must_use]
    pub fn clip_params(&self) -> &ClipParamsUniforms {
        self.clip_params.get()
    }
}

impl RenderCore for CrossSectionCore {
    fn name(&self) -> &str {
        "CrossSection"
    }

    fn attach(&mut self, technique: &dyn Technique) -> Result<()> {
        self.detach();

        let buffer = technique.register_buffer(&BufferDesc::of::<ClipParamsUniforms>(
            buffer_names::CLIP_PARAMS_CB,
        ))?;
        let passes = CrossSectionPasses {
            mesh: require_pass(technique, pass_names::MESH_DEFAULT)?,
            backface: require_pass(technique, pass_names::BACKFACE)?,
            screen_quad: require_pass(technique, pass_names::SCREEN_QUAD)?,
        };

        self.clip_params.bind(buffer);
        self.passes = Some(passes);
        log::debug!("CrossSection attached to '{}'", technique.name());
        Ok(())
    }

    fn detach(&mut self) {
        self.passes = None;
        self.clip_params.unbind();
    }

    fn is_attached(&self) -> bool {
        self.passes.is_some()
    }

    fn update_model_struct(&mut self) {
        self.clip_params.set(ClipParamsUniforms::new(
            self.section_color,
            self.planes_enabled,
            self.plane_params,
        ));
    }

    fn on_render(&mut self, frame: &mut FrameContext<'_>) {
        let Some(passes) = &self.passes else {
            return;
        };
        let Some(mesh) = self.geometry else {
            log::trace!("CrossSection: no geometry bound, nothing to draw");
            return;
        };

        let mut device = StateGuard::new(&mut *frame.device);

        // The buffer is registered by name and may be shared, so upload every frame.
        self.clip_params.upload(&mut *device);

        device.set_rasterizer_state(&self.raster_state);
        device.bind_pass(&passes.mesh);
        device.set_depth_stencil_state(passes.mesh.depth_stencil(), 0);
        device.draw_mesh(&mesh);

        let targets = device.output_targets();
        let Some(depth_stencil) = targets.depth_stencil.as_ref() else {
            log::debug!("CrossSection: no depth-stencil bound, section fill skipped");
            return;
        };

        device.clear_depth_stencil(depth_stencil, ClearFlags::STENCIL, 0.0, 0);

        // Back faces of the clipped mesh into the stencil only.
        device.set_output_targets(Some(depth_stencil), &[]);
        device.set_rasterizer_state(&self.backface_raster_state);
        device.bind_pass(&passes.backface);
        device.set_depth_stencil_state(passes.backface.depth_stencil(), 1);
        device.draw_mesh(&mesh);

        // Section colour where stencil == 1.
        device.set_primitive_topology(wgpu::PrimitiveTopology::TriangleStrip);
        device.set_rasterizer_state(&self.raster_state);
        device.bind_pass(&passes.screen_quad);
        device.set_output_targets(Some(depth_stencil), &targets.colors);
        device.set_depth_stencil_state(passes.screen_quad.depth_stencil(), 1);
        device.draw(4, 0);
    }
}
