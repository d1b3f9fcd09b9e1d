//! Immediate-mode device context.
//!
//! [`DeviceContext`] is the command surface every render core talks to. It is
//! stateful in the output-merger sense: bound targets, rasterizer state,
//! topology, the bound pass and the depth-stencil state persist between calls
//! until changed. Cores therefore wrap their work in a
//! [`StateGuard`](super::StateGuard) so the caller's state is restored.
//!
//! Two implementations ship with the crate:
//! - [`SoftwareDevice`](crate::backend::software::SoftwareDevice): CPU reference rasteriser
//! - [`WgpuRecorder`](crate::backend::wgpu_recorder::WgpuRecorder): records and encodes into wgpu render passes

use glam::Vec4;

use super::state::{ClearFlags, DepthStencilMode, RasterizerState};
use super::technique::{ConstantBuffer, ShaderPass};
use super::view::{DepthStencilView, RenderTargetView, TargetBinding, TargetDesc};

/// Identity of geometry uploaded to a backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GeometryId(pub u64);

/// One instanced mesh draw.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MeshDraw {
    pub geometry: GeometryId,
    pub instance_count: u32,
}

impl MeshDraw {
    #[must_use]
    pub fn new(geometry: GeometryId) -> Self {
        Self {
            geometry,
            instance_count: 1,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub trait DeviceContext {
    // === Resources ===
    fn create_render_target(&mut self, desc: TargetDesc) -> RenderTargetView;
    fn create_depth_stencil(&mut self, desc: TargetDesc) -> DepthStencilView;

    // === Output merger ===
    /// Returns the currently bound targets. Every handle in the result is an
    /// extra reference that is released when the binding is dropped.
    fn output_targets(&self) -> TargetBinding;
    fn set_output_targets(&mut self, depth_stencil: Option<&DepthStencilView>, colors: &[RenderTargetView]);
    fn reset_targets(&mut self) {
        self.set_output_targets(None, &[]);
    }

    fn clear_render_target(&mut self, view: &RenderTargetView, color: Vec4);
    fn clear_depth_stencil(&mut self, view: &DepthStencilView, flags: ClearFlags, depth: f32, stencil: u8);

    // === Fixed-function state ===
    fn viewport(&self) -> Viewport;
    fn set_viewport(&mut self, viewport: Viewport);

    fn rasterizer_state(&self) -> RasterizerState;
    fn set_rasterizer_state(&mut self, state: &RasterizerState);

    fn primitive_topology(&self) -> wgpu::PrimitiveTopology;
    fn set_primitive_topology(&mut self, topology: wgpu::PrimitiveTopology);

    /// Returns the bound depth-stencil state and stencil reference.
    fn depth_stencil_state(&self) -> (DepthStencilMode, u32);
    fn set_depth_stencil_state(&mut self, mode: &DepthStencilMode, stencil_ref: u32);

    /// Binds the pass shaders and blend state. Depth-stencil state is set
    /// separately so callers choose the stencil reference.
    fn bind_pass(&mut self, pass: &ShaderPass);

    // === Data & draws ===
    fn upload(&mut self, buffer: &ConstantBuffer, bytes: &[u8]);

    /// Non-indexed procedural draw (vertex positions generated in the shader).
    fn draw(&mut self, vertex_count: u32, start_vertex: u32);

    /// Draws mesh geometry. Sets the topology to the mesh topology (triangle list).
    fn draw_mesh(&mut self, mesh: &MeshDraw);
}
