//! Fixed-function pipeline state descriptors.
//!
//! Expressed in `wgpu` vocabulary so the same descriptors drive the software
//! reference device and the wgpu recorder.

use bitflags::bitflags;

bitflags! {
    /// Planes affected by [`DeviceContext::clear_depth_stencil`](super::DeviceContext::clear_depth_stencil).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const DEPTH = 1 << 0;
        const STENCIL = 1 << 1;
    }
}

/// Rasterizer state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterizerState {
    pub cull_mode: Option<wgpu::Face>,
    pub front_face: wgpu::FrontFace,
    pub depth_bias: wgpu::DepthBiasState,
    pub unclipped_depth: bool,
    pub multisample: bool,
    pub scissor: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            cull_mode: Some(wgpu::Face::Back),
            front_face: wgpu::FrontFace::Ccw,
            depth_bias: wgpu::DepthBiasState::default(),
            unclipped_depth: false,
            multisample: true,
            scissor: false,
        }
    }
}

impl RasterizerState {
    /// Back-face-only variant of `base`: culls front faces, multisampling
    /// and scissor off, bias / depth clip / winding kept from `base`.
    #[must_use]
    pub fn backface_of(base: &Self) -> Self {
        Self {
            cull_mode: Some(wgpu::Face::Front),
            multisample: false,
            scissor: false,
            ..*base
        }
    }
}

/// Depth + stencil test state. Both stencil faces share one [`wgpu::StencilFaceState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepthStencilMode {
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub stencil: wgpu::StencilFaceState,
    pub stencil_read_mask: u32,
    pub stencil_write_mask: u32,
}

const STENCIL_KEEP: wgpu::StencilFaceState = wgpu::StencilFaceState {
    compare: wgpu::CompareFunction::Always,
    fail_op: wgpu::StencilOperation::Keep,
    depth_fail_op: wgpu::StencilOperation::Keep,
    pass_op: wgpu::StencilOperation::Keep,
};

impl Default for DepthStencilMode {
    fn default() -> Self {
        Self {
            depth_write: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: STENCIL_KEEP,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
        }
    }
}

impl DepthStencilMode {
    /// No depth test, no depth write, stencil untouched.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            depth_write: false,
            depth_compare: wgpu::CompareFunction::Always,
            ..Self::default()
        }
    }

    /// Same depth state with the stencil face replaced.
    #[must_use]
    pub fn with_stencil(
        mut self,
        compare: wgpu::CompareFunction,
        pass_op: wgpu::StencilOperation,
    ) -> Self {
        self.stencil = wgpu::StencilFaceState {
            compare,
            fail_op: wgpu::StencilOperation::Keep,
            depth_fail_op: wgpu::StencilOperation::Keep,
            pass_op,
        };
        self
    }

    #[must_use]
    pub fn with_depth(mut self, compare: wgpu::CompareFunction, write: bool) -> Self {
        self.depth_compare = compare;
        self.depth_write = write;
        self
    }

    /// Whether any stencil operation can modify the buffer.
    #[must_use]
    pub fn writes_stencil(&self) -> bool {
        use wgpu::StencilOperation::Keep;
        self.stencil_write_mask != 0
            && (self.stencil.pass_op != Keep
                || self.stencil.fail_op != Keep
                || self.stencil.depth_fail_op != Keep)
    }
}
