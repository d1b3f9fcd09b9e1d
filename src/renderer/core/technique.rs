//! Technique boundary: named shader passes and constant-buffer registration.
//!
//! Shader compilation lives outside this crate. A [`Technique`] only has to
//! answer two questions: "which bindable pass is registered under this name?"
//! and "give me an upload-capable buffer for this description".

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::state::DepthStencilMode;
use crate::errors::Result;

/// Well-known pass names.
pub mod pass_names {
    /// Regular mesh shading (cross-section base draw).
    pub const MESH_DEFAULT: &str = "MeshDefault";
    /// Back faces of a clipped mesh into the stencil buffer.
    pub const BACKFACE: &str = "Backface";
    /// Full-screen quad gated on the stencil mask.
    pub const SCREEN_QUAD: &str = "ScreenQuad";
    /// X-ray phase 1: stencil marking, no colour.
    pub const EFFECT_MESH_XRAY_P1: &str = "EffectMeshXRayP1";
    /// X-ray phase 2: colour overlay.
    pub const EFFECT_MESH_XRAY_P2: &str = "EffectMeshXRayP2";
    /// Depth-only pass used to rebuild a single-sample depth buffer.
    pub const DEPTH_PREPASS: &str = "DepthPrepass";
}

/// Well-known constant-buffer names.
pub mod buffer_names {
    pub const CLIP_PARAMS_CB: &str = "ClipParamsCB";
    pub const BORDER_EFFECT_CB: &str = "BorderEffectCB";
}

/// Well-known technique names.
pub mod technique_names {
    pub const POST_EFFECT_MESH_XRAY: &str = "PostEffectMeshXRay";
}

static NEXT_PASS_ID: AtomicU32 = AtomicU32::new(1);
static NEXT_BUFFER_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PassId(u32);

impl PassId {
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_PASS_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Fixed-function state a pass binds together with its shaders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassState {
    pub depth_stencil: DepthStencilMode,
    pub blend: Option<wgpu::BlendState>,
    pub color_writes: wgpu::ColorWrites,
}

impl Default for PassState {
    fn default() -> Self {
        Self {
            depth_stencil: DepthStencilMode::default(),
            blend: None,
            color_writes: wgpu::ColorWrites::ALL,
        }
    }
}

/// A bindable shader pass.
///
/// Cheap to clone; backends map [`ShaderPass::id`] to their compiled program.
#[derive(Clone, Debug)]
pub struct ShaderPass {
    id: PassId,
    name: Arc<str>,
    state: PassState,
}

impl ShaderPass {
    #[must_use]
    pub fn new(name: &str, state: PassState) -> Self {
        Self {
            id: PassId::next(),
            name: Arc::from(name),
            state,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> PassId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &PassState {
        &self.state
    }

    #[inline]
    #[must_use]
    pub fn depth_stencil(&self) -> &DepthStencilMode {
        &self.state.depth_stencil
    }
}

impl PartialEq for ShaderPass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BufferId(u32);

impl BufferId {
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Named constant-buffer description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferDesc {
    pub name: &'static str,
    pub size: usize,
}

impl BufferDesc {
    #[must_use]
    pub const fn new(name: &'static str, size: usize) -> Self {
        Self { name, size }
    }

    #[must_use]
    pub fn of<T>(name: &'static str) -> Self {
        Self::new(name, std::mem::size_of::<T>())
    }
}

/// Upload-capable constant-buffer handle returned by [`Technique::register_buffer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstantBuffer {
    id: BufferId,
    desc: BufferDesc,
}

impl ConstantBuffer {
    #[must_use]
    pub fn new(desc: BufferDesc) -> Self {
        Self {
            id: BufferId::next(),
            desc,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.desc.size
    }
}

/// A set of named shader passes plus its constant-buffer pool.
pub trait Technique {
    fn name(&self) -> &str;

    /// Resolves a pass by name. `None` is the "unavailable" sentinel: callers
    /// skip the affected draw instead of failing.
    fn pass(&self, name: &str) -> Option<ShaderPass>;

    /// Registers (or looks up) the buffer described by `desc`.
    fn register_buffer(&self, desc: &BufferDesc) -> Result<ConstantBuffer>;
}

/// Resolves a pass that a core cannot work without.
pub(crate) fn require_pass(technique: &dyn Technique, name: &'static str) -> Result<ShaderPass> {
    technique
        .pass(name)
        .ok_or_else(|| crate::errors::PostFxError::PassUnavailable {
            technique: technique.name().to_string(),
            pass: name,
        })
}
