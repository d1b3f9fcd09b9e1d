//! In-memory [`Technique`] for the software device.

use std::cell::RefCell;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::device::SoftwareDevice;
use super::shaders;
use crate::errors::{PostFxError, Result};
use crate::renderer::core::{
    BufferDesc, ConstantBuffer, DepthStencilMode, PassState, ShaderPass, Technique, pass_names,
};

/// Named passes plus a constant-buffer pool keyed by buffer name.
///
/// Registering a buffer name twice returns the same buffer when the sizes
/// agree, so several cores attached to one technique share it.
#[derive(Debug, Default)]
pub struct SoftwareTechnique {
    name: String,
    passes: RefCell<FxHashMap<String, ShaderPass>>,
    buffers: RefCell<FxHashMap<&'static str, ConstantBuffer>>,
}

impl SoftwareTechnique {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Registers `pass` under its own name, replacing any previous one.
    pub fn add_pass(&self, pass: ShaderPass) {
        self.passes.borrow_mut().insert(pass.name().to_string(), pass);
    }

    #[must_use]
    pub fn with_pass(self, pass: ShaderPass) -> Self {
        self.add_pass(pass);
        self
    }

    pub fn remove_pass(&self, name: &str) -> Option<ShaderPass> {
        self.passes.borrow_mut().remove(name)
    }

    /// Buffer registered under `name`, if any.
    #[must_use]
    pub fn buffer(&self, name: &str) -> Option<ConstantBuffer> {
        self.buffers.borrow().get(name).cloned()
    }
}

impl Technique for SoftwareTechnique {
    fn name(&self) -> &str {
        &self.name
    }

    fn pass(&self, name: &str) -> Option<ShaderPass> {
        self.passes.borrow().get(name).cloned()
    }

    fn register_buffer(&self, desc: &BufferDesc) -> Result<ConstantBuffer> {
        let mut buffers = self.buffers.borrow_mut();
        if let Some(existing) = buffers.get(desc.name) {
            if existing.size() != desc.size {
                return Err(PostFxError::BufferSizeMismatch {
                    name: desc.name,
                    registered: existing.size(),
                    requested: desc.size,
                });
            }
            return Ok(existing.clone());
        }
        let buffer = ConstantBuffer::new(*desc);
        buffers.insert(desc.name, buffer.clone());
        Ok(buffer)
    }
}

/// Pass states of the default passes.
pub mod states {
    use super::{DepthStencilMode, PassState};

    const NO_COLOR: wgpu::ColorWrites = wgpu::ColorWrites::empty();

    #[must_use]
    pub fn mesh() -> PassState {
        PassState::default()
    }

    /// Back faces increment the stencil regardless of depth; no colour.
    #[must_use]
    pub fn backface() -> PassState {
        PassState {
            depth_stencil: DepthStencilMode::disabled()
                .with_stencil(wgpu::CompareFunction::Always, wgpu::StencilOperation::IncrementClamp),
            blend: None,
            color_writes: NO_COLOR,
        }
    }

    /// Passes only where stencil equals the reference.
    #[must_use]
    pub fn screen_quad() -> PassState {
        PassState {
            depth_stencil: DepthStencilMode::disabled()
                .with_stencil(wgpu::CompareFunction::Equal, wgpu::StencilOperation::Keep),
            ..PassState::default()
        }
    }

    /// Marks visible, still unmarked pixels (reference 0); no colour.
    #[must_use]
    pub fn xray_mark() -> PassState {
        PassState {
            depth_stencil: DepthStencilMode::default()
                .with_depth(wgpu::CompareFunction::LessEqual, false)
                .with_stencil(wgpu::CompareFunction::Equal, wgpu::StencilOperation::IncrementClamp),
            blend: None,
            color_writes: NO_COLOR,
        }
    }

    /// Blends where stencil equals the reference and bumps it past it.
    #[must_use]
    pub fn xray_overlay() -> PassState {
        PassState {
            depth_stencil: DepthStencilMode::default()
                .with_depth(wgpu::CompareFunction::LessEqual, false)
                .with_stencil(wgpu::CompareFunction::Equal, wgpu::StencilOperation::IncrementClamp),
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            color_writes: wgpu::ColorWrites::ALL,
        }
    }

    #[must_use]
    pub fn depth_prepass() -> PassState {
        PassState {
            color_writes: NO_COLOR,
            ..PassState::default()
        }
    }
}

/// Technique providing every default pass, backed by the reference shaders.
pub fn reference_technique(device: &mut SoftwareDevice, name: &str) -> Arc<SoftwareTechnique> {
    let technique = SoftwareTechnique::new(name)
        .with_pass(device.register_pass(pass_names::MESH_DEFAULT, states::mesh(), shaders::mesh_color))
        .with_pass(device.register_pass(pass_names::BACKFACE, states::backface(), shaders::clip_backface))
        .with_pass(device.register_pass(pass_names::SCREEN_QUAD, states::screen_quad(), shaders::screen_quad))
        .with_pass(device.register_pass(pass_names::EFFECT_MESH_XRAY_P1, states::xray_mark(), shaders::depth_only))
        .with_pass(device.register_pass(pass_names::EFFECT_MESH_XRAY_P2, states::xray_overlay(), shaders::xray_color))
        .with_pass(device.register_pass(pass_names::DEPTH_PREPASS, states::depth_prepass(), shaders::depth_only));
    Arc::new(technique)
}
