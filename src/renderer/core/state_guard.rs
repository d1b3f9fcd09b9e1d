//! Scoped pipeline-state save/restore.
//!
//! [`StateGuard`] snapshots the caller's output-merger bindings, viewport,
//! rasterizer state, topology and depth-stencil state, hands out the device
//! through `Deref`/`DerefMut`, and restores the snapshot when dropped. Early
//! returns inside a render core therefore cannot leak pass-specific state.

use std::ops::{Deref, DerefMut};

use super::device::{DeviceContext, Viewport};
use super::state::{DepthStencilMode, RasterizerState};
use super::view::TargetBinding;

struct SavedState {
    targets: TargetBinding,
    viewport: Viewport,
    rasterizer: RasterizerState,
    topology: wgpu::PrimitiveTopology,
    depth_stencil: DepthStencilMode,
    stencil_ref: u32,
}

/// Restores the captured device state when the scope ends.
pub struct StateGuard<'a> {
    device: &'a mut dyn DeviceContext,
    saved: SavedState,
}

impl<'a> StateGuard<'a> {
    pub fn new(device: &'a mut dyn DeviceContext) -> Self {
        let (depth_stencil, stencil_ref) = device.depth_stencil_state();
        let saved = SavedState {
            targets: device.output_targets(),
            viewport: device.viewport(),
            rasterizer: device.rasterizer_state(),
            topology: device.primitive_topology(),
            depth_stencil,
            stencil_ref,
        };
        Self { device, saved }
    }

    /// Targets that were bound when the guard was created.
    #[must_use]
    pub fn saved_targets(&self) -> &TargetBinding {
        &self.saved.targets
    }
}

impl<'a> Deref for StateGuard<'a> {
    type Target = dyn DeviceContext + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.device
    }
}

impl DerefMut for StateGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.device
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        let targets = std::mem::take(&mut self.saved.targets);
        let saved = &self.saved;
        self.device
            .set_output_targets(targets.depth_stencil.as_ref(), &targets.colors);
        self.device.set_viewport(saved.viewport);
        self.device.set_rasterizer_state(&saved.rasterizer);
        self.device.set_primitive_topology(saved.topology);
        self.device
            .set_depth_stencil_state(&saved.depth_stencil, saved.stencil_ref);
        // `targets` drops here, releasing the snapshot references.
    }
}
