//! Fragment programs run by the software device.

use bytemuck::Pod;
use glam::{UVec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

/// Interpolated inputs of one fragment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FragmentInput {
    /// Pixel coordinates (origin top-left).
    pub pixel: UVec2,
    /// Window-space depth in `[0, 1]`.
    pub depth: f32,
    /// World-space position (perspective-correct). Procedural draws report NDC.
    pub world_position: Vec3,
    pub front_facing: bool,
    /// Geometry colour, white for procedural draws.
    pub color: Vec4,
}

/// Last uploaded contents of every constant buffer, keyed by buffer name.
#[derive(Debug, Default, Clone)]
pub struct UniformStore {
    buffers: FxHashMap<&'static str, Vec<u8>>,
}

impl UniformStore {
    pub(crate) fn write(&mut self, name: &'static str, bytes: &[u8]) {
        let slot = self.buffers.entry(name).or_default();
        slot.clear();
        slot.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        self.buffers.get(name).map(Vec::as_slice)
    }

    /// Reads the buffer back as `T`. `None` when absent or of a different size.
    #[must_use]
    pub fn get<T: Pod>(&self, name: &str) -> Option<T> {
        self.bytes(name)
            .and_then(|bytes| bytemuck::try_pod_read_unaligned(bytes).ok())
    }
}

/// Per-pass fragment stage. Returning `None` discards the fragment.
pub trait FragmentProgram {
    fn shade(&self, input: &FragmentInput, uniforms: &UniformStore) -> Option<Vec4>;
}

impl<F> FragmentProgram for F
where
    F: Fn(&FragmentInput, &UniformStore) -> Option<Vec4>,
{
    fn shade(&self, input: &FragmentInput, uniforms: &UniformStore) -> Option<Vec4> {
        self(input, uniforms)
    }
}
