//! Reference fragment programs for the default passes.
//!
//! They read the same constant buffers the GPU shaders would
//! ([`ClipParamsUniforms`], [`BorderEffectUniforms`]) from the device's
//! [`UniformStore`].

use glam::Vec4;

use super::program::{FragmentInput, UniformStore};
use crate::renderer::core::buffer_names;
use crate::resources::{BorderEffectUniforms, ClipParamsUniforms, color};

/// Geometry colour, unclipped.
#[allow(clippy::unnecessary_wraps)]
pub fn mesh_color(input: &FragmentInput, _: &UniformStore) -> Option<Vec4> {
    Some(input.color)
}

/// Geometry colour with clipped fragments discarded.
pub fn clipped_mesh_color(input: &FragmentInput, uniforms: &UniformStore) -> Option<Vec4> {
    let clipped = uniforms
        .get::<ClipParamsUniforms>(buffer_names::CLIP_PARAMS_CB)
        .is_some_and(|clip| clip.is_clipped(input.world_position));
    (!clipped).then_some(input.color)
}

/// Stencil-only back-face pass: discards clipped fragments.
pub fn clip_backface(input: &FragmentInput, uniforms: &UniformStore) -> Option<Vec4> {
    clipped_mesh_color(input, uniforms).map(|_| Vec4::ZERO)
}

/// Section colour from the clip parameters.
#[allow(clippy::unnecessary_wraps)]
pub fn screen_quad(_: &FragmentInput, uniforms: &UniformStore) -> Option<Vec4> {
    Some(
        uniforms
            .get::<ClipParamsUniforms>(buffer_names::CLIP_PARAMS_CB)
            .map_or(color::FIREBRICK, |clip| clip.cross_section_color),
    )
}

/// X-ray overlay colour from the border-effect buffer.
#[allow(clippy::unnecessary_wraps)]
pub fn xray_color(_: &FragmentInput, uniforms: &UniformStore) -> Option<Vec4> {
    Some(
        uniforms
            .get::<BorderEffectUniforms>(buffer_names::BORDER_EFFECT_CB)
            .map_or(color::BLUE, |border| border.color),
    )
}

/// Depth/stencil-only passes; the colour is masked out by the pass state.
#[allow(clippy::unnecessary_wraps)]
pub fn depth_only(_: &FragmentInput, _: &UniformStore) -> Option<Vec4> {
    Some(Vec4::ZERO)
}
