//! GPU uniform layouts uploaded by the post-effect cores.
//!
//! Both structs are `#[repr(C)]` + [`Pod`] and padded to 16 bytes so they can
//! be uploaded byte-for-byte into a uniform buffer.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Clip-plane parameters consumed by the cross-section shader passes.
///
/// Plane *i* lives in column *i* of `plane_params` as `(nx, ny, nz, d)`.
/// A fragment at world position `p` is clipped when `dot(n, p) + d > 0`
/// for any enabled plane.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ClipParamsUniforms {
    pub cross_section_color: Vec4,
    /// One `u32` flag per plane (`0` = disabled).
    pub enable_planes: [u32; 4],
    pub plane_params: Mat4,
}

impl Default for ClipParamsUniforms {
    fn default() -> Self {
        Self {
            cross_section_color: super::color::FIREBRICK,
            enable_planes: [0; 4],
            plane_params: Mat4::ZERO,
        }
    }
}

impl ClipParamsUniforms {
    #[must_use]
    pub fn new(color: Vec4, enabled: [bool; 4], planes: Mat4) -> Self {
        Self {
            cross_section_color: color,
            enable_planes: enabled.map(u32::from),
            plane_params: planes,
        }
    }

    #[must_use]
    pub fn plane_enabled(&self, index: usize) -> bool {
        self.enable_planes[index] != 0
    }

    /// Returns `true` when `position` lies on the clipped side of any enabled plane.
    #[must_use]
    pub fn is_clipped(&self, position: glam::Vec3) -> bool {
        (0..4).any(|i| {
            self.plane_enabled(i) && {
                let plane = self.plane_params.col(i);
                plane.truncate().dot(position) + plane.w > 0.0
            }
        })
    }
}

/// Per-model parameters of the X-ray overlay passes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BorderEffectUniforms {
    pub color: Vec4,
    /// `x`: outline fading factor; `yzw` reserved.
    pub params: Vec4,
}

impl Default for BorderEffectUniforms {
    fn default() -> Self {
        Self {
            color: super::color::BLUE,
            params: Vec4::new(1.5, 0.0, 0.0, 0.0),
        }
    }
}
