//! Fixed-function helpers of the software device: triangle setup and
//! coverage, depth/stencil comparisons and colour blending, all following
//! `wgpu` semantics.

use glam::{Vec2, Vec3, Vec4};

/// A vertex after the viewport transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ScreenVertex {
    /// Window coordinates, y down.
    pub position: Vec2,
    /// Window-space depth.
    pub depth: f32,
    /// `1 / w_clip`.
    pub inv_w: f32,
    /// Attribute interpolated perspective-correctly.
    pub world: Vec3,
}

/// Edge function of `p` against the directed edge `a → b` (y-down window space).
#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Top-left rule for positively oriented triangles in y-down space.
#[inline]
fn is_top_left(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    (d.y == 0.0 && d.x > 0.0) || d.y < 0.0
}

#[inline]
fn covers(w: f32, top_left: bool) -> bool {
    w > 0.0 || (w == 0.0 && top_left)
}

/// Interpolated fragment produced by [`rasterize_triangle`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Fragment {
    pub x: u32,
    pub y: u32,
    pub depth: f32,
    pub world: Vec3,
}

/// Calls `emit` for every pixel centre covered by the triangle, within
/// `width` × `height`. Degenerate triangles produce nothing.
pub(crate) fn rasterize_triangle(
    vertices: [ScreenVertex; 3],
    width: u32,
    height: u32,
    mut emit: impl FnMut(Fragment),
) {
    let [mut v0, mut v1, mut v2] = vertices;
    let mut area = edge(v0.position, v1.position, v2.position);
    if area == 0.0 || !area.is_finite() {
        return;
    }
    if area < 0.0 {
        std::mem::swap(&mut v1, &mut v2);
        area = -area;
    }

    let min = v0.position.min(v1.position).min(v2.position).floor().max(Vec2::ZERO);
    let max = v0
        .position
        .max(v1.position)
        .max(v2.position)
        .ceil()
        .min(Vec2::new(width as f32, height as f32));
    if min.x >= max.x || min.y >= max.y {
        return;
    }

    let top_left = [
        is_top_left(v1.position, v2.position),
        is_top_left(v2.position, v0.position),
        is_top_left(v0.position, v1.position),
    ];

    for y in (min.y as u32)..(max.y as u32) {
        for x in (min.x as u32)..(max.x as u32) {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(v1.position, v2.position, p);
            let w1 = edge(v2.position, v0.position, p);
            let w2 = edge(v0.position, v1.position, p);
            if !(covers(w0, top_left[0]) && covers(w1, top_left[1]) && covers(w2, top_left[2])) {
                continue;
            }

            let (b0, b1, b2) = (w0 / area, w1 / area, w2 / area);
            let depth = b0 * v0.depth + b1 * v1.depth + b2 * v2.depth;

            let inv_w = b0 * v0.inv_w + b1 * v1.inv_w + b2 * v2.inv_w;
            let world = (v0.world * (b0 * v0.inv_w)
                + v1.world * (b1 * v1.inv_w)
                + v2.world * (b2 * v2.inv_w))
                / inv_w;

            emit(Fragment { x, y, depth, world });
        }
    }
}

/// `new <compare> existing`, as `wgpu::CompareFunction` defines it.
#[inline]
pub(crate) fn compare<T: PartialOrd>(function: wgpu::CompareFunction, new: T, existing: T) -> bool {
    use wgpu::CompareFunction as C;
    match function {
        C::Never => false,
        C::Less => new < existing,
        C::Equal => new == existing,
        C::LessEqual => new <= existing,
        C::Greater => new > existing,
        C::NotEqual => new != existing,
        C::GreaterEqual => new >= existing,
        C::Always => true,
    }
}

/// Applies a stencil operation and the write mask.
#[inline]
pub(crate) fn apply_stencil_op(
    operation: wgpu::StencilOperation,
    value: u8,
    reference: u8,
    write_mask: u8,
) -> u8 {
    use wgpu::StencilOperation as S;
    let result = match operation {
        S::Keep => value,
        S::Zero => 0,
        S::Replace => reference,
        S::Invert => !value,
        S::IncrementClamp => value.saturating_add(1),
        S::DecrementClamp => value.saturating_sub(1),
        S::IncrementWrap => value.wrapping_add(1),
        S::DecrementWrap => value.wrapping_sub(1),
    };
    (value & !write_mask) | (result & write_mask)
}

fn blend_factor(factor: wgpu::BlendFactor, src: Vec4, dst: Vec4, alpha_channel: bool) -> Vec4 {
    use wgpu::BlendFactor as F;
    let splat = |v: f32| Vec4::splat(v);
    match factor {
        F::Zero => Vec4::ZERO,
        F::One => Vec4::ONE,
        F::Src => src,
        F::OneMinusSrc => Vec4::ONE - src,
        F::SrcAlpha => splat(src.w),
        F::OneMinusSrcAlpha => splat(1.0 - src.w),
        F::Dst => dst,
        F::OneMinusDst => Vec4::ONE - dst,
        F::DstAlpha => splat(dst.w),
        F::OneMinusDstAlpha => splat(1.0 - dst.w),
        F::SrcAlphaSaturated => {
            if alpha_channel {
                Vec4::ONE
            } else {
                splat(src.w.min(1.0 - dst.w))
            }
        }
        // Blend constant is fixed at white.
        F::Constant => Vec4::ONE,
        F::OneMinusConstant => Vec4::ZERO,
        other => {
            log::warn!("SoftwareDevice: blend factor {other:?} unsupported, using One");
            Vec4::ONE
        }
    }
}

fn blend_component(component: &wgpu::BlendComponent, src: Vec4, dst: Vec4, alpha_channel: bool) -> Vec4 {
    use wgpu::BlendOperation as O;
    let s = src * blend_factor(component.src_factor, src, dst, alpha_channel);
    let d = dst * blend_factor(component.dst_factor, src, dst, alpha_channel);
    match component.operation {
        O::Add => s + d,
        O::Subtract => s - d,
        O::ReverseSubtract => d - s,
        O::Min => src.min(dst),
        O::Max => src.max(dst),
    }
}

/// Blends `src` over `dst` and applies the channel write mask.
pub(crate) fn blend(
    state: Option<&wgpu::BlendState>,
    writes: wgpu::ColorWrites,
    src: Vec4,
    dst: Vec4,
) -> Vec4 {
    let blended = match state {
        None => src,
        Some(state) => {
            let rgb = blend_component(&state.color, src, dst, false);
            let alpha = blend_component(&state.alpha, src, dst, true);
            rgb.truncate().extend(alpha.w)
        }
    };
    let pick = |flag: wgpu::ColorWrites, new: f32, old: f32| if writes.contains(flag) { new } else { old };
    Vec4::new(
        pick(wgpu::ColorWrites::RED, blended.x, dst.x),
        pick(wgpu::ColorWrites::GREEN, blended.y, dst.y),
        pick(wgpu::ColorWrites::BLUE, blended.z, dst.z),
        pick(wgpu::ColorWrites::ALPHA, blended.w, dst.w),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32) -> ScreenVertex {
        ScreenVertex {
            position: Vec2::new(x, y),
            depth: 0.5,
            inv_w: 1.0,
            world: Vec3::new(x, y, 0.0),
        }
    }

    #[test]
    fn test_shared_edge_covered_once() {
        // Two triangles of a 4x4 square sharing the diagonal through pixel centres.
        let a = [vertex(0.0, 4.0), vertex(4.0, 4.0), vertex(4.0, 0.0)];
        let b = [vertex(0.0, 4.0), vertex(4.0, 0.0), vertex(0.0, 0.0)];
        let mut hits = [0u8; 16];
        for tri in [a, b] {
            rasterize_triangle(tri, 4, 4, |f| hits[(f.y * 4 + f.x) as usize] += 1);
        }
        assert!(hits.iter().all(|&h| h == 1), "{hits:?}");
    }

    #[test]
    fn test_winding_does_not_matter() {
        let mut cw = 0;
        let mut ccw = 0;
        rasterize_triangle([vertex(0.0, 0.0), vertex(4.0, 0.0), vertex(0.0, 4.0)], 4, 4, |_| cw += 1);
        rasterize_triangle([vertex(0.0, 0.0), vertex(0.0, 4.0), vertex(4.0, 0.0)], 4, 4, |_| ccw += 1);
        assert_eq!(cw, ccw);
        assert!(cw > 0);
    }

    #[test]
    fn test_stencil_ops() {
        use wgpu::StencilOperation as S;
        assert_eq!(apply_stencil_op(S::IncrementClamp, 255, 0, 0xff), 255);
        assert_eq!(apply_stencil_op(S::IncrementWrap, 255, 0, 0xff), 0);
        assert_eq!(apply_stencil_op(S::Replace, 3, 9, 0xff), 9);
        assert_eq!(apply_stencil_op(S::Replace, 3, 0xf0, 0x0f), 0x00);
        assert_eq!(apply_stencil_op(S::IncrementClamp, 1, 0, 0x00), 1);
    }

    #[test]
    fn test_alpha_blending() {
        let src = Vec4::new(0.0, 0.0, 1.0, 0.5);
        let out = blend(
            Some(&wgpu::BlendState::ALPHA_BLENDING),
            wgpu::ColorWrites::ALL,
            src,
            Vec4::ZERO,
        );
        assert!((out - Vec4::new(0.0, 0.0, 0.5, 0.5)).abs().max_element() < 1e-6);
    }

    #[test]
    fn test_color_write_mask() {
        let out = blend(None, wgpu::ColorWrites::empty(), Vec4::ONE, Vec4::ZERO);
        assert_eq!(out, Vec4::ZERO);
    }
}
