//! Triangle geometry uploaded to the software device.

use glam::{Vec3, Vec4};

#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub label: String,
    pub positions: Vec<Vec3>,
    /// Triangle list indices, counter-clockwise front faces.
    pub indices: Vec<u32>,
    pub color: Vec4,
}

impl Geometry {
    #[must_use]
    pub fn new(label: impl Into<String>, positions: Vec<Vec3>, indices: Vec<u32>, color: Vec4) -> Self {
        Self {
            label: label.into(),
            positions,
            indices,
            color,
        }
    }

    /// Axis-aligned cube centred at `center` with half extent `half`.
    #[must_use]
    pub fn cube(center: Vec3, half: f32, color: Vec4) -> Self {
        // (normal, u, v) with u × v = normal, so every face winds CCW seen from outside.
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let base = positions.len() as u32;
            let face_center = center + normal * half;
            let (u, v) = (u * half, v * half);
            positions.extend_from_slice(&[
                face_center - u - v,
                face_center + u - v,
                face_center + u + v,
                face_center - u + v,
            ]);
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new("Cube", positions, indices, color)
    }

    /// Axis-aligned quad in the plane `z = center.z`, facing +Z.
    #[must_use]
    pub fn quad(center: Vec3, half_extent: f32, color: Vec4) -> Self {
        let (u, v) = (Vec3::X * half_extent, Vec3::Y * half_extent);
        Self::new(
            "Quad",
            vec![center - u - v, center + u - v, center + u + v, center - u + v],
            vec![0, 1, 2, 0, 2, 3],
            color,
        )
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
