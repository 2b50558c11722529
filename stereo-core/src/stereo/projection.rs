//! Per-eye projection and eye-to-head transforms.
//!
//! Matrices are row-major `m[row][col]`, right-handed, clip space
//! z in `[-1, 1]` (OpenGL convention).

use super::target::Eye;

pub type Mat4 = [[f32; 4]; 4];

pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Half-angle tangents of an eye's field of view. `left` and `bottom`
/// are negative for a view that straddles the optical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FovTangents {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl FovTangents {
    /// Centred field of view from a vertical angle in radians.
    pub fn symmetric(fov_y: f32, aspect: f32) -> Self {
        let t = (fov_y * 0.5).tan();
        let r = t * aspect;
        Self {
            left: -r,
            right: r,
            top: t,
            bottom: -t,
        }
    }

    /// Off-axis perspective frustum between `near` and `far`.
    pub fn frustum(&self, near: f32, far: f32) -> Mat4 {
        let w = self.right - self.left;
        let h = self.top - self.bottom;
        let d = far - near;
        [
            [2.0 / w, 0.0, (self.right + self.left) / w, 0.0],
            [0.0, 2.0 / h, (self.top + self.bottom) / h, 0.0],
            [0.0, 0.0, -(far + near) / d, -2.0 * far * near / d],
            [0.0, 0.0, -1.0, 0.0],
        ]
    }
}

/// Eye-to-head transform for an interpupillary distance in metres.
pub fn eye_offset(eye: Eye, ipd: f32) -> Mat4 {
    let half = ipd * 0.5;
    let mut m = IDENTITY;
    m[0][3] = match eye {
        Eye::Left => -half,
        Eye::Right => half,
    };
    m
}
