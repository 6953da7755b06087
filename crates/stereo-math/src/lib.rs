// SPDX-License-Identifier: CEPL-1.0
//! Geometry shared by the compositor: row-major 4x4 transforms, render-target
//! sizes and the UV-space to pixel-space rectangle conversions.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::ops::Mul;

/// Row-major 4x4 transform, `m[row][col]`.
///
/// `a * b` applies `b` first, then `a`: an eye view is
/// `eye_from_head * head_from_world`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Transform4x4 {
    pub m: [[f32; 4]; 4],
}

impl Transform4x4 {
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_rows(m: [[f32; 4]; 4]) -> Self {
        Self { m }
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut t = Self::IDENTITY;
        t.m[0][3] = x;
        t.m[1][3] = y;
        t.m[2][3] = z;
        t
    }

    pub fn from_mat4(mat: Mat4) -> Self {
        // columns of the transpose are the rows of `mat`
        Self {
            m: mat.transpose().to_cols_array_2d(),
        }
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.m).transpose()
    }

    /// The sixteen floats in row order, for callers that want a flat pointer.
    pub fn as_slice(&self) -> &[f32] {
        bytemuck::cast_slice(&self.m[..])
    }

    pub fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        self.as_slice()
            .iter()
            .zip(other.as_slice())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

impl Default for Transform4x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for Transform4x4 {
    fn from(mat: Mat4) -> Self {
        Self::from_mat4(mat)
    }
}

impl Mul for Transform4x4 {
    type Output = Transform4x4;

    fn mul(self, rhs: Transform4x4) -> Transform4x4 {
        matrix_mul(&self, &rhs)
    }
}

/// Render-target resolution in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size2D {
    pub width: i32,
    pub height: i32,
}

impl Size2D {
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Sub-rectangle of a render target in normalised texture coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UvRect {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl UvRect {
    pub const FULL: Self = Self {
        left: 0.0,
        right: 1.0,
        bottom: 0.0,
        top: 1.0,
    };

    pub const fn new(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }
}

/// Pixel-space rectangle, always derived from a [`UvRect`] and a [`Size2D`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub bottom: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn top(&self) -> i32 {
        self.bottom + self.height
    }
}

/// Angular extents of one eye's frustum, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldOfView {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl FieldOfView {
    pub const fn symmetric(degrees: f32) -> Self {
        Self {
            left: degrees,
            right: degrees,
            bottom: degrees,
            top: degrees,
        }
    }
}

pub fn matrix_mul(a: &Transform4x4, b: &Transform4x4) -> Transform4x4 {
    Transform4x4::from_mat4(a.to_mat4() * b.to_mat4())
}

/// Scales both X edges by `width` and both Y edges by `height`.
pub fn modulate_rect(rect: &UvRect, width: f32, height: f32) -> UvRect {
    UvRect {
        left: rect.left * width,
        right: rect.right * width,
        bottom: rect.bottom * height,
        top: rect.top * height,
    }
}

/// Edges are truncated toward zero, not rounded.
pub fn pixel_rect_from_uv(texture_size: Size2D, uv: &UvRect) -> PixelRect {
    let rect = modulate_rect(uv, texture_size.width as f32, texture_size.height as f32);
    let (left, right) = (rect.left as i32, rect.right as i32);
    let (bottom, top) = (rect.bottom as i32, rect.top as i32);
    PixelRect {
        left,
        bottom,
        width: right - left,
        height: top - bottom,
    }
}

/// Roughly half the pixels: each axis scaled by 7/10 (about sqrt(2)/2),
/// integer division.
pub fn half_pixel_count(size: Size2D) -> Size2D {
    // 7/10 of an i32 always fits back in one.
    let scale = |v: i32| (7 * i64::from(v) / 10) as i32;
    Size2D {
        width: scale(size.width),
        height: scale(size.height),
    }
}

/// OpenGL-style projection for an asymmetric field of view.
pub fn perspective_from_fov(fov: &FieldOfView, near: f32, far: f32) -> Transform4x4 {
    let left = -fov.left.to_radians().tan() * near;
    let right = fov.right.to_radians().tan() * near;
    let top = fov.top.to_radians().tan() * near;
    let bottom = -fov.bottom.to_radians().tan() * near;

    let r_width = 1.0 / (right - left);
    let r_height = 1.0 / (top - bottom);
    let r_depth = 1.0 / (near - far);

    let x = 2.0 * (near * r_width);
    let y = 2.0 * (near * r_height);
    let a = (right + left) * r_width;
    let b = (top + bottom) * r_height;
    let c = (far + near) * r_depth;
    let d = 2.0 * (far * near * r_depth);

    Transform4x4::from_mat4(Mat4::from_cols_array(&[
        x, 0.0, 0.0, 0.0, //
        0.0, y, 0.0, 0.0, //
        a, b, c, -1.0, //
        0.0, 0.0, d, 0.0,
    ]))
}
