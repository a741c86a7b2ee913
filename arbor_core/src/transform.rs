// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transform for 3-D scenes.
//!
//! [`Transform3d`] is the built-in 3-D [`Transformation`](crate::Transformation):
//! it composes by matrix multiplication and is its own matrix representation,
//! so features receive exactly the value the solver produced.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column*, matching the memory layout GPU APIs
/// expect for uniform uploads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from a column-major 2-D array.
    #[inline]
    #[must_use]
    pub const fn from_cols_array_2d(cols: [[f64; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Returns the translation part `(x, y, z)`.
    #[inline]
    #[must_use]
    pub const fn translation(self) -> [f64; 3] {
        [self.cols[3][0], self.cols[3][1], self.cols[3][2]]
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        #[cfg(feature = "std")]
        let (s, c) = radians.sin_cos();
        #[cfg(not(feature = "std"))]
        let (s, c) = (radians.sin(), radians.cos());
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Returns the determinant.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let s = top_minors(&self.cols);
        let c = bottom_minors(&self.cols);
        s[0] * c[5] - s[1] * c[4] + s[2] * c[3] + s[3] * c[2] - s[4] * c[1] + s[5] * c[0]
    }

    /// Returns the inverse transform.
    ///
    /// A singular matrix yields non-finite entries; check the result with
    /// [`is_finite`](Self::is_finite) when the input may be degenerate.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let s = top_minors(&self.cols);
        let c = bottom_minors(&self.cols);
        let inv_det = 1.0 / self.determinant();
        // Row `r`, column `k` lives at `cols[k][r]`.
        let a = |r: usize, k: usize| self.cols[k][r];

        let rows = [
            [
                a(1, 1) * c[5] - a(1, 2) * c[4] + a(1, 3) * c[3],
                -a(0, 1) * c[5] + a(0, 2) * c[4] - a(0, 3) * c[3],
                a(3, 1) * s[5] - a(3, 2) * s[4] + a(3, 3) * s[3],
                -a(2, 1) * s[5] + a(2, 2) * s[4] - a(2, 3) * s[3],
            ],
            [
                -a(1, 0) * c[5] + a(1, 2) * c[2] - a(1, 3) * c[1],
                a(0, 0) * c[5] - a(0, 2) * c[2] + a(0, 3) * c[1],
                -a(3, 0) * s[5] + a(3, 2) * s[2] - a(3, 3) * s[1],
                a(2, 0) * s[5] - a(2, 2) * s[2] + a(2, 3) * s[1],
            ],
            [
                a(1, 0) * c[4] - a(1, 1) * c[2] + a(1, 3) * c[0],
                -a(0, 0) * c[4] + a(0, 1) * c[2] - a(0, 3) * c[0],
                a(3, 0) * s[4] - a(3, 1) * s[2] + a(3, 3) * s[0],
                -a(2, 0) * s[4] + a(2, 1) * s[2] - a(2, 3) * s[0],
            ],
            [
                -a(1, 0) * c[3] + a(1, 1) * c[1] - a(1, 2) * c[0],
                a(0, 0) * c[3] - a(0, 1) * c[1] + a(0, 2) * c[0],
                -a(3, 0) * s[3] + a(3, 1) * s[1] - a(3, 2) * s[0],
                a(2, 0) * s[3] - a(2, 1) * s[1] + a(2, 2) * s[0],
            ],
        ];

        let mut cols = [[0.0_f64; 4]; 4];
        for (r, row) in rows.iter().enumerate() {
            for (k, v) in row.iter().enumerate() {
                cols[k][r] = v * inv_det;
            }
        }
        Self { cols }
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Is this transform [NaN]?
    ///
    /// [NaN]: f64::is_nan
    #[inline]
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.cols.iter().flatten().any(|v| v.is_nan())
    }
}

/// 2×2 minors of the top two rows, used by the cofactor expansion.
fn top_minors(m: &[[f64; 4]; 4]) -> [f64; 6] {
    let a = |r: usize, k: usize| m[k][r];
    [
        a(0, 0) * a(1, 1) - a(1, 0) * a(0, 1),
        a(0, 0) * a(1, 2) - a(1, 0) * a(0, 2),
        a(0, 0) * a(1, 3) - a(1, 0) * a(0, 3),
        a(0, 1) * a(1, 2) - a(1, 1) * a(0, 2),
        a(0, 1) * a(1, 3) - a(1, 1) * a(0, 3),
        a(0, 2) * a(1, 3) - a(1, 2) * a(0, 3),
    ]
}

/// 2×2 minors of the bottom two rows.
fn bottom_minors(m: &[[f64; 4]; 4]) -> [f64; 6] {
    let a = |r: usize, k: usize| m[k][r];
    [
        a(2, 0) * a(3, 1) - a(3, 0) * a(2, 1),
        a(2, 0) * a(3, 2) - a(3, 0) * a(2, 2),
        a(2, 0) * a(3, 3) - a(3, 0) * a(2, 3),
        a(2, 1) * a(3, 2) - a(3, 1) * a(2, 2),
        a(2, 1) * a(3, 3) - a(3, 1) * a(2, 3),
        a(2, 2) * a(3, 3) - a(3, 2) * a(2, 3),
    ]
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Transform3d, b: Transform3d) {
        for (ca, cb) in a.cols.iter().zip(b.cols.iter()) {
            for (x, y) in ca.iter().zip(cb.iter()) {
                assert!((x - y).abs() < 1e-9, "{a:?} != {b:?}");
            }
        }
    }

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform3d::default(), Transform3d::IDENTITY);
    }

    #[test]
    fn translation_composition() {
        let a = Transform3d::from_translation(1.0, 0.0, 0.0);
        let b = Transform3d::from_translation(0.0, 2.0, 0.0);
        assert_eq!((a * b).translation(), [1.0, 2.0, 0.0]);
    }

    #[test]
    fn scale_then_translate() {
        let s = Transform3d::from_scale(2.0, 2.0, 2.0);
        let t = Transform3d::from_translation(3.0, 4.0, 0.0);
        let combined = t * s;
        assert_eq!(combined.col(0), [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(combined.col(3), [3.0, 4.0, 0.0, 1.0]);
    }

    #[test]
    fn identity_determinant_is_one() {
        assert_eq!(Transform3d::IDENTITY.determinant(), 1.0);
        assert_eq!(Transform3d::from_scale(2.0, 3.0, 4.0).determinant(), 24.0);
    }

    #[test]
    fn inverse_of_translation() {
        let t = Transform3d::from_translation(5.0, -6.0, 7.0);
        assert_eq!(t.inverse(), Transform3d::from_translation(-5.0, 6.0, -7.0));
    }

    #[test]
    fn inverse_round_trips_general_transform() {
        let t = Transform3d::from_translation(1.0, 2.0, 3.0)
            * Transform3d::from_rotation_z(0.7)
            * Transform3d::from_scale(2.0, 0.5, 4.0);
        assert_close(t * t.inverse(), Transform3d::IDENTITY);
        assert_close(t.inverse() * t, Transform3d::IDENTITY);
    }

    #[test]
    fn singular_inverse_is_not_finite() {
        let flat = Transform3d::from_scale(1.0, 0.0, 1.0);
        assert!(!flat.inverse().is_finite());
    }

    #[test]
    fn nan_detected() {
        let mut t = Transform3d::IDENTITY;
        t.cols[2][1] = f64::NAN;
        assert!(!t.is_finite());
        assert!(t.is_nan());
    }
}
