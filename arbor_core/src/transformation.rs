// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The transformation capability consumed by the scene graph.
//!
//! A [`Scene`](crate::node::Scene) never looks inside a transformation. It
//! only needs to compose, invert, and convert values to and from the matrix
//! type that [features](crate::feature) consume. Any representation (2-D or
//! 3-D, matrix, dual quaternion, rigid motion, …) works as long as it obeys
//! two laws:
//!
//! - `compose` is associative.
//! - `compose(a, b).to_matrix() == a.to_matrix() * b.to_matrix()`, i.e.
//!   composition order matches matrix multiplication order, with the parent
//!   on the left.
//!
//! Implementations are provided for [`Transform3d`] and [`kurbo::Affine`].

use core::fmt::Debug;

use kurbo::Affine;

use crate::transform::Transform3d;

/// A transformation value type usable as a node's local transform.
pub trait Transformation: Copy + Debug {
    /// The matrix representation handed to features.
    type Matrix: Copy + Debug;

    /// The transformation that leaves everything in place.
    fn identity() -> Self;

    /// Composes `child` into the space of `parent`.
    ///
    /// For a node with absolute transform `parent` and local transform
    /// `child`, the result is the node's child-space-to-world transform.
    fn compose(parent: Self, child: Self) -> Self;

    /// Returns the inverse transformation.
    fn inverted(self) -> Self;

    /// Converts to the matrix representation.
    fn to_matrix(self) -> Self::Matrix;

    /// Converts from the matrix representation.
    fn from_matrix(matrix: &Self::Matrix) -> Self;
}

impl Transformation for Transform3d {
    type Matrix = Self;

    #[inline]
    fn identity() -> Self {
        Self::IDENTITY
    }

    #[inline]
    fn compose(parent: Self, child: Self) -> Self {
        parent * child
    }

    #[inline]
    fn inverted(self) -> Self {
        self.inverse()
    }

    #[inline]
    fn to_matrix(self) -> Self {
        self
    }

    #[inline]
    fn from_matrix(matrix: &Self) -> Self {
        *matrix
    }
}

impl Transformation for Affine {
    type Matrix = Self;

    #[inline]
    fn identity() -> Self {
        Self::IDENTITY
    }

    #[inline]
    fn compose(parent: Self, child: Self) -> Self {
        parent * child
    }

    #[inline]
    fn inverted(self) -> Self {
        self.inverse()
    }

    #[inline]
    fn to_matrix(self) -> Self {
        self
    }

    #[inline]
    fn from_matrix(matrix: &Self) -> Self {
        *matrix
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Affine, Point};

    use super::*;

    #[test]
    fn affine_composes_parent_first() {
        let parent = Affine::translate((10.0, 0.0));
        let child = Affine::scale(2.0);
        let world = Affine::compose(parent, child);
        // The child's scale applies in the parent's translated space.
        assert_eq!(world * Point::new(1.0, 1.0), Point::new(12.0, 2.0));
    }

    #[test]
    fn affine_inverse_undoes_composition() {
        let t = Affine::compose(Affine::translate((3.0, -1.0)), Affine::scale(4.0));
        let back = Affine::compose(t, t.inverted());
        let coeffs = back.as_coeffs();
        let identity = Affine::IDENTITY.as_coeffs();
        for (a, b) in coeffs.iter().zip(identity.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn matrix_order_matches_composition_order() {
        let a = Transform3d::from_translation(1.0, 2.0, 3.0);
        let b = Transform3d::from_scale(2.0, 2.0, 2.0);
        assert_eq!(
            Transform3d::compose(a, b).to_matrix(),
            a.to_matrix() * b.to_matrix()
        );
        assert_eq!(Transform3d::from_matrix(&a.to_matrix()), a);
    }

    #[test]
    fn identity_is_neutral() {
        let t = Transform3d::from_translation(4.0, 5.0, 6.0);
        assert_eq!(Transform3d::compose(Transform3d::identity(), t), t);
        assert_eq!(Transform3d::compose(t, Transform3d::identity()), t);
        let a = Affine::translate((4.0, 5.0));
        assert_eq!(Affine::compose(Affine::identity(), a), a);
    }
}
