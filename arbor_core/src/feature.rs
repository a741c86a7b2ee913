// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Features: per-node state that consumes cached absolute transforms.
//!
//! A feature is anything attached to a node that needs to know where that
//! node ended up in world space: a drawable, a camera, a light, a collision
//! shape. Features declare which matrices they want through
//! [`Feature::cached_transformations`]; the scene computes each requested
//! matrix at most once per node per clean pass and hands the same value to
//! every feature on that node that asked for it.
//!
//! Features are owned by the caller as `Rc<RefCell<F>>`. Nodes only hold
//! [`Weak`](alloc::rc::Weak) references, so dropping the last `Rc` detaches
//! the feature; the scene prunes the dead reference the next time the node
//! is dirtied or cleaned.

use core::fmt;
use core::ops::BitOr;

use crate::transformation::Transformation;

/// Which cached matrices a feature wants on each clean pass.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CachedTransformations(u8);

impl CachedTransformations {
    /// No cached matrices; the feature only cares about dirty notifications.
    pub const NONE: Self = Self(0);
    /// The absolute (object-to-world) matrix.
    pub const ABSOLUTE: Self = Self(1 << 0);
    /// The inverted absolute (world-to-object) matrix.
    pub const INVERTED_ABSOLUTE: Self = Self(1 << 1);
    /// Both matrices.
    pub const BOTH: Self = Self(Self::ABSOLUTE.0 | Self::INVERTED_ABSOLUTE.0);

    /// Returns whether every bit in `other` is also set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns whether no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CachedTransformations {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for CachedTransformations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (
            self.contains(Self::ABSOLUTE),
            self.contains(Self::INVERTED_ABSOLUTE),
        ) {
            (false, false) => f.write_str("CachedTransformations(NONE)"),
            (true, false) => f.write_str("CachedTransformations(ABSOLUTE)"),
            (false, true) => f.write_str("CachedTransformations(INVERTED_ABSOLUTE)"),
            (true, true) => f.write_str("CachedTransformations(ABSOLUTE | INVERTED_ABSOLUTE)"),
        }
    }
}

/// Attachable per-node state notified when its node's transform changes.
///
/// All methods have default implementations, so a feature only overrides the
/// hooks it needs.
pub trait Feature<T: Transformation> {
    /// Which matrices [`clean`](Self::clean) and
    /// [`clean_inverted`](Self::clean_inverted) should receive.
    fn cached_transformations(&self) -> CachedTransformations {
        CachedTransformations::NONE
    }

    /// Called when the owning node (or one of its ancestors) becomes dirty.
    ///
    /// Previously received matrices are stale after this call.
    fn mark_dirty(&mut self) {}

    /// Receives the node's absolute matrix during a clean pass.
    ///
    /// Only called if [`cached_transformations`](Self::cached_transformations)
    /// contains [`CachedTransformations::ABSOLUTE`].
    fn clean(&mut self, absolute: &T::Matrix) {
        _ = absolute;
    }

    /// Receives the node's inverted absolute matrix during a clean pass.
    ///
    /// Only called if [`cached_transformations`](Self::cached_transformations)
    /// contains [`CachedTransformations::INVERTED_ABSOLUTE`].
    fn clean_inverted(&mut self, inverted_absolute: &T::Matrix) {
        _ = inverted_absolute;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_contains_each_kind() {
        let both = CachedTransformations::ABSOLUTE | CachedTransformations::INVERTED_ABSOLUTE;
        assert_eq!(both, CachedTransformations::BOTH);
        assert!(both.contains(CachedTransformations::ABSOLUTE));
        assert!(both.contains(CachedTransformations::INVERTED_ABSOLUTE));
        assert!(!CachedTransformations::ABSOLUTE.contains(CachedTransformations::BOTH));
    }

    #[test]
    fn none_is_empty() {
        assert!(CachedTransformations::NONE.is_empty());
        assert!(CachedTransformations::default().is_empty());
        assert!(!CachedTransformations::ABSOLUTE.is_empty());
    }
}
