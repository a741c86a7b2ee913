// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by batch queries.

use core::fmt;

use crate::node::NodeId;

/// Exclusive upper bound on targets and joints in one batch query.
///
/// Joint indices are 16-bit; a query that would need index `0xFFFF` or above
/// fails with a capacity error instead of truncating.
pub const MAX_BATCH_NODES: usize = 0xFFFF;

/// Errors from [`Scene::transformations`](crate::node::Scene::transformations)
/// and [`Scene::set_clean_many`](crate::node::Scene::set_clean_many).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveError {
    /// More targets were passed than a batch can index.
    TooManyTargets {
        /// Number of targets passed.
        count: usize,
    },
    /// The targets branch into more joints than a batch can index.
    TooManyJoints,
    /// The anchor is not the scene root.
    ///
    /// Anchoring at an arbitrary subtree would require a nearest common
    /// ancestor reduction, which is not implemented.
    AnchorNotSceneRoot {
        /// The anchor that was passed.
        anchor: NodeId,
    },
    /// A node is not attached to the scene being queried.
    NotInScene {
        /// The offending node.
        node: NodeId,
    },
}

impl SolveError {
    /// Returns whether this is a capacity failure rather than a usage error.
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(self, Self::TooManyTargets { .. } | Self::TooManyJoints)
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyTargets { count } => write!(
                f,
                "batch of {count} targets exceeds the limit of {}",
                MAX_BATCH_NODES - 1
            ),
            Self::TooManyJoints => write!(
                f,
                "batch needs more than {} joints",
                MAX_BATCH_NODES - 1
            ),
            Self::AnchorNotSceneRoot { anchor } => {
                write!(f, "anchor {anchor:?} is not the scene root")
            }
            Self::NotInScene { node } => write!(f, "{node:?} is not part of the scene"),
        }
    }
}

impl core::error::Error for SolveError {}
