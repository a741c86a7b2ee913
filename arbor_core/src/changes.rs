// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change-journal channel constants.
//!
//! Besides each node's own dirty flag, a [`Scene`](crate::node::Scene) keeps
//! a journal of what happened since the last
//! [`take_changes`](crate::node::Scene::take_changes) call, backed by
//! [`understory_dirty`]. Renderers drain it once per frame to upload only
//! the nodes whose cached matrices were refreshed.
//!
//! Both channels are local-only: the scene's own dirty propagation already
//! covers descendants, so the journal records exactly the nodes that were
//! touched.

use alloc::vec::Vec;

use understory_dirty::Channel;

/// A node committed fresh cached matrices in a clean pass.
pub const CLEANED: Channel = Channel::new(0);

/// A node was attached or moved, or its child list changed.
pub const TOPOLOGY: Channel = Channel::new(1);

/// Nodes touched since the previous [`take_changes`] call.
///
/// Entries are raw slot indices, sorted ascending and free of duplicates.
/// Indices of nodes destroyed in the meantime are never reported.
///
/// [`take_changes`]: crate::node::Scene::take_changes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SceneChanges {
    /// Nodes that committed fresh cached matrices.
    pub cleaned: Vec<u32>,
    /// Nodes that were attached or moved, or whose child list changed.
    pub topology: Vec<u32>,
}

impl SceneChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.cleaned.clear();
        self.topology.clear();
    }

    /// Returns whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cleaned.is_empty() && self.topology.is_empty()
    }
}
