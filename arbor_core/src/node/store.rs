// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and dirty state.

use alloc::rc::{Rc, Weak};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use understory_dirty::{CycleHandling, DirtyTracker};

use super::id::{INVALID, NodeId};
use super::traverse::{Ancestors, Children};
use crate::changes::{self, SceneChanges};
use crate::feature::Feature;
use crate::trace::{DirtyEvent, ReparentEvent, Tracer, count};
use crate::transformation::Transformation;

/// A non-owning reference from a node to one of its features.
pub(crate) type FeatureRef<T> = Weak<RefCell<dyn Feature<T>>>;

/// A scene: one tree of nodes under a scene root, plus any detached nodes
/// waiting to be attached.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// The scene is single-threaded and provides no internal synchronization;
/// hosts that share one across threads must serialize access themselves.
pub struct Scene<T: Transformation> {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Per-node state --
    pub(crate) local_transform: Vec<T>,
    pub(crate) dirty: Vec<bool>,
    pub(crate) features: Vec<Vec<FeatureRef<T>>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
    pub(crate) root: u32,

    // -- Change journal --
    pub(crate) changes: DirtyTracker<u32>,
}

impl<T: Transformation> fmt::Debug for Scene<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("root", &self.root)
            .field("slots", &self.len)
            .field("free", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transformation> Default for Scene<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transformation> Scene<T> {
    /// Creates a scene containing only its root.
    ///
    /// The root starts dirty and its local transform is fixed at identity;
    /// batch queries place it in world space through their initial
    /// transform instead.
    #[must_use]
    pub fn new() -> Self {
        let mut scene = Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            local_transform: Vec::new(),
            dirty: Vec::new(),
            features: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            root: INVALID,
            changes: DirtyTracker::with_cycle_handling(CycleHandling::Error),
        };
        let root = scene.create_node();
        scene.root = root.idx;
        scene
    }

    // -- Allocation API --

    /// Creates a detached node and returns its handle.
    ///
    /// The node starts dirty, with an identity local transform, no parent,
    /// and no features. Attach it with [`set_parent`](Self::set_parent).
    pub fn create_node(&mut self) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            self.generation[idx as usize] += 1;
            self.parent[idx as usize] = INVALID;
            self.first_child[idx as usize] = INVALID;
            self.next_sibling[idx as usize] = INVALID;
            self.prev_sibling[idx as usize] = INVALID;
            self.local_transform[idx as usize] = T::identity();
            self.dirty[idx as usize] = true;
            self.features[idx as usize].clear();
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.local_transform.push(T::identity());
            self.dirty.push(true);
            self.features.push(Vec::new());
            self.generation.push(0);
            idx
        };
        self.id_at(idx)
    }

    /// Creates a node and attaches it as the last child of `parent`.
    pub fn create_child(&mut self, parent: NodeId) -> NodeId {
        self.validate(parent);
        let child = self.create_node();
        self.set_parent(child, parent);
        child
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// The node is unlinked from its parent first; its siblings keep their
    /// order. Feature references are dropped (the features themselves are
    /// owned by the caller).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, if `node` is the scene root, or if it
    /// still has children (use [`destroy_subtree`](Self::destroy_subtree)).
    pub fn destroy_node(&mut self, node: NodeId) {
        self.validate(node);
        let idx = node.idx;
        assert!(idx != self.root, "cannot destroy the scene root");
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );

        let p = self.parent[idx as usize];
        if p != INVALID {
            self.unlink_from_parent(idx);
            self.changes.mark(p, changes::TOPOLOGY);
        }
        self.features[idx as usize].clear();
        self.changes.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);
    }

    /// Destroys a node together with all of its descendants.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or if `node` is the scene root.
    pub fn destroy_subtree(&mut self, node: NodeId) {
        self.validate(node);
        assert!(node.idx != self.root, "cannot destroy the scene root");

        // Pre-order; destroying in reverse guarantees children go first.
        let mut order = Vec::new();
        let mut stack = vec![node.idx];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }
        }
        for idx in order.into_iter().rev() {
            self.destroy_node(self.id_at(idx));
        }
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len && self.generation[id.idx as usize] == id.generation
    }

    /// Returns the number of live nodes, the scene root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Makes `new_parent` the parent of `node`, appending it to the end of
    /// `new_parent`'s children.
    ///
    /// Returns whether the tree changed. The call is a no-op returning
    /// `false` if `new_parent` already is the parent, if `node` is the scene
    /// root, or if `new_parent` is `node` itself or one of its descendants.
    /// The last two are caller errors; the tree is left untouched rather
    /// than guessing what was meant.
    ///
    /// On success `node` and its whole subtree become dirty.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn set_parent(&mut self, node: NodeId, new_parent: NodeId) -> bool {
        self.set_parent_traced(node, new_parent, &mut Tracer::none())
    }

    /// Like [`set_parent`](Self::set_parent), reporting to `tracer`.
    pub fn set_parent_traced(
        &mut self,
        node: NodeId,
        new_parent: NodeId,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        self.validate(node);
        self.validate(new_parent);
        let c = node.idx;
        let p = new_parent.idx;

        if self.parent[c as usize] == p || c == self.root {
            return false;
        }

        // A node cannot become a child of itself or of its own descendant.
        let mut ancestor = p;
        while ancestor != INVALID {
            if ancestor == c {
                return false;
            }
            ancestor = self.parent[ancestor as usize];
        }

        let old = self.parent[c as usize];
        if old != INVALID {
            self.unlink_from_parent(c);
            self.changes.mark(old, changes::TOPOLOGY);
        }
        self.link_last_child(p, c);
        self.changes.mark(p, changes::TOPOLOGY);
        self.changes.mark(c, changes::TOPOLOGY);

        tracer.reparent(&ReparentEvent {
            node: c,
            old_parent: (old != INVALID).then_some(old),
            new_parent: p,
        });
        self.set_dirty_traced(node, tracer);
        true
    }

    /// Returns the scene root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.id_at(self.root)
    }

    /// Returns whether `node` is the scene root.
    #[must_use]
    pub fn is_scene_root(&self, node: NodeId) -> bool {
        self.validate(node);
        node.idx == self.root
    }

    /// Returns the scene root if `node` is attached to it, or `None` if
    /// `node` sits in a detached subtree.
    #[must_use]
    pub fn scene_root_of(&self, node: NodeId) -> Option<NodeId> {
        self.validate(node);
        let mut top = node.idx;
        while self.parent[top as usize] != INVALID {
            top = self.parent[top as usize];
        }
        (top == self.root).then(|| self.id_at(top))
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.validate(node);
        let p = self.parent[node.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Children<'_, T> {
        self.validate(node);
        Children::new(self, self.first_child[node.idx as usize])
    }

    /// Returns an iterator over the ancestors of a node, parent first.
    #[must_use]
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_, T> {
        self.validate(node);
        Ancestors::new(self, node.idx)
    }

    // -- Local transform API (auto-marks dirty) --

    /// Returns the local transform of a node.
    #[must_use]
    pub fn local_transform(&self, node: NodeId) -> T {
        self.validate(node);
        self.local_transform[node.idx as usize]
    }

    /// Replaces the local transform of a node and marks its subtree dirty.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or if `node` is the scene root.
    pub fn set_local_transform(&mut self, node: NodeId, transform: T) {
        self.validate(node);
        assert!(node.idx != self.root, "cannot transform the scene root");
        self.local_transform[node.idx as usize] = transform;
        self.set_dirty(node);
    }

    /// Applies `transform` in the node's local space (`local ∘ transform`).
    pub fn transform_local(&mut self, node: NodeId, transform: T) {
        let local = self.local_transform(node);
        self.set_local_transform(node, T::compose(local, transform));
    }

    /// Applies `transform` in the parent's space (`transform ∘ local`).
    pub fn transform_global(&mut self, node: NodeId, transform: T) {
        let local = self.local_transform(node);
        self.set_local_transform(node, T::compose(transform, local));
    }

    // -- Dirty state --

    /// Returns whether the node's cached matrices are stale.
    #[must_use]
    pub fn is_dirty(&self, node: NodeId) -> bool {
        self.validate(node);
        self.dirty[node.idx as usize]
    }

    /// Marks a node and its entire subtree dirty, invalidating every
    /// attached feature on the way.
    ///
    /// Returns immediately if the node is already dirty: a dirty node's
    /// descendants are always dirty too.
    pub fn set_dirty(&mut self, node: NodeId) {
        self.set_dirty_traced(node, &mut Tracer::none());
    }

    /// Like [`set_dirty`](Self::set_dirty), reporting to `tracer`.
    pub fn set_dirty_traced(&mut self, node: NodeId, tracer: &mut Tracer<'_>) {
        self.validate(node);
        if self.dirty[node.idx as usize] {
            return;
        }

        let mut marked = 0;
        let mut stack = vec![node.idx];
        while let Some(idx) = stack.pop() {
            if self.dirty[idx as usize] {
                continue;
            }
            self.invalidate_features(idx);
            self.dirty[idx as usize] = true;
            marked += 1;

            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }
        }

        tracer.dirty(&DirtyEvent {
            node: node.idx,
            marked: count(marked),
        });
    }

    // -- Features --

    /// Attaches a feature to a node.
    ///
    /// The node keeps a weak reference only. Attaching does not change the
    /// node's dirty state: a feature attached to a clean node receives its
    /// first matrices after the next [`set_dirty`](Self::set_dirty) and
    /// clean pass.
    pub fn attach_feature<F: Feature<T> + 'static>(&mut self, node: NodeId, feature: &Rc<RefCell<F>>) {
        self.validate(node);
        let weak = Rc::downgrade(feature);
        self.features[node.idx as usize].push(weak);
    }

    /// Detaches a feature from a node. Returns whether it was attached.
    pub fn detach_feature<F: Feature<T> + 'static>(
        &mut self,
        node: NodeId,
        feature: &Rc<RefCell<F>>,
    ) -> bool {
        self.validate(node);
        let target = Rc::as_ptr(feature);
        let features = &mut self.features[node.idx as usize];
        let before = features.len();
        features.retain(|f| !core::ptr::addr_eq(f.as_ptr(), target));
        features.len() != before
    }

    /// Returns the number of live features attached to a node.
    #[must_use]
    pub fn feature_count(&self, node: NodeId) -> usize {
        self.validate(node);
        self.features[node.idx as usize]
            .iter()
            .filter(|f| f.strong_count() > 0)
            .count()
    }

    // -- Change journal --

    /// Drains the change journal.
    #[must_use]
    pub fn take_changes(&mut self) -> SceneChanges {
        let mut changes = SceneChanges::default();
        self.take_changes_into(&mut changes);
        changes
    }

    /// Like [`take_changes`](Self::take_changes), reusing `out`'s allocations.
    pub fn take_changes_into(&mut self, out: &mut SceneChanges) {
        out.clear();
        out.cleaned
            .extend(self.changes.drain(changes::CLEANED).deterministic().run());
        out.topology
            .extend(self.changes.drain(changes::TOPOLOGY).deterministic().run());
        out.cleaned.sort_unstable();
        out.topology.sort_unstable();
    }

    // -- Internal helpers --

    /// Builds a handle for a live slot.
    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Calls `mark_dirty` on every live feature of `idx`, pruning dead ones.
    fn invalidate_features(&mut self, idx: u32) {
        let features = &mut self.features[idx as usize];
        features.retain(|f| f.strong_count() > 0);
        for feature in features.iter() {
            if let Some(feature) = feature.upgrade() {
                feature.borrow_mut().mark_dirty();
            }
        }
    }

    /// Appends `child` to the end of `parent`'s child list.
    fn link_last_child(&mut self, parent: u32, child: u32) {
        self.parent[child as usize] = parent;
        self.prev_sibling[child as usize] = INVALID;
        self.next_sibling[child as usize] = INVALID;

        if self.first_child[parent as usize] == INVALID {
            self.first_child[parent as usize] = child;
        } else {
            let mut last = self.first_child[parent as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = child;
            self.prev_sibling[child as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}
