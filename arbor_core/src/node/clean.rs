// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clean-commit: handing fresh matrices to features and clearing dirty flags.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use super::id::{INVALID, NodeId};
use super::store::Scene;
use crate::changes;
use crate::error::SolveError;
use crate::feature::CachedTransformations;
use crate::trace::{CleanPassEvent, Tracer, count};
use crate::transformation::Transformation;

#[cfg(feature = "trace-rich")]
use crate::trace::NodeCleanEvent;

impl<T: Transformation> Scene<T> {
    /// Cleans a node, computing only what it needs.
    ///
    /// Collects the node and its dirty ancestors up to the first clean
    /// ancestor (or the top of the tree), starts from that ancestor's
    /// absolute transformation, and commits each collected node top-down.
    /// Works for nodes in detached subtrees too.
    ///
    /// Does nothing if the node is already clean.
    pub fn set_clean(&mut self, node: NodeId) {
        self.validate(node);
        if !self.dirty[node.idx as usize] {
            return;
        }

        let mut path = Vec::new();
        let mut idx = node.idx;
        let mut absolute = loop {
            path.push(idx);
            let p = self.parent[idx as usize];
            if p == INVALID {
                break T::identity();
            }
            if !self.dirty[p as usize] {
                break self.absolute_transformation(self.id_at(p));
            }
            idx = p;
        };

        let mut tracer = Tracer::none();
        for &idx in path.iter().rev() {
            absolute = T::compose(absolute, self.local_transform[idx as usize]);
            self.commit(idx, absolute, &mut tracer);
        }
    }

    /// Cleans a node using an absolute transformation the caller already
    /// computed.
    ///
    /// Does nothing if the node is already clean. The caller is responsible
    /// for `absolute` being current.
    ///
    /// The node's parent must be clean (or absent): a clean node under a
    /// dirty parent would miss the parent's next invalidation. Debug builds
    /// panic on a dirty parent; release builds leave the node dirty.
    pub fn set_clean_with(&mut self, node: NodeId, absolute: T) {
        self.validate(node);
        let idx = node.idx as usize;
        if !self.dirty[idx] {
            return;
        }
        let p = self.parent[idx];
        let parent_clean = p == INVALID || !self.dirty[p as usize];
        debug_assert!(
            parent_clean,
            "set_clean_with requires a clean parent: {node:?} is under a dirty node"
        );
        if !parent_clean {
            return;
        }
        self.commit(node.idx, absolute, &mut Tracer::none());
    }

    /// Cleans many nodes with a single batch query.
    ///
    /// Nodes that are already clean are skipped. Dirty ancestors of the
    /// requested nodes are cleaned as well, since their matrices are computed
    /// along the way anyway. Duplicates are committed once.
    ///
    /// # Errors
    ///
    /// Fails with a capacity error if the nodes plus their dirty ancestors
    /// exceed what one batch query can hold; nothing is committed in that
    /// case. Nodes that are not attached to the scene root are a caller bug,
    /// reported as [`SolveError::NotInScene`] (and a panic in debug builds).
    pub fn set_clean_many(&mut self, nodes: &[NodeId]) -> Result<(), SolveError> {
        self.set_clean_many_traced(nodes, &mut Tracer::none())
    }

    /// Like [`set_clean_many`](Self::set_clean_many), reporting to `tracer`.
    ///
    /// # Errors
    ///
    /// See [`set_clean_many`](Self::set_clean_many).
    pub fn set_clean_many_traced(
        &mut self,
        nodes: &[NodeId],
        tracer: &mut Tracer<'_>,
    ) -> Result<(), SolveError> {
        for &node in nodes {
            self.validate(node);
        }

        // Requested nodes first, so an ancestor that was also requested is
        // not picked up twice by the ancestor walk below.
        let mut seen = BTreeSet::new();
        let mut expanded: Vec<u32> = nodes
            .iter()
            .map(|node| node.idx)
            .filter(|&idx| self.dirty[idx as usize] && seen.insert(idx))
            .collect();
        let requested = expanded.len();

        // A dirty node's dirty ancestors form an unbroken chain above it.
        for i in 0..requested {
            let mut p = self.parent[expanded[i] as usize];
            while p != INVALID && self.dirty[p as usize] && seen.insert(p) {
                expanded.push(p);
                p = self.parent[p as usize];
            }
        }

        let mut committed = 0;
        if !expanded.is_empty() {
            let targets: Vec<NodeId> = expanded.iter().map(|&idx| self.id_at(idx)).collect();
            let absolutes = self.transformations_traced(self.root(), &targets, T::identity(), tracer)?;

            for (&idx, absolute) in expanded.iter().zip(absolutes) {
                if !self.dirty[idx as usize] {
                    continue;
                }
                self.commit(idx, absolute, tracer);
                debug_assert!(!self.dirty[idx as usize], "node {idx} still dirty after commit");
                committed += 1;
            }
        }

        tracer.clean_pass(&CleanPassEvent {
            requested: count(requested),
            expanded: count(expanded.len()),
            committed: count(committed),
        });
        Ok(())
    }

    /// Hands `absolute` to the features of `idx` and clears its dirty flag.
    ///
    /// Each matrix kind is computed at most once and shared by every feature
    /// that asked for it.
    fn commit(&mut self, idx: u32, absolute: T, tracer: &mut Tracer<'_>) {
        let features = &mut self.features[idx as usize];
        features.retain(|f| f.strong_count() > 0);

        let mut matrix = None;
        let mut inverted = None;
        for feature in features.iter() {
            let Some(feature) = feature.upgrade() else {
                continue;
            };
            let mut feature = feature.borrow_mut();
            let wants = feature.cached_transformations();
            if wants.contains(CachedTransformations::ABSOLUTE) {
                let m = *matrix.get_or_insert_with(|| absolute.to_matrix());
                feature.clean(&m);
            }
            if wants.contains(CachedTransformations::INVERTED_ABSOLUTE) {
                let m = *inverted.get_or_insert_with(|| absolute.inverted().to_matrix());
                feature.clean_inverted(&m);
            }
        }

        self.dirty[idx as usize] = false;
        self.changes.mark(idx, changes::CLEANED);

        #[cfg(feature = "trace-rich")]
        tracer.node_clean(&NodeCleanEvent {
            node: idx,
            absolute: matrix.is_some(),
            inverted: inverted.is_some(),
        });
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = tracer;
        }
    }
}
