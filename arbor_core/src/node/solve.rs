// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Absolute transformation queries.
//!
//! [`Scene::absolute_transformation`] is the uncached reference walk: it
//! composes every local transform from the node up to the top of its tree.
//!
//! [`Scene::transformations`] answers many targets at once. It first finds
//! the *joints* of the query: every target, plus every node where two
//! walked paths merge. Each joint's absolute transform is then computed once
//! from the nearest joint above it, so every edge of the union of the
//! target paths is composed exactly once, no matter how many targets share
//! it.
//!
//! All bookkeeping lives in locals of the call; nothing is left behind on
//! the nodes.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec;
use alloc::vec::Vec;

use super::id::{INVALID, NodeId};
use super::store::Scene;
use crate::error::{MAX_BATCH_NODES, SolveError};
use crate::trace::{SolveEvent, Tracer, count};
use crate::transformation::Transformation;

/// Progress of one joint through the computation stack.
#[derive(Clone, Copy, Debug)]
enum JointState<T> {
    Pending,
    /// The segment up to the joint above has been composed; waiting on it.
    Computing { segment: T, above: u16 },
    Done(T),
}

/// Converts a joint position to its index; callers keep `len` below
/// [`MAX_BATCH_NODES`].
#[expect(
    clippy::cast_possible_truncation,
    reason = "batch sizes are capped below u16::MAX before indexing"
)]
fn joint_index(len: usize) -> u16 {
    debug_assert!(len < MAX_BATCH_NODES, "joint index {len} out of range");
    len as u16
}

/// Reports a caller bug: fatal in debug builds, an `Err` otherwise.
#[track_caller]
pub(crate) fn usage_error<V>(err: SolveError) -> Result<V, SolveError> {
    if cfg!(debug_assertions) {
        panic!("{err}");
    }
    Err(err)
}

impl<T: Transformation> Scene<T> {
    /// Computes the absolute transformation of a node by walking to the top
    /// of its tree.
    ///
    /// Ignores cached state and dirty flags entirely. For a detached node
    /// the result is relative to the top of its detached subtree.
    #[must_use]
    pub fn absolute_transformation(&self, node: NodeId) -> T {
        self.validate(node);
        let mut absolute = self.local_transform[node.idx as usize];
        let mut p = self.parent[node.idx as usize];
        while p != INVALID {
            absolute = T::compose(self.local_transform[p as usize], absolute);
            p = self.parent[p as usize];
        }
        absolute
    }

    /// Computes the absolute transformations of many targets at once.
    ///
    /// Returns one value per target, in order, duplicates included. Each
    /// result is `initial` composed with the local transforms on the path
    /// from `anchor` (exclusive) down to the target (inclusive); a target
    /// equal to `anchor` yields `initial`.
    ///
    /// `anchor` must be the scene root; anchoring at an arbitrary subtree is
    /// not supported. Every target must be attached to the scene.
    ///
    /// # Errors
    ///
    /// Returns a capacity error if there are [`MAX_BATCH_NODES`] or more
    /// targets, or if they branch into that many joints.
    ///
    /// Returns [`SolveError::AnchorNotSceneRoot`] or
    /// [`SolveError::NotInScene`] for the corresponding caller bugs. Debug
    /// builds panic instead.
    ///
    /// # Panics
    ///
    /// Panics if any handle is stale, or on a caller bug in debug builds.
    pub fn transformations(
        &self,
        anchor: NodeId,
        targets: &[NodeId],
        initial: T,
    ) -> Result<Vec<T>, SolveError> {
        self.transformations_traced(anchor, targets, initial, &mut Tracer::none())
    }

    /// Like [`transformations`](Self::transformations), converting to and
    /// from the matrix representation.
    ///
    /// # Errors
    ///
    /// See [`transformations`](Self::transformations).
    pub fn transformation_matrices(
        &self,
        anchor: NodeId,
        targets: &[NodeId],
        initial: &T::Matrix,
    ) -> Result<Vec<T::Matrix>, SolveError> {
        let transformations = self.transformations(anchor, targets, T::from_matrix(initial))?;
        Ok(transformations.into_iter().map(T::to_matrix).collect())
    }

    /// Like [`transformations`](Self::transformations), reporting to
    /// `tracer`.
    ///
    /// # Errors
    ///
    /// See [`transformations`](Self::transformations).
    pub fn transformations_traced(
        &self,
        anchor: NodeId,
        targets: &[NodeId],
        initial: T,
        tracer: &mut Tracer<'_>,
    ) -> Result<Vec<T>, SolveError> {
        self.validate(anchor);
        for &target in targets {
            self.validate(target);
        }
        if anchor.idx != self.root {
            return usage_error(SolveError::AnchorNotSceneRoot { anchor });
        }
        if targets.len() >= MAX_BATCH_NODES {
            return Err(SolveError::TooManyTargets {
                count: targets.len(),
            });
        }
        let anchor = anchor.idx;

        // Every distinct target is a joint, indexed by first occurrence.
        let mut joints: Vec<u32> = Vec::new();
        let mut joint_of: BTreeMap<u32, u16> = BTreeMap::new();
        for target in targets {
            joint_of.entry(target.idx).or_insert_with(|| {
                joints.push(target.idx);
                joint_index(joints.len() - 1)
            });
        }

        // Walk each target upward. A walk ends at the anchor or at a joint;
        // reaching a node some earlier walk passed through makes it a joint.
        let mut visited: BTreeSet<u32> = BTreeSet::new();
        for t in 0..joints.len() {
            let start = joints[t];
            if start == anchor {
                continue;
            }
            let mut p = self.parent[start as usize];
            loop {
                if p == anchor || joint_of.contains_key(&p) {
                    break;
                }
                if p == INVALID {
                    let node = self.id_at(start);
                    return usage_error(SolveError::NotInScene { node });
                }
                if !visited.insert(p) {
                    if joints.len() >= MAX_BATCH_NODES {
                        return Err(SolveError::TooManyJoints);
                    }
                    joint_of.insert(p, joint_index(joints.len()));
                    joints.push(p);
                    break;
                }
                p = self.parent[p as usize];
            }
        }

        // Resolve joints top-down through an explicit stack; a joint waits
        // on the joint above it, never on one below.
        let mut compositions = 0_usize;
        let mut state = vec![JointState::Pending; joints.len()];
        let mut stack: Vec<u16> = Vec::new();
        for j in 0..joints.len() {
            stack.push(joint_index(j));
            while let Some(&j) = stack.last() {
                let j = usize::from(j);
                match state[j] {
                    JointState::Done(_) => {
                        stack.pop();
                    }
                    JointState::Pending if joints[j] == anchor => {
                        state[j] = JointState::Done(initial);
                        stack.pop();
                    }
                    JointState::Pending => {
                        let (segment, above) =
                            self.joint_segment(joints[j], anchor, &joint_of, &mut compositions);
                        if let Some(above) = above {
                            state[j] = JointState::Computing { segment, above };
                            stack.push(above);
                        } else {
                            state[j] = JointState::Done(T::compose(initial, segment));
                            compositions += 1;
                            stack.pop();
                        }
                    }
                    JointState::Computing { segment, above } => {
                        if let JointState::Done(base) = state[usize::from(above)] {
                            state[j] = JointState::Done(T::compose(base, segment));
                            compositions += 1;
                            stack.pop();
                        } else {
                            stack.push(above);
                        }
                    }
                }
            }
        }

        tracer.solve(&SolveEvent {
            targets: count(targets.len()),
            joints: count(joints.len()),
            compositions: count(compositions),
        });

        Ok(targets
            .iter()
            .map(|target| match state[usize::from(joint_of[&target.idx])] {
                JointState::Done(t) => t,
                JointState::Pending | JointState::Computing { .. } => {
                    unreachable!("joint of {target:?} left unresolved")
                }
            })
            .collect())
    }

    /// Composes the local transforms from `joint` up to, but excluding, the
    /// anchor or the nearest joint above it, whichever comes first.
    ///
    /// Returns the composed segment and the index of the joint above, or
    /// `None` if the walk reached the anchor.
    fn joint_segment(
        &self,
        joint: u32,
        anchor: u32,
        joint_of: &BTreeMap<u32, u16>,
        compositions: &mut usize,
    ) -> (T, Option<u16>) {
        let mut segment = self.local_transform[joint as usize];
        let mut p = self.parent[joint as usize];
        while p != anchor && p != INVALID {
            if let Some(&above) = joint_of.get(&p) {
                return (segment, Some(above));
            }
            segment = T::compose(self.local_transform[p as usize], segment);
            *compositions += 1;
            p = self.parent[p as usize];
        }
        (segment, None)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::Cell;

    use kurbo::Affine;

    use super::*;
    use crate::transform::Transform3d;

    // -- Compose-counting stub --

    std::thread_local! {
        static COMPOSES: Cell<u32> = const { Cell::new(0) };
    }

    fn reset_composes() {
        COMPOSES.with(|c| c.set(0));
    }

    fn composes() -> u32 {
        COMPOSES.with(Cell::get)
    }

    /// A 1-D offset whose compositions are counted.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Counted(i64);

    impl Transformation for Counted {
        type Matrix = i64;

        fn identity() -> Self {
            Self(0)
        }

        fn compose(parent: Self, child: Self) -> Self {
            COMPOSES.with(|c| c.set(c.get() + 1));
            Self(parent.0 + child.0)
        }

        fn inverted(self) -> Self {
            Self(-self.0)
        }

        fn to_matrix(self) -> i64 {
            self.0
        }

        fn from_matrix(matrix: &i64) -> Self {
            Self(*matrix)
        }
    }

    fn translate(x: f64, y: f64) -> Affine {
        Affine::translate((x, y))
    }

    /// A branchy tree with distinct offsets on every node.
    fn sample_tree(scene: &mut Scene<Transform3d>) -> Vec<NodeId> {
        let root = scene.root();
        let a = scene.create_child(root);
        let b = scene.create_child(a);
        let c = scene.create_child(b);
        let d = scene.create_child(b);
        let e = scene.create_child(root);
        let f = scene.create_child(e);
        let nodes = vec![a, b, c, d, e, f];
        for (i, &node) in nodes.iter().enumerate() {
            let k = i as f64 + 1.0;
            scene.set_local_transform(
                node,
                Transform3d::from_translation(k, 2.0 * k, 0.5)
                    * Transform3d::from_scale(1.0, 2.0, 1.0),
            );
        }
        nodes
    }

    #[test]
    fn absolute_walk_composes_parent_first() {
        let mut scene = Scene::<Affine>::new();
        let a = scene.create_child(scene.root());
        let b = scene.create_child(a);
        scene.set_local_transform(a, translate(10.0, 0.0));
        scene.set_local_transform(b, Affine::scale(2.0));
        assert_eq!(
            scene.absolute_transformation(b),
            translate(10.0, 0.0) * Affine::scale(2.0)
        );
    }

    #[test]
    fn absolute_walk_of_detached_node_is_relative_to_its_top() {
        let mut scene = Scene::<Affine>::new();
        let top = scene.create_node();
        let child = scene.create_child(top);
        scene.set_local_transform(top, translate(1.0, 0.0));
        scene.set_local_transform(child, translate(0.0, 1.0));
        assert_eq!(scene.absolute_transformation(child), translate(1.0, 1.0));
    }

    #[test]
    fn batch_agrees_with_absolute_walk() {
        let mut scene = Scene::<Transform3d>::new();
        let nodes = sample_tree(&mut scene);
        let root = scene.root();
        for &node in nodes.iter().chain([&root]) {
            let batch = scene
                .transformations(root, &[node], Transform3d::IDENTITY)
                .unwrap();
            assert_eq!(batch[0], scene.absolute_transformation(node));
        }
    }

    #[test]
    fn batch_of_many_agrees_with_singles() {
        let mut scene = Scene::<Transform3d>::new();
        let nodes = sample_tree(&mut scene);
        let root = scene.root();
        let all = scene
            .transformations(root, &nodes, Transform3d::IDENTITY)
            .unwrap();
        for (node, t) in nodes.iter().zip(&all) {
            let single = scene
                .transformations(root, &[*node], Transform3d::IDENTITY)
                .unwrap();
            assert_eq!(single[0], *t);
        }
    }

    #[test]
    fn duplicates_are_preserved_positionally() {
        let mut scene = Scene::<Affine>::new();
        let root = scene.root();
        let a = scene.create_child(root);
        let b = scene.create_child(a);
        scene.set_local_transform(a, translate(1.0, 0.0));
        scene.set_local_transform(b, translate(0.0, 1.0));

        let out = scene
            .transformations(root, &[b, a, b], Affine::IDENTITY)
            .unwrap();
        assert_eq!(
            out,
            vec![translate(1.0, 1.0), translate(1.0, 0.0), translate(1.0, 1.0)]
        );
    }

    #[test]
    fn duplicate_targets_equal_each_other() {
        let mut scene = Scene::<Transform3d>::new();
        let nodes = sample_tree(&mut scene);
        let root = scene.root();
        let targets = [nodes[2], nodes[5], nodes[2], nodes[1], nodes[5], nodes[2]];
        let out = scene
            .transformations(root, &targets, Transform3d::IDENTITY)
            .unwrap();
        assert_eq!(out.len(), targets.len());
        assert_eq!(out[0], out[2]);
        assert_eq!(out[0], out[5]);
        assert_eq!(out[1], out[4]);
    }

    #[test]
    fn initial_transform_is_applied_at_anchor() {
        let mut scene = Scene::<Affine>::new();
        let root = scene.root();
        let a = scene.create_child(root);
        scene.set_local_transform(a, Affine::scale(2.0));
        let initial = translate(5.0, 5.0);

        let out = scene.transformations(root, &[a, root], initial).unwrap();
        assert_eq!(out[0], initial * Affine::scale(2.0));
        assert_eq!(out[1], initial);
    }

    #[test]
    fn matrix_form_converts_both_ways() {
        let mut scene = Scene::<Transform3d>::new();
        let nodes = sample_tree(&mut scene);
        let root = scene.root();
        let initial = Transform3d::from_translation(0.0, 0.0, 4.0);
        let matrices = scene
            .transformation_matrices(root, &nodes, &initial)
            .unwrap();
        let values = scene.transformations(root, &nodes, initial).unwrap();
        assert_eq!(matrices, values);
    }

    #[test]
    fn empty_batch_is_empty() {
        let scene = Scene::<Affine>::new();
        let out = scene
            .transformations(scene.root(), &[], Affine::IDENTITY)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn shared_segments_are_composed_once() {
        // root -> a -> b -> {c, d}
        let mut scene = Scene::<Counted>::new();
        let root = scene.root();
        let a = scene.create_child(root);
        let b = scene.create_child(a);
        let c = scene.create_child(b);
        let d = scene.create_child(b);
        for (node, offset) in [(a, 1), (b, 10), (c, 100), (d, 1000)] {
            scene.set_local_transform(node, Counted(offset));
        }

        reset_composes();
        let out = scene
            .transformations(root, &[c, d], Counted::identity())
            .unwrap();
        assert_eq!(out, vec![Counted(111), Counted(1011)]);
        // a∘b once, initial once, then one edge each for c and d.
        assert_eq!(composes(), 4);
    }

    #[test]
    fn composition_count_is_linear_in_union_of_paths() {
        // A long shared trunk with many leaves hanging off the end.
        let mut scene = Scene::<Counted>::new();
        let mut tip = scene.root();
        for _ in 0..50 {
            tip = scene.create_child(tip);
            scene.set_local_transform(tip, Counted(1));
        }
        let leaves: Vec<_> = (0..20)
            .map(|_| {
                let leaf = scene.create_child(tip);
                scene.set_local_transform(leaf, Counted(1));
                leaf
            })
            .collect();

        reset_composes();
        let out = scene
            .transformations(scene.root(), &leaves, Counted::identity())
            .unwrap();
        assert!(out.iter().all(|t| *t == Counted(51)));
        // 49 trunk edges + 1 initial + 20 leaf edges.
        assert_eq!(composes(), 70);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn solve_event_counts_compositions() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Capture(Vec<SolveEvent>);
        impl TraceSink for Capture {
            fn on_solve(&mut self, e: &SolveEvent) {
                self.0.push(*e);
            }
        }

        let mut scene = Scene::<Counted>::new();
        let root = scene.root();
        let a = scene.create_child(root);
        let b = scene.create_child(a);
        let c = scene.create_child(a);

        let mut sink = Capture::default();
        reset_composes();
        scene
            .transformations_traced(
                root,
                &[b, c, b],
                Counted::identity(),
                &mut Tracer::new(&mut sink),
            )
            .unwrap();
        assert_eq!(
            sink.0,
            vec![SolveEvent {
                targets: 3,
                joints: 3,
                compositions: composes(),
            }]
        );
    }

    #[test]
    fn consecutive_queries_do_not_leak_state() {
        let mut scene = Scene::<Affine>::new();
        let root = scene.root();
        let a = scene.create_child(root);
        let b = scene.create_child(root);
        let c = scene.create_child(root);
        scene.set_local_transform(a, translate(1.0, 0.0));
        scene.set_local_transform(b, translate(0.0, 2.0));
        scene.set_local_transform(c, translate(3.0, 3.0));

        let first = scene
            .transformations(root, &[a, b], Affine::IDENTITY)
            .unwrap();
        let second = scene
            .transformations(root, &[b, c], Affine::IDENTITY)
            .unwrap();
        assert_eq!(first, vec![translate(1.0, 0.0), translate(0.0, 2.0)]);
        assert_eq!(second, vec![translate(0.0, 2.0), translate(3.0, 3.0)]);
    }

    #[test]
    fn target_on_path_of_another_target() {
        let mut scene = Scene::<Affine>::new();
        let root = scene.root();
        let a = scene.create_child(root);
        let b = scene.create_child(a);
        let c = scene.create_child(b);
        scene.set_local_transform(a, translate(1.0, 0.0));
        scene.set_local_transform(b, translate(2.0, 0.0));
        scene.set_local_transform(c, translate(4.0, 0.0));

        let out = scene
            .transformations(root, &[c, a], Affine::IDENTITY)
            .unwrap();
        assert_eq!(out, vec![translate(7.0, 0.0), translate(1.0, 0.0)]);
    }

    #[test]
    fn too_many_targets_is_a_capacity_error() {
        let mut scene = Scene::<Affine>::new();
        let a = scene.create_child(scene.root());
        let targets = vec![a; MAX_BATCH_NODES];
        let err = scene
            .transformations(scene.root(), &targets, Affine::IDENTITY)
            .unwrap_err();
        assert_eq!(
            err,
            SolveError::TooManyTargets {
                count: MAX_BATCH_NODES
            }
        );
        assert!(err.is_capacity());
    }

    #[test]
    fn just_below_capacity_succeeds() {
        let mut scene = Scene::<Affine>::new();
        let a = scene.create_child(scene.root());
        let targets = vec![a; MAX_BATCH_NODES - 1];
        let out = scene
            .transformations(scene.root(), &targets, Affine::IDENTITY)
            .unwrap();
        assert_eq!(out.len(), MAX_BATCH_NODES - 1);
    }

    /// Hangs a perfect binary tree with `1 << depth` leaves under `top`.
    fn binary_tree(scene: &mut Scene<Affine>, top: NodeId, depth: u32) -> Vec<NodeId> {
        let mut level = vec![top];
        for _ in 0..depth {
            level = level
                .iter()
                .flat_map(|&node| [scene.create_child(node), scene.create_child(node)])
                .collect();
        }
        level
    }

    #[test]
    fn branching_into_too_many_joints_is_a_capacity_error() {
        let mut scene = Scene::<Affine>::new();
        let root = scene.root();
        let top = scene.create_child(root);
        // 32768 leaves plus 32767 merge points below the anchor: exactly the
        // largest joint set a batch can index.
        let mut targets = binary_tree(&mut scene, top, 15);
        assert!(targets.len() < MAX_BATCH_NODES);
        let out = scene
            .transformations(root, &targets, Affine::IDENTITY)
            .unwrap();
        assert_eq!(out.len(), targets.len());

        // One more merge point tips it over.
        let side = scene.create_child(root);
        targets.extend(binary_tree(&mut scene, side, 1));
        assert!(targets.len() < MAX_BATCH_NODES);
        let err = scene
            .transformations(root, &targets, Affine::IDENTITY)
            .unwrap_err();
        assert_eq!(err, SolveError::TooManyJoints);
        assert!(err.is_capacity());
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "is not the scene root"))]
    fn anchor_must_be_scene_root() {
        let mut scene = Scene::<Affine>::new();
        let a = scene.create_child(scene.root());
        let b = scene.create_child(a);
        let err = scene.transformations(a, &[b], Affine::IDENTITY).unwrap_err();
        assert_eq!(err, SolveError::AnchorNotSceneRoot { anchor: a });
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "is not part of the scene"))]
    fn detached_target_is_rejected() {
        let mut scene = Scene::<Affine>::new();
        let root = scene.root();
        let attached = scene.create_child(root);
        let loose = scene.create_node();
        let loose_child = scene.create_child(loose);
        let err = scene
            .transformations(root, &[attached, loose_child], Affine::IDENTITY)
            .unwrap_err();
        assert_eq!(err, SolveError::NotInScene { node: loose_child });
    }
}
