// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transformation propagation for hierarchical scene graphs.
//!
//! `arbor_core` keeps a tree of nodes, each with a local transform, and
//! answers the question "where is this node in world space?" as cheaply as
//! possible. It is `no_std` compatible (with `alloc`) and uses array-based
//! struct-of-arrays storage with index handles.
//!
//! # Architecture
//!
//! ```text
//!   set_local_transform / set_parent
//!       │
//!       ▼
//!   set_dirty ──► Feature::mark_dirty        (whole subtree)
//!       │
//!       ▼
//!   set_clean_many ──► transformations ──► Feature::clean / clean_inverted
//!                                               │
//!                 ┌─────────────────────────────┘
//!                 ▼
//!   take_changes ──► SceneChanges
//! ```
//!
//! **[`node`]**: The [`Scene`] arena with generational [`NodeId`]
//! handles, reparenting, dirty propagation, absolute-transform queries and
//! clean-commit.
//!
//! **[`transformation`]**: The [`Transformation`] capability a scene is
//! generic over, implemented for [`Transform3d`] and [`kurbo::Affine`].
//!
//! **[`transform`]**: A 3D affine transform type.
//!
//! **[`feature`]**: The [`Feature`](feature::Feature) trait for per-node
//! state that consumes cached absolute matrices.
//!
//! **[`changes`]**: The change journal, built on `understory_dirty`.
//!
//! **[`error`]**: [`SolveError`] and the batch capacity limit.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! scene instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Example
//!
//! ```
//! use arbor_core::{Scene, Transform3d};
//!
//! let mut scene = Scene::<Transform3d>::new();
//! let arm = scene.create_child(scene.root());
//! let hand = scene.create_child(arm);
//! scene.set_local_transform(arm, Transform3d::from_translation(1.0, 0.0, 0.0));
//! scene.set_local_transform(hand, Transform3d::from_translation(0.0, 2.0, 0.0));
//!
//! let world = scene
//!     .transformations(scene.root(), &[hand, arm], Transform3d::IDENTITY)
//!     .unwrap();
//! assert_eq!(world[0].translation(), [1.0, 2.0, 0.0]);
//! assert_eq!(world[1].translation(), [1.0, 0.0, 0.0]);
//!
//! scene.set_clean_many(&[hand]).unwrap();
//! assert!(!scene.is_dirty(arm));
//! ```
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-node
//!   clean events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod changes;
pub mod error;
pub mod feature;
pub mod node;
pub mod trace;
pub mod transform;
pub mod transformation;

pub use changes::SceneChanges;
pub use error::{MAX_BATCH_NODES, SolveError};
pub use node::{NodeId, Scene};
pub use transform::Transform3d;
pub use transformation::Transformation;
