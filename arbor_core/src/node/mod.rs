// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene graph.
//!
//! A *node* is an element of a transformation hierarchy. Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is destroyed, preventing use-after-free bugs at the API level.
//! - Topology: parent, first-child, and sibling links forming an ordered tree.
//!   Exactly one node per [`Scene`], its root, has no parent and can never be
//!   given one. Nodes created with [`create_node`](Scene::create_node) start
//!   detached and join the scene through [`set_parent`](Scene::set_parent).
//! - A local transform relative to its parent.
//! - A dirty flag, and the [features](crate::feature) that read the node's
//!   absolute transform when it is cleaned.
//!
//! # Dirty state
//!
//! A dirty node's descendants are always dirty too. Changing a node's local
//! transform or parent dirties its whole subtree and notifies every feature
//! in it. Cleaning hands fresh matrices to the features and clears the flag;
//! see [`set_clean`](Scene::set_clean) and
//! [`set_clean_many`](Scene::set_clean_many).
//!
//! # Queries
//!
//! [`absolute_transformation`](Scene::absolute_transformation) walks one
//! node's ancestry. [`transformations`](Scene::transformations) resolves many
//! nodes at once, composing every shared path segment only once.

mod clean;
mod id;
mod solve;
mod store;
mod traverse;

pub use id::{INVALID, NodeId};
pub use store::Scene;
pub use traverse::{Ancestors, Children};
