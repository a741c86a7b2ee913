// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal iterators.

use super::id::{INVALID, NodeId};
use super::store::Scene;
use crate::transformation::Transformation;

/// An iterator over the direct children of a node, in insertion order.
///
/// Created by [`Scene::children`].
#[derive(Debug)]
pub struct Children<'a, T: Transformation> {
    scene: &'a Scene<T>,
    current: u32,
}

impl<'a, T: Transformation> Children<'a, T> {
    pub(crate) fn new(scene: &'a Scene<T>, first: u32) -> Self {
        Self {
            scene,
            current: first,
        }
    }
}

impl<T: Transformation> Iterator for Children<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.scene.next_sibling[idx as usize];
        Some(self.scene.id_at(idx))
    }
}

/// An iterator over the proper ancestors of a node, nearest first.
///
/// Created by [`Scene::ancestors`].
#[derive(Debug)]
pub struct Ancestors<'a, T: Transformation> {
    scene: &'a Scene<T>,
    current: u32,
}

impl<'a, T: Transformation> Ancestors<'a, T> {
    pub(crate) fn new(scene: &'a Scene<T>, start: u32) -> Self {
        Self {
            scene,
            current: scene.parent[start as usize],
        }
    }
}

impl<T: Transformation> Iterator for Ancestors<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.scene.parent[idx as usize];
        Some(self.scene.id_at(idx))
    }
}
