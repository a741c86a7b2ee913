// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for scene-graph operations.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! `*_traced` scene operations call as they run. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates the per-node [`NodeCleanEvent`].

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a node is moved under a new parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReparentEvent {
    /// Slot index of the moved node.
    pub node: u32,
    /// Slot index of the previous parent, if the node was attached.
    pub old_parent: Option<u32>,
    /// Slot index of the new parent.
    pub new_parent: u32,
}

/// Emitted after dirty propagation from a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyEvent {
    /// Slot index of the node the propagation started from.
    pub node: u32,
    /// Number of nodes that went from clean to dirty.
    pub marked: u32,
}

/// Emitted after a batch absolute-transformation query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolveEvent {
    /// Number of targets passed, duplicates included.
    pub targets: u32,
    /// Number of distinct joints the query resolved: each distinct target
    /// plus every node where two target paths merge.
    pub joints: u32,
    /// Number of `compose` calls performed.
    pub compositions: u32,
}

/// Emitted after a batch clean pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CleanPassEvent {
    /// Nodes passed in that were still dirty.
    pub requested: u32,
    /// Nodes solved after adding dirty ancestors.
    pub expanded: u32,
    /// Nodes actually committed.
    pub committed: u32,
}

/// Emitted for every node committed in a batch clean pass.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeCleanEvent {
    /// Slot index of the committed node.
    pub node: u32,
    /// Whether an absolute matrix was computed for its features.
    pub absolute: bool,
    /// Whether an inverted absolute matrix was computed for its features.
    pub inverted: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from scene operations.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a node was reparented.
    fn on_reparent(&mut self, e: &ReparentEvent) {
        _ = e;
    }

    /// Called after dirty propagation.
    fn on_dirty(&mut self, e: &DirtyEvent) {
        _ = e;
    }

    /// Called after a batch query.
    fn on_solve(&mut self, e: &SolveEvent) {
        _ = e;
    }

    /// Called after a batch clean pass.
    fn on_clean_pass(&mut self, e: &CleanPassEvent) {
        _ = e;
    }

    /// Called for each committed node (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_node_clean(&mut self, e: &NodeCleanEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`ReparentEvent`].
    #[inline]
    pub fn reparent(&mut self, e: &ReparentEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_reparent(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DirtyEvent`].
    #[inline]
    pub fn dirty(&mut self, e: &DirtyEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_dirty(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SolveEvent`].
    #[inline]
    pub fn solve(&mut self, e: &SolveEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_solve(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CleanPassEvent`].
    #[inline]
    pub fn clean_pass(&mut self, e: &CleanPassEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_clean_pass(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`NodeCleanEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn node_clean(&mut self, e: &NodeCleanEvent) {
        if let Some(s) = &mut self.sink {
            s.on_node_clean(e);
        }
    }
}

/// Saturating `usize` to `u32` conversion for event counters.
#[inline]
pub(crate) fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_reparent(&ReparentEvent {
            node: 1,
            old_parent: None,
            new_parent: 0,
        });
        sink.on_solve(&SolveEvent {
            targets: 3,
            joints: 4,
            compositions: 5,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.dirty(&DirtyEvent { node: 0, marked: 1 });
        tracer.clean_pass(&CleanPassEvent {
            requested: 1,
            expanded: 2,
            committed: 2,
        });
    }

    #[test]
    fn count_saturates() {
        assert_eq!(count(7), 7);
        assert_eq!(count(usize::MAX), u32::MAX);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_when_enabled() {
        #[derive(Default)]
        struct Counting {
            solves: u32,
        }
        impl TraceSink for Counting {
            fn on_solve(&mut self, e: &SolveEvent) {
                self.solves += e.targets;
            }
        }

        let mut sink = Counting::default();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.solve(&SolveEvent {
                targets: 2,
                joints: 2,
                compositions: 3,
            });
        }
        assert_eq!(sink.solves, 2);
    }
}
