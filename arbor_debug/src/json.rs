// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON event export.
//!
//! [`JsonSink`] implements [`TraceSink`] by turning every event into a
//! [`serde_json::Value`] object of the form
//! `{"seq": n, "name": "...", "cat": "...", "args": {...}}`.
//! [`write_json`](JsonSink::write_json) writes the collected events as one
//! JSON array, ready for scripts or a notebook.

use std::io::{self, Write};

use serde_json::{Value, json};

use arbor_core::trace::{
    CleanPassEvent, DirtyEvent, NodeCleanEvent, ReparentEvent, SolveEvent, TraceSink,
};

/// Collects trace events as JSON values.
#[derive(Debug, Default)]
pub struct JsonSink {
    events: Vec<Value>,
}

impl JsonSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events collected so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[Value] {
        &self.events
    }

    /// Discards all collected events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Writes the collected events as a pretty-printed JSON array.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from `writer`.
    pub fn write_json(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, &self.events)?;
        Ok(())
    }

    fn push(&mut self, name: &str, cat: &str, args: Value) {
        let seq = self.events.len();
        self.events.push(json!({
            "seq": seq,
            "name": name,
            "cat": cat,
            "args": args,
        }));
    }
}

impl TraceSink for JsonSink {
    fn on_reparent(&mut self, e: &ReparentEvent) {
        self.push(
            "Reparent",
            "Topology",
            json!({
                "node": e.node,
                "old_parent": e.old_parent,
                "new_parent": e.new_parent,
            }),
        );
    }

    fn on_dirty(&mut self, e: &DirtyEvent) {
        self.push(
            "Dirty",
            "Topology",
            json!({
                "node": e.node,
                "marked": e.marked,
            }),
        );
    }

    fn on_solve(&mut self, e: &SolveEvent) {
        self.push(
            "Solve",
            "Query",
            json!({
                "targets": e.targets,
                "joints": e.joints,
                "compositions": e.compositions,
            }),
        );
    }

    fn on_clean_pass(&mut self, e: &CleanPassEvent) {
        self.push(
            "CleanPass",
            "Clean",
            json!({
                "requested": e.requested,
                "expanded": e.expanded,
                "committed": e.committed,
            }),
        );
    }

    fn on_node_clean(&mut self, e: &NodeCleanEvent) {
        self.push(
            "NodeClean",
            "Rich",
            json!({
                "node": e.node,
                "absolute": e.absolute,
                "inverted": e.inverted,
            }),
        );
    }
}
