// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Nodes are
//! printed by slot index.

use std::io::Write;

use arbor_core::trace::{
    CleanPassEvent, DirtyEvent, NodeCleanEvent, ReparentEvent, SolveEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink, returning the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_reparent(&mut self, e: &ReparentEvent) {
        let from = match e.old_parent {
            Some(p) => format!("#{p}"),
            None => "detached".to_owned(),
        };
        let _ = writeln!(
            self.writer,
            "[reparent] node=#{} from={from} to=#{}",
            e.node, e.new_parent,
        );
    }

    fn on_dirty(&mut self, e: &DirtyEvent) {
        let _ = writeln!(self.writer, "[dirty] node=#{} marked={}", e.node, e.marked);
    }

    fn on_solve(&mut self, e: &SolveEvent) {
        let _ = writeln!(
            self.writer,
            "[solve] targets={} joints={} compositions={}",
            e.targets, e.joints, e.compositions,
        );
    }

    fn on_clean_pass(&mut self, e: &CleanPassEvent) {
        let _ = writeln!(
            self.writer,
            "[clean] requested={} expanded={} committed={}",
            e.requested, e.expanded, e.committed,
        );
    }

    fn on_node_clean(&mut self, e: &NodeCleanEvent) {
        let kinds = match (e.absolute, e.inverted) {
            (false, false) => "none",
            (true, false) => "absolute",
            (false, true) => "inverted",
            (true, true) => "absolute+inverted",
        };
        let _ = writeln!(self.writer, "[clean:node] node=#{} matrices={kinds}", e.node);
    }
}
