// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use stratum_core::trace::{
    BoxEvent, BoxEventKind, FrameSummary, RetainAction, RetainEvent, SurfaceEvent,
    SurfaceEventKind, SweepEvent, TraceSink,
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

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

pub(crate) fn box_kind_name(kind: BoxEventKind) -> &'static str {
    match kind {
        BoxEventKind::Finalized => "finalized",
        BoxEventKind::DeletedPermanently => "deleted",
        BoxEventKind::Reclaimed => "reclaimed",
    }
}

pub(crate) fn surface_kind_name(kind: SurfaceEventKind) -> &'static str {
    match kind {
        SurfaceEventKind::Allocated => "allocated",
        SurfaceEventKind::Reused => "reused",
        SurfaceEventKind::Backup => "backup",
        SurfaceEventKind::Released => "released",
    }
}

pub(crate) fn retain_action_name(action: RetainAction) -> &'static str {
    match action {
        RetainAction::Reused => "reused",
        RetainAction::Created => "created",
        RetainAction::Released => "released",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_box_event(&mut self, e: &BoxEvent) {
        let _ = writeln!(
            self.writer,
            "[box:{}] id={}",
            box_kind_name(e.kind),
            e.box_id.get(),
        );
    }

    fn on_sweep(&mut self, e: &SweepEvent) {
        let _ = writeln!(
            self.writer,
            "[sweep] finalized={} deleted={} live={}",
            e.finalized, e.deleted_permanently, e.live_after,
        );
    }

    fn on_surface_event(&mut self, e: &SurfaceEvent) {
        let _ = writeln!(
            self.writer,
            "[surface:{}] frame={} surface={}@{}",
            surface_kind_name(e.kind),
            e.frame_index,
            e.surface.index(),
            e.surface.epoch(),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} reused={} created={} released={} \
             transforms={} clips={} surfaces={}",
            s.frame_index,
            s.reused,
            s.created,
            s.released,
            s.transforms_recomputed,
            s.clips_recomputed,
            s.surfaces_live,
        );
    }

    fn on_retain(&mut self, e: &RetainEvent) {
        let _ = writeln!(
            self.writer,
            "[retain:{}] frame={} node={} op={:?}",
            retain_action_name(e.action),
            e.frame_index,
            e.node,
            e.op,
        );
    }
}
