// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON-lines trace output.
//!
//! [`JsonLinesSink`] writes every event as one JSON object on its own line.
//! Each object carries an `"event"` tag naming the event type.

use std::io::Write;

use serde_json::{Value, json};

use stratum_core::trace::{
    BoxEvent, FrameSummary, RetainEvent, SurfaceEvent, SweepEvent, TraceSink,
};

use crate::pretty::{box_kind_name, retain_action_name, surface_kind_name};

/// Writes one JSON object per event to a [`Write`](std::io::Write)
/// destination.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    lines: u64,
}

impl<W: Write> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl<W: Write> JsonLinesSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    /// Returns the number of lines written so far.
    #[must_use]
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, value: &Value) {
        if serde_json::to_writer(&mut self.writer, value).is_ok()
            && self.writer.write_all(b"\n").is_ok()
        {
            self.lines += 1;
        }
    }
}

impl<W: Write> TraceSink for JsonLinesSink<W> {
    fn on_box_event(&mut self, e: &BoxEvent) {
        self.emit(&json!({
            "event": "box",
            "kind": box_kind_name(e.kind),
            "box_id": e.box_id.get(),
        }));
    }

    fn on_sweep(&mut self, e: &SweepEvent) {
        self.emit(&json!({
            "event": "sweep",
            "finalized": e.finalized,
            "deleted_permanently": e.deleted_permanently,
            "live_after": e.live_after,
        }));
    }

    fn on_surface_event(&mut self, e: &SurfaceEvent) {
        self.emit(&json!({
            "event": "surface",
            "kind": surface_kind_name(e.kind),
            "frame_index": e.frame_index,
            "surface": e.surface.index(),
            "epoch": e.surface.epoch(),
        }));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.emit(&json!({
            "event": "frame_summary",
            "frame_index": s.frame_index,
            "reused": s.reused,
            "created": s.created,
            "released": s.released,
            "transforms_recomputed": s.transforms_recomputed,
            "clips_recomputed": s.clips_recomputed,
            "surfaces_live": s.surfaces_live,
        }));
    }

    fn on_retain(&mut self, e: &RetainEvent) {
        self.emit(&json!({
            "event": "retain",
            "action": retain_action_name(e.action),
            "frame_index": e.frame_index,
            "node": e.node,
            "op": format!("{:?}", e.op),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_event_is_one_line() {
        let mut sink = JsonLinesSink::new(Vec::<u8>::new());
        sink.on_sweep(&SweepEvent {
            finalized: 0,
            deleted_permanently: 3,
            live_after: 1,
        });
        sink.on_frame_summary(&FrameSummary {
            frame_index: 9,
            created: 2,
            ..FrameSummary::default()
        });
        assert_eq!(sink.lines(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines[0]["event"], "sweep");
        assert_eq!(lines[0]["deleted_permanently"], 3);
        assert_eq!(lines[1]["event"], "frame_summary");
        assert_eq!(lines[1]["frame_index"], 9);
        assert_eq!(lines[1]["created"], 2);
    }
}
