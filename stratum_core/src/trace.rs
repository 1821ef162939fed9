// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for resource lifetimes.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! collector, the surface pool and the retain pass call as they work. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates per-node [`RetainEvent`]s.

use crate::object::BoxId;
#[cfg(feature = "trace-rich")]
use crate::scene::OpKind;
use crate::surface::SurfaceId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What happened to a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoxEventKind {
    /// A dropped wrapper's reference was released by the collector.
    Finalized,
    /// A zero-reference box reached its terminal state.
    DeletedPermanently,
    /// A box was reclaimed by a hot restart.
    Reclaimed,
}

/// How a surface changed hands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceEventKind {
    /// A new surface was created and put on loan.
    Allocated,
    /// A released surface was put on loan again.
    Reused,
    /// The pool was at capacity and handed out the shared backup surface.
    Backup,
    /// A surface was returned to the pool.
    Released,
}

/// What the retain pass did with a node.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RetainAction {
    /// The previous frame's node was updated in place.
    Reused,
    /// A new node was created and applied.
    Created,
    /// A previous frame's node (and its subtree) was released.
    Released,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted by the collector for each box it acts on.
#[derive(Clone, Copy, Debug)]
pub struct BoxEvent {
    /// The box.
    pub box_id: BoxId,
    /// What happened.
    pub kind: BoxEventKind,
}

/// Emitted at the end of every collection pass.
#[derive(Clone, Copy, Debug)]
pub struct SweepEvent {
    /// References released on behalf of dropped wrappers.
    pub finalized: u32,
    /// Boxes permanently deleted by this pass.
    pub deleted_permanently: u32,
    /// Boxes still registered after the pass.
    pub live_after: u32,
}

/// Emitted when the retain pass acquires or releases a rendering target.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The surface.
    pub surface: SurfaceId,
    /// What happened.
    pub kind: SurfaceEventKind,
}

/// A per-node retain decision.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct RetainEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Raw slot index of the node.
    pub node: u32,
    /// Operation kind of the node.
    pub op: OpKind,
    /// What the pass did.
    pub action: RetainAction,
}

/// Per-frame summary produced at the end of the retain pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Nodes updated in place.
    pub reused: u32,
    /// Nodes created.
    pub created: u32,
    /// Nodes released (including descendants of released nodes).
    pub released: u32,
    /// Nodes whose world transform was recomputed.
    pub transforms_recomputed: u32,
    /// Nodes whose projected clip was recomputed.
    pub clips_recomputed: u32,
    /// Surfaces live in the pool after the frame.
    pub surfaces_live: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives lifetime events.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called for each box the collector finalizes, deletes or reclaims.
    fn on_box_event(&mut self, e: &BoxEvent) {
        _ = e;
    }

    /// Called at the end of every collection pass.
    fn on_sweep(&mut self, e: &SweepEvent) {
        _ = e;
    }

    /// Called when a rendering target is acquired or released.
    fn on_surface_event(&mut self, e: &SurfaceEvent) {
        _ = e;
    }

    /// Called with a per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called for every retain decision (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_retain(&mut self, e: &RetainEvent) {
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

    /// Emits a [`BoxEvent`].
    #[inline]
    pub fn box_event(&mut self, e: &BoxEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_box_event(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SweepEvent`].
    #[inline]
    pub fn sweep(&mut self, e: &SweepEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sweep(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SurfaceEvent`].
    #[inline]
    pub fn surface_event(&mut self, e: &SurfaceEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_surface_event(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, summary: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_summary(summary);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = summary;
        }
    }

    /// Emits a [`RetainEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn retain(&mut self, e: &RetainEvent) {
        if let Some(s) = &mut self.sink {
            s.on_retain(e);
        }
    }
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink {
        sweeps: u32,
        frames: u32,
    }

    impl TraceSink for CountingSink {
        fn on_sweep(&mut self, _e: &SweepEvent) {
            self.sweeps += 1;
        }

        fn on_frame_summary(&mut self, _s: &FrameSummary) {
            self.frames += 1;
        }
    }

    #[test]
    fn tracer_dispatches_to_sink() {
        let mut sink = CountingSink::default();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.sweep(&SweepEvent {
                finalized: 0,
                deleted_permanently: 1,
                live_after: 0,
            });
            tracer.frame_summary(&FrameSummary::default());
        }
        assert_eq!(sink.sweeps, 1);
        assert_eq!(sink.frames, 1);
    }

    #[test]
    fn none_tracer_is_silent() {
        let mut tracer = Tracer::none();
        tracer.frame_summary(&FrameSummary::default());
    }
}
