// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifetime and resource management for a retained-mode compositor.
//!
//! `stratum_core` decides *when* native graphics objects and rendering
//! targets are created, shared, reused and destroyed. It never draws; the
//! graphics binding and the host document are reached through small traits.
//! It is `no_std` compatible (with `alloc`) and single-threaded.
//!
//! # Architecture
//!
//! ```text
//!   SceneBuilder ──► Scene ──► SurfaceTree::retain() ──► RetainReport
//!                                 │        │
//!              ┌──────────────────┘        └────────────────┐
//!              ▼                                            ▼
//!   SurfaceFactory (render targets)              ElementHost (host document)
//!              │
//!              ▼
//!   BoxRef<P> ──► Collector::collect() ──► SweepReport
//! ```
//!
//! **[`object`]**: Reference-counted boxes around native handles with
//! explicit dispose, deferred permanent deletion, resurrection from a
//! recipe, and the [`Collector`](object::Collector) that sweeps them.
//!
//! **[`surface`]**: Bounded pool of rendering targets with a base surface
//! and a shared backup surface used when the pool is exhausted.
//!
//! **[`scene`]**: The per-frame scene description (a tree of
//! [`LayerOp`](scene::LayerOp)s) and its builder.
//!
//! **[`persisted`]**: The retained surface tree, diffed positionally
//! against each new scene. World transforms and projected clips are
//! recomputed lazily through [`dirty`] channels.
//!
//! **[`image`]**: Animated images whose codec survives eviction with its
//! playback position intact.
//!
//! **[`compositor`]**: Wires the pieces together with a
//! [`CompositorConfig`](compositor::CompositorConfig) and a hot restart.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-node
//!   retain events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod compositor;
pub mod dirty;
pub mod host;
pub mod image;
pub mod native;
pub mod object;
pub mod persisted;
pub mod scene;
pub mod surface;
pub mod trace;
pub mod transform;
