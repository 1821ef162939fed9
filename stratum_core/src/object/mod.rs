// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference-counted, resurrectable boxes around native graphics objects.
//!
//! A *box* owns at most one native handle plus the bookkeeping needed to
//! share, delete and recreate it. User code never holds a box directly;
//! it holds [`BoxRef`] wrappers. Each wrapper contributes one reference.
//!
//! # Lifecycle
//!
//! ```text
//!            dispose() to zero             Collector::collect()
//!   Live ──────────────────────► PendingDeletion ──────────────► DeletedPermanently
//!    ▲                                │
//!    └────── native() resurrects ─────┘
//! ```
//!
//! - **Live**: at least one wrapper holds a reference. The native handle may
//!   still be absent if it was [evicted](BoxRef::evict); the next
//!   [`native`](BoxRef::native) call recreates it from the box's recipe.
//! - **PendingDeletion**: the last reference was disposed and the native
//!   handle deleted. Lookups still succeed (resurrecting if needed) until
//!   the next collection pass.
//! - **DeletedPermanently**: terminal. Any further access panics.
//!
//! # Misuse
//!
//! Double dispose, use after permanent deletion and reference-count
//! underflow are caller bugs and panic immediately.
//!
//! # Finalization
//!
//! Dropping a wrapper without disposing it hands its reference to the
//! [`Collector`] when [`FinalizationMode::Automatic`] is selected; the next
//! collection pass releases it. With [`FinalizationMode::Disabled`] the
//! reference is leaked and reported, mirroring hosts that have no weak
//! finalizers.

mod boxed;
mod collector;

pub use boxed::{BoxId, BoxRef, BoxState, ResurrectOutcome, ResurrectionTicket};
pub use collector::{Collector, DEFAULT_CACHE_CAPACITY, FinalizationMode, SweepReport};
