// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The retained surface tree.
//!
//! A *persisted node* mirrors one [`LayerOp`](crate::scene::LayerOp) of the
//! most recently retained scene. Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is released.
//! - Topology: parent, first-child, and sibling links in paint order.
//! - **Mirrored state**: the operation itself, the host element it owns,
//!   and for pictures a rendering target from the
//!   [`SurfaceFactory`](crate::surface::SurfaceFactory).
//! - **Computed geometry** produced by [`evaluate`](SurfaceTree::evaluate):
//!   `world_transform` (product of ancestor local transforms) and
//!   `projected_clip` (the visible area in viewport coordinates).
//!
//! Each frame, [`retain`](SurfaceTree::retain) diffs the tree against a new
//! scene, reusing nodes whose operation is compatible with the one at the
//! same position.
//!
//! # Dirty tracking
//!
//! Geometry changes mark [`dirty`](crate::dirty) channels that propagate to
//! all descendants:
//!
//! - **TRANSFORM**: a changed offset or matrix. Also marks CLIP, since the
//!   projected clip depends on the world transform.
//! - **CLIP**: a changed clip shape or viewport.

mod evaluate;
mod id;
mod patch;
mod retain;
mod store;
mod traverse;

pub use evaluate::TreeChanges;
pub use id::{INVALID, NodeId};
pub use patch::Patch;
pub use retain::RetainReport;
pub use store::SurfaceTree;
pub use traverse::Children;
