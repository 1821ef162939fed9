// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The persisted surface tree caches two derived properties per node and
//! recomputes them only when invalidated, using multi-channel dirty tracking
//! from [`understory_dirty`].
//!
//! Both channels use [`EagerPolicy`](understory_dirty::EagerPolicy) and have
//! dependency edges from child to parent, since both derived properties are
//! inherited:
//!
//! - [`TRANSFORM`]: world transform is `parent_world * local`.
//! - [`CLIP`]: projected clip is the parent's projected clip intersected
//!   with the world bounds of the local clip.
//!
//! A transform change moves every clip below it, so the tree marks both
//! channels when a local transform changes. A clip change only marks
//! [`CLIP`].

use understory_dirty::Channel;

/// Local transform changed; world transforms of the subtree are stale.
pub const TRANSFORM: Channel = Channel::new(0);

/// Local clip (or the viewport) changed; projected clips of the subtree are
/// stale.
pub const CLIP: Channel = Channel::new(1);
