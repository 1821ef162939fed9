// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surface identity.

use core::fmt;

/// A handle to a rendering target owned by a
/// [`SurfaceFactory`](super::SurfaceFactory).
///
/// Contains the slot index and the factory epoch it was issued in, so that
/// handles issued before a [`reset`](super::SurfaceFactory::reset) are
/// detected as stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId {
    /// Slot index into the factory's target list.
    pub(crate) idx: u32,
    /// Factory epoch; must match the factory's current epoch.
    pub(crate) epoch: u32,
}

impl SurfaceId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the factory epoch the handle was issued in.
    #[inline]
    #[must_use]
    pub const fn epoch(self) -> u32 {
        self.epoch
    }
}

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({}@epoch{})", self.idx, self.epoch)
    }
}
