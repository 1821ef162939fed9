// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded pool of rendering targets.

use alloc::vec::Vec;
use core::fmt;

use super::{RenderTarget, SurfaceId, SurfaceProvider};

/// Default capacity of a [`SurfaceFactory`].
pub const DEFAULT_SURFACE_CAPACITY: usize = 8;

const BASE: u32 = 0;
const BACKUP: u32 = 1;

/// How [`SurfaceFactory::acquire`] satisfied a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireKind {
    /// A new target was created.
    Allocated,
    /// A previously released target was handed out again.
    Reused,
    /// The pool was at capacity; the shared backup target was returned.
    Backup,
}

/// Pool of rendering targets bounded by a capacity.
///
/// Two targets always exist: the *base* surface (the primary target, never
/// released) and the *backup* surface (shared overflow). Capacity bounds the
/// base surface plus every target created for loans, whether currently on
/// loan or cached after release; the backup surface is held in reserve on
/// top of it. Once the bound is reached, requests are answered with the
/// backup surface, which callers must tolerate aliasing. The backup surface
/// counts its loans and leaves the scene when the last one is released.
pub struct SurfaceFactory<S: SurfaceProvider> {
    provider: S,
    capacity: usize,
    epoch: u32,
    targets: Vec<S::Target>,
    on_loan: Vec<u32>,
    cached: Vec<u32>,
    backup_loans: u32,
}

impl<S: SurfaceProvider> fmt::Debug for SurfaceFactory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceFactory")
            .field("capacity", &self.capacity)
            .field("epoch", &self.epoch)
            .field("targets", &self.targets.len())
            .field("on_loan", &self.on_loan)
            .field("cached", &self.cached)
            .field("backup_loans", &self.backup_loans)
            .finish_non_exhaustive()
    }
}

impl<S: SurfaceProvider> SurfaceFactory<S> {
    /// Creates a pool with fresh base and backup surfaces.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(provider: S, capacity: usize) -> Self {
        assert!(
            capacity >= 1,
            "surface capacity must be at least 1, got {capacity}"
        );
        let mut factory = Self {
            provider,
            capacity,
            epoch: 0,
            targets: Vec::new(),
            on_loan: Vec::new(),
            cached: Vec::new(),
            backup_loans: 0,
        };
        factory.create_reserved();
        factory
    }

    /// Returns the capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the base surface.
    #[must_use]
    pub fn base_surface(&self) -> SurfaceId {
        self.id(BASE)
    }

    /// Returns the backup surface.
    #[must_use]
    pub fn backup_surface(&self) -> SurfaceId {
        self.id(BACKUP)
    }

    /// Returns a surface for a new rendering job.
    ///
    /// See [`acquire`](Self::acquire) for how the request is satisfied.
    pub fn get_surface(&mut self) -> SurfaceId {
        self.acquire().0
    }

    /// Returns a surface for a new rendering job and how it was obtained.
    ///
    /// The most recently released surface is reused first. Otherwise a new
    /// surface is created if the pool is below capacity. Otherwise the backup
    /// surface is returned; this never fails.
    pub fn acquire(&mut self) -> (SurfaceId, AcquireKind) {
        if let Some(idx) = self.cached.pop() {
            self.on_loan.push(idx);
            return (self.id(idx), AcquireKind::Reused);
        }
        if self.pooled_count() < self.capacity {
            let idx = u32::try_from(self.targets.len()).unwrap_or(u32::MAX);
            let id = self.id(idx);
            let target = self.provider.create_surface(id);
            self.targets.push(target);
            self.on_loan.push(idx);
            return (id, AcquireKind::Allocated);
        }
        log::warn!(
            "surface pool at capacity ({}); sharing the backup surface",
            self.capacity
        );
        self.backup_loans += 1;
        (self.backup_surface(), AcquireKind::Backup)
    }

    /// Returns a surface to the pool, detaching it from the host document.
    ///
    /// The target is kept; the next [`acquire`](Self::acquire) hands it out
    /// again. The backup surface is shared, so it is only detached once every
    /// loan of it has been released.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale, is the base surface, or is not on loan.
    pub fn release_surface(&mut self, id: SurfaceId) {
        self.validate(id);
        assert!(id.idx != BASE, "cannot release the base surface");
        if id.idx == BACKUP {
            assert!(self.backup_loans > 0, "{id:?} is not on loan");
            self.backup_loans -= 1;
            if self.backup_loans == 0 {
                self.targets[BACKUP as usize].remove_from_scene();
            }
            return;
        }
        let Some(pos) = self.on_loan.iter().position(|&idx| idx == id.idx) else {
            panic!("{id:?} is not on loan");
        };
        self.on_loan.swap_remove(pos);
        self.targets[id.idx as usize].remove_from_scene();
        self.cached.push(id.idx);
    }

    /// Returns whether `id` is the base surface, the backup surface, or on
    /// loan. Released and stale surfaces are not live.
    #[must_use]
    pub fn is_live(&self, id: SurfaceId) -> bool {
        id.epoch == self.epoch
            && (id.idx == BASE || id.idx == BACKUP || self.on_loan.contains(&id.idx))
    }

    /// Returns the number of live surfaces: base, backup and those on loan.
    #[must_use]
    pub fn live_count(&self) -> usize {
        2 + self.on_loan.len()
    }

    /// Returns how many loans of the backup surface are outstanding.
    #[must_use]
    pub fn backup_loans(&self) -> u32 {
        self.backup_loans
    }

    /// Returns the number of released surfaces waiting for reuse.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cached.len()
    }

    /// Returns the target behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    #[must_use]
    pub fn surface(&self, id: SurfaceId) -> &S::Target {
        self.validate(id);
        &self.targets[id.idx as usize]
    }

    /// Returns the target behind `id` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    #[must_use]
    pub fn surface_mut(&mut self, id: SurfaceId) -> &mut S::Target {
        self.validate(id);
        &mut self.targets[id.idx as usize]
    }

    /// Returns the provider.
    #[must_use]
    pub fn provider(&self) -> &S {
        &self.provider
    }

    /// Hot restart: disposes every target (base and backup included) and
    /// rebuilds fresh base and backup surfaces.
    ///
    /// Every [`SurfaceId`] issued before the reset becomes stale. Returns the
    /// number of targets disposed.
    pub fn reset(&mut self) -> usize {
        let disposed = self.targets.len();
        for target in &mut self.targets {
            target.dispose();
        }
        self.targets.clear();
        self.on_loan.clear();
        self.cached.clear();
        self.backup_loans = 0;
        self.epoch += 1;
        self.create_reserved();
        log::debug!("surface factory reset disposed {disposed} targets");
        disposed
    }

    fn create_reserved(&mut self) {
        for idx in [BASE, BACKUP] {
            let id = self.id(idx);
            let target = self.provider.create_surface(id);
            self.targets.push(target);
        }
    }

    /// Base plus every target created for loans.
    fn pooled_count(&self) -> usize {
        1 + self.on_loan.len() + self.cached.len()
    }

    fn id(&self, idx: u32) -> SurfaceId {
        SurfaceId {
            idx,
            epoch: self.epoch,
        }
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: SurfaceId) {
        assert!(
            id.epoch == self.epoch && (id.idx as usize) < self.targets.len(),
            "stale SurfaceId: {id:?} (current epoch: {})",
            self.epoch
        );
    }
}
