// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The box itself and the wrappers that share it.

use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Ref, RefCell, RefMut};
use core::fmt;
use core::future::Future;
use core::panic::Location;

use super::collector::{Collectable, CollectorState};
use super::Collector;
use crate::native::{BoxedRecipe, DecodeError, NativeObject};

/// Identity of a box, unique within one [`Collector`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxId(pub(crate) u64);

impl BoxId {
    /// Returns the raw id (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxId({})", self.0)
    }
}

/// Lifecycle state of a box. See the [module docs](super) for transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoxState {
    /// At least one wrapper holds a reference.
    Live,
    /// The last reference was disposed; awaiting the next collection pass.
    ///
    /// Access through [`BoxRef::native`] still works and recreates the
    /// handle, but the state does not return to `Live`: no wrapper owns the
    /// box, so the next sweep deletes the recreated handle and makes the
    /// deletion permanent. Use [`BoxRef::has_native`] to tell a resurrected
    /// pending box from an empty one.
    PendingDeletion,
    /// Terminal; the native handle can never come back.
    DeletedPermanently,
}

/// Result of completing an asynchronous resurrection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResurrectOutcome {
    /// The new handle was installed in the box.
    Installed,
    /// The box already had a handle; the new one was deleted.
    AlreadyLive,
    /// The box was permanently deleted while the work was in flight; the new
    /// handle was deleted.
    Discarded,
}

pub(crate) struct BoxCell<N> {
    ref_count: u32,
    native: Option<N>,
    state: BoxState,
    recipe: Option<BoxedRecipe<N>>,
    creation_sites: BTreeMap<u64, &'static Location<'static>>,
    next_wrapper: u64,
    resurrections: u32,
}

pub(crate) struct BoxInner<N> {
    id: BoxId,
    resurrectable: bool,
    cell: RefCell<BoxCell<N>>,
    collector: Weak<RefCell<CollectorState>>,
}

impl<N: NativeObject> BoxInner<N> {
    /// Drops one reference. Returns `true` if this was the last one.
    fn release(&self, wrapper: u64) -> bool {
        let mut cell = self.cell.borrow_mut();
        if cell.state == BoxState::DeletedPermanently {
            // Hot restart already reclaimed everything.
            return false;
        }
        assert!(
            cell.ref_count > 0,
            "reference count underflow on {:?}",
            self.id
        );
        cell.ref_count -= 1;
        cell.creation_sites.remove(&wrapper);
        if cell.ref_count > 0 {
            return false;
        }
        if let Some(mut native) = cell.native.take() {
            native.delete();
        }
        cell.state = BoxState::PendingDeletion;
        log::trace!("{:?} reached zero references", self.id);
        true
    }

    fn schedule(self: &Rc<Self>)
    where
        N: 'static,
    {
        if let Some(state) = self.collector.upgrade() {
            let entry: Rc<dyn Collectable> = self.clone();
            state.borrow_mut().schedule(entry);
        }
    }

    fn touch(self: &Rc<Self>)
    where
        N: 'static,
    {
        if !self.resurrectable {
            return;
        }
        let Some(state) = self.collector.upgrade() else {
            return;
        };
        let entry: Rc<dyn Collectable> = self.clone();
        let victims = state.borrow_mut().touch(self.id, Rc::downgrade(&entry));
        for victim in victims {
            victim.evict();
        }
    }
}

impl<N: NativeObject> Collectable for BoxInner<N> {
    fn id(&self) -> BoxId {
        self.id
    }

    fn release_finalized(&self, wrapper: u64) -> bool {
        self.release(wrapper)
    }

    fn sweep(&self) -> bool {
        let recipe = {
            let mut cell = self.cell.borrow_mut();
            if cell.state != BoxState::PendingDeletion || cell.ref_count != 0 {
                return false;
            }
            if let Some(mut native) = cell.native.take() {
                // Resurrected after reaching zero.
                native.delete();
            }
            cell.state = BoxState::DeletedPermanently;
            cell.creation_sites.clear();
            cell.recipe.take()
        };
        // Recipes may own other wrappers; drop outside the borrow.
        drop(recipe);
        true
    }

    fn evict(&self) -> bool {
        let Ok(mut cell) = self.cell.try_borrow_mut() else {
            return false;
        };
        if cell.state == BoxState::DeletedPermanently || cell.recipe.is_none() {
            return false;
        }
        match cell.native.take() {
            Some(mut native) => {
                native.delete();
                log::trace!("evicted native handle of {:?}", self.id);
                true
            }
            None => false,
        }
    }

    fn delete_permanently(&self) {
        let recipe = {
            let Ok(mut cell) = self.cell.try_borrow_mut() else {
                log::warn!("{:?} is borrowed during reset; skipping", self.id);
                return;
            };
            if let Some(mut native) = cell.native.take() {
                native.delete();
            }
            cell.ref_count = 0;
            cell.state = BoxState::DeletedPermanently;
            cell.creation_sites.clear();
            cell.recipe.take()
        };
        drop(recipe);
    }

    fn is_deleted_permanently(&self) -> bool {
        self.cell
            .try_borrow()
            .map(|cell| cell.state == BoxState::DeletedPermanently)
            .unwrap_or(false)
    }
}

/// One owning reference to a box around a native object `N`.
///
/// Cloning a wrapper is explicit ([`clone_ref`](Self::clone_ref)) so that
/// every reference has a creation site and a matching
/// [`dispose`](Self::dispose).
pub struct BoxRef<N: NativeObject + 'static> {
    inner: Rc<BoxInner<N>>,
    wrapper: u64,
    disposed: bool,
}

impl<N: NativeObject + 'static> fmt::Debug for BoxRef<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (ref_count, state) = self
            .inner
            .cell
            .try_borrow()
            .map(|cell| (Some(cell.ref_count), Some(cell.state)))
            .unwrap_or((None, None));
        f.debug_struct("BoxRef")
            .field("id", &self.inner.id)
            .field("wrapper", &self.wrapper)
            .field("disposed", &self.disposed)
            .field("ref_count", &ref_count)
            .field("state", &state)
            .finish()
    }
}

impl<N: NativeObject + 'static> BoxRef<N> {
    /// Boxes an existing native handle that cannot be recreated.
    ///
    /// Such a box is never evicted. Accessing it after its handle was
    /// deleted (while pending collection) panics, since there is no recipe.
    #[track_caller]
    #[must_use]
    pub fn new(collector: &Collector, native: N) -> Self {
        Self::with_parts(collector, native, None)
    }

    /// Builds the first handle from `recipe` and keeps the recipe for later
    /// resurrection.
    #[track_caller]
    pub fn resurrectable(
        collector: &Collector,
        mut recipe: BoxedRecipe<N>,
    ) -> Result<Self, DecodeError> {
        let native = recipe.resurrect()?;
        Ok(Self::with_parts(collector, native, Some(recipe)))
    }

    #[track_caller]
    fn with_parts(collector: &Collector, native: N, recipe: Option<BoxedRecipe<N>>) -> Self {
        let id = collector.next_box_id();
        let mut creation_sites = BTreeMap::new();
        creation_sites.insert(0, Location::caller());
        let inner = Rc::new(BoxInner {
            id,
            resurrectable: recipe.is_some(),
            cell: RefCell::new(BoxCell {
                ref_count: 1,
                native: Some(native),
                state: BoxState::Live,
                recipe,
                creation_sites,
                next_wrapper: 1,
                resurrections: 0,
            }),
            collector: collector.downgrade(),
        });
        let entry: Rc<dyn Collectable> = inner.clone();
        collector.register(Rc::downgrade(&entry));
        log::trace!("created {id:?}");
        Self {
            inner,
            wrapper: 0,
            disposed: false,
        }
    }

    /// Returns the box identity shared by all clones of this wrapper.
    #[must_use]
    pub fn box_id(&self) -> BoxId {
        self.inner.id
    }

    /// Returns the number of undisposed wrappers sharing the box.
    #[must_use]
    pub fn ref_count(&self) -> u32 {
        self.inner.cell.borrow().ref_count
    }

    /// Returns the box lifecycle state.
    #[must_use]
    pub fn state(&self) -> BoxState {
        self.inner.cell.borrow().state
    }

    /// Returns whether this particular wrapper has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Returns how many times the native handle has been recreated.
    #[must_use]
    pub fn resurrection_count(&self) -> u32 {
        self.inner.cell.borrow().resurrections
    }

    /// Returns whether two wrappers share the same box.
    #[must_use]
    pub fn same_box(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Acquires another reference to the same box.
    ///
    /// # Panics
    ///
    /// Panics if this wrapper was disposed or the box was permanently
    /// deleted.
    #[track_caller]
    #[must_use]
    pub fn clone_ref(&self) -> Self {
        assert!(!self.disposed, "clone_ref on a disposed {:?}", self.inner.id);
        let mut cell = self.inner.cell.borrow_mut();
        assert!(
            cell.state != BoxState::DeletedPermanently,
            "clone_ref on {:?} after permanent deletion",
            self.inner.id
        );
        cell.ref_count += 1;
        let wrapper = cell.next_wrapper;
        cell.next_wrapper += 1;
        cell.creation_sites.insert(wrapper, Location::caller());
        Self {
            inner: self.inner.clone(),
            wrapper,
            disposed: false,
        }
    }

    /// Releases this wrapper's reference.
    ///
    /// When the last reference goes away the native handle is deleted and the
    /// box is scheduled for the next collection pass.
    ///
    /// # Panics
    ///
    /// Panics if this wrapper was already disposed.
    pub fn dispose(&mut self) {
        assert!(!self.disposed, "{:?} disposed twice", self.inner.id);
        self.disposed = true;
        if self.inner.release(self.wrapper) {
            self.inner.schedule();
        }
    }

    /// Returns the native handle, recreating it from the recipe if it was
    /// deleted and the box is not yet permanently gone.
    ///
    /// Access marks the box as recently used for the collector's
    /// resurrection cache.
    ///
    /// # Panics
    ///
    /// Panics if the box was permanently deleted, or if the handle is absent
    /// and the box has no recipe.
    pub fn native(&self) -> Result<RefMut<'_, N>, DecodeError> {
        self.ensure_native()?;
        self.inner.touch();
        match RefMut::filter_map(self.inner.cell.borrow_mut(), |cell| cell.native.as_mut()) {
            Ok(native) => Ok(native),
            Err(_) => panic!("native handle of {:?} vanished during access", self.inner.id),
        }
    }

    /// Returns whether the native handle is currently present.
    ///
    /// Independent of [`state`](Self::state): a pending box that was
    /// accessed again holds a handle until the sweep.
    #[must_use]
    pub fn has_native(&self) -> bool {
        self.inner.cell.borrow().native.is_some()
    }

    /// Returns the native handle if it is currently present, without
    /// resurrecting.
    #[must_use]
    pub fn raw_native(&self) -> Option<Ref<'_, N>> {
        Ref::filter_map(self.inner.cell.borrow(), |cell| cell.native.as_ref()).ok()
    }

    /// Deletes the native handle but keeps every reference, so the next
    /// [`native`](Self::native) call resurrects it.
    ///
    /// Returns `false` if there was nothing to evict or the box has no
    /// recipe.
    pub fn evict(&self) -> bool {
        self.inner.evict()
    }

    /// Starts an out-of-band resurrection (e.g. an asynchronous decode).
    ///
    /// # Panics
    ///
    /// Panics if the box was permanently deleted.
    #[must_use]
    pub fn begin_resurrection(&self) -> ResurrectionTicket<N> {
        assert!(
            self.state() != BoxState::DeletedPermanently,
            "cannot resurrect {:?} after permanent deletion",
            self.inner.id
        );
        ResurrectionTicket {
            inner: self.inner.clone(),
        }
    }

    /// Awaits `pending` and installs its result, unless the box was
    /// permanently deleted in the meantime.
    pub async fn resurrect_with<F>(&self, pending: F) -> Result<ResurrectOutcome, DecodeError>
    where
        F: Future<Output = Result<N, DecodeError>>,
    {
        let ticket = self.begin_resurrection();
        let native = pending.await?;
        Ok(ticket.complete(native))
    }

    /// Returns the creation sites of every undisposed wrapper of this box.
    ///
    /// Used to track down leaks.
    #[must_use]
    pub fn debug_creation_sites(&self) -> Vec<&'static Location<'static>> {
        self.inner
            .cell
            .borrow()
            .creation_sites
            .values()
            .copied()
            .collect()
    }

    fn ensure_native(&self) -> Result<(), DecodeError> {
        let mut recipe = {
            let mut cell = self.inner.cell.borrow_mut();
            assert!(
                cell.state != BoxState::DeletedPermanently,
                "use of {:?} after permanent deletion",
                self.inner.id
            );
            if cell.native.is_some() {
                return Ok(());
            }
            match cell.recipe.take() {
                Some(recipe) => recipe,
                None => panic!("{:?} has no recipe to resurrect from", self.inner.id),
            }
        };
        let result = recipe.resurrect();
        let mut cell = self.inner.cell.borrow_mut();
        cell.recipe = Some(recipe);
        let native = result?;
        cell.native = Some(native);
        cell.resurrections += 1;
        log::debug!(
            "resurrected {:?} ({} resurrections)",
            self.inner.id,
            cell.resurrections
        );
        Ok(())
    }
}

impl<N: NativeObject + 'static> Drop for BoxRef<N> {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        let Some(state) = self.inner.collector.upgrade() else {
            // No collector left to finalize through; release eagerly.
            self.inner.release(self.wrapper);
            return;
        };
        let entry: Rc<dyn Collectable> = self.inner.clone();
        match state.try_borrow_mut() {
            Ok(mut state) => state.finalize_later(entry, self.wrapper),
            Err(_) => log::warn!(
                "{:?} dropped while the collector was busy; reference leaked",
                self.inner.id
            ),
        }
    }
}

/// Pending completion of an out-of-band resurrection.
///
/// The ticket does not hold a reference: disposing every wrapper while the
/// work is in flight is allowed, and [`complete`](Self::complete) then
/// discards the result.
pub struct ResurrectionTicket<N: NativeObject + 'static> {
    inner: Rc<BoxInner<N>>,
}

impl<N: NativeObject + 'static> fmt::Debug for ResurrectionTicket<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResurrectionTicket")
            .field("id", &self.inner.id)
            .finish()
    }
}

impl<N: NativeObject + 'static> ResurrectionTicket<N> {
    /// Installs `native` if the box can still use it; deletes it otherwise.
    pub fn complete(self, mut native: N) -> ResurrectOutcome {
        let mut cell = self.inner.cell.borrow_mut();
        if cell.state == BoxState::DeletedPermanently {
            native.delete();
            log::debug!(
                "discarded late resurrection of permanently deleted {:?}",
                self.inner.id
            );
            return ResurrectOutcome::Discarded;
        }
        if cell.native.is_some() {
            native.delete();
            return ResurrectOutcome::AlreadyLive;
        }
        cell.native = Some(native);
        cell.resurrections += 1;
        ResurrectOutcome::Installed
    }
}
