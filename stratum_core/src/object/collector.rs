// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred deletion, finalization and the resurrection cache.

use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::mem;

use super::boxed::BoxId;
use crate::trace::{BoxEvent, BoxEventKind, SweepEvent, Tracer};

/// Default number of resurrectable boxes whose native handles stay resident.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Type-erased view of a box used by the collector.
pub(crate) trait Collectable {
    fn id(&self) -> BoxId;
    /// Releases the reference of a wrapper that was dropped undisposed.
    /// Returns `true` if that was the last reference.
    fn release_finalized(&self, wrapper: u64) -> bool;
    /// Moves a zero-reference box to its terminal state.
    fn sweep(&self) -> bool;
    /// Deletes the native handle while keeping references.
    fn evict(&self) -> bool;
    /// Unconditionally reclaims the box (hot restart).
    fn delete_permanently(&self);
    fn is_deleted_permanently(&self) -> bool;
}

/// Whether dropped, undisposed wrappers are reclaimed automatically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FinalizationMode {
    /// Dropping a wrapper queues its reference for release on the next
    /// collection pass.
    #[default]
    Automatic,
    /// Only explicit [`dispose`](super::BoxRef::dispose) releases references;
    /// dropped wrappers are counted as leaks.
    Disabled,
}

/// What a single [`Collector::collect`] pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// References released on behalf of dropped wrappers.
    pub finalized: u32,
    /// Boxes moved to [`DeletedPermanently`](super::BoxState::DeletedPermanently).
    pub deleted_permanently: u32,
    /// Boxes still registered after the pass.
    pub live_after: u32,
}

pub(crate) struct CollectorState {
    mode: FinalizationMode,
    next_id: u64,
    registry: Vec<Weak<dyn Collectable>>,
    pending: Vec<Rc<dyn Collectable>>,
    finalized: Vec<(Rc<dyn Collectable>, u64)>,
    lru: VecDeque<(BoxId, Weak<dyn Collectable>)>,
    cache_capacity: usize,
    leaked: u64,
}

impl CollectorState {
    pub(crate) fn schedule(&mut self, entry: Rc<dyn Collectable>) {
        self.pending.push(entry);
    }

    pub(crate) fn finalize_later(&mut self, entry: Rc<dyn Collectable>, wrapper: u64) {
        match self.mode {
            FinalizationMode::Automatic => self.finalized.push((entry, wrapper)),
            FinalizationMode::Disabled => {
                self.leaked += 1;
                log::warn!(
                    "{:?} wrapper dropped without dispose; reference leaked",
                    entry.id()
                );
            }
        }
    }

    /// Marks `id` as most recently used. Returns the boxes that fell out of
    /// the cache and must be evicted once the caller has released the state.
    pub(crate) fn touch(
        &mut self,
        id: BoxId,
        entry: Weak<dyn Collectable>,
    ) -> Vec<Rc<dyn Collectable>> {
        if let Some(pos) = self.lru.iter().position(|(key, _)| *key == id) {
            self.lru.remove(pos);
        }
        self.lru.push_back((id, entry));
        self.trim_cache()
    }

    fn trim_cache(&mut self) -> Vec<Rc<dyn Collectable>> {
        let mut victims = Vec::new();
        while self.lru.len() > self.cache_capacity {
            if let Some((_, weak)) = self.lru.pop_front()
                && let Some(victim) = weak.upgrade()
            {
                victims.push(victim);
            }
        }
        victims
    }
}

/// Process-wide owner of box bookkeeping.
///
/// `Collector` is a cheap handle; clones share the same state. It is created
/// explicitly and passed to whatever creates boxes, so tests get isolated
/// instances.
#[derive(Clone)]
pub struct Collector {
    state: Rc<RefCell<CollectorState>>,
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Collector")
            .field("mode", &state.mode)
            .field("registered", &state.registry.len())
            .field("pending", &state.pending.len())
            .field("finalized", &state.finalized.len())
            .field("leaked", &state.leaked)
            .finish_non_exhaustive()
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(FinalizationMode::default())
    }
}

impl Collector {
    /// Creates a collector with the default resurrection cache capacity.
    #[must_use]
    pub fn new(mode: FinalizationMode) -> Self {
        Self::with_cache_capacity(mode, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a collector that keeps at most `capacity` resurrectable native
    /// handles resident.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_cache_capacity(mode: FinalizationMode, capacity: usize) -> Self {
        assert!(capacity >= 1, "resurrection cache capacity must be at least 1");
        Self {
            state: Rc::new(RefCell::new(CollectorState {
                mode,
                next_id: 0,
                registry: Vec::new(),
                pending: Vec::new(),
                finalized: Vec::new(),
                lru: VecDeque::new(),
                cache_capacity: capacity,
                leaked: 0,
            })),
        }
    }

    /// Returns the finalization mode.
    #[must_use]
    pub fn mode(&self) -> FinalizationMode {
        self.state.borrow().mode
    }

    /// Returns the resurrection cache capacity.
    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.state.borrow().cache_capacity
    }

    /// Changes the resurrection cache capacity, evicting least recently used
    /// handles if the cache is now over capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn set_cache_capacity(&self, capacity: usize) {
        assert!(capacity >= 1, "resurrection cache capacity must be at least 1");
        let victims = {
            let mut state = self.state.borrow_mut();
            state.cache_capacity = capacity;
            state.trim_cache()
        };
        for victim in victims {
            victim.evict();
        }
    }

    /// Returns the number of boxes awaiting the next collection pass.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Returns the number of dropped wrappers awaiting finalization.
    #[must_use]
    pub fn finalization_queue_len(&self) -> usize {
        self.state.borrow().finalized.len()
    }

    /// Returns how many dropped wrappers leaked their reference because
    /// finalization is disabled.
    #[must_use]
    pub fn leaked_count(&self) -> u64 {
        self.state.borrow().leaked
    }

    /// Returns the number of boxes not yet permanently deleted.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.state
            .borrow()
            .registry
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|entry| !entry.is_deleted_permanently())
            .count()
    }

    /// Runs a collection pass.
    ///
    /// References of dropped wrappers are released first, so a box whose last
    /// owner was dropped is permanently deleted by the same pass.
    pub fn collect(&self, tracer: &mut Tracer<'_>) -> SweepReport {
        let finalized = mem::take(&mut self.state.borrow_mut().finalized);
        let mut report = SweepReport::default();
        let mut candidates = Vec::new();
        for (entry, wrapper) in finalized {
            report.finalized += 1;
            tracer.box_event(&BoxEvent {
                box_id: entry.id(),
                kind: BoxEventKind::Finalized,
            });
            if entry.release_finalized(wrapper) {
                candidates.push(entry);
            }
        }

        candidates.append(&mut mem::take(&mut self.state.borrow_mut().pending));
        for entry in &candidates {
            if entry.sweep() {
                report.deleted_permanently += 1;
                tracer.box_event(&BoxEvent {
                    box_id: entry.id(),
                    kind: BoxEventKind::DeletedPermanently,
                });
            }
        }

        {
            let mut state = self.state.borrow_mut();
            state.registry.retain(|weak| {
                weak.upgrade()
                    .is_some_and(|entry| !entry.is_deleted_permanently())
            });
            state.lru.retain(|(_, weak)| {
                weak.upgrade()
                    .is_some_and(|entry| !entry.is_deleted_permanently())
            });
            report.live_after = u32::try_from(state.registry.len()).unwrap_or(u32::MAX);
        }
        // Dropping the last strong handles may run recipe destructors, which
        // can reach back into the collector.
        drop(candidates);

        tracer.sweep(&SweepEvent {
            finalized: report.finalized,
            deleted_permanently: report.deleted_permanently,
            live_after: report.live_after,
        });
        report
    }

    /// Hot restart: permanently deletes every registered box and clears all
    /// queues. Returns the number of boxes reclaimed.
    pub fn reset(&self, tracer: &mut Tracer<'_>) -> usize {
        let (registry, pending, finalized) = {
            let mut state = self.state.borrow_mut();
            state.lru.clear();
            (
                mem::take(&mut state.registry),
                mem::take(&mut state.pending),
                mem::take(&mut state.finalized),
            )
        };
        let mut reclaimed = 0;
        for entry in registry.iter().filter_map(Weak::upgrade) {
            if entry.is_deleted_permanently() {
                continue;
            }
            entry.delete_permanently();
            reclaimed += 1;
            tracer.box_event(&BoxEvent {
                box_id: entry.id(),
                kind: BoxEventKind::Reclaimed,
            });
        }
        drop(pending);
        drop(finalized);
        log::debug!("collector reset reclaimed {reclaimed} boxes");
        reclaimed
    }

    pub(crate) fn next_box_id(&self) -> BoxId {
        let mut state = self.state.borrow_mut();
        let id = BoxId(state.next_id);
        state.next_id += 1;
        id
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<CollectorState>> {
        Rc::downgrade(&self.state)
    }

    pub(crate) fn register(&self, entry: Weak<dyn Collectable>) {
        self.state.borrow_mut().registry.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use core::cell::Cell;

    use super::*;
    use crate::native::{DecodeError, NativeObject};
    use crate::object::{BoxRef, BoxState};

    struct Handle {
        deleted: bool,
        deletes: Rc<Cell<u32>>,
    }

    impl NativeObject for Handle {
        fn delete(&mut self) {
            self.deleted = true;
            self.deletes.set(self.deletes.get() + 1);
        }

        fn is_deleted(&self) -> bool {
            self.deleted
        }
    }

    fn handle(deletes: &Rc<Cell<u32>>) -> Handle {
        Handle {
            deleted: false,
            deletes: deletes.clone(),
        }
    }

    fn resurrectable(collector: &Collector, deletes: &Rc<Cell<u32>>) -> BoxRef<Handle> {
        let deletes = deletes.clone();
        BoxRef::resurrectable(
            collector,
            Box::new(move || -> Result<Handle, DecodeError> { Ok(handle(&deletes)) }),
        )
        .unwrap()
    }

    #[test]
    fn clone_then_dispose_both_deletes_once() {
        let collector = Collector::new(FinalizationMode::Disabled);
        let deletes = Rc::new(Cell::new(0));
        let mut original = BoxRef::new(&collector, handle(&deletes));
        let mut clone = original.clone_ref();
        original.dispose();
        assert_eq!(deletes.get(), 0);
        clone.dispose();
        assert_eq!(deletes.get(), 1);

        let report = collector.collect(&mut Tracer::none());
        assert_eq!(report.deleted_permanently, 1);
        assert_eq!(deletes.get(), 1, "sweep must not delete a second time");
        assert_eq!(collector.live_count(), 0);
    }

    #[test]
    fn dropped_wrapper_is_finalized_automatically() {
        let collector = Collector::new(FinalizationMode::Automatic);
        let deletes = Rc::new(Cell::new(0));
        let image = BoxRef::new(&collector, handle(&deletes));
        let observer = image.clone_ref();
        drop(image);
        assert_eq!(collector.finalization_queue_len(), 1);
        assert_eq!(observer.ref_count(), 2, "release waits for the sweep");

        let report = collector.collect(&mut Tracer::none());
        assert_eq!(report.finalized, 1);
        assert_eq!(report.deleted_permanently, 0);
        assert_eq!(observer.ref_count(), 1);
        assert_eq!(observer.state(), BoxState::Live);

        drop(observer);
        let report = collector.collect(&mut Tracer::none());
        assert_eq!(report.finalized, 1);
        assert_eq!(report.deleted_permanently, 1);
        assert_eq!(deletes.get(), 1);
    }

    #[test]
    fn disabled_finalization_counts_leaks() {
        let collector = Collector::new(FinalizationMode::Disabled);
        let deletes = Rc::new(Cell::new(0));
        let image = BoxRef::new(&collector, handle(&deletes));
        drop(image);
        assert_eq!(collector.leaked_count(), 1);
        let report = collector.collect(&mut Tracer::none());
        assert_eq!(report.finalized, 0);
        assert_eq!(deletes.get(), 0);
        assert_eq!(collector.live_count(), 1);
    }

    #[test]
    fn disabled_finalization_still_resurrects() {
        let collector = Collector::new(FinalizationMode::Disabled);
        let deletes = Rc::new(Cell::new(0));
        let mut image = resurrectable(&collector, &deletes);
        image.dispose();
        assert_eq!(collector.pending_count(), 1);
        assert!(image.native().is_ok());
        assert_eq!(image.resurrection_count(), 1);
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let collector = Collector::with_cache_capacity(FinalizationMode::Disabled, 2);
        let deletes = Rc::new(Cell::new(0));
        let a = resurrectable(&collector, &deletes);
        let b = resurrectable(&collector, &deletes);
        let c = resurrectable(&collector, &deletes);

        let _ = a.native().unwrap();
        let _ = b.native().unwrap();
        assert!(a.raw_native().is_some());
        let _ = c.native().unwrap();

        assert!(a.raw_native().is_none(), "a was least recently used");
        assert!(b.raw_native().is_some());
        assert!(c.raw_native().is_some());
        assert_eq!(a.ref_count(), 1, "eviction keeps references");

        let _ = a.native().unwrap();
        assert_eq!(a.resurrection_count(), 1);
        assert!(b.raw_native().is_none());
    }

    #[test]
    fn shrinking_cache_evicts_immediately() {
        let collector = Collector::with_cache_capacity(FinalizationMode::Disabled, 4);
        let deletes = Rc::new(Cell::new(0));
        let a = resurrectable(&collector, &deletes);
        let b = resurrectable(&collector, &deletes);
        let _ = a.native().unwrap();
        let _ = b.native().unwrap();
        collector.set_cache_capacity(1);
        assert!(a.raw_native().is_none());
        assert!(b.raw_native().is_some());
    }

    #[test]
    fn reset_reclaims_everything() {
        let collector = Collector::new(FinalizationMode::Automatic);
        let deletes = Rc::new(Cell::new(0));
        let mut a = BoxRef::new(&collector, handle(&deletes));
        let b = resurrectable(&collector, &deletes);
        let reclaimed = collector.reset(&mut Tracer::none());
        assert_eq!(reclaimed, 2);
        assert_eq!(deletes.get(), 2);
        assert_eq!(a.state(), BoxState::DeletedPermanently);
        assert_eq!(b.state(), BoxState::DeletedPermanently);
        assert_eq!(a.ref_count(), 0);
        // Disposing a reclaimed wrapper is harmless.
        a.dispose();
        assert_eq!(collector.live_count(), 0);
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn zero_cache_capacity_panics() {
        let _ = Collector::with_cache_capacity(FinalizationMode::Automatic, 0);
    }
}
