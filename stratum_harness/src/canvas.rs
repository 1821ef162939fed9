// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fake rendering targets.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Ref, RefCell, RefMut};

use kurbo::{Size, Vec2};
use stratum_core::native::NativeObject;
use stratum_core::surface::{PictureTarget, RenderTarget, SurfaceId, SurfaceProvider};

use crate::native::FakePicture;

/// Observable state of one [`FakeCanvas`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanvasState {
    /// Whether the canvas is in the host document.
    pub attached: bool,
    /// Whether the backing resource was released.
    pub disposed: bool,
    /// Size requested by the most recent frame.
    pub frame_size: Size,
    /// Frames flushed with `end_of_paint`.
    pub frames: u32,
    /// Number of clears.
    pub clears: u32,
    /// Ids of pictures drawn since creation, with their offsets.
    pub draws: Vec<(u32, Vec2)>,
}

/// Shared view of a canvas's state, valid after the canvas is disposed.
#[derive(Clone, Debug)]
pub struct CanvasProbe {
    id: SurfaceId,
    state: Rc<RefCell<CanvasState>>,
}

impl CanvasProbe {
    /// Returns the surface id the canvas was created for.
    #[must_use]
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> Ref<'_, CanvasState> {
        self.state.borrow()
    }
}

/// An in-memory rendering target.
#[derive(Debug)]
pub struct FakeCanvas {
    state: Rc<RefCell<CanvasState>>,
}

impl FakeCanvas {
    fn live(&self) -> RefMut<'_, CanvasState> {
        let state = self.state.borrow_mut();
        assert!(!state.disposed, "use of a disposed canvas");
        state
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> Ref<'_, CanvasState> {
        self.state.borrow()
    }
}

impl RenderTarget for FakeCanvas {
    fn acquire_frame(&mut self, size: Size) {
        self.live().frame_size = size;
    }

    fn clear(&mut self) {
        self.live().clears += 1;
    }

    fn end_of_paint(&mut self) {
        self.live().frames += 1;
    }

    fn add_to_scene(&mut self) {
        self.live().attached = true;
    }

    fn remove_from_scene(&mut self) {
        self.live().attached = false;
    }

    fn is_attached(&self) -> bool {
        self.state.borrow().attached
    }

    fn dispose(&mut self) {
        let mut state = self.live();
        state.attached = false;
        state.disposed = true;
    }
}

impl PictureTarget<FakePicture> for FakeCanvas {
    fn draw_picture(&mut self, picture: &mut FakePicture, offset: Vec2) {
        assert!(!picture.is_deleted(), "drawing deleted picture {}", picture.id());
        self.live().draws.push((picture.id(), offset));
    }
}

/// Creates [`FakeCanvas`]es and keeps a probe on each.
#[derive(Debug, Default)]
pub struct FakeCanvasProvider {
    probes: Vec<CanvasProbe>,
}

impl FakeCanvasProvider {
    /// Returns probes for every canvas created, in creation order.
    #[must_use]
    pub fn probes(&self) -> &[CanvasProbe] {
        &self.probes
    }

    /// Returns the probe of the most recent canvas created for `id`.
    #[must_use]
    pub fn probe(&self, id: SurfaceId) -> Option<&CanvasProbe> {
        self.probes.iter().rev().find(|probe| probe.id == id)
    }
}

impl SurfaceProvider for FakeCanvasProvider {
    type Target = FakeCanvas;

    fn create_surface(&mut self, id: SurfaceId) -> FakeCanvas {
        let state = Rc::new(RefCell::new(CanvasState::default()));
        self.probes.push(CanvasProbe {
            id,
            state: state.clone(),
        });
        FakeCanvas { state }
    }
}
