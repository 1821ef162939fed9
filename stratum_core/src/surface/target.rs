// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering-target contract.

use kurbo::{Size, Vec2};

use super::SurfaceId;

/// A canvas-like rendering target (an offscreen bitmap or a GL-backed
/// canvas element).
///
/// Targets are created by a [`SurfaceProvider`] and owned by the
/// [`SurfaceFactory`](super::SurfaceFactory); stratum only decides when they
/// are attached, painted, and disposed.
pub trait RenderTarget {
    /// Prepares a frame of at least `size` pixels, growing the backing store
    /// if needed.
    fn acquire_frame(&mut self, size: Size);

    /// Clears the current frame.
    fn clear(&mut self);

    /// Flushes painting for the current frame.
    fn end_of_paint(&mut self);

    /// Connects the target to the host document.
    fn add_to_scene(&mut self);

    /// Disconnects the target from the host document, keeping its backing
    /// resource for reuse.
    fn remove_from_scene(&mut self);

    /// Returns whether the target is connected to the host document.
    fn is_attached(&self) -> bool;

    /// Releases the backing resource. The target is not used again.
    fn dispose(&mut self);
}

/// A rendering target that can replay recorded pictures of type `P`.
pub trait PictureTarget<P>: RenderTarget {
    /// Replays `picture` into the current frame, translated by `offset`.
    fn draw_picture(&mut self, picture: &mut P, offset: Vec2);
}

/// Creates rendering targets on behalf of a
/// [`SurfaceFactory`](super::SurfaceFactory).
pub trait SurfaceProvider {
    /// The target type this provider creates.
    type Target: RenderTarget;

    /// Creates a fresh, detached target that will be known as `id`.
    fn create_surface(&mut self, id: SurfaceId) -> Self::Target;
}
