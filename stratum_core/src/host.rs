// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host document contract.
//!
//! Every persisted node owns one element in the host document (a `<div>` in
//! a browser). The retain pass creates, restyles, orders and removes those
//! elements through [`ElementHost`]; it never inspects them.

use core::fmt;

use kurbo::{BezPath, Rect, RoundedRect, Size};

use crate::scene::{ImageFilter, OpKind};
use crate::surface::SurfaceId;
use crate::transform::Transform3d;

/// An element in the host document.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u32);

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

/// A single style property written to an element.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleUpdate {
    /// Transform relative to the parent element.
    Transform(Transform3d),
    /// Group opacity, 0.0 to 1.0.
    Opacity(f32),
    /// Rectangular clip.
    ClipRect(Rect),
    /// Rounded-rectangle clip.
    ClipRRect(RoundedRect),
    /// Path clip.
    ClipPath(BezPath),
    /// Filter over the element's content.
    Filter(ImageFilter),
    /// Filter over what is behind the element.
    BackdropFilter(ImageFilter),
    /// Explicit element size.
    Size(Size),
}

/// The document that hosts persisted elements.
pub trait ElementHost {
    /// Returns the element that hosts the scene root.
    fn root(&self) -> ElementId;

    /// Creates a detached element for a node of the given kind.
    fn create_element(&mut self, kind: OpKind) -> ElementId;

    /// Appends `child` as the last child of `parent`, moving it if it is
    /// already in the document.
    fn append_child(&mut self, parent: ElementId, child: ElementId);

    /// Removes `element` and its descendants from the document.
    fn remove_element(&mut self, element: ElementId);

    /// Writes one style property.
    fn set_style(&mut self, element: ElementId, style: &StyleUpdate);

    /// Places the rendering target `surface` inside `element`.
    fn attach_surface(&mut self, element: ElementId, surface: SurfaceId);
}
