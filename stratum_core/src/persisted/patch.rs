// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-place updates of persisted operations.

use alloc::vec::Vec;

use crate::host::StyleUpdate;
use crate::native::NativeObject;
use crate::object::BoxRef;
use crate::scene::LayerOp;

/// The attributes an update touched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Patch {
    /// The local transform changed.
    pub transform: bool,
    /// The clip changed.
    pub clip: bool,
    /// The opacity changed.
    pub opacity: bool,
    /// A filter changed.
    pub filter: bool,
    /// An explicit size changed.
    pub size: bool,
    /// Picture content must be replayed.
    pub repaint: bool,
}

impl Patch {
    /// Every attribute; used when a node is first applied.
    pub const ALL: Self = Self {
        transform: true,
        clip: true,
        opacity: true,
        filter: true,
        size: true,
        repaint: true,
    };

    /// Returns whether nothing changed.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::default()
    }
}

impl<P: NativeObject + 'static> LayerOp<P> {
    /// Updates `self` in place to `next`, reporting what changed.
    ///
    /// For pictures the returned reference must be disposed by the caller:
    /// it is either the replaced picture or, when both refer to the same box,
    /// the redundant incoming reference.
    ///
    /// # Panics
    ///
    /// Panics if `next` is not [compatible](Self::is_compatible) with `self`.
    pub(crate) fn update(&mut self, next: Self) -> (Patch, Option<BoxRef<P>>) {
        let (from, to) = (self.kind(), next.kind());
        let mut patch = Patch::default();
        let mut stale = None;
        match (self, next) {
            (Self::Offset { offset }, Self::Offset { offset: new }) => {
                patch.transform = replace(offset, new);
            }
            (Self::Opacity { alpha, offset }, Self::Opacity { alpha: a, offset: o }) => {
                patch.opacity = replace(alpha, a);
                patch.transform = replace(offset, o);
            }
            (Self::ClipRect { rect }, Self::ClipRect { rect: new }) => {
                patch.clip = replace(rect, new);
            }
            (Self::ClipRRect { rrect }, Self::ClipRRect { rrect: new }) => {
                patch.clip = replace(rrect, new);
            }
            (Self::ClipPath { path }, Self::ClipPath { path: new }) => {
                patch.clip = replace(path, new);
            }
            (Self::Transform { matrix }, Self::Transform { matrix: new }) => {
                patch.transform = replace(matrix, new);
            }
            (Self::ImageFilter { filter, offset }, Self::ImageFilter { filter: f, offset: o }) => {
                patch.filter = replace(filter, f);
                patch.transform = replace(offset, o);
            }
            (Self::BackdropFilter { filter }, Self::BackdropFilter { filter: new }) => {
                patch.filter = replace(filter, new);
            }
            (
                Self::Picture {
                    offset,
                    cull,
                    picture,
                },
                Self::Picture {
                    offset: o,
                    cull: c,
                    picture: p,
                },
            ) => {
                patch.transform = replace(offset, o);
                patch.size = replace(cull, c);
                patch.repaint = patch.size;
                if picture.same_box(&p) {
                    stale = Some(p);
                } else {
                    stale = Some(core::mem::replace(picture, p));
                    patch.repaint = true;
                }
            }
            (
                Self::PlatformView {
                    view_id,
                    offset,
                    size,
                },
                Self::PlatformView {
                    view_id: v,
                    offset: o,
                    size: s,
                },
            ) => {
                assert!(
                    *view_id == v,
                    "cannot update platform view {view_id} from platform view {v}"
                );
                patch.transform = replace(offset, o);
                patch.size = replace(size, s);
            }
            _ => panic!("cannot update a {from:?} node from a {to:?} operation"),
        }
        (patch, stale)
    }

    /// Returns the style properties to write for `patch`.
    pub(crate) fn styles(&self, patch: Patch) -> Vec<StyleUpdate> {
        let mut out = Vec::new();
        match self {
            Self::Offset { .. } | Self::Transform { .. } => {
                if patch.transform {
                    out.push(StyleUpdate::Transform(self.local_transform()));
                }
            }
            Self::Opacity { alpha, .. } => {
                if patch.transform {
                    out.push(StyleUpdate::Transform(self.local_transform()));
                }
                if patch.opacity {
                    out.push(StyleUpdate::Opacity(f32::from(*alpha) / 255.0));
                }
            }
            Self::ClipRect { rect } => {
                if patch.clip {
                    out.push(StyleUpdate::ClipRect(*rect));
                }
            }
            Self::ClipRRect { rrect } => {
                if patch.clip {
                    out.push(StyleUpdate::ClipRRect(*rrect));
                }
            }
            Self::ClipPath { path } => {
                if patch.clip {
                    out.push(StyleUpdate::ClipPath(path.clone()));
                }
            }
            Self::ImageFilter { filter, .. } => {
                if patch.transform {
                    out.push(StyleUpdate::Transform(self.local_transform()));
                }
                if patch.filter {
                    out.push(StyleUpdate::Filter(*filter));
                }
            }
            Self::BackdropFilter { filter } => {
                if patch.filter {
                    out.push(StyleUpdate::BackdropFilter(*filter));
                }
            }
            Self::Picture { cull, .. } => {
                if patch.transform {
                    out.push(StyleUpdate::Transform(self.local_transform()));
                }
                if patch.size {
                    out.push(StyleUpdate::Size(cull.size()));
                }
            }
            Self::PlatformView { size, .. } => {
                if patch.transform {
                    out.push(StyleUpdate::Transform(self.local_transform()));
                }
                if patch.size {
                    out.push(StyleUpdate::Size(*size));
                }
            }
        }
        out
    }
}

/// Stores `new` into `slot`; returns whether the value changed.
fn replace<T: PartialEq>(slot: &mut T, new: T) -> bool {
    if *slot == new {
        false
    } else {
        *slot = new;
        true
    }
}
