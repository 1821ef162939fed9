// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer operations.

use kurbo::{Affine, BezPath, Rect, RoundedRect, Shape as _, Size, Vec2};

use crate::native::NativeObject;
use crate::object::BoxRef;
use crate::transform::Transform3d;

/// The tag of a [`LayerOp`], used for positional matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// [`LayerOp::Offset`].
    Offset,
    /// [`LayerOp::Opacity`].
    Opacity,
    /// [`LayerOp::ClipRect`].
    ClipRect,
    /// [`LayerOp::ClipRRect`].
    ClipRRect,
    /// [`LayerOp::ClipPath`].
    ClipPath,
    /// [`LayerOp::Transform`].
    Transform,
    /// [`LayerOp::ImageFilter`].
    ImageFilter,
    /// [`LayerOp::BackdropFilter`].
    BackdropFilter,
    /// [`LayerOp::Picture`].
    Picture,
    /// [`LayerOp::PlatformView`].
    PlatformView,
}

/// A filter applied to a subtree or to the backdrop behind it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFilter {
    /// Gaussian blur.
    Blur {
        /// Horizontal standard deviation.
        sigma_x: f64,
        /// Vertical standard deviation.
        sigma_y: f64,
    },
    /// Morphological dilation.
    Dilate {
        /// Radius in pixels.
        radius: f64,
    },
    /// Morphological erosion.
    Erode {
        /// Radius in pixels.
        radius: f64,
    },
    /// Resampling through a 2-D affine matrix.
    Matrix(Affine),
}

/// One node's operation in a scene description.
///
/// Container operations (everything except [`Picture`](Self::Picture) and
/// [`PlatformView`](Self::PlatformView)) apply to their children.
#[derive(Debug)]
pub enum LayerOp<P: NativeObject + 'static> {
    /// Translates children.
    Offset {
        /// Translation.
        offset: Vec2,
    },
    /// Composites children with group opacity.
    Opacity {
        /// Opacity, 0 (transparent) to 255 (opaque).
        alpha: u8,
        /// Translation.
        offset: Vec2,
    },
    /// Clips children to a rectangle.
    ClipRect {
        /// Clip rectangle in local coordinates.
        rect: Rect,
    },
    /// Clips children to a rounded rectangle.
    ClipRRect {
        /// Clip shape in local coordinates.
        rrect: RoundedRect,
    },
    /// Clips children to an arbitrary path.
    ClipPath {
        /// Clip path in local coordinates.
        path: BezPath,
    },
    /// Transforms children.
    Transform {
        /// Local transform.
        matrix: Transform3d,
    },
    /// Filters the composited children.
    ImageFilter {
        /// Filter.
        filter: ImageFilter,
        /// Translation.
        offset: Vec2,
    },
    /// Filters whatever was painted behind this node.
    BackdropFilter {
        /// Filter.
        filter: ImageFilter,
    },
    /// Replays a recorded picture into a rendering target.
    Picture {
        /// Position of the picture's origin.
        offset: Vec2,
        /// Bounds of the recorded content, in picture coordinates.
        cull: Rect,
        /// The recording. The node owns this reference.
        picture: BoxRef<P>,
    },
    /// Reserves space for a view rendered by the platform.
    PlatformView {
        /// Identity of the platform view.
        view_id: u64,
        /// Position.
        offset: Vec2,
        /// Size.
        size: Size,
    },
}

impl<P: NativeObject + 'static> LayerOp<P> {
    /// Returns the operation's tag.
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Offset { .. } => OpKind::Offset,
            Self::Opacity { .. } => OpKind::Opacity,
            Self::ClipRect { .. } => OpKind::ClipRect,
            Self::ClipRRect { .. } => OpKind::ClipRRect,
            Self::ClipPath { .. } => OpKind::ClipPath,
            Self::Transform { .. } => OpKind::Transform,
            Self::ImageFilter { .. } => OpKind::ImageFilter,
            Self::BackdropFilter { .. } => OpKind::BackdropFilter,
            Self::Picture { .. } => OpKind::Picture,
            Self::PlatformView { .. } => OpKind::PlatformView,
        }
    }

    /// Returns whether a node built from `self` can be updated in place to
    /// `other`.
    ///
    /// Kinds must match; platform views must also show the same view.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::PlatformView { view_id: a, .. }, Self::PlatformView { view_id: b, .. }) => {
                a == b
            }
            _ => self.kind() == other.kind(),
        }
    }

    /// Returns the transform this operation applies relative to its parent.
    #[must_use]
    pub fn local_transform(&self) -> Transform3d {
        match self {
            Self::Offset { offset }
            | Self::Opacity { offset, .. }
            | Self::ImageFilter { offset, .. }
            | Self::Picture { offset, .. }
            | Self::PlatformView { offset, .. } => Transform3d::from_offset(*offset),
            Self::Transform { matrix } => *matrix,
            Self::ClipRect { .. }
            | Self::ClipRRect { .. }
            | Self::ClipPath { .. }
            | Self::BackdropFilter { .. } => Transform3d::IDENTITY,
        }
    }

    /// Returns the bounds of this operation's clip in local coordinates.
    ///
    /// Rounded rectangles and paths clip to their bounding box for culling.
    #[must_use]
    pub fn local_clip(&self) -> Option<Rect> {
        match self {
            Self::ClipRect { rect } => Some(*rect),
            Self::ClipRRect { rrect } => Some(rrect.rect()),
            Self::ClipPath { path } => Some(path.bounding_box()),
            _ => None,
        }
    }

    /// Returns the picture reference, if this is a picture.
    #[must_use]
    pub fn picture(&self) -> Option<&BoxRef<P>> {
        match self {
            Self::Picture { picture, .. } => Some(picture),
            _ => None,
        }
    }
}
