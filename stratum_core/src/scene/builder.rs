// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Push/pop construction of scenes.

use alloc::vec::Vec;

use kurbo::{BezPath, Rect, RoundedRect, Size, Vec2};

use super::{ImageFilter, LayerOp, Scene, SceneNode};
use crate::native::NativeObject;
use crate::object::BoxRef;
use crate::transform::Transform3d;

/// Builds a [`Scene`] by pushing container layers, adding leaves, and popping.
///
/// ```rust,ignore
/// let mut builder = SceneBuilder::new();
/// builder.push_opacity(128, Vec2::new(5.0, 5.0));
/// builder.add_picture(Vec2::ZERO, cull, picture);
/// builder.pop();
/// let scene = builder.build();
/// ```
#[derive(Debug)]
pub struct SceneBuilder<P: NativeObject + 'static> {
    roots: Vec<SceneNode<P>>,
    open: Vec<SceneNode<P>>,
}

impl<P: NativeObject + 'static> Default for SceneBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: NativeObject + 'static> SceneBuilder<P> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            open: Vec::new(),
        }
    }

    /// Returns the number of container layers not yet popped.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Opens an offset layer.
    pub fn push_offset(&mut self, offset: Vec2) {
        self.push(LayerOp::Offset { offset });
    }

    /// Opens an opacity layer.
    pub fn push_opacity(&mut self, alpha: u8, offset: Vec2) {
        self.push(LayerOp::Opacity { alpha, offset });
    }

    /// Opens a rectangular clip layer.
    pub fn push_clip_rect(&mut self, rect: Rect) {
        self.push(LayerOp::ClipRect { rect });
    }

    /// Opens a rounded-rectangle clip layer.
    pub fn push_clip_rrect(&mut self, rrect: RoundedRect) {
        self.push(LayerOp::ClipRRect { rrect });
    }

    /// Opens a path clip layer.
    pub fn push_clip_path(&mut self, path: BezPath) {
        self.push(LayerOp::ClipPath { path });
    }

    /// Opens a transform layer.
    ///
    /// # Panics
    ///
    /// Panics if `matrix` has non-finite entries.
    pub fn push_transform(&mut self, matrix: Transform3d) {
        assert!(matrix.is_finite(), "transform must be finite: {matrix:?}");
        self.push(LayerOp::Transform { matrix });
    }

    /// Opens an image filter layer.
    pub fn push_image_filter(&mut self, filter: ImageFilter, offset: Vec2) {
        self.push(LayerOp::ImageFilter { filter, offset });
    }

    /// Opens a backdrop filter layer.
    pub fn push_backdrop_filter(&mut self, filter: ImageFilter) {
        self.push(LayerOp::BackdropFilter { filter });
    }

    /// Closes the most recently pushed layer.
    ///
    /// # Panics
    ///
    /// Panics if no layer is open.
    pub fn pop(&mut self) {
        let Some(node) = self.open.pop() else {
            panic!("pop without a matching push");
        };
        self.attach(node);
    }

    /// Adds a picture leaf. The scene takes over the `picture` reference.
    pub fn add_picture(&mut self, offset: Vec2, cull: Rect, picture: BoxRef<P>) {
        self.attach(SceneNode::leaf(LayerOp::Picture {
            offset,
            cull,
            picture,
        }));
    }

    /// Adds a platform view placeholder leaf.
    pub fn add_platform_view(&mut self, view_id: u64, offset: Vec2, size: Size) {
        self.attach(SceneNode::leaf(LayerOp::PlatformView {
            view_id,
            offset,
            size,
        }));
    }

    /// Finishes the scene.
    ///
    /// # Panics
    ///
    /// Panics if any pushed layer was not popped.
    #[must_use]
    pub fn build(self) -> Scene<P> {
        assert!(
            self.open.is_empty(),
            "unbalanced scene: {} layers still open",
            self.open.len()
        );
        Scene { roots: self.roots }
    }

    fn push(&mut self, op: LayerOp<P>) {
        self.open.push(SceneNode::leaf(op));
    }

    fn attach(&mut self, node: SceneNode<P>) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }
}
