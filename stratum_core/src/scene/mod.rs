// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene descriptions.
//!
//! A [`Scene`] is an ordered tree of [`LayerOp`]s produced fresh every frame,
//! usually through a [`SceneBuilder`]. It is consumed by
//! [`SurfaceTree::retain`](crate::persisted::SurfaceTree::retain), which
//! takes over the picture references it carries.

use alloc::vec::Vec;

use crate::native::NativeObject;

mod builder;
mod op;

pub use builder::SceneBuilder;
pub use op::{ImageFilter, LayerOp, OpKind};

/// One node of a scene description.
#[derive(Debug)]
pub struct SceneNode<P: NativeObject + 'static> {
    pub(crate) op: LayerOp<P>,
    pub(crate) children: Vec<SceneNode<P>>,
}

impl<P: NativeObject + 'static> SceneNode<P> {
    /// Creates a node with children.
    #[must_use]
    pub fn new(op: LayerOp<P>, children: Vec<Self>) -> Self {
        Self { op, children }
    }

    /// Creates a node without children.
    #[must_use]
    pub fn leaf(op: LayerOp<P>) -> Self {
        Self::new(op, Vec::new())
    }

    /// Returns the node's operation.
    #[must_use]
    pub fn op(&self) -> &LayerOp<P> {
        &self.op
    }

    /// Returns the node's children in paint order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(Self::count).sum::<usize>()
    }

    fn dispose(self) {
        if let LayerOp::Picture { mut picture, .. } = self.op {
            picture.dispose();
        }
        for child in self.children {
            child.dispose();
        }
    }
}

/// A complete frame description.
#[derive(Debug)]
pub struct Scene<P: NativeObject + 'static> {
    pub(crate) roots: Vec<SceneNode<P>>,
}

impl<P: NativeObject + 'static> Default for Scene<P> {
    fn default() -> Self {
        Self { roots: Vec::new() }
    }
}

impl<P: NativeObject + 'static> Scene<P> {
    /// Creates a scene from top-level nodes.
    #[must_use]
    pub fn new(roots: Vec<SceneNode<P>>) -> Self {
        Self { roots }
    }

    /// Returns the top-level nodes.
    #[must_use]
    pub fn roots(&self) -> &[SceneNode<P>] {
        &self.roots
    }

    /// Returns the total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(SceneNode::count).sum()
    }

    /// Disposes every picture reference held by a scene that will not be
    /// retained.
    pub fn dispose(self) {
        for root in self.roots {
            root.dispose();
        }
    }
}
