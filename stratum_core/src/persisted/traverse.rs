// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, NodeId};
use super::store::SurfaceTree;
use crate::native::NativeObject;

/// An iterator over the direct children of a node.
///
/// Created by [`SurfaceTree::children`].
#[derive(Debug)]
pub struct Children<'a, P: NativeObject + 'static> {
    tree: &'a SurfaceTree<P>,
    current: u32,
}

impl<'a, P: NativeObject + 'static> Children<'a, P> {
    pub(crate) fn new(tree: &'a SurfaceTree<P>, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl<P: NativeObject + 'static> Iterator for Children<'_, P> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(NodeId {
            idx,
            generation: self.tree.generation[idx as usize],
        })
    }
}
