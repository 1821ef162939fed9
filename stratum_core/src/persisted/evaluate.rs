// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazy recomputation of derived geometry.
//!
//! Evaluation follows a drain-recompute pattern for each dirty channel, in
//! parent-before-child order:
//!
//! 1. **TRANSFORM**: `world_transform = parent_world * local_transform`.
//! 2. **CLIP**: `projected_clip = parent_projected ∩ bbox(world * local_clip)`,
//!    or the parent's projected clip for nodes without a clip. The root's
//!    projected clip is the viewport.
//!
//! Only marked nodes (and, through eager propagation, their descendants)
//! are visited, so an unchanged subtree costs nothing.

use alloc::vec::Vec;

use super::id::INVALID;
use super::store::{ROOT, SurfaceTree};
use crate::dirty;
use crate::native::NativeObject;
use crate::scene::LayerOp;
use crate::transform::Transform3d;

/// Raw slot indices whose derived geometry was recomputed by one
/// [`SurfaceTree::evaluate`] call.
#[derive(Clone, Debug, Default)]
pub struct TreeChanges {
    /// Nodes whose world transform was recomputed.
    pub transforms: Vec<u32>,
    /// Nodes whose projected clip was recomputed.
    pub clips: Vec<u32>,
}

impl<P: NativeObject + 'static> SurfaceTree<P> {
    /// Recomputes world transforms and projected clips of dirty nodes.
    ///
    /// Picture nodes whose projected clip changed are queued for repaint,
    /// since their visible area may have moved.
    pub fn evaluate(&mut self) -> TreeChanges {
        let transforms: Vec<u32> = self
            .dirty
            .drain(dirty::TRANSFORM)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &transforms {
            let parent = self.parent[idx as usize];
            let parent_world = if parent == INVALID {
                Transform3d::IDENTITY
            } else {
                self.world_transform[parent as usize]
            };
            self.world_transform[idx as usize] = parent_world * self.local_transform[idx as usize];
        }

        let clips: Vec<u32> = self
            .dirty
            .drain(dirty::CLIP)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &clips {
            let i = idx as usize;
            if idx == ROOT {
                self.projected_clip[i] = self.viewport.to_rect();
                continue;
            }
            let parent = self.parent[i];
            let parent_clip = if parent == INVALID {
                self.viewport.to_rect()
            } else {
                self.projected_clip[parent as usize]
            };
            self.projected_clip[i] = match self.local_clip[i] {
                Some(local) => {
                    parent_clip.intersect(self.world_transform[i].transform_rect_bbox(local))
                }
                None => parent_clip,
            };
            if matches!(self.op[i], Some(LayerOp::Picture { .. })) {
                self.needs_paint.push(idx);
            }
        }

        TreeChanges { transforms, clips }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Size, Vec2};

    use super::*;
    use crate::host::ElementId;

    #[derive(Debug)]
    struct Recording;

    impl NativeObject for Recording {
        fn delete(&mut self) {}

        fn is_deleted(&self) -> bool {
            false
        }
    }

    fn link(tree: &mut SurfaceTree<Recording>, parent: u32, op: LayerOp<Recording>) -> u32 {
        let idx = tree.alloc_node(op, ElementId(tree.len));
        tree.adopt(parent, idx);
        let mut order = tree.child_indices(parent);
        order.push(idx);
        tree.set_child_order(parent, &order);
        idx
    }

    #[test]
    fn world_transform_composes_ancestors() {
        let mut tree = SurfaceTree::<Recording>::new(ElementId(0));
        let outer = link(
            &mut tree,
            ROOT,
            LayerOp::Offset {
                offset: Vec2::new(10.0, 0.0),
            },
        );
        let inner = link(
            &mut tree,
            outer,
            LayerOp::Opacity {
                alpha: 128,
                offset: Vec2::new(0.0, 5.0),
            },
        );
        let _ = tree.evaluate();
        assert_eq!(
            tree.world_transform(tree.node_id(inner)),
            Transform3d::from_translation(10.0, 5.0, 0.0)
        );
    }

    #[test]
    fn projected_clip_intersects_viewport_and_ancestors() {
        let mut tree = SurfaceTree::<Recording>::new(ElementId(0));
        tree.set_viewport(Size::new(100.0, 100.0));
        let moved = link(
            &mut tree,
            ROOT,
            LayerOp::Offset {
                offset: Vec2::new(80.0, 0.0),
            },
        );
        let clip = link(
            &mut tree,
            moved,
            LayerOp::ClipRect {
                rect: Rect::new(0.0, 0.0, 50.0, 50.0),
            },
        );
        let _ = tree.evaluate();
        assert_eq!(
            tree.projected_clip(tree.node_id(clip)),
            Rect::new(80.0, 0.0, 100.0, 50.0)
        );
        assert_eq!(
            tree.projected_clip(tree.node_id(moved)),
            Rect::new(0.0, 0.0, 100.0, 100.0)
        );
    }

    #[test]
    fn viewport_change_reaches_descendants() {
        let mut tree = SurfaceTree::<Recording>::new(ElementId(0));
        tree.set_viewport(Size::new(100.0, 100.0));
        let child = link(
            &mut tree,
            ROOT,
            LayerOp::Offset {
                offset: Vec2::ZERO,
            },
        );
        let _ = tree.evaluate();

        assert!(!tree.set_viewport(Size::new(100.0, 100.0)));
        let unchanged = tree.evaluate();
        assert!(unchanged.clips.is_empty(), "same viewport marks nothing");

        assert!(tree.set_viewport(Size::new(40.0, 30.0)));
        let changes = tree.evaluate();
        assert!(changes.clips.contains(&child));
        assert!(changes.transforms.is_empty());
        assert_eq!(
            tree.projected_clip(tree.node_id(child)),
            Rect::new(0.0, 0.0, 40.0, 30.0)
        );
    }

    #[test]
    fn clean_tree_evaluates_nothing() {
        let mut tree = SurfaceTree::<Recording>::new(ElementId(0));
        let _ = link(
            &mut tree,
            ROOT,
            LayerOp::Offset {
                offset: Vec2::ZERO,
            },
        );
        let _ = tree.evaluate();
        let changes = tree.evaluate();
        assert!(changes.transforms.is_empty());
        assert!(changes.clips.is_empty());
    }
}
