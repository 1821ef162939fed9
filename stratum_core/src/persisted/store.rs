// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and derived
//! geometry.

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Rect, Size};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{INVALID, NodeId};
use super::traverse::Children;
use crate::dirty;
use crate::host::ElementId;
use crate::native::NativeObject;
use crate::scene::{LayerOp, OpKind};
use crate::surface::SurfaceId;
use crate::transform::Transform3d;

/// Slot of the implicit root node, which stands for the host window.
pub(crate) const ROOT: u32 = 0;

/// The retained tree of persisted surfaces.
///
/// Each node mirrors one [`LayerOp`] of the most recently retained scene and
/// owns one host element, plus a rendering target for pictures. Nodes live in
/// parallel arrays addressed by [`NodeId`]; released slots are recycled via a
/// free list and generation counters make stale handles detectable.
///
/// Slot 0 is an implicit root with no operation. Its element is the host's
/// root element and its clip is the viewport.
pub struct SurfaceTree<P: NativeObject + 'static> {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Mirrored state --
    pub(crate) op: Vec<Option<LayerOp<P>>>,
    pub(crate) element: Vec<ElementId>,
    pub(crate) surface: Vec<Option<SurfaceId>>,

    // -- Local geometry (derived from the operation) --
    pub(crate) local_transform: Vec<Transform3d>,
    pub(crate) local_clip: Vec<Option<Rect>>,

    // -- Computed geometry (written by evaluate) --
    pub(crate) world_transform: Vec<Transform3d>,
    pub(crate) projected_clip: Vec<Rect>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) needs_paint: Vec<u32>,

    // -- Frame state --
    pub(crate) viewport: Size,
    pub(crate) frame_index: u64,
}

impl<P: NativeObject + 'static> fmt::Debug for SurfaceTree<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceTree")
            .field("nodes", &self.node_count())
            .field("slots", &self.len)
            .field("viewport", &self.viewport)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl<P: NativeObject + 'static> SurfaceTree<P> {
    /// Creates a tree holding only the root, hosted by `root_element`.
    #[must_use]
    pub fn new(root_element: ElementId) -> Self {
        let mut tree = Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            op: Vec::new(),
            element: Vec::new(),
            surface: Vec::new(),
            local_transform: Vec::new(),
            local_clip: Vec::new(),
            world_transform: Vec::new(),
            projected_clip: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            needs_paint: Vec::new(),
            viewport: Size::ZERO,
            frame_index: 0,
        };
        let root = tree.alloc_slot(None, root_element);
        debug_assert_eq!(root, ROOT, "root must occupy the first slot");
        tree.local_clip[ROOT as usize] = Some(Rect::ZERO);
        tree
    }

    // -- Queries --

    /// Returns the implicit root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.node_id(ROOT)
    }

    /// Returns whether the handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Returns the number of live nodes, excluding the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len() - 1
    }

    /// Returns the viewport applied by the most recent retain.
    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Returns the number of frames retained so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.node_id(p))
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_, P> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the `n`th child of a node.
    #[must_use]
    pub fn child(&self, id: NodeId, n: usize) -> Option<NodeId> {
        self.children(id).nth(n)
    }

    /// Returns the operation a node mirrors (`None` for the root).
    #[must_use]
    pub fn op(&self, id: NodeId) -> Option<&LayerOp<P>> {
        self.validate(id);
        self.op[id.idx as usize].as_ref()
    }

    /// Returns the operation kind of a node (`None` for the root).
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<OpKind> {
        self.op(id).map(LayerOp::kind)
    }

    /// Returns the host element of a node.
    #[must_use]
    pub fn element(&self, id: NodeId) -> ElementId {
        self.validate(id);
        self.element[id.idx as usize]
    }

    /// Returns the rendering target of a picture node.
    #[must_use]
    pub fn surface(&self, id: NodeId) -> Option<SurfaceId> {
        self.validate(id);
        self.surface[id.idx as usize]
    }

    /// Returns the local transform of a node.
    #[must_use]
    pub fn local_transform(&self, id: NodeId) -> Transform3d {
        self.validate(id);
        self.local_transform[id.idx as usize]
    }

    /// Returns the local clip bounds of a node.
    #[must_use]
    pub fn local_clip(&self, id: NodeId) -> Option<Rect> {
        self.validate(id);
        self.local_clip[id.idx as usize]
    }

    /// Returns the computed world transform of a node.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has run.
    #[must_use]
    pub fn world_transform(&self, id: NodeId) -> Transform3d {
        self.validate(id);
        self.world_transform[id.idx as usize]
    }

    /// Returns the computed clip of a node in viewport coordinates.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has run.
    #[must_use]
    pub fn projected_clip(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.projected_clip[id.idx as usize]
    }

    // -- Internal mutation --

    /// Allocates a node for `op` hosted by `element`. The node is unlinked.
    pub(crate) fn alloc_node(&mut self, op: LayerOp<P>, element: ElementId) -> u32 {
        self.alloc_slot(Some(op), element)
    }

    fn alloc_slot(&mut self, op: Option<LayerOp<P>>, element: ElementId) -> u32 {
        let (local_transform, local_clip) = op
            .as_ref()
            .map_or((Transform3d::IDENTITY, None), |op| {
                (op.local_transform(), op.local_clip())
            });
        if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.op[i] = op;
            self.element[i] = element;
            self.surface[i] = None;
            self.local_transform[i] = local_transform;
            self.local_clip[i] = local_clip;
            self.world_transform[i] = Transform3d::IDENTITY;
            self.projected_clip[i] = Rect::ZERO;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.op.push(op);
            self.element.push(element);
            self.surface.push(None);
            self.local_transform.push(local_transform);
            self.local_clip.push(local_clip);
            self.world_transform.push(Transform3d::IDENTITY);
            self.projected_clip.push(Rect::ZERO);
            self.generation.push(0);
            idx
        }
    }

    /// Records `parent` as the parent of the unlinked node `idx` and marks
    /// its geometry stale. Sibling order is set by
    /// [`set_child_order`](Self::set_child_order).
    pub(crate) fn adopt(&mut self, parent: u32, idx: u32) {
        debug_assert_eq!(
            self.parent[idx as usize], INVALID,
            "node already has a parent"
        );
        self.parent[idx as usize] = parent;
        let _ = self.dirty.add_dependency(idx, parent, dirty::TRANSFORM);
        let _ = self.dirty.add_dependency(idx, parent, dirty::CLIP);
        self.mark_transform(idx);
    }

    /// Rewrites the sibling links below `parent` to exactly `order`.
    ///
    /// Every node in `order` must already have `parent` as its parent.
    pub(crate) fn set_child_order(&mut self, parent: u32, order: &[u32]) {
        let mut prev = INVALID;
        for &idx in order {
            debug_assert_eq!(self.parent[idx as usize], parent, "foreign child");
            self.prev_sibling[idx as usize] = prev;
            self.next_sibling[idx as usize] = INVALID;
            if prev == INVALID {
                self.first_child[parent as usize] = idx;
            } else {
                self.next_sibling[prev as usize] = idx;
            }
            prev = idx;
        }
        if order.is_empty() {
            self.first_child[parent as usize] = INVALID;
        }
    }

    /// Frees a childless node's slot, unlinking it from its parent.
    pub(crate) fn free_node(&mut self, idx: u32) {
        assert!(idx != ROOT, "cannot free the root node");
        debug_assert_eq!(
            self.first_child[idx as usize], INVALID,
            "children must be freed first"
        );
        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }
        self.dirty.remove_key(idx);
        self.op[idx as usize] = None;
        self.surface[idx as usize] = None;
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);
    }

    /// Returns the raw slot indices of `parent`'s children, in order.
    pub(crate) fn child_indices(&self, parent: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut child = self.first_child[parent as usize];
        while child != INVALID {
            out.push(child);
            child = self.next_sibling[child as usize];
        }
        out
    }

    /// Marks `idx` and its subtree for world transform and clip
    /// recomputation.
    pub(crate) fn mark_transform(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::CLIP, &EagerPolicy);
    }

    /// Marks `idx` and its subtree for clip recomputation.
    pub(crate) fn mark_clip(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::CLIP, &EagerPolicy);
    }

    /// Applies a new viewport to the root clip. Returns `true` if it changed.
    pub(crate) fn set_viewport(&mut self, viewport: Size) -> bool {
        if viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        self.local_clip[ROOT as usize] = Some(viewport.to_rect());
        self.mark_clip(ROOT);
        true
    }

    pub(crate) fn node_id(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Removes `idx` from its parent's child list and dependency edges.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else if self.first_child[p as usize] == idx {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.dirty.remove_dependency(idx, p, dirty::TRANSFORM);
        self.dirty.remove_dependency(idx, p, dirty::CLIP);

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}
