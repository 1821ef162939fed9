// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-to-frame diffing of the persisted tree against a new scene.
//!
//! A retain pass runs in phases:
//!
//! 1. **Match**: walk the scene and the tree together. A scene node reuses
//!    the old node at the same child position when the operations are
//!    compatible. Every old node without a match is released with its
//!    subtree: picture references are disposed, rendering targets go back to
//!    the factory, and the host element is removed.
//! 2. **Apply**: walk the scene again. Reused nodes are patched in place;
//!    the rest are created and fully applied (a picture acquires a target).
//!    Sibling order is rewritten only where it changed.
//! 3. **Evaluate**: recompute world transforms and projected clips of
//!    dirty nodes.
//! 4. **Paint**: replay pictures that are new, changed, or whose visible
//!    area moved.
//!
//! All releases of phase 1 complete before the first acquisition of phase 2,
//! so replaced pictures hand their targets to their replacements instead of
//! pushing the factory past capacity.
//!
//! Matching is positional: swapping two siblings replaces both.

use alloc::vec::Vec;
use core::mem;

use kurbo::Size;

use super::patch::Patch;
use super::store::{ROOT, SurfaceTree};
use crate::host::ElementHost;
use crate::native::NativeObject;
use crate::scene::{LayerOp, OpKind, Scene, SceneNode};
use crate::surface::{AcquireKind, PictureTarget, RenderTarget, SurfaceFactory, SurfaceProvider};
#[cfg(feature = "trace-rich")]
use crate::trace::{RetainAction, RetainEvent};
use crate::trace::{FrameSummary, SurfaceEvent, SurfaceEventKind, Tracer};

/// What one [`SurfaceTree::retain`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetainReport {
    /// Frame counter after this pass.
    pub frame_index: u64,
    /// Nodes updated in place.
    pub reused: u32,
    /// Nodes created.
    pub created: u32,
    /// Nodes released, including descendants of released nodes.
    pub released: u32,
    /// Pictures that had to share the backup surface.
    pub backup_shared: u32,
    /// Pictures replayed into their targets.
    pub repainted: u32,
    /// Pictures skipped because they are entirely clipped out.
    pub culled: u32,
    /// Pictures whose recording could not be resurrected.
    pub paint_failures: u32,
    /// Nodes whose world transform was recomputed.
    pub transforms_recomputed: u32,
    /// Nodes whose projected clip was recomputed.
    pub clips_recomputed: u32,
}

/// Match result for one scene node, mirroring the scene's shape.
///
/// `reuse` names the previous frame's node only for the duration of the
/// pass; it is never stored in the tree.
#[derive(Debug, Default)]
struct Plan {
    reuse: Option<u32>,
    children: Vec<Plan>,
}

struct Pass<'a, 't, S: SurfaceProvider, H> {
    factory: &'a mut SurfaceFactory<S>,
    host: &'a mut H,
    tracer: &'a mut Tracer<'t>,
    report: RetainReport,
}

impl<P: NativeObject + 'static> SurfaceTree<P> {
    /// Diffs the tree against `scene` and brings the host document and the
    /// rendering targets up to date.
    ///
    /// The scene's picture references are taken over by the tree (or
    /// disposed when they duplicate a reference the tree already holds).
    /// The root clip is recomputed from `viewport`.
    pub fn retain<S, H>(
        &mut self,
        scene: Scene<P>,
        viewport: Size,
        factory: &mut SurfaceFactory<S>,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) -> RetainReport
    where
        S: SurfaceProvider,
        S::Target: PictureTarget<P>,
        H: ElementHost,
    {
        self.frame_index += 1;
        let mut pass = Pass {
            factory,
            host,
            tracer,
            report: RetainReport {
                frame_index: self.frame_index,
                ..RetainReport::default()
            },
        };

        self.set_viewport(viewport);

        let plans = self.match_children(ROOT, &scene.roots, &mut pass);
        self.apply_children(ROOT, scene.roots, plans, &mut pass);

        let changes = self.evaluate();
        pass.report.transforms_recomputed = count(&changes.transforms);
        pass.report.clips_recomputed = count(&changes.clips);

        let mut repaint = mem::take(&mut self.needs_paint);
        repaint.sort_unstable();
        repaint.dedup();
        for idx in repaint {
            self.paint(idx, &mut pass);
        }

        let report = pass.report;
        pass.tracer.frame_summary(&FrameSummary {
            frame_index: report.frame_index,
            reused: report.reused,
            created: report.created,
            released: report.released,
            transforms_recomputed: report.transforms_recomputed,
            clips_recomputed: report.clips_recomputed,
            surfaces_live: count_usize(pass.factory.live_count()),
        });
        log::trace!("retained frame {}: {report:?}", report.frame_index);
        report
    }

    /// Releases every node, leaving only the root.
    ///
    /// Used on hot restart, before the collector and the surface factory are
    /// reset. Returns the number of nodes released.
    pub fn clear<S, H>(
        &mut self,
        factory: &mut SurfaceFactory<S>,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) -> u32
    where
        S: SurfaceProvider,
        H: ElementHost,
    {
        let mut pass = Pass {
            factory,
            host,
            tracer,
            report: RetainReport::default(),
        };
        for idx in self.child_indices(ROOT) {
            self.release_subtree(idx, true, &mut pass);
        }
        self.needs_paint.clear();
        // Force the root clip to be reapplied on the next frame.
        self.viewport = Size::ZERO;
        pass.report.released
    }

    fn match_children<S: SurfaceProvider, H: ElementHost>(
        &mut self,
        parent: u32,
        nodes: &[SceneNode<P>],
        pass: &mut Pass<'_, '_, S, H>,
    ) -> Vec<Plan> {
        let old = self.child_indices(parent);
        let mut plans = Vec::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            let reuse = old.get(position).copied().filter(|&idx| {
                self.op[idx as usize]
                    .as_ref()
                    .is_some_and(|op| op.is_compatible(&node.op))
            });
            let children = match reuse {
                Some(idx) => self.match_children(idx, &node.children, pass),
                None => Vec::new(),
            };
            plans.push(Plan { reuse, children });
        }
        for (position, &idx) in old.iter().enumerate() {
            let matched = plans
                .get(position)
                .is_some_and(|plan| plan.reuse == Some(idx));
            if !matched {
                self.release_subtree(idx, true, pass);
            }
        }
        plans
    }

    fn apply_children<S, H>(
        &mut self,
        parent: u32,
        nodes: Vec<SceneNode<P>>,
        plans: Vec<Plan>,
        pass: &mut Pass<'_, '_, S, H>,
    ) where
        S: SurfaceProvider,
        H: ElementHost,
    {
        let mut plans = plans.into_iter();
        let mut order = Vec::with_capacity(nodes.len());
        for node in nodes {
            let plan = plans.next().unwrap_or_default();
            let SceneNode { op, children } = node;
            let idx = match plan.reuse {
                Some(idx) => {
                    self.update_node(idx, op, pass);
                    idx
                }
                None => self.create_node(parent, op, pass),
            };
            self.apply_children(idx, children, plan.children, pass);
            order.push(idx);
        }
        if self.child_indices(parent) != order {
            self.set_child_order(parent, &order);
            let parent_element = self.element[parent as usize];
            for &idx in &order {
                pass.host
                    .append_child(parent_element, self.element[idx as usize]);
            }
        }
    }

    fn update_node<S: SurfaceProvider, H: ElementHost>(
        &mut self,
        idx: u32,
        op: LayerOp<P>,
        pass: &mut Pass<'_, '_, S, H>,
    ) {
        let i = idx as usize;
        let Some(current) = self.op[i].as_mut() else {
            panic!("cannot update the root node");
        };
        let (patch, stale) = current.update(op);
        let styles = current.styles(patch);
        let local_transform = current.local_transform();
        let local_clip = current.local_clip();
        #[cfg(feature = "trace-rich")]
        let kind = current.kind();

        if let Some(mut stale) = stale {
            stale.dispose();
        }
        if patch.transform {
            self.local_transform[i] = local_transform;
            self.mark_transform(idx);
        }
        if patch.clip {
            self.local_clip[i] = local_clip;
            self.mark_clip(idx);
        }
        for style in &styles {
            pass.host.set_style(self.element[i], style);
        }
        if patch.repaint {
            self.needs_paint.push(idx);
        }
        pass.report.reused += 1;
        #[cfg(feature = "trace-rich")]
        pass.tracer.retain(&RetainEvent {
            frame_index: self.frame_index,
            node: idx,
            op: kind,
            action: RetainAction::Reused,
        });
    }

    fn create_node<S: SurfaceProvider, H: ElementHost>(
        &mut self,
        parent: u32,
        op: LayerOp<P>,
        pass: &mut Pass<'_, '_, S, H>,
    ) -> u32 {
        let kind = op.kind();
        let element = pass.host.create_element(kind);
        for style in &op.styles(Patch::ALL) {
            pass.host.set_style(element, style);
        }
        let idx = self.alloc_node(op, element);
        self.adopt(parent, idx);

        if kind == OpKind::Picture {
            let (surface, how) = pass.factory.acquire();
            if how == AcquireKind::Backup {
                pass.report.backup_shared += 1;
            }
            pass.factory.surface_mut(surface).add_to_scene();
            pass.host.attach_surface(element, surface);
            self.surface[idx as usize] = Some(surface);
            self.needs_paint.push(idx);
            pass.tracer.surface_event(&SurfaceEvent {
                frame_index: self.frame_index,
                surface,
                kind: match how {
                    AcquireKind::Allocated => SurfaceEventKind::Allocated,
                    AcquireKind::Reused => SurfaceEventKind::Reused,
                    AcquireKind::Backup => SurfaceEventKind::Backup,
                },
            });
        }

        pass.report.created += 1;
        #[cfg(feature = "trace-rich")]
        pass.tracer.retain(&RetainEvent {
            frame_index: self.frame_index,
            node: idx,
            op: kind,
            action: RetainAction::Created,
        });
        idx
    }

    /// Releases `idx` and its subtree. Only the top of the subtree removes
    /// its element; descendants leave the document with it.
    fn release_subtree<S: SurfaceProvider, H: ElementHost>(
        &mut self,
        idx: u32,
        remove_element: bool,
        pass: &mut Pass<'_, '_, S, H>,
    ) {
        for child in self.child_indices(idx) {
            self.release_subtree(child, false, pass);
        }
        let i = idx as usize;
        if let Some(op) = self.op[i].take() {
            #[cfg(feature = "trace-rich")]
            pass.tracer.retain(&RetainEvent {
                frame_index: self.frame_index,
                node: idx,
                op: op.kind(),
                action: RetainAction::Released,
            });
            if let LayerOp::Picture { mut picture, .. } = op {
                picture.dispose();
            }
        }
        if let Some(surface) = self.surface[i].take() {
            pass.factory.release_surface(surface);
            pass.tracer.surface_event(&SurfaceEvent {
                frame_index: self.frame_index,
                surface,
                kind: SurfaceEventKind::Released,
            });
        }
        if remove_element {
            pass.host.remove_element(self.element[i]);
        }
        self.free_node(idx);
        pass.report.released += 1;
    }

    fn paint<S, H>(&self, idx: u32, pass: &mut Pass<'_, '_, S, H>)
    where
        S: SurfaceProvider,
        S::Target: PictureTarget<P>,
        H: ElementHost,
    {
        let i = idx as usize;
        let (Some(LayerOp::Picture { cull, picture, .. }), Some(surface)) =
            (self.op[i].as_ref(), self.surface[i])
        else {
            return;
        };
        let visible = self.world_transform[i]
            .transform_rect_bbox(*cull)
            .intersect(self.projected_clip[i]);
        let target = pass.factory.surface_mut(surface);
        if visible.is_zero_area() {
            target.clear();
            pass.report.culled += 1;
            return;
        }
        match picture.native() {
            Ok(mut recording) => {
                target.acquire_frame(cull.size());
                target.clear();
                target.draw_picture(&mut *recording, -cull.origin().to_vec2());
                target.end_of_paint();
                pass.report.repainted += 1;
            }
            Err(err) => {
                log::warn!("cannot paint picture node {idx}: {err}");
                pass.report.paint_failures += 1;
            }
        }
    }
}

fn count(indices: &[u32]) -> u32 {
    count_usize(indices.len())
}

fn count_usize(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::Cell;

    use kurbo::{Rect, Vec2};

    use super::*;
    use crate::host::{ElementId, StyleUpdate};
    use crate::object::{BoxRef, Collector, FinalizationMode};
    use crate::surface::SurfaceId;
    use crate::trace::Tracer;

    #[derive(Debug)]
    struct Recording {
        deletes: Rc<Cell<u32>>,
    }

    impl NativeObject for Recording {
        fn delete(&mut self) {
            self.deletes.set(self.deletes.get() + 1);
        }

        fn is_deleted(&self) -> bool {
            false
        }
    }

    #[derive(Debug, Default)]
    struct Canvas {
        attached: bool,
        draws: u32,
    }

    impl RenderTarget for Canvas {
        fn acquire_frame(&mut self, _size: Size) {}
        fn clear(&mut self) {}
        fn end_of_paint(&mut self) {}
        fn add_to_scene(&mut self) {
            self.attached = true;
        }
        fn remove_from_scene(&mut self) {
            self.attached = false;
        }
        fn is_attached(&self) -> bool {
            self.attached
        }
        fn dispose(&mut self) {}
    }

    impl PictureTarget<Recording> for Canvas {
        fn draw_picture(&mut self, _picture: &mut Recording, _offset: Vec2) {
            self.draws += 1;
        }
    }

    #[derive(Debug, Default)]
    struct Canvases;

    impl SurfaceProvider for Canvases {
        type Target = Canvas;

        fn create_surface(&mut self, _id: SurfaceId) -> Canvas {
            Canvas::default()
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    enum DomOp {
        Create(ElementId, OpKind),
        Append(ElementId, ElementId),
        Remove(ElementId),
        Style(ElementId, StyleUpdate),
        Attach(ElementId, SurfaceId),
    }

    #[derive(Debug, Default)]
    struct Dom {
        next: u32,
        ops: Vec<DomOp>,
    }

    impl ElementHost for Dom {
        fn root(&self) -> ElementId {
            ElementId(0)
        }

        fn create_element(&mut self, kind: OpKind) -> ElementId {
            self.next += 1;
            let el = ElementId(self.next);
            self.ops.push(DomOp::Create(el, kind));
            el
        }

        fn append_child(&mut self, parent: ElementId, child: ElementId) {
            self.ops.push(DomOp::Append(parent, child));
        }

        fn remove_element(&mut self, element: ElementId) {
            self.ops.push(DomOp::Remove(element));
        }

        fn set_style(&mut self, element: ElementId, style: &StyleUpdate) {
            self.ops.push(DomOp::Style(element, style.clone()));
        }

        fn attach_surface(&mut self, element: ElementId, surface: SurfaceId) {
            self.ops.push(DomOp::Attach(element, surface));
        }
    }

    struct Fixture {
        collector: Collector,
        deletes: Rc<Cell<u32>>,
        factory: SurfaceFactory<Canvases>,
        dom: Dom,
        tree: SurfaceTree<Recording>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                collector: Collector::new(FinalizationMode::Disabled),
                deletes: Rc::new(Cell::new(0)),
                factory: SurfaceFactory::new(Canvases, 8),
                dom: Dom::default(),
                tree: SurfaceTree::new(ElementId(0)),
            }
        }

        fn recording(&self) -> BoxRef<Recording> {
            BoxRef::new(
                &self.collector,
                Recording {
                    deletes: self.deletes.clone(),
                },
            )
        }

        fn frame(&mut self, roots: Vec<SceneNode<Recording>>) -> RetainReport {
            self.dom.ops.clear();
            self.tree.retain(
                Scene::new(roots),
                Size::new(100.0, 100.0),
                &mut self.factory,
                &mut self.dom,
                &mut Tracer::none(),
            )
        }
    }

    fn offset(x: f64, children: Vec<SceneNode<Recording>>) -> SceneNode<Recording> {
        SceneNode::new(
            LayerOp::Offset {
                offset: Vec2::new(x, 0.0),
            },
            children,
        )
    }

    fn picture(picture: &BoxRef<Recording>, x: f64) -> SceneNode<Recording> {
        SceneNode::leaf(LayerOp::Picture {
            offset: Vec2::new(x, 0.0),
            cull: Rect::new(0.0, 0.0, 10.0, 10.0),
            picture: picture.clone_ref(),
        })
    }

    #[test]
    fn first_frame_creates_and_paints() {
        let mut fx = Fixture::new();
        let rec = fx.recording();
        let report = fx.frame(vec![offset(5.0, vec![picture(&rec, 0.0)])]);

        assert_eq!(report.frame_index, 1);
        assert_eq!(report.created, 2);
        assert_eq!(report.reused, 0);
        assert_eq!(report.repainted, 1);
        assert_eq!(fx.tree.node_count(), 2);

        let outer = fx.tree.child(fx.tree.root(), 0).unwrap();
        let leaf = fx.tree.child(outer, 0).unwrap();
        let surface = fx.tree.surface(leaf).unwrap();
        assert!(fx.factory.surface(surface).is_attached());
        assert_eq!(fx.factory.surface(surface).draws, 1);
        assert!(fx.dom.ops.contains(&DomOp::Attach(ElementId(2), surface)));
        assert!(
            fx.dom
                .ops
                .contains(&DomOp::Append(ElementId(0), ElementId(1)))
        );
        assert!(
            fx.dom
                .ops
                .contains(&DomOp::Append(ElementId(1), ElementId(2)))
        );
        assert_eq!(rec.ref_count(), 2);
    }

    #[test]
    fn unchanged_frame_touches_nothing() {
        let mut fx = Fixture::new();
        let rec = fx.recording();
        let _ = fx.frame(vec![offset(5.0, vec![picture(&rec, 0.0)])]);
        let report = fx.frame(vec![offset(5.0, vec![picture(&rec, 0.0)])]);

        assert_eq!(report.reused, 2);
        assert_eq!(report.created, 0);
        assert_eq!(report.released, 0);
        assert_eq!(report.repainted, 0);
        assert!(fx.dom.ops.is_empty(), "{:?}", fx.dom.ops);
        assert_eq!(rec.ref_count(), 2, "the redundant reference is disposed");
    }

    #[test]
    fn removed_subtree_returns_its_surface() {
        let mut fx = Fixture::new();
        let rec = fx.recording();
        let _ = fx.frame(vec![offset(5.0, vec![picture(&rec, 0.0)])]);
        let report = fx.frame(vec![]);

        assert_eq!(report.released, 2);
        assert_eq!(fx.tree.node_count(), 0);
        assert_eq!(fx.factory.cached_count(), 1);
        assert_eq!(fx.dom.ops, [DomOp::Remove(ElementId(1))]);
        assert_eq!(rec.ref_count(), 1);
        assert_eq!(fx.deletes.get(), 0);
    }

    #[test]
    fn replaced_picture_reuses_node_and_repaints() {
        let mut fx = Fixture::new();
        let first = fx.recording();
        let second = fx.recording();
        let _ = fx.frame(vec![picture(&first, 0.0)]);
        let report = fx.frame(vec![picture(&second, 0.0)]);

        assert_eq!(report.reused, 1);
        assert_eq!(report.repainted, 1);
        assert_eq!(first.ref_count(), 1);
        assert_eq!(second.ref_count(), 2);
        let leaf = fx.tree.child(fx.tree.root(), 0).unwrap();
        let surface = fx.tree.surface(leaf).unwrap();
        assert_eq!(fx.factory.surface(surface).draws, 2);
    }

    #[test]
    fn swapped_siblings_are_recreated() {
        let mut fx = Fixture::new();
        let clip = || {
            SceneNode::leaf(LayerOp::ClipRect {
                rect: Rect::new(0.0, 0.0, 50.0, 50.0),
            })
        };
        let _ = fx.frame(vec![offset(1.0, vec![]), clip()]);
        let report = fx.frame(vec![clip(), offset(1.0, vec![])]);

        assert_eq!(report.released, 2);
        assert_eq!(report.created, 2);
        assert_eq!(report.reused, 0);
        let kinds: Vec<_> = fx
            .tree
            .children(fx.tree.root())
            .map(|id| fx.tree.kind(id))
            .collect();
        assert_eq!(kinds, [Some(OpKind::ClipRect), Some(OpKind::Offset)]);
    }

    #[test]
    fn offscreen_picture_is_culled() {
        let mut fx = Fixture::new();
        let rec = fx.recording();
        let report = fx.frame(vec![picture(&rec, 500.0)]);
        assert_eq!(report.culled, 1);
        assert_eq!(report.repainted, 0);

        let report = fx.frame(vec![picture(&rec, 20.0)]);
        assert_eq!(report.culled, 0);
        assert_eq!(report.repainted, 1, "moving into view repaints");
    }

    #[test]
    fn clear_releases_everything() {
        let mut fx = Fixture::new();
        let rec = fx.recording();
        let _ = fx.frame(vec![
            offset(0.0, vec![picture(&rec, 0.0)]),
            picture(&rec, 1.0),
        ]);
        let released = fx
            .tree
            .clear(&mut fx.factory, &mut fx.dom, &mut Tracer::none());
        assert_eq!(released, 3);
        assert_eq!(fx.tree.node_count(), 0);
        assert_eq!(rec.ref_count(), 1);
        assert_eq!(fx.tree.viewport(), Size::ZERO);
    }
}
