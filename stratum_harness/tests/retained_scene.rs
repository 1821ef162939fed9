// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-to-frame retain scenarios driven through a compositor.

use std::cell::Cell;
use std::rc::Rc;

use kurbo::{Rect, Size, Vec2};
use stratum_core::compositor::{Compositor, CompositorConfig};
use stratum_core::host::StyleUpdate;
use stratum_core::native::DecodeError;
use stratum_core::object::{BoxRef, BoxState};
use stratum_core::scene::{OpKind, Scene, SceneBuilder};
use stratum_core::surface::RenderTarget;
use stratum_core::trace::Tracer;
use stratum_debug::pretty::PrettyPrintSink;
use stratum_harness::canvas::FakeCanvasProvider;
use stratum_harness::dom::{DomOp, FakeDom};
use stratum_harness::native::{FakePicture, Ledger};

type TestCompositor = Compositor<FakePicture, FakeCanvasProvider, FakeDom>;

const VIEWPORT: Size = Size::new(200.0, 200.0);
const CULL: Rect = Rect::new(0.0, 0.0, 50.0, 50.0);

fn compositor(config: CompositorConfig) -> TestCompositor {
    Compositor::new(FakeCanvasProvider::default(), FakeDom::new(), config)
}

fn opacity_scene(picture: &BoxRef<FakePicture>, alpha: u8) -> Scene<FakePicture> {
    let mut builder = SceneBuilder::new();
    builder.push_opacity(alpha, Vec2::new(5.0, 5.0));
    builder.add_picture(Vec2::ZERO, CULL, picture.clone_ref());
    builder.pop();
    builder.build()
}

#[test]
fn opacity_change_reuses_the_element() {
    let ledger = Ledger::shared();
    let mut c = compositor(CompositorConfig::default());
    let picture = BoxRef::new(c.collector(), FakePicture::new(&ledger, 1));

    let first = c.draw_frame(opacity_scene(&picture, 128), VIEWPORT, &mut Tracer::none());
    assert_eq!(first.created, 2);
    assert_eq!(first.repainted, 1);
    let root = c.tree().root();
    let opacity = c.tree().child(root, 0).unwrap();
    let element = c.tree().element(opacity);
    let _ = c.host_mut().take_log();

    let second = c.draw_frame(opacity_scene(&picture, 64), VIEWPORT, &mut Tracer::none());
    assert_eq!(second.reused, 2);
    assert_eq!(second.created, 0);
    assert_eq!(second.released, 0);
    assert_eq!(second.repainted, 0);

    assert_eq!(c.tree().child(root, 0), Some(opacity));
    assert_eq!(c.tree().element(opacity), element);
    assert_eq!(
        c.host().log(),
        [DomOp::Style(element, StyleUpdate::Opacity(64.0 / 255.0))]
    );
    assert_eq!(
        c.host().element(element).unwrap().opacity(),
        Some(64.0 / 255.0)
    );
    assert_eq!(ledger.created(), 1);
    assert_eq!(picture.ref_count(), 2);
}

#[test]
fn swapped_siblings_are_replaced() {
    let mut c = compositor(CompositorConfig::default());
    let scene = |clip_first: bool| {
        let mut builder = SceneBuilder::<FakePicture>::new();
        let clip = |b: &mut SceneBuilder<FakePicture>| {
            b.push_clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
            b.pop();
        };
        if clip_first {
            clip(&mut builder);
        }
        builder.push_offset(Vec2::new(3.0, 0.0));
        builder.pop();
        if !clip_first {
            clip(&mut builder);
        }
        builder.build()
    };

    let _ = c.draw_frame(scene(false), VIEWPORT, &mut Tracer::none());
    let before = c.host().children(FakeDom::ROOT).to_vec();
    let report = c.draw_frame(scene(true), VIEWPORT, &mut Tracer::none());

    assert_eq!(report.released, 2);
    assert_eq!(report.created, 2);
    assert_eq!(report.reused, 0);
    let after = c.host().children(FakeDom::ROOT);
    assert_eq!(after.len(), 2);
    assert!(after.iter().all(|el| !before.contains(el)));
    let kinds: Vec<_> = after
        .iter()
        .map(|&el| c.host().element(el).unwrap().kind)
        .collect();
    assert_eq!(kinds, [Some(OpKind::ClipRect), Some(OpKind::Offset)]);
}

#[test]
fn replaced_subtree_hands_its_surface_over() {
    let ledger = Ledger::shared();
    let mut c = compositor(CompositorConfig::default());
    let a = BoxRef::new(c.collector(), FakePicture::new(&ledger, 1));
    let b = BoxRef::new(c.collector(), FakePicture::new(&ledger, 2));

    let _ = c.draw_frame(opacity_scene(&a, 255), VIEWPORT, &mut Tracer::none());
    let created = c.factory().provider().probes().len();

    let mut builder = SceneBuilder::new();
    builder.push_clip_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
    builder.add_picture(Vec2::ZERO, CULL, b.clone_ref());
    builder.pop();
    let report = c.draw_frame(builder.build(), VIEWPORT, &mut Tracer::none());

    assert_eq!(report.released, 2);
    assert_eq!(report.created, 2);
    assert_eq!(report.backup_shared, 0);
    assert_eq!(c.factory().provider().probes().len(), created);
    assert_eq!(a.ref_count(), 1);

    let clip = c.tree().child(c.tree().root(), 0).unwrap();
    let leaf = c.tree().child(clip, 0).unwrap();
    let surface = c.tree().surface(leaf).unwrap();
    let probe = c.factory().provider().probe(surface).unwrap();
    assert!(probe.state().attached);
    let drawn: Vec<u32> = probe.state().draws.iter().map(|(id, _)| *id).collect();
    assert_eq!(drawn, [1, 2]);
}

#[test]
fn exhausted_pool_shares_the_backup_surface() {
    let ledger = Ledger::shared();
    let mut c = compositor(CompositorConfig {
        surface_capacity: 2,
        ..CompositorConfig::default()
    });
    let picture = BoxRef::new(c.collector(), FakePicture::new(&ledger, 1));

    let mut builder = SceneBuilder::new();
    for i in 0..3 {
        builder.add_picture(Vec2::new(f64::from(i) * 60.0, 0.0), CULL, picture.clone_ref());
    }
    let report = c.draw_frame(builder.build(), VIEWPORT, &mut Tracer::none());

    assert_eq!(report.created, 3);
    assert_eq!(report.backup_shared, 2);
    assert_eq!(report.repainted, 3);
    assert_eq!(c.factory().live_count(), 3);
    let backup = c.factory().backup_surface();
    let probe = c.factory().provider().probe(backup).unwrap();
    assert_eq!(probe.state().draws.len(), 2);
}

#[test]
fn backup_surface_leaves_the_scene_with_its_last_picture() {
    let ledger = Ledger::shared();
    let mut c = compositor(CompositorConfig {
        surface_capacity: 2,
        ..CompositorConfig::default()
    });
    let picture = BoxRef::new(c.collector(), FakePicture::new(&ledger, 1));
    let overflow = |count: u8| {
        let mut builder = SceneBuilder::new();
        for i in 0..count {
            builder.add_picture(Vec2::new(f64::from(i) * 60.0, 0.0), CULL, picture.clone_ref());
        }
        builder.build()
    };
    let backup = c.factory().backup_surface();

    let _ = c.draw_frame(overflow(3), VIEWPORT, &mut Tracer::none());
    assert!(c.factory().surface(backup).is_attached());
    assert_eq!(c.factory().backup_loans(), 2);

    let report = c.draw_frame(overflow(2), VIEWPORT, &mut Tracer::none());
    assert_eq!(report.released, 1);
    assert!(c.factory().surface(backup).is_attached(), "one picture still shares it");

    let report = c.draw_frame(Scene::default(), VIEWPORT, &mut Tracer::none());
    assert_eq!(report.released, 2);
    assert_eq!(c.tree().node_count(), 0);
    assert!(!c.factory().surface(backup).is_attached());
    assert_eq!(c.factory().backup_loans(), 0);
    assert!(c.factory().is_live(backup));
}

#[test]
fn viewport_growth_paints_culled_pictures() {
    let ledger = Ledger::shared();
    let mut c = compositor(CompositorConfig::default());
    let picture = BoxRef::new(c.collector(), FakePicture::new(&ledger, 1));
    let scene = |p: &BoxRef<FakePicture>| {
        let mut builder = SceneBuilder::new();
        builder.push_offset(Vec2::new(300.0, 0.0));
        builder.add_picture(Vec2::ZERO, CULL, p.clone_ref());
        builder.pop();
        builder.build()
    };

    let report = c.draw_frame(scene(&picture), VIEWPORT, &mut Tracer::none());
    assert_eq!(report.culled, 1);
    assert_eq!(report.repainted, 0);

    let report = c.draw_frame(scene(&picture), Size::new(400.0, 200.0), &mut Tracer::none());
    assert_eq!(report.reused, 2);
    assert_eq!(report.transforms_recomputed, 0);
    assert_eq!(report.clips_recomputed, 3);
    assert_eq!(report.repainted, 1);
}

#[test]
fn failed_resurrection_is_reported_not_fatal() {
    let ledger = Ledger::shared();
    let mut c = compositor(CompositorConfig::default());
    let attempts = Rc::new(Cell::new(0));
    let recipe = {
        let ledger = ledger.clone();
        let attempts = attempts.clone();
        Box::new(move || {
            attempts.set(attempts.get() + 1);
            if attempts.get() > 1 {
                Err(DecodeError::InvalidData("recording lost"))
            } else {
                Ok(FakePicture::new(&ledger, 9))
            }
        })
    };
    let picture = BoxRef::resurrectable(c.collector(), recipe).unwrap();
    let scene = |cull: Rect| {
        let mut builder = SceneBuilder::new();
        builder.add_picture(Vec2::ZERO, cull, picture.clone_ref());
        builder.build()
    };

    let _ = c.draw_frame(scene(CULL), VIEWPORT, &mut Tracer::none());
    assert!(picture.evict());
    let report = c.draw_frame(
        scene(Rect::new(0.0, 0.0, 60.0, 60.0)),
        VIEWPORT,
        &mut Tracer::none(),
    );
    assert_eq!(report.paint_failures, 1);
    assert_eq!(report.repainted, 0);
    assert_eq!(picture.state(), BoxState::Live);
}

#[test]
fn hot_restart_reclaims_everything() {
    let ledger = Ledger::shared();
    let mut c = compositor(CompositorConfig::default());
    let mut picture = BoxRef::new(c.collector(), FakePicture::new(&ledger, 1));
    let _ = c.draw_frame(opacity_scene(&picture, 200), VIEWPORT, &mut Tracer::none());
    let old_base = c.factory().base_surface();

    let report = c.hot_restart(&mut Tracer::none());
    assert_eq!(report.nodes_released, 2);
    assert_eq!(report.boxes_reclaimed, 1);
    assert_eq!(report.surfaces_disposed, 3);

    assert_eq!(picture.state(), BoxState::DeletedPermanently);
    assert_eq!(ledger.alive(), 0);
    assert_eq!(c.tree().node_count(), 0);
    assert!(c.host().is_empty());
    assert_ne!(c.factory().base_surface(), old_base);
    assert!(!c.factory().is_live(old_base));

    let probes = c.factory().provider().probes();
    let (old, fresh) = probes.split_at(3);
    assert!(old.iter().all(|p| p.state().disposed));
    assert!(fresh.iter().all(|p| !p.state().disposed));
    assert!(c.factory().surface(c.factory().base_surface()).is_attached());

    // Wrappers held across the restart may still be disposed.
    picture.dispose();

    let fresh_picture = BoxRef::new(c.collector(), FakePicture::new(&ledger, 2));
    let report = c.draw_frame(
        opacity_scene(&fresh_picture, 200),
        VIEWPORT,
        &mut Tracer::none(),
    );
    assert_eq!(report.created, 2);
    assert_eq!(report.repainted, 1);
}

#[test]
fn frames_are_traced() {
    let ledger = Ledger::shared();
    let mut c = compositor(CompositorConfig::default());
    let picture = BoxRef::new(c.collector(), FakePicture::new(&ledger, 1));
    let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
    {
        let mut tracer = Tracer::new(&mut sink);
        let _ = c.draw_frame(opacity_scene(&picture, 10), VIEWPORT, &mut tracer);
        let _ = c.draw_frame(Scene::default(), VIEWPORT, &mut tracer);
    }
    let output = String::from_utf8(sink.into_inner()).unwrap();
    assert!(output.contains("[surface:allocated] frame=1"), "got: {output}");
    assert!(output.contains("[retain:created] frame=1"), "got: {output}");
    assert!(output.contains("[summary] frame=1 reused=0 created=2"), "got: {output}");
    assert!(output.contains("[surface:released] frame=2"), "got: {output}");
    assert!(output.contains("[summary] frame=2 reused=0 created=0 released=2"), "got: {output}");
}
