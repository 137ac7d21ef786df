// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::rc::Rc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::Rect;
use understory_transitions::{
    AnimatedProperties, ContentKind, HostTree, MountItemId, NoLogicalTree, RenderNode,
    RenderSnapshot, RenderUnitId, ScriptedTransitionManager, Transition, TransitionId,
    TransitionTarget, TransitionUnit, TransitionsEngine, TreeId,
};

type Engine = TransitionsEngine<MountItemId, ScriptedTransitionManager<MountItemId>>;

/// A root with `n` cards, each a host holding one label.
fn gen_cards(n: usize, transition: Option<&Transition>) -> Rc<RenderSnapshot> {
    let mut b = RenderSnapshot::builder(TreeId(1), "Feed");
    let root = b.root(RenderNode::new(
        RenderUnitId(0),
        ContentKind::Host,
        Rect::new(0.0, 0.0, 400.0, 60.0 * n as f64),
    ));
    for i in 0..n {
        let y = 60.0 * i as f64;
        let id = TransitionId::global(&format!("card-{i}"));
        let card = b.child(
            root,
            RenderNode::new(
                RenderUnitId(1 + 2 * i as u64),
                ContentKind::Host,
                Rect::new(0.0, y, 400.0, y + 50.0),
            )
            .with_transition_id(id),
        );
        b.child(
            card,
            RenderNode::new(
                RenderUnitId(2 + 2 * i as u64),
                ContentKind::Drawable,
                Rect::new(10.0, y + 10.0, 200.0, y + 40.0),
            ),
        );
    }
    if let Some(t) = transition {
        b.transition(t.clone());
    }
    Rc::new(b.build().unwrap())
}

fn empty_feed(transition: &Transition) -> Rc<RenderSnapshot> {
    let mut b = RenderSnapshot::builder(TreeId(1), "Feed");
    let bounds = Rect::new(0.0, 0.0, 400.0, 400.0);
    b.root(RenderNode::new(RenderUnitId(0), ContentKind::Host, bounds));
    b.transition(transition.clone());
    Rc::new(b.build().unwrap())
}

fn pass(engine: &mut Engine, tree: &mut HostTree, snapshot: &Rc<RenderSnapshot>) {
    engine
        .before_mount(Rc::clone(snapshot), tree, &mut NoLogicalTree)
        .unwrap();
    tree.mount(Rc::clone(snapshot), engine);
    engine.after_mount(tree).unwrap();
}

fn mounted(first: &Rc<RenderSnapshot>) -> (Engine, HostTree) {
    let mut engine = TransitionsEngine::new(ScriptedTransitionManager::new);
    let mut tree = HostTree::new();
    pass(&mut engine, &mut tree, first);
    (engine, tree)
}

fn bench_disappear(c: &mut Criterion) {
    let mut group = c.benchmark_group("disappear");
    let fade: Transition = TransitionUnit::new(TransitionTarget::All, AnimatedProperties::ALPHA)
        .disappear_to(0.0)
        .into();
    let next = empty_feed(&fade);
    for &n in &[16usize, 128, 1024] {
        let first = gen_cards(n, None);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("extract_finalize_n{}", n), |b| {
            b.iter_batched(
                || mounted(&first),
                |(mut engine, mut tree)| {
                    pass(&mut engine, &mut tree, &next);
                    if let Some(manager) = engine.manager_mut() {
                        manager.finish_all();
                    }
                    let handled = engine.process_events(&mut tree).unwrap();
                    black_box((handled, tree.alive_count()));
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_animation_locks(c: &mut Criterion) {
    let mut group = c.benchmark_group("animation_locks");
    let slide: Transition =
        TransitionUnit::new(TransitionTarget::All, AnimatedProperties::X).into();
    for &n in &[16usize, 128, 1024] {
        let first = gen_cards(n, None);
        let next = gen_cards(n, Some(&slide));
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("lock_unlock_n{}", n), |b| {
            b.iter_batched(
                || mounted(&first),
                |(mut engine, mut tree)| {
                    pass(&mut engine, &mut tree, &next);
                    if let Some(manager) = engine.manager_mut() {
                        manager.finish_all();
                    }
                    let handled = engine.process_events(&mut tree).unwrap();
                    black_box(handled);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_disappear, bench_animation_locks);
criterion_main!(benches);
