// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reappearing ids and animation locks.
//!
//! A badge fades out, then comes back before the fade completes: the stale
//! disappearing copy is torn down and the new one mounted fresh. A slide on
//! the badge then locks it until the slide completes.
//!
//! Run:
//! - `cargo run -p understory_demos --example transitions_reappear`

use std::rc::Rc;

use kurbo::Rect;
use understory_transitions::{
    AnimatedProperties, ContentKind, EngineConfig, HostTree, NoLogicalTree, RenderNode,
    RenderSnapshot, RenderUnitId, ScriptedTransitionManager, Transition, TransitionId,
    TransitionTarget, TransitionUnit, TransitionsEngine, TreeId,
};

fn screen(badge: Option<f64>, transition: Option<Transition>) -> Rc<RenderSnapshot> {
    let mut b = RenderSnapshot::builder(TreeId(7), "Profile");
    let root = b.root(RenderNode::new(
        RenderUnitId(0),
        ContentKind::Host,
        Rect::new(0.0, 0.0, 200.0, 200.0),
    ));
    if let Some(x) = badge {
        b.child(
            root,
            RenderNode::new(RenderUnitId(1), ContentKind::View, Rect::new(x, 10.0, x + 40.0, 30.0))
                .with_transition_id(TransitionId::global("badge")),
        );
    }
    if let Some(t) = transition {
        b.transition(t);
    }
    Rc::new(b.build().unwrap())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_target(false)
        .init();

    let badge = TransitionId::global("badge");
    let mut engine = TransitionsEngine::with_config(
        EngineConfig::default()
            .with_log_tag("profile")
            .with_debug_animations(true),
        ScriptedTransitionManager::new,
    );
    let mut tree = HostTree::new();

    let fade =
        TransitionUnit::new(TransitionTarget::Single(badge.clone()), AnimatedProperties::ALPHA)
            .disappear_to(0.0);
    let slide = TransitionUnit::new(TransitionTarget::Single(badge.clone()), AnimatedProperties::X);
    let passes = [
        ("mount", screen(Some(10.0), None)),
        ("fade out", screen(None, Some(fade.into()))),
        ("reappear", screen(Some(10.0), None)),
        ("slide", screen(Some(120.0), Some(slide.into()))),
    ];
    for (label, snapshot) in passes {
        engine
            .before_mount(Rc::clone(&snapshot), &mut tree, &mut NoLogicalTree)
            .unwrap();
        tree.mount(snapshot, &mut engine);
        engine.after_mount(&mut tree).unwrap();
        println!(
            "{label}: state {:?}, disappearing {:?}, animating {:?}",
            engine.state(),
            engine.disappearing_ids().collect::<Vec<_>>(),
            engine.animating_ids().collect::<Vec<_>>(),
        );
        for op in tree.take_journal() {
            println!("  {op:?}");
        }
    }

    println!("badge lock count: {}", engine.lock_count(RenderUnitId(1)));
    assert_eq!(engine.lock_count(RenderUnitId(1)), 1);

    engine.manager_mut().unwrap().finish_all();
    engine.process_events(&mut tree).unwrap();
    println!("after completion: {:?}", engine.state());
    assert_eq!(engine.lock_count(RenderUnitId(1)), 0);
}
