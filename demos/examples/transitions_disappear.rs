// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Disappearing items.
//!
//! Mount a card inside a wrapper host, remove both with a fade-out declared on
//! the card, and watch the card move to the root host and survive until the
//! fade completes.
//!
//! Run:
//! - `cargo run -p understory_demos --example transitions_disappear`

use std::rc::Rc;

use kurbo::Rect;
use understory_transitions::{
    AnimatedProperties, ContentKind, EngineState, HostTree, MountTarget, NoLogicalTree,
    RenderNode, RenderSnapshot, RenderUnitId, ScriptedTransitionManager, TransitionId,
    TransitionTarget, TransitionUnit, TransitionsEngine, TreeId,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_target(false)
        .init();

    let card = TransitionId::global("card");

    // root
    // └── wrapper (host)
    //     └── card (host, "card")
    //         └── label
    let mut b = RenderSnapshot::builder(TreeId(1), "Inbox");
    let root = b.root(RenderNode::new(
        RenderUnitId(0),
        ContentKind::Host,
        Rect::new(0.0, 0.0, 320.0, 480.0),
    ));
    let wrapper = b.child(
        root,
        RenderNode::new(RenderUnitId(1), ContentKind::Host, Rect::new(20.0, 40.0, 300.0, 200.0)),
    );
    let card_index = b.child(
        wrapper,
        RenderNode::new(RenderUnitId(2), ContentKind::Host, Rect::new(30.0, 60.0, 290.0, 120.0))
            .with_transition_id(card.clone()),
    );
    b.child(
        card_index,
        RenderNode::new(RenderUnitId(3), ContentKind::Drawable, Rect::new(40.0, 70.0, 200.0, 90.0)),
    );
    let with_card = Rc::new(b.build().unwrap());

    let mut b = RenderSnapshot::builder(TreeId(1), "Inbox");
    b.root(RenderNode::new(
        RenderUnitId(0),
        ContentKind::Host,
        Rect::new(0.0, 0.0, 320.0, 480.0),
    ));
    b.transition(
        TransitionUnit::new(TransitionTarget::Single(card.clone()), AnimatedProperties::ALPHA)
            .disappear_to(0.0),
    );
    let without_card = Rc::new(b.build().unwrap());

    let mut engine = TransitionsEngine::new(ScriptedTransitionManager::new);
    let mut tree = HostTree::new();
    for snapshot in [with_card, without_card] {
        engine
            .before_mount(Rc::clone(&snapshot), &mut tree, &mut NoLogicalTree)
            .unwrap();
        tree.mount(snapshot, &mut engine);
        engine.after_mount(&mut tree).unwrap();
    }

    let root_item = tree.root_item().unwrap();
    let disappearing = tree.disappearing(root_item).to_vec();
    println!("state: {:?}", engine.state());
    println!("disappearing in root: {:?}", disappearing);
    for item in &disappearing {
        // Bounds were rebased from the wrapper onto the root host.
        println!("  bounds in root: {:?}", tree.bounds_of(*item));
    }
    assert_eq!(engine.state(), EngineState::Animating);
    assert_eq!(disappearing.len(), 1, "the card is drawn by the root host");

    engine.manager_mut().unwrap().finish(&card);
    let handled = engine.process_events(&mut tree).unwrap();
    println!("handled {handled} completion(s)");
    for op in tree.take_journal() {
        println!("  {op:?}");
    }
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(tree.alive_count(), 1, "only the root remains");
}
