//! Sequences of optimistic inserts and resolutions
//!
//! This tests:
//! - Sibling provisional inserts settled independently, in any order
//! - Nested provisional chains (reply to a reply that is still pending)
//! - Cascading rollback when a provisional parent fails
//! - Forest integrity after long runs

use pin_engine::{
    apply_insert, assemble, resolve_failure, resolve_success, EngineConfig, EngineError, Forest,
    Item, ItemId, Payload, ThreadSession,
};
use std::collections::HashSet;

fn base() -> Forest {
    assemble(vec![
        Item::new("A", Payload::text("a")),
        Item::new("B", Payload::text("b")),
        Item::reply("A1", "A", Payload::text("a1")),
    ])
}

fn assert_unique_ids(forest: &Forest) {
    let mut seen = HashSet::new();
    for item in forest.iter() {
        assert!(seen.insert(item.id.clone()), "duplicate id {}", item.id);
    }
}

#[test]
fn test_sibling_inserts_settle_independently() {
    let forest = base();
    let (f1, op1) = apply_insert(&forest, Some(&"A".into()), Payload::text("first")).unwrap();
    let (f2, op2) = apply_insert(&f1, Some(&"A".into()), Payload::text("second")).unwrap();

    // Second settles first
    let f3 = resolve_success(&f2, &op2, Item::reply("S2", "A", Payload::text("second"))).unwrap();
    let (f4, _) = resolve_failure(&f3, &op1).unwrap();

    let a = f4.find(&"A".into()).unwrap();
    let ids: Vec<String> = a.children.iter().map(|c| c.id.to_string()).collect();
    assert_eq!(ids, vec!["A1", "S2"]);
    assert_unique_ids(&f4);
}

#[test]
fn test_root_inserts_are_newest_first() {
    let (f1, op1) = apply_insert(&base(), None, Payload::text("older")).unwrap();
    let (f2, op2) = apply_insert(&f1, None, Payload::text("newer")).unwrap();

    assert_eq!(f2.roots[0].payload.content, "newer");
    assert_eq!(f2.roots[1].payload.content, "older");

    let f3 = resolve_success(&f2, &op1, Item::new("O", Payload::text("older"))).unwrap();
    let f4 = resolve_success(&f3, &op2, Item::new("N", Payload::text("newer"))).unwrap();

    let roots: Vec<String> = f4.roots.iter().map(|r| r.id.to_string()).collect();
    assert_eq!(roots, vec!["N", "O", "A", "B"]);
}

#[test]
fn test_nested_chain_confirmed_top_down() {
    let (f1, top) = apply_insert(&base(), Some(&"A1".into()), Payload::text("l1")).unwrap();
    let l1 = top.provisional_id().unwrap().clone();
    let (f2, mid) = apply_insert(&f1, Some(&l1), Payload::text("l2")).unwrap();
    let l2 = mid.provisional_id().unwrap().clone();
    let (f3, leaf) = apply_insert(&f2, Some(&l2), Payload::text("l3")).unwrap();

    assert_eq!(f3.depth_of(leaf.provisional_id().unwrap()), Some(4));

    let f4 = resolve_success(&f3, &top, Item::reply("L1", "A1", Payload::text("l1"))).unwrap();
    let f5 = resolve_success(&f4, &mid, Item::reply("L2", "L1", Payload::text("l2"))).unwrap();
    let f6 = resolve_success(&f5, &leaf, Item::reply("L3", "L2", Payload::text("l3"))).unwrap();

    assert_eq!(f6.depth_of(&"L3".into()), Some(4));
    assert_eq!(
        f6.find(&"L3".into()).unwrap().parent_id,
        Some(ItemId::canonical("L2"))
    );
    assert!(f6.iter().all(|i| !i.is_provisional()));
}

#[test]
fn test_failed_middle_of_chain_cascades() {
    let (f1, top) = apply_insert(&base(), None, Payload::text("l1")).unwrap();
    let l1 = top.provisional_id().unwrap().clone();
    let (f2, mid) = apply_insert(&f1, Some(&l1), Payload::text("l2")).unwrap();
    let l2 = mid.provisional_id().unwrap().clone();
    let (f3, leaf) = apply_insert(&f2, Some(&l2), Payload::text("l3")).unwrap();

    let (f4, removed) = resolve_failure(&f3, &mid).unwrap();

    assert_eq!(removed.len(), 2);
    assert!(f4.contains(&l1));
    assert!(!f4.contains(&l2));
    assert!(!f4.contains(leaf.provisional_id().unwrap()));
    assert_eq!(
        resolve_success(&f4, &leaf, Item::new("L3", Payload::text("l3"))).unwrap_err(),
        EngineError::TokenNotFound(leaf.token)
    );

    // No surviving node points at a removed one
    for item in f4.iter() {
        if let Some(parent) = &item.parent_id {
            assert!(!removed.contains(parent));
        }
    }
}

#[test]
fn test_long_session_keeps_integrity() {
    let mut session = ThreadSession::from_forest("post-1", base(), EngineConfig::default());
    let mut tokens = Vec::new();

    for i in 0..30 {
        let parent = match i % 3 {
            0 => None,
            1 => Some(ItemId::canonical("A")),
            _ => Some(ItemId::canonical("A1")),
        };
        tokens.push(
            session
                .insert(parent.as_ref(), Payload::text(format!("c{}", i)))
                .unwrap(),
        );
    }
    assert_eq!(session.forest().len(), 33);

    for (i, token) in tokens.iter().enumerate() {
        if i % 2 == 0 {
            let parent = session.submission(*token).unwrap().parent_id;
            let item = Item {
                id: ItemId::canonical(format!("srv-{}", i)),
                parent_id: parent,
                payload: Payload::text(format!("c{}", i)),
                children: Vec::new(),
            };
            session.confirm(*token, item).unwrap();
        } else {
            session.reject(*token).unwrap();
        }
    }

    let forest = session.forest();
    assert_eq!(session.pending_count(), 0);
    assert_eq!(forest.len(), 3 + 15);
    assert!(forest.iter().all(|i| !i.is_provisional()));
    assert_unique_ids(forest);
    assert_eq!(assemble(forest.flatten()), *forest);
}
