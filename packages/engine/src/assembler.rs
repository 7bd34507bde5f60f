//! # Tree Assembler
//!
//! Turns the flat comment listing into a forest.
//!
//! ## Ordering
//!
//! - Roots keep their input order (parentless and orphaned items alike)
//! - Replies keep their input order within each parent
//!
//! ## Content is never dropped
//!
//! - A `parent_id` naming an item that is not in the input (deleted, not yet
//!   loaded) makes the item a root
//! - Items caught in a parent cycle are unreachable from any root; the first
//!   of them in input order is promoted to root, which brings the rest along
//! - A repeated id keeps its first occurrence (an id lives in one place only)
//!
//! Linking runs on an arena of indices and the nested items are built
//! bottom-up, so deep threads never recurse.

use pin_common::{CommentRecord, Forest, Item, ItemId};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Assemble backend records into a forest
pub fn assemble_records(records: Vec<CommentRecord>) -> Forest {
    assemble(records.into_iter().map(Item::from))
}

/// Assemble flat items (each naming an optional parent) into a forest
pub fn assemble(items: impl IntoIterator<Item = Item>) -> Forest {
    // Pass 1: id -> arena slot
    let mut nodes: Vec<Item> = Vec::new();
    let mut index: HashMap<ItemId, usize> = HashMap::new();

    for mut item in items {
        if index.contains_key(&item.id) {
            warn!(id = %item.id, "Dropping duplicate item");
            continue;
        }
        item.children.clear();
        index.insert(item.id.clone(), nodes.len());
        nodes.push(item);
    }

    // Pass 2: link to parents
    let len = nodes.len();
    let mut parent: Vec<Option<usize>> = vec![None; len];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); len];
    let mut orphans = 0usize;

    for (slot, node) in nodes.iter().enumerate() {
        let Some(parent_id) = &node.parent_id else {
            continue;
        };

        match index.get(parent_id) {
            Some(&p) if p != slot => {
                parent[slot] = Some(p);
                children[p].push(slot);
            }
            Some(_) => {
                warn!(id = %node.id, "Item names itself as parent, treating as root");
            }
            None => {
                orphans += 1;
                debug!(id = %node.id, parent = %parent_id, "Parent missing, treating as root");
            }
        }
    }

    break_cycles(&nodes, &mut parent, &mut children);

    let forest = build(nodes, &parent, &children);
    debug!(
        items = len,
        roots = forest.len_roots(),
        orphans,
        "Assembled thread"
    );
    forest
}

fn break_cycles(nodes: &[Item], parent: &mut [Option<usize>], children: &mut [Vec<usize>]) {
    let mut reached = vec![false; nodes.len()];

    for slot in 0..nodes.len() {
        if parent[slot].is_none() {
            mark_subtree(slot, children, &mut reached);
        }
    }

    for slot in 0..nodes.len() {
        if reached[slot] {
            continue;
        }

        warn!(id = %nodes[slot].id, "Parent cycle detected, promoting item to root");
        if let Some(p) = parent[slot].take() {
            children[p].retain(|&c| c != slot);
        }
        mark_subtree(slot, children, &mut reached);
    }
}

fn mark_subtree(start: usize, children: &[Vec<usize>], reached: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(slot) = stack.pop() {
        if reached[slot] {
            continue;
        }
        reached[slot] = true;
        stack.extend(children[slot].iter().copied());
    }
}

fn build(nodes: Vec<Item>, parent: &[Option<usize>], children: &[Vec<usize>]) -> Forest {
    let roots: Vec<usize> = (0..nodes.len()).filter(|&s| parent[s].is_none()).collect();

    // Pre-order over slots; every child lands after its parent
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(slot) = stack.pop() {
        order.push(slot);
        stack.extend(children[slot].iter().rev().copied());
    }

    let mut slots: Vec<Option<Item>> = nodes.into_iter().map(Some).collect();

    for &slot in order.iter().rev() {
        let kids: Vec<Item> = children[slot]
            .iter()
            .filter_map(|&c| slots[c].take())
            .collect();
        if let Some(item) = slots[slot].as_mut() {
            item.children = kids;
        }
    }

    Forest::new(roots.into_iter().filter_map(|s| slots[s].take()).collect())
}
