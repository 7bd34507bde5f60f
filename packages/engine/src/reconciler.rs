//! # Reconciler
//!
//! Converges optimistic state with the server outcome of a pending operation.
//!
//! ## Tree operations
//!
//! - Success: the provisional node takes the server id and payload in place.
//!   Its replies and its position among siblings are kept.
//! - Failure: the provisional node is removed together with everything below
//!   it. Replies posted under a node that never existed are not confirmed
//!   either.
//! - A server id already held by an unrelated item folds the provisional node
//!   into it. An id held by an ancestor or reply of the provisional node is
//!   `IdCollision` and nothing changes.
//! - Resolving a node that is no longer provisional, or no longer present,
//!   is `TokenNotFound`: a token settles once.
//!
//! ## Counter operations
//!
//! - Success keeps the optimistic value
//! - Failure returns the exact snapshot taken before the adjustment
//!
//! Counter cells track which tokens are still outstanding, see
//! [`crate::counter`].

use crate::errors::{EngineError, EngineResult};
use crate::pending::{PendingOperation, PriorSnapshot};
use pin_common::{Forest, Item, ItemId};
use tracing::debug;

fn provisional_target(op: &PendingOperation) -> EngineResult<&ItemId> {
    op.provisional_id().ok_or(EngineError::KindMismatch {
        token: op.token,
        expected: "tree",
    })
}

/// Promote the provisional node of `op` to the server-confirmed `server_item`
pub fn resolve_success(
    forest: &Forest,
    op: &PendingOperation,
    server_item: Item,
) -> EngineResult<Forest> {
    let provisional_id = provisional_target(op)?;

    if server_item.id.is_provisional() {
        return Err(EngineError::ProvisionalServerId(server_item.id));
    }
    if !forest.contains(provisional_id) {
        return Err(EngineError::TokenNotFound(op.token));
    }

    let canonical = server_item.id;
    let mut next = forest.clone();

    // Already present (e.g. a refetch delivered it first): fold into it
    if next.contains(&canonical) {
        check_no_lineage(&next, provisional_id, &canonical)?;

        let mut node = next
            .remove(provisional_id)
            .ok_or(EngineError::TokenNotFound(op.token))?;
        reparent(&mut node.children, &canonical);

        let existing = next
            .find_mut(&canonical)
            .ok_or_else(|| EngineError::IdCollision(canonical.clone()))?;
        existing.payload = server_item.payload;
        existing.children.append(&mut node.children);

        debug!(token = %op.token, id = %canonical, "Merged provisional item into existing");
        return Ok(next);
    }

    let node = next
        .find_mut(provisional_id)
        .ok_or(EngineError::TokenNotFound(op.token))?;
    node.id = canonical.clone();
    node.payload = server_item.payload;
    reparent(&mut node.children, &canonical);

    debug!(token = %op.token, from = %provisional_id, to = %canonical, "Confirmed item");
    Ok(next)
}

/// Remove the provisional node of `op` and its subtree; returns the removed ids
pub fn resolve_failure(
    forest: &Forest,
    op: &PendingOperation,
) -> EngineResult<(Forest, Vec<ItemId>)> {
    let provisional_id = provisional_target(op)?;

    let mut next = forest.clone();
    let removed = next
        .remove(provisional_id)
        .ok_or(EngineError::TokenNotFound(op.token))?;

    let removed_ids: Vec<ItemId> = Forest::new(vec![removed])
        .iter()
        .map(|item| item.id.clone())
        .collect();

    debug!(token = %op.token, id = %provisional_id, removed = removed_ids.len(), "Rolled back item");
    Ok((next, removed_ids))
}

/// Counter success: the optimistic value already is the confirmed one
pub fn resolve_counter_success(value: i64, op: &PendingOperation) -> EngineResult<i64> {
    match op.snapshot {
        PriorSnapshot::Counter { .. } | PriorSnapshot::Toggle { .. } => Ok(value),
        PriorSnapshot::Removal => Err(EngineError::KindMismatch {
            token: op.token,
            expected: "counter",
        }),
    }
}

/// Counter failure: the exact value before the adjustment
pub fn resolve_counter_failure(op: &PendingOperation) -> EngineResult<i64> {
    match op.snapshot {
        PriorSnapshot::Counter { value } | PriorSnapshot::Toggle { value, .. } => Ok(value),
        PriorSnapshot::Removal => Err(EngineError::KindMismatch {
            token: op.token,
            expected: "counter",
        }),
    }
}

/// Toggle failure: the exact flag and value before the toggle
pub fn resolve_toggle_failure(op: &PendingOperation) -> EngineResult<(bool, i64)> {
    match op.snapshot {
        PriorSnapshot::Toggle { active, value } => Ok((active, value)),
        _ => Err(EngineError::KindMismatch {
            token: op.token,
            expected: "toggle",
        }),
    }
}

/// A server id may only be merged into an unrelated item, never into an
/// ancestor or descendant of the provisional node
fn check_no_lineage(
    forest: &Forest,
    provisional_id: &ItemId,
    canonical: &ItemId,
) -> EngineResult<()> {
    let related = |outer: &ItemId, inner: &ItemId| {
        forest
            .find(outer)
            .map(|item| subtree_contains(item, inner))
            .unwrap_or(false)
    };

    if related(provisional_id, canonical) || related(canonical, provisional_id) {
        return Err(EngineError::IdCollision(canonical.clone()));
    }
    Ok(())
}

fn subtree_contains(root: &Item, id: &ItemId) -> bool {
    let mut stack: Vec<&Item> = root.children.iter().collect();
    while let Some(item) = stack.pop() {
        if &item.id == id {
            return true;
        }
        stack.extend(item.children.iter());
    }
    false
}

fn reparent(children: &mut [Item], parent: &ItemId) {
    for child in children {
        child.parent_id = Some(parent.clone());
    }
}
