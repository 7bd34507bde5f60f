//! # Optimistic Mutations
//!
//! Speculative local edits applied before the server confirms them.
//!
//! ## Semantics
//!
//! ### InsertRoot
//! - New provisional item prepended to the roots (newest first)
//!
//! ### InsertReply
//! - New provisional item appended to the parent's replies (oldest first)
//! - The parent may sit at any depth and may itself be provisional
//! - Fails with `ParentNotFound` before anything is minted or copied
//!
//! ### Counter adjust / toggle
//! - `value + delta`, clamped at the configured floor
//! - The prior value (and flag, for toggles) is kept for rollback
//!
//! Every operation returns a new value; inputs are never modified.

use crate::errors::{EngineError, EngineResult};
use crate::identity::new_provisional_id;
use crate::pending::{CounterKey, PendingOperation, PriorSnapshot};
use pin_common::{Forest, Item, ItemId, Payload};
use serde::{Deserialize, Serialize};

/// Structural edits to a comment forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mutation {
    /// Post a new top-level comment
    InsertRoot { payload: Payload },

    /// Reply to an existing comment
    #[serde(rename_all = "camelCase")]
    InsertReply { parent_id: ItemId, payload: Payload },
}

impl Mutation {
    pub fn target_parent(&self) -> Option<&ItemId> {
        match self {
            Mutation::InsertRoot { .. } => None,
            Mutation::InsertReply { parent_id, .. } => Some(parent_id),
        }
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Mutation::InsertRoot { payload } | Mutation::InsertReply { payload, .. } => payload,
        }
    }

    /// Validate without applying
    pub fn validate(&self, forest: &Forest) -> EngineResult<()> {
        match self {
            Mutation::InsertRoot { .. } => Ok(()),
            Mutation::InsertReply { parent_id, .. } => {
                if forest.contains(parent_id) {
                    Ok(())
                } else {
                    Err(EngineError::ParentNotFound(parent_id.clone()))
                }
            }
        }
    }

    /// Apply to a copy of `forest`, returning the new revision and its token
    pub fn apply(&self, forest: &Forest) -> EngineResult<(Forest, PendingOperation)> {
        apply_insert(forest, self.target_parent(), self.payload().clone())
    }
}

/// Insert a provisional item as a root (`None`) or as a reply
pub fn apply_insert(
    forest: &Forest,
    target_parent: Option<&ItemId>,
    payload: Payload,
) -> EngineResult<(Forest, PendingOperation)> {
    if let Some(parent_id) = target_parent {
        if !forest.contains(parent_id) {
            return Err(EngineError::ParentNotFound(parent_id.clone()));
        }
    }

    let provisional_id = new_provisional_id();
    let mut next = forest.clone();
    insert_provisional(&mut next, target_parent, provisional_id.clone(), payload)?;

    let op = match target_parent {
        None => PendingOperation::insert_root(provisional_id),
        Some(parent_id) => PendingOperation::insert_reply(parent_id.clone(), provisional_id),
    };

    Ok((next, op))
}

/// Place an already minted provisional item into `forest`
pub(crate) fn insert_provisional(
    forest: &mut Forest,
    target_parent: Option<&ItemId>,
    provisional_id: ItemId,
    payload: Payload,
) -> EngineResult<()> {
    match target_parent {
        None => {
            forest.roots.insert(0, Item::new(provisional_id, payload));
        }
        Some(parent_id) => {
            let parent = forest
                .find_mut(parent_id)
                .ok_or_else(|| EngineError::ParentNotFound(parent_id.clone()))?;
            parent
                .children
                .push(Item::reply(provisional_id, parent_id.clone(), payload));
        }
    }
    Ok(())
}

/// Adjust a scalar counter, clamped at `floor`
pub fn apply_counter_adjust(
    key: CounterKey,
    value: i64,
    delta: i64,
    floor: i64,
) -> (i64, PendingOperation) {
    let next = value.saturating_add(delta).max(floor);
    let op = PendingOperation::counter_adjust(key, delta, PriorSnapshot::Counter { value });
    (next, op)
}

/// Flip a boolean (liked / not liked) and move its counter by one
pub fn apply_toggle(
    key: CounterKey,
    active: bool,
    value: i64,
    floor: i64,
) -> ((bool, i64), PendingOperation) {
    let delta = if active { -1 } else { 1 };
    let next = value.saturating_add(delta).max(floor);
    let op = PendingOperation::counter_adjust(key, delta, PriorSnapshot::Toggle { active, value });
    ((!active, next), op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::PendingKind;

    fn thread() -> Forest {
        Forest::new(vec![
            Item::new("A", Payload::text("a"))
                .with_children(vec![Item::reply("B", "A", Payload::text("b"))]),
            Item::new("C", Payload::text("c")),
        ])
    }

    #[test]
    fn test_insert_root_prepends_provisional() {
        let before = thread();
        let (after, op) = apply_insert(&before, None, Payload::text("new")).unwrap();

        assert!(after.roots[0].is_provisional());
        assert_eq!(after.roots[0].payload.content, "new");
        assert_eq!(after.len_roots(), 3);
        assert_eq!(before, thread());
        assert!(matches!(op.kind, PendingKind::InsertRoot { .. }));
        assert_eq!(op.provisional_id(), Some(&after.roots[0].id));
    }

    #[test]
    fn test_insert_reply_appends_at_depth() {
        let before = thread();
        let (after, op) = apply_insert(&before, Some(&"B".into()), Payload::text("deep")).unwrap();

        let b = after.find(&"B".into()).unwrap();
        assert_eq!(b.children.len(), 1);
        assert!(b.children[0].is_provisional());
        assert_eq!(b.children[0].parent_id, Some(ItemId::canonical("B")));
        assert_eq!(
            op.kind,
            PendingKind::InsertReply {
                parent_id: "B".into(),
                provisional_id: b.children[0].id.clone(),
            }
        );
    }

    #[test]
    fn test_insert_reply_appends_after_existing_replies() {
        let (after, _) = apply_insert(&thread(), Some(&"A".into()), Payload::text("p")).unwrap();
        let a = &after.roots[0];

        assert_eq!(a.children.len(), 2);
        assert_eq!(a.children[0].id, ItemId::canonical("B"));
        assert!(a.children[1].is_provisional());
    }

    #[test]
    fn test_insert_reply_missing_parent() {
        let before = thread();
        let err = apply_insert(&before, Some(&"Z".into()), Payload::text("x")).unwrap_err();

        assert_eq!(err, EngineError::ParentNotFound("Z".into()));
    }

    #[test]
    fn test_mutation_dispatch_and_validation() {
        let forest = thread();
        let reply = Mutation::InsertReply {
            parent_id: "C".into(),
            payload: Payload::text("hi"),
        };
        assert!(reply.validate(&forest).is_ok());

        let (after, _) = reply.apply(&forest).unwrap();
        assert_eq!(after.find(&"C".into()).unwrap().children.len(), 1);

        let orphan = Mutation::InsertReply {
            parent_id: "nope".into(),
            payload: Payload::text("hi"),
        };
        assert!(orphan.validate(&forest).is_err());
    }

    #[test]
    fn test_mutation_serialization() {
        let mutation = Mutation::InsertReply {
            parent_id: "A".into(),
            payload: Payload::text("Hello"),
        };

        let json = serde_json::to_string(&mutation).unwrap();
        assert!(json.contains("\"type\":\"insertReply\""));
        assert!(json.contains("\"parentId\":\"A\""));

        let back: Mutation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mutation);
    }

    #[test]
    fn test_counter_adjust_clamps_at_floor() {
        let (value, op) = apply_counter_adjust(CounterKey::likes("p"), 0, -1, 0);
        assert_eq!(value, 0);
        assert_eq!(op.snapshot, PriorSnapshot::Counter { value: 0 });

        let (value, _) = apply_counter_adjust(CounterKey::likes("p"), 5, 2, 0);
        assert_eq!(value, 7);
    }

    #[test]
    fn test_toggle_flips_flag_and_count() {
        let ((liked, count), op) = apply_toggle(CounterKey::likes("p"), false, 3, 0);
        assert!(liked);
        assert_eq!(count, 4);
        assert_eq!(
            op.snapshot,
            PriorSnapshot::Toggle {
                active: false,
                value: 3
            }
        );

        let ((liked, count), _) = apply_toggle(CounterKey::likes("p"), true, 0, 0);
        assert!(!liked);
        assert_eq!(count, 0);
    }
}
