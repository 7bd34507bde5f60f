//! # Pending Operations
//!
//! Record of one in-flight optimistic mutation.
//!
//! A pending operation is created together with the optimistic state and
//! consumed exactly once when the server outcome arrives. Its snapshot says
//! how to undo it:
//!
//! | kind            | snapshot  | rollback                          |
//! |-----------------|-----------|-----------------------------------|
//! | InsertRoot      | Removal   | remove the provisional subtree    |
//! | InsertReply     | Removal   | remove the provisional subtree    |
//! | CounterAdjust   | Counter   | restore the prior value           |
//! | CounterAdjust   | Toggle    | restore the prior flag and value  |

use crate::identity::OperationToken;
use pin_common::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric aggregate field adjusted optimistically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CounterField {
    Likes,
    Comments,
    Ratings,
}

impl fmt::Display for CounterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterField::Likes => f.write_str("likes"),
            CounterField::Comments => f.write_str("comments"),
            CounterField::Ratings => f.write_str("ratings"),
        }
    }
}

/// Counter address: which field of which target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CounterKey {
    pub target: String,
    pub field: CounterField,
}

impl CounterKey {
    pub fn new(target: impl Into<String>, field: CounterField) -> Self {
        Self {
            target: target.into(),
            field,
        }
    }

    pub fn likes(target: impl Into<String>) -> Self {
        Self::new(target, CounterField::Likes)
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.field)
    }
}

/// What the optimistic mutation did
#[derive(Debug, Clone, PartialEq)]
pub enum PendingKind {
    InsertRoot {
        provisional_id: ItemId,
    },
    InsertReply {
        parent_id: ItemId,
        provisional_id: ItemId,
    },
    CounterAdjust {
        key: CounterKey,
        delta: i64,
    },
}

/// State needed to revert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorSnapshot {
    /// Tree insert: rollback is remove-by-id
    Removal,

    /// Scalar counter value before the adjustment
    Counter { value: i64 },

    /// Boolean flag and its counter before a toggle
    Toggle { active: bool, value: i64 },
}

/// Mutation waiting for its server outcome
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    pub token: OperationToken,
    pub kind: PendingKind,
    pub snapshot: PriorSnapshot,
}

impl PendingOperation {
    pub fn insert_root(provisional_id: ItemId) -> Self {
        Self {
            token: OperationToken::next(),
            kind: PendingKind::InsertRoot { provisional_id },
            snapshot: PriorSnapshot::Removal,
        }
    }

    pub fn insert_reply(parent_id: ItemId, provisional_id: ItemId) -> Self {
        Self {
            token: OperationToken::next(),
            kind: PendingKind::InsertReply {
                parent_id,
                provisional_id,
            },
            snapshot: PriorSnapshot::Removal,
        }
    }

    pub fn counter_adjust(key: CounterKey, delta: i64, snapshot: PriorSnapshot) -> Self {
        Self {
            token: OperationToken::next(),
            kind: PendingKind::CounterAdjust { key, delta },
            snapshot,
        }
    }

    /// Provisional node this operation created, for tree operations
    pub fn provisional_id(&self) -> Option<&ItemId> {
        match &self.kind {
            PendingKind::InsertRoot { provisional_id }
            | PendingKind::InsertReply { provisional_id, .. } => Some(provisional_id),
            PendingKind::CounterAdjust { .. } => None,
        }
    }

}
