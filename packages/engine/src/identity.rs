//! # Node Identity
//!
//! Mints provisional ids and operation tokens.
//!
//! Both come from process-wide counters, so a value is never handed out
//! twice while the process lives. Provisional ids are a separate variant of
//! [`ItemId`] and cannot be confused with a server id.

use pin_common::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PROVISIONAL: AtomicU64 = AtomicU64::new(1);
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Fresh provisional id
pub fn new_provisional_id() -> ItemId {
    ItemId::Provisional(NEXT_PROVISIONAL.fetch_add(1, Ordering::Relaxed))
}

pub fn is_provisional(id: &ItemId) -> bool {
    id.is_provisional()
}

/// Handle correlating one optimistic mutation with its eventual outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationToken(u64);

impl OperationToken {
    pub fn next() -> Self {
        OperationToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}
