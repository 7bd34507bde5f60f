//! # Pin Engine
//!
//! Optimistic mutation and thread reconciliation for comment threads and
//! like counters.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ content fetch: flat comment listing         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ assembler: flat list → forest               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ mutations: optimistic insert / adjust       │
//! │  - provisional ids from `identity`          │
//! │  - returns new state + pending operation    │
//! └─────────────────────────────────────────────┘
//!                     ↓   (submit collaborator talks to the server)
//! ┌─────────────────────────────────────────────┐
//! │ reconciler: success → promote in place      │
//! │             failure → remove / restore      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Immutable revisions**: every operation returns a new forest
//! 2. **Single-use tokens**: a pending operation settles exactly once
//! 3. **Nothing lost, nothing duplicated**: orphans become roots, a
//!    provisional node lives in exactly one place
//! 4. **Server authority**: confirmed data replaces the optimistic copy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pin_engine::{EngineConfig, SubmitOutcome, ThreadSession};
//! use pin_common::Payload;
//!
//! let mut session = ThreadSession::load("post-1", records, EngineConfig::default());
//!
//! // Render immediately
//! let token = session.insert(None, Payload::text("Great coffee"))?;
//! let request = session.submission(token)?;
//!
//! // ...later, when the request settles
//! session.settle(token, SubmitOutcome::Confirmed(server_item))?;
//! ```

mod assembler;
mod config;
mod counter;
mod errors;
mod identity;
mod mutations;
mod pending;
mod reconciler;
mod session;

pub use assembler::{assemble, assemble_records};
pub use config::EngineConfig;
pub use counter::{CounterBoard, CounterCell, CounterState, LikeToggle};
pub use errors::{EngineError, EngineResult};
pub use identity::{is_provisional, new_provisional_id, OperationToken};
pub use mutations::{apply_counter_adjust, apply_insert, apply_toggle, Mutation};
pub use pending::{CounterField, CounterKey, PendingKind, PendingOperation, PriorSnapshot};
pub use reconciler::{
    resolve_counter_failure, resolve_counter_success, resolve_failure, resolve_success,
    resolve_toggle_failure,
};
pub use session::{SubmitOutcome, Submission, ThreadSession};

// Re-export the data model for convenience
pub use pin_common::{Forest, Item, ItemId, Payload};
