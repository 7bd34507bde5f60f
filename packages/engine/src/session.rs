//! # Thread Session
//!
//! One client's view of a post's comment thread.
//!
//! A session holds the current forest revision plus the operations still
//! waiting for the server. It is the single writer of its forest: callers
//! apply optimistic inserts in the order the user acts, hand each token to
//! the submit collaborator, and feed the outcome back through [`settle`].
//!
//! Provisional ids stay local. [`ThreadSession::submission`] yields what is
//! sent over the wire: the payload and a canonical parent id, if any.
//!
//! [`settle`]: ThreadSession::settle

use crate::assembler::assemble_records;
use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::identity::OperationToken;
use crate::mutations::{insert_provisional, Mutation};
use crate::pending::{PendingKind, PendingOperation};
use crate::reconciler::{resolve_failure, resolve_success};
use pin_common::{CommentRecord, Forest, Item, ItemId, Payload};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

/// Result of a submit call, as reported by the network collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Confirmed(Item),
    Failed(String),
}

/// What the submit collaborator sends for a pending insert
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub parent_id: Option<ItemId>,
    pub payload: Payload,
}

/// Insert waiting for server acknowledgment
#[derive(Debug, Clone)]
struct PendingInsert {
    op: PendingOperation,
    payload: Payload,
}

pub struct ThreadSession {
    /// Thread identifier (the post the comments belong to)
    pub id: String,

    forest: Forest,

    /// Increments on every change to the forest
    version: u64,

    config: EngineConfig,

    /// Outstanding inserts, in the order they were applied
    pending: BTreeMap<OperationToken, PendingInsert>,

    /// Provisional ids already confirmed, mapped to their server ids
    aliases: HashMap<ItemId, ItemId>,
}

impl ThreadSession {
    pub fn new(id: impl Into<String>, config: EngineConfig) -> Self {
        Self::from_forest(id, Forest::default(), config)
    }

    pub fn from_forest(id: impl Into<String>, forest: Forest, config: EngineConfig) -> Self {
        Self {
            id: id.into(),
            forest,
            version: 0,
            config,
            pending: BTreeMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Session over a freshly fetched comment listing
    pub fn load(id: impl Into<String>, records: Vec<CommentRecord>, config: EngineConfig) -> Self {
        Self::from_forest(id, assemble_records(records), config)
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, token: OperationToken) -> bool {
        self.pending.contains_key(&token)
    }

    /// Pending operation behind a token
    pub fn operation(&self, token: OperationToken) -> Option<&PendingOperation> {
        self.pending.get(&token).map(|p| &p.op)
    }

    /// Current id of an item: the server id if it has been confirmed since
    pub fn canonical_id(&self, id: &ItemId) -> ItemId {
        self.aliases.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    /// Apply a mutation optimistically
    pub fn apply(&mut self, mutation: Mutation) -> EngineResult<OperationToken> {
        match mutation {
            Mutation::InsertRoot { payload } => self.insert(None, payload),
            Mutation::InsertReply { parent_id, payload } => self.insert(Some(&parent_id), payload),
        }
    }

    /// Insert a provisional comment (root if `target_parent` is `None`)
    #[instrument(skip(self, payload), fields(session = %self.id))]
    pub fn insert(
        &mut self,
        target_parent: Option<&ItemId>,
        payload: Payload,
    ) -> EngineResult<OperationToken> {
        let target = target_parent.map(|id| self.canonical_id(id));
        let mutation = match target {
            Some(parent_id) => Mutation::InsertReply {
                parent_id,
                payload: payload.clone(),
            },
            None => Mutation::InsertRoot {
                payload: payload.clone(),
            },
        };
        mutation.validate(&self.forest)?;

        if let Some(limit) = self.config.max_pending {
            if self.pending.len() >= limit {
                return Err(EngineError::TooManyPending(limit));
            }
        }

        let (next, op) = mutation.apply(&self.forest)?;
        let token = op.token;

        info!(%token, id = ?op.provisional_id(), "Optimistic insert");
        self.forest = next;
        self.version += 1;
        self.pending.insert(token, PendingInsert { op, payload });
        Ok(token)
    }

    /// Request body for a pending insert
    ///
    /// Fails with `StillProvisional` while the parent is itself waiting for
    /// confirmation; the reply must not be submitted before its parent.
    pub fn submission(&self, token: OperationToken) -> EngineResult<Submission> {
        let entry = self
            .pending
            .get(&token)
            .ok_or(EngineError::TokenNotFound(token))?;

        let parent_id = match &entry.op.kind {
            PendingKind::InsertReply { parent_id, .. } => {
                let parent_id = self.canonical_id(parent_id);
                if parent_id.is_provisional() {
                    return Err(EngineError::StillProvisional(parent_id));
                }
                Some(parent_id)
            }
            _ => None,
        };

        Ok(Submission {
            parent_id,
            payload: entry.payload.clone(),
        })
    }

    /// Feed a server outcome back; returns tokens retired along the way
    pub fn settle(
        &mut self,
        token: OperationToken,
        outcome: SubmitOutcome,
    ) -> EngineResult<Vec<OperationToken>> {
        match outcome {
            SubmitOutcome::Confirmed(item) => self.confirm(token, item).map(|_| Vec::new()),
            SubmitOutcome::Failed(reason) => {
                debug!(%token, %reason, "Submission failed");
                self.reject(token)
            }
        }
    }

    /// Server accepted the insert
    #[instrument(skip(self, server_item), fields(session = %self.id, id = %server_item.id))]
    pub fn confirm(&mut self, token: OperationToken, server_item: Item) -> EngineResult<()> {
        let entry = self
            .pending
            .get(&token)
            .ok_or(EngineError::TokenNotFound(token))?;

        let canonical = server_item.id.clone();
        let next = resolve_success(&self.forest, &entry.op, server_item)?;

        if let Some(provisional_id) = entry.op.provisional_id() {
            self.aliases.insert(provisional_id.clone(), canonical);
        }
        self.pending.remove(&token);
        self.forest = next;
        self.version += 1;
        info!(%token, "Insert confirmed");
        Ok(())
    }

    /// Server refused the insert
    ///
    /// The provisional item and every reply under it are removed. Tokens of
    /// pending replies removed this way are retired and returned so the
    /// caller can ignore their eventual outcome.
    #[instrument(skip(self), fields(session = %self.id))]
    pub fn reject(&mut self, token: OperationToken) -> EngineResult<Vec<OperationToken>> {
        let entry = self
            .pending
            .get(&token)
            .ok_or(EngineError::TokenNotFound(token))?;

        let (next, removed) = resolve_failure(&self.forest, &entry.op)?;
        self.pending.remove(&token);

        let retired: Vec<OperationToken> = self
            .pending
            .iter()
            .filter(|(_, p)| {
                p.op
                    .provisional_id()
                    .map(|id| removed.contains(id))
                    .unwrap_or(false)
            })
            .map(|(t, _)| *t)
            .collect();
        for t in &retired {
            self.pending.remove(t);
        }

        self.forest = next;
        self.version += 1;
        info!(%token, removed = removed.len(), retired = retired.len(), "Insert rolled back");
        Ok(retired)
    }

    /// Replace the forest with a fresh server listing
    ///
    /// Pending inserts are replayed on top, in their original order and under
    /// their original provisional ids. An insert whose parent is gone from the
    /// new listing is dropped and its token returned.
    #[instrument(skip(self, records), fields(session = %self.id, records = records.len()))]
    pub fn rebase(&mut self, records: Vec<CommentRecord>) -> Vec<OperationToken> {
        let mut next = assemble_records(records);
        let mut dropped = Vec::new();

        let pending = std::mem::take(&mut self.pending);
        for (token, entry) in pending {
            let Some(provisional_id) = entry.op.provisional_id().cloned() else {
                continue;
            };
            let parent = match &entry.op.kind {
                PendingKind::InsertReply { parent_id, .. } => Some(self.canonical_id(parent_id)),
                _ => None,
            };

            match insert_provisional(&mut next, parent.as_ref(), provisional_id, entry.payload.clone()) {
                Ok(()) => {
                    self.pending.insert(token, entry);
                }
                Err(err) => {
                    warn!(%token, error = %err, "Dropping pending insert during rebase");
                    dropped.push(token);
                }
            }
        }

        self.forest = next;
        self.version += 1;
        dropped
    }
}
