//! Error types for the engine

use crate::identity::OperationToken;
use pin_common::ItemId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Parent not found: {0}")]
    ParentNotFound(ItemId),

    #[error("No pending operation for token {0}")]
    TokenNotFound(OperationToken),

    #[error("Token {token} is not a {expected} operation")]
    KindMismatch {
        token: OperationToken,
        expected: &'static str,
    },

    #[error("Server returned a provisional id: {0}")]
    ProvisionalServerId(ItemId),

    #[error("Item {0} has not been confirmed by the server yet")]
    StillProvisional(ItemId),

    #[error("Server id {0} collides with an ancestor or reply of the pending item")]
    IdCollision(ItemId),

    #[error("Too many pending operations (limit {0})")]
    TooManyPending(usize),
}

pub type EngineResult<T> = Result<T, EngineError>;
