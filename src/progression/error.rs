use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::{models::SetStatus, storage::StorageError},
    state::state_machine::InvalidTransition,
};

/// Result alias for progression entry points.
pub type EngineResult<T> = Result<T, ProgressionError>;

/// Set lifecycle actions that can be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetAction {
    /// `NotStarted -> InProgress`.
    Start,
    /// `InProgress -> Completed`.
    Complete,
    /// `Completed -> InProgress`.
    Reopen,
}

/// Errors raised by the progression engine.
#[derive(Debug, Error)]
pub enum ProgressionError {
    /// The primary subject of the call does not exist.
    #[error("{entity} `{id}` not found")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// Identifier that was looked up.
        id: Uuid,
    },
    /// Match lifecycle transition refused.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// Set lifecycle transition refused.
    #[error("invalid set transition: cannot {action:?} a set while {from:?}")]
    InvalidSetTransition {
        /// Status of the set when the action was attempted.
        from: SetStatus,
        /// Refused action.
        action: SetAction,
    },
    /// Malformed input, rejected before any mutation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The store failed while reading or committing.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressionError {
    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        ProgressionError::NotFound { entity, id }
    }
}
