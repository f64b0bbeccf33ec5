//! Stateful page workflows built on top of the API client and query cache.
//!
//! Each workflow owns the state machine for one dashboard surface: which
//! modal or form is active, what record it operates on, and which cache
//! resources a successful mutation must refresh. Workflows never render
//! anything; outcomes are reported through [`crate::notify::Notifier`] and
//! the returned values.

pub mod kanban;
pub mod receiving;

pub use kanban::{
    categorize, BoardColumns, KanbanWorkflow, PendingStatusFix, ReturnDetails, ReturnOutcome,
};
pub use receiving::{ReceivingState, ReceivingWorkflow};

use thiserror::Error;

use crate::error::ClientError;

/// Errors surfaced by workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The operation is not legal in the workflow's current state, e.g.
    /// submitting a conference while no conference form is active.
    #[error("action '{action}' is not allowed in state {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl WorkflowError {
    /// True when the underlying cause was client-side input validation,
    /// which callers surface inline rather than as a notice.
    pub fn is_validation(&self) -> bool {
        matches!(self, WorkflowError::Client(err) if err.is_validation())
    }
}
