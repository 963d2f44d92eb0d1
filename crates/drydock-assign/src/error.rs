//! Assignment coordinator error types.
//!
//! The coordinator is the sole translator from store-level absence and
//! conflict signals into these typed failures; nothing is swallowed on
//! the way up.

use drydock_admission::Rejection;
use thiserror::Error;

/// Errors that can occur during assignment operations.
#[derive(Debug, Error)]
pub enum AssignError {
    /// Malformed id syntax — rejected before any store access.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// The candidate taskset does not fit the node. Carries the
    /// evaluator's rejection so callers can distinguish missing devices
    /// from other infeasibility.
    #[error("assignment not feasible: {0}")]
    NotFeasible(Rejection),

    /// Concurrent mutations kept winning the conditional swap until the
    /// retry budget ran out.
    #[error("node {node_id} kept changing underneath us ({attempts} attempts)")]
    Contention { node_id: String, attempts: usize },

    #[error("state store error: {0}")]
    Store(#[from] drydock_state::StoreError),
}

pub type AssignResult<T> = Result<T, AssignError>;
