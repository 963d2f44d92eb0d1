//! Drydock assignment coordinator.
//!
//! Orchestrates admission-controlled attach/detach of tasks to nodes:
//! loads fresh node and task state, runs the feasibility evaluator from
//! `drydock-admission`, and commits the new taskset through the state
//! store's conditional swap. Concurrent requests against the same node
//! serialize on the node document's revision; a lost race is retried a
//! bounded number of times against freshly read state.
//!
//! # Components
//!
//! - **`coordinator`** — `Coordinator` attach/detach/dry_run
//! - **`ident`** — id minting and syntactic validation
//! - **`error`** — `AssignError` / `AssignResult`

pub mod coordinator;
pub mod error;
pub mod ident;

pub use coordinator::{Coordinator, DEFAULT_MAX_ATTEMPTS};
pub use error::{AssignError, AssignResult};
pub use ident::{mint_id, valid_id};
