//! Drydock embedded state store.
//!
//! Persists node and task documents in a redb database and exposes the
//! conditional taskset swap the assignment protocol is built on.
//!
//! # Components
//!
//! - **`types`** — Node/task document types
//! - **`tables`** — redb table definitions
//! - **`store`** — `StateStore` CRUD + `swap_node_tasks`
//! - **`error`** — `StoreError` / `StoreResult`

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::{StateStore, SwapOutcome};
pub use types::{CpuArch, NodeId, NodeRecord, TaskId, TaskRecord, TaskSnapshot};
