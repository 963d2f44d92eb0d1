//! Drydock admission control — feasibility evaluation for task assignment.
//!
//! This crate decides whether a node's declared capacity can accommodate
//! a candidate set of task requirements. It performs no I/O and holds no
//! state: `evaluate` is a pure function, safe to call with hypothetical
//! (not-yet-persisted) candidate sets for dry-run decisions. The
//! coordinator in `drydock-assign` commits the results.
//!
//! # Components
//!
//! - **`evaluator`** — `evaluate` and the `Verdict`/`Rejection` types
//! - **`convert`** — Type conversions from state store types

pub mod convert;
pub mod evaluator;

pub use convert::{node_capacity, snapshot_requirements, task_requirement};
pub use evaluator::{Capacity, Rejection, Requirement, Verdict, evaluate};
