//! Feasibility evaluation of a candidate taskset against node capacity.
//!
//! Constraints are checked in a fixed order — CPU, then architecture,
//! then devices — and the first failing class is the one reported. The
//! order is a deliberate policy: when several constraints fail at once,
//! callers always see the same rejection, which keeps error reporting
//! deterministic and testable.

use std::collections::BTreeSet;

use drydock_state::CpuArch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A node's declared capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capacity {
    /// Total CPU cores on the node.
    pub cpu_cores: u32,
    /// The node's CPU architecture.
    pub cpu_arch: CpuArch,
    /// Device identifiers physically present on the node.
    pub devices: BTreeSet<String>,
}

/// A single task's resource requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// CPU cores the task needs.
    pub cpu_cores: u32,
    /// Required CPU architecture, if any.
    pub cpu_arch: Option<CpuArch>,
    /// Device identifiers the task needs.
    pub devices: BTreeSet<String>,
}

/// Outcome of a feasibility evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Feasible,
    Infeasible(Rejection),
}

impl Verdict {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Verdict::Feasible)
    }
}

/// Why a candidate taskset does not fit a node.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum Rejection {
    #[error("taskset needs {required} cpu cores but the node has {available}")]
    InsufficientCpu { required: u64, available: u32 },

    #[error("task requires {required} but the node is {node}")]
    ArchMismatch { required: CpuArch, node: CpuArch },

    #[error("node is missing required devices: {}", .missing.join(", "))]
    MissingDevices { missing: Vec<String> },
}

/// Decide whether `candidate` fits within `capacity`.
///
/// `candidate` is the full taskset the node would host, not a delta.
/// Checks run in fixed precedence: total CPU demand first, then
/// per-task architecture, then per-task devices. `MissingDevices`
/// names every absent device across the whole candidate set, sorted.
pub fn evaluate(capacity: &Capacity, candidate: &[Requirement]) -> Verdict {
    let required: u64 = candidate.iter().map(|r| u64::from(r.cpu_cores)).sum();
    if required > u64::from(capacity.cpu_cores) {
        return Verdict::Infeasible(Rejection::InsufficientCpu {
            required,
            available: capacity.cpu_cores,
        });
    }

    for req in candidate {
        if let Some(required) = req.cpu_arch {
            if required != capacity.cpu_arch {
                return Verdict::Infeasible(Rejection::ArchMismatch {
                    required,
                    node: capacity.cpu_arch,
                });
            }
        }
    }

    let missing: BTreeSet<String> = candidate
        .iter()
        .flat_map(|r| r.devices.iter())
        .filter(|d| !capacity.devices.contains(*d))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Verdict::Infeasible(Rejection::MissingDevices {
            missing: missing.into_iter().collect(),
        });
    }

    Verdict::Feasible
}
