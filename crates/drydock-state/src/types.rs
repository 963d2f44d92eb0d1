//! Domain types for the drydock state store.
//!
//! These types represent the persisted state of compute nodes and the
//! tasks that can be assigned to them. All types are serializable
//! to/from JSON for storage in redb tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for a node.
pub type NodeId = String;

/// Unique identifier for a task.
pub type TaskId = String;

/// CPU architecture of a node, or required by a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuArch {
    X86_64,
    Arm64,
    Riscv64,
}

impl fmt::Display for CpuArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CpuArch::X86_64 => "x86_64",
            CpuArch::Arm64 => "arm64",
            CpuArch::Riscv64 => "riscv64",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for CpuArch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86_64" | "amd64" => Ok(CpuArch::X86_64),
            "arm64" | "aarch64" => Ok(CpuArch::Arm64),
            "riscv64" => Ok(CpuArch::Riscv64),
            other => Err(format!("unknown cpu architecture: {other}")),
        }
    }
}

// ── Node ──────────────────────────────────────────────────────────

/// A compute node and the taskset currently assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeRecord {
    /// Opaque id, assigned at creation, immutable thereafter.
    pub id: NodeId,
    /// Unique across all nodes (enforced at creation); mutable.
    pub name: String,
    /// Network address of the node.
    pub address: String,
    /// Total CPU cores on this node.
    pub cpu_cores: u32,
    /// CPU architecture of this node.
    pub cpu_arch: CpuArch,
    /// Device identifiers physically present on this node.
    pub devices: BTreeSet<String>,
    /// Assigned tasks, in assignment order.
    pub tasks: Vec<TaskSnapshot>,
    /// Version marker bumped on every taskset swap.
    pub revision: u64,
    /// Unix timestamp (seconds) when this node was created.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last mutation.
    pub updated_at: u64,
}

// ── Task ──────────────────────────────────────────────────────────

/// A task definition, owned by the task collection independent of
/// any assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    /// Opaque id, immutable.
    pub id: TaskId,
    /// Unique across all tasks (enforced at creation).
    pub name: String,
    /// Executable artifact reference for this task.
    pub runtime: String,
    /// CPU cores this task needs.
    pub cpu_cores: u32,
    /// Required CPU architecture, if the task is arch-specific.
    pub cpu_arch: Option<CpuArch>,
    /// Device identifiers this task needs present on its node.
    pub devices: BTreeSet<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Denormalized copy of a task's requirement fields, held inside the
/// node document for feasibility bookkeeping. Holds only what the
/// evaluator needs, not the full task record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub name: String,
    pub cpu_cores: u32,
    pub cpu_arch: Option<CpuArch>,
    pub devices: BTreeSet<String>,
}

impl From<&TaskRecord> for TaskSnapshot {
    fn from(task: &TaskRecord) -> Self {
        TaskSnapshot {
            task_id: task.id.clone(),
            name: task.name.clone(),
            cpu_cores: task.cpu_cores,
            cpu_arch: task.cpu_arch,
            devices: task.devices.clone(),
        }
    }
}

impl NodeRecord {
    /// Total CPU cores already committed to assigned tasks.
    pub fn committed_cpu(&self) -> u64 {
        self.tasks.iter().map(|t| u64::from(t.cpu_cores)).sum()
    }

    /// Whether a task with the given id is in this node's taskset.
    pub fn hosts_task(&self, task_id: &str) -> bool {
        self.tasks.iter().any(|t| t.task_id == task_id)
    }
}
