//! Type conversions between state store types and evaluator types.
//!
//! Bridges `drydock_state::{NodeRecord, TaskRecord, TaskSnapshot}` to the
//! evaluator's `Capacity` and `Requirement` views.

use drydock_state::{NodeRecord, TaskRecord, TaskSnapshot};

use crate::evaluator::{Capacity, Requirement};

/// Extract a node's capacity view for evaluation.
pub fn node_capacity(node: &NodeRecord) -> Capacity {
    Capacity {
        cpu_cores: node.cpu_cores,
        cpu_arch: node.cpu_arch,
        devices: node.devices.clone(),
    }
}

/// Extract a task record's requirement view.
pub fn task_requirement(task: &TaskRecord) -> Requirement {
    Requirement {
        cpu_cores: task.cpu_cores,
        cpu_arch: task.cpu_arch,
        devices: task.devices.clone(),
    }
}

/// Requirement views for every snapshot in a node's current taskset.
pub fn snapshot_requirements(snapshots: &[TaskSnapshot]) -> Vec<Requirement> {
    snapshots
        .iter()
        .map(|s| Requirement {
            cpu_cores: s.cpu_cores,
            cpu_arch: s.cpu_arch,
            devices: s.devices.clone(),
        })
        .collect()
}
