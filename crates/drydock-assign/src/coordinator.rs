//! Coordinator — admission-controlled attach/detach of tasks to nodes.
//!
//! Every taskset mutation follows the same protocol: read fresh node and
//! task state, evaluate feasibility of the candidate taskset, then commit
//! through the store's revision-checked swap. A plain read-modify-write
//! would let two concurrent attaches, each feasible against a stale read,
//! jointly overcommit the node; the conditional swap is the sole
//! synchronization primitive, so no in-process locks are needed. A lost
//! swap is retried with freshly read state — a feasibility verdict is
//! never reused across attempts.

use drydock_admission::{Verdict, evaluate, node_capacity, snapshot_requirements};
use drydock_state::{NodeRecord, StateStore, SwapOutcome, TaskSnapshot};
use tracing::{debug, info};

use crate::error::{AssignError, AssignResult};
use crate::ident::valid_id;

/// Default retry budget for a lost conditional swap.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// The assignment coordinator.
///
/// Cheap to clone; safe to share across concurrent requests.
#[derive(Clone)]
pub struct Coordinator {
    store: StateStore,
    max_attempts: usize,
}

impl Coordinator {
    /// Create a coordinator with the default retry budget.
    pub fn new(store: StateStore) -> Self {
        Self::with_max_attempts(store, DEFAULT_MAX_ATTEMPTS)
    }

    /// Create a coordinator with an explicit retry budget.
    pub fn with_max_attempts(store: StateStore, max_attempts: usize) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Attach a task to a node.
    ///
    /// The candidate taskset (current snapshots plus the new task) must
    /// pass admission; on success the updated node is returned.
    /// Attaching a task that is already in the node's taskset is a no-op
    /// returning the unchanged node — detach is idempotent, and keeping
    /// the pair symmetric avoids double-counting the task's CPU demand.
    pub async fn attach(&self, node_id: &str, task_id: &str) -> AssignResult<NodeRecord> {
        check_id(node_id)?;
        check_id(task_id)?;

        for attempt in 1..=self.max_attempts {
            let node = self
                .store
                .get_node(node_id)?
                .ok_or_else(|| AssignError::NodeNotFound(node_id.to_string()))?;
            let task = self
                .store
                .get_task(task_id)?
                .ok_or_else(|| AssignError::TaskNotFound(task_id.to_string()))?;

            if node.hosts_task(task_id) {
                debug!(%node_id, %task_id, "task already attached, no-op");
                return Ok(node);
            }

            let mut candidate = node.tasks.clone();
            candidate.push(TaskSnapshot::from(&task));

            let requirements = snapshot_requirements(&candidate);
            if let Verdict::Infeasible(rejection) =
                evaluate(&node_capacity(&node), &requirements)
            {
                debug!(%node_id, %task_id, %rejection, "attach rejected by admission");
                return Err(AssignError::NotFeasible(rejection));
            }

            match self.store.swap_node_tasks(node_id, node.revision, candidate)? {
                SwapOutcome::Applied(updated) => {
                    info!(
                        %node_id,
                        %task_id,
                        tasks = updated.tasks.len(),
                        "task attached"
                    );
                    return Ok(updated);
                }
                SwapOutcome::Absent => {
                    return Err(AssignError::NodeNotFound(node_id.to_string()));
                }
                SwapOutcome::Conflict => {
                    debug!(%node_id, attempt, "attach lost the swap, retrying");
                }
            }
        }

        Err(AssignError::Contention {
            node_id: node_id.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Detach a task from a node.
    ///
    /// Idempotent: removing a task id that is not in the taskset leaves
    /// the node unchanged and succeeds. No feasibility re-check — removal
    /// can only reduce demand.
    pub async fn detach(&self, node_id: &str, task_id: &str) -> AssignResult<NodeRecord> {
        check_id(node_id)?;
        check_id(task_id)?;

        for attempt in 1..=self.max_attempts {
            let node = self
                .store
                .get_node(node_id)?
                .ok_or_else(|| AssignError::NodeNotFound(node_id.to_string()))?;

            let remaining: Vec<TaskSnapshot> = node
                .tasks
                .iter()
                .filter(|t| t.task_id != task_id)
                .cloned()
                .collect();

            if remaining.len() == node.tasks.len() {
                debug!(%node_id, %task_id, "task not attached, no-op");
                return Ok(node);
            }

            match self.store.swap_node_tasks(node_id, node.revision, remaining)? {
                SwapOutcome::Applied(updated) => {
                    info!(
                        %node_id,
                        %task_id,
                        tasks = updated.tasks.len(),
                        "task detached"
                    );
                    return Ok(updated);
                }
                SwapOutcome::Absent => {
                    return Err(AssignError::NodeNotFound(node_id.to_string()));
                }
                SwapOutcome::Conflict => {
                    debug!(%node_id, attempt, "detach lost the swap, retrying");
                }
            }
        }

        Err(AssignError::Contention {
            node_id: node_id.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Evaluate whether attaching a task would be feasible, without
    /// mutating anything.
    pub async fn dry_run(&self, node_id: &str, task_id: &str) -> AssignResult<Verdict> {
        check_id(node_id)?;
        check_id(task_id)?;

        let node = self
            .store
            .get_node(node_id)?
            .ok_or_else(|| AssignError::NodeNotFound(node_id.to_string()))?;
        let task = self
            .store
            .get_task(task_id)?
            .ok_or_else(|| AssignError::TaskNotFound(task_id.to_string()))?;

        let mut candidate = node.tasks.clone();
        if !node.hosts_task(task_id) {
            candidate.push(TaskSnapshot::from(&task));
        }

        let requirements = snapshot_requirements(&candidate);
        Ok(evaluate(&node_capacity(&node), &requirements))
    }
}

fn check_id(id: &str) -> AssignResult<()> {
    if valid_id(id) {
        Ok(())
    } else {
        Err(AssignError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_admission::Rejection;
    use drydock_state::{CpuArch, TaskRecord};

    // Fixed 24-char hex ids keep the tests deterministic.
    const NODE_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";
    const TASK_1: &str = "b1b1b1b1b1b1b1b1b1b1b1b1";
    const TASK_2: &str = "b2b2b2b2b2b2b2b2b2b2b2b2";
    const GHOST: &str = "cccccccccccccccccccccccc";

    fn node(id: &str, name: &str, cpu: u32, arch: CpuArch, devices: &[&str]) -> NodeRecord {
        NodeRecord {
            id: id.to_string(),
            name: name.to_string(),
            address: "10.0.0.1".to_string(),
            cpu_cores: cpu,
            cpu_arch: arch,
            devices: devices.iter().map(|d| d.to_string()).collect(),
            tasks: Vec::new(),
            revision: 0,
            created_at: 1000,
            updated_at: 1000,
        }
    }

    fn task(
        id: &str,
        name: &str,
        cpu: u32,
        arch: Option<CpuArch>,
        devices: &[&str],
    ) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            name: name.to_string(),
            runtime: format!("{name}.bin"),
            cpu_cores: cpu,
            cpu_arch: arch,
            devices: devices.iter().map(|d| d.to_string()).collect(),
            created_at: 1000,
            updated_at: 1000,
        }
    }

    fn setup() -> (StateStore, Coordinator) {
        let store = StateStore::open_in_memory().unwrap();
        let coordinator = Coordinator::new(store.clone());
        (store, coordinator)
    }

    #[tokio::test]
    async fn attach_happy_path() {
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_1, "telemetry", 2, None, &[]))
            .unwrap();

        let updated = coordinator.attach(NODE_A, TASK_1).await.unwrap();

        assert_eq!(updated.tasks.len(), 1);
        assert_eq!(updated.tasks[0].task_id, TASK_1);
        assert_eq!(updated.revision, 1);
    }

    #[tokio::test]
    async fn attach_rejects_cpu_overcommit() {
        // Scenario A: 2-core task fits a 4-core node, a further 3-core
        // task does not (2 + 3 = 5 > 4).
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_1, "first", 2, None, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_2, "second", 3, None, &[]))
            .unwrap();

        coordinator.attach(NODE_A, TASK_1).await.unwrap();
        let err = coordinator.attach(NODE_A, TASK_2).await.unwrap_err();

        assert!(matches!(
            err,
            AssignError::NotFeasible(Rejection::InsufficientCpu {
                required: 5,
                available: 4,
            })
        ));

        // The rejected attach must not have written anything.
        let stored = store.get_node(NODE_A).unwrap().unwrap();
        assert_eq!(stored.tasks.len(), 1);
    }

    #[tokio::test]
    async fn attach_rejects_arch_mismatch() {
        // Scenario B.
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::Arm64, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_1, "intel-only", 1, Some(CpuArch::X86_64), &[]))
            .unwrap();

        let err = coordinator.attach(NODE_A, TASK_1).await.unwrap_err();
        assert!(matches!(
            err,
            AssignError::NotFeasible(Rejection::ArchMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn attach_rejects_missing_devices() {
        // Scenario C: missing devices stay distinguishable and named.
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &["gpu0"]))
            .unwrap();
        store
            .insert_task(&task(TASK_1, "vision", 1, None, &["gpu0", "gpu1"]))
            .unwrap();

        let err = coordinator.attach(NODE_A, TASK_1).await.unwrap_err();
        match err {
            AssignError::NotFeasible(Rejection::MissingDevices { missing }) => {
                assert_eq!(missing, vec!["gpu1".to_string()]);
            }
            other => panic!("expected MissingDevices, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn attach_missing_node_is_not_found() {
        // Scenario E.
        let (store, coordinator) = setup();
        store
            .insert_task(&task(TASK_1, "telemetry", 1, None, &[]))
            .unwrap();

        let err = coordinator.attach(GHOST, TASK_1).await.unwrap_err();
        assert!(matches!(err, AssignError::NodeNotFound(id) if id == GHOST));
    }

    #[tokio::test]
    async fn attach_missing_task_is_not_found() {
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &[]))
            .unwrap();

        let err = coordinator.attach(NODE_A, GHOST).await.unwrap_err();
        assert!(matches!(err, AssignError::TaskNotFound(id) if id == GHOST));
    }

    #[tokio::test]
    async fn attach_rejects_malformed_ids_before_store_access() {
        let (_store, coordinator) = setup();

        let err = coordinator.attach("not-an-id", TASK_1).await.unwrap_err();
        assert!(matches!(err, AssignError::InvalidId(_)));

        let err = coordinator.attach(NODE_A, "NOPE").await.unwrap_err();
        assert!(matches!(err, AssignError::InvalidId(_)));
    }

    #[tokio::test]
    async fn reattach_is_a_noop() {
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_1, "telemetry", 2, None, &[]))
            .unwrap();

        let first = coordinator.attach(NODE_A, TASK_1).await.unwrap();
        let second = coordinator.attach(NODE_A, TASK_1).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.tasks.len(), 1);
        assert_eq!(second.revision, 1); // No second swap happened.
    }

    #[tokio::test]
    async fn detach_removes_task() {
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_1, "telemetry", 2, None, &[]))
            .unwrap();

        coordinator.attach(NODE_A, TASK_1).await.unwrap();
        let updated = coordinator.detach(NODE_A, TASK_1).await.unwrap();

        assert!(updated.tasks.is_empty());
        assert_eq!(updated.revision, 2);
    }

    #[tokio::test]
    async fn detach_of_absent_task_is_idempotent() {
        // Scenario D: the node is returned unchanged, no error, no write.
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &[]))
            .unwrap();

        let result = coordinator.detach(NODE_A, GHOST).await.unwrap();
        assert!(result.tasks.is_empty());
        assert_eq!(result.revision, 0);
    }

    #[tokio::test]
    async fn detach_missing_node_is_not_found() {
        let (_store, coordinator) = setup();
        let err = coordinator.detach(GHOST, TASK_1).await.unwrap_err();
        assert!(matches!(err, AssignError::NodeNotFound(_)));
    }

    #[tokio::test]
    async fn dry_run_reports_without_mutating() {
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_1, "big", 8, None, &[]))
            .unwrap();

        let verdict = coordinator.dry_run(NODE_A, TASK_1).await.unwrap();
        assert!(!verdict.is_feasible());

        let stored = store.get_node(NODE_A).unwrap().unwrap();
        assert!(stored.tasks.is_empty());
        assert_eq!(stored.revision, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn attach_retries_after_lost_swap() {
        // A competing writer bumps the node's revision after the
        // coordinator would have read it; the bounded loop re-reads and
        // succeeds on the next attempt. Jointly feasible tasks attached
        // concurrently must therefore both land.
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_1, "first", 2, None, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_2, "second", 2, None, &[]))
            .unwrap();

        let c1 = coordinator.clone();
        let c2 = coordinator.clone();
        let a = tokio::spawn(async move { c1.attach(NODE_A, TASK_1).await });
        let b = tokio::spawn(async move { c2.attach(NODE_A, TASK_2).await });

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let stored = store.get_node(NODE_A).unwrap().unwrap();
        assert_eq!(stored.tasks.len(), 2);
        assert_eq!(stored.committed_cpu(), 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn racing_attaches_never_overcommit() {
        // Atomicity under race: 4 free cores, two tasks needing 3 each.
        // Exactly one attach may win; the other must surface a typed
        // failure, and the stored node must respect the CPU invariant.
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_1, "heavy-a", 3, None, &[]))
            .unwrap();
        store
            .insert_task(&task(TASK_2, "heavy-b", 3, None, &[]))
            .unwrap();

        let c1 = coordinator.clone();
        let c2 = coordinator.clone();
        let a = tokio::spawn(async move { c1.attach(NODE_A, TASK_1).await });
        let b = tokio::spawn(async move { c2.attach(NODE_A, TASK_2).await });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one racing attach may win");

        for result in &results {
            if let Err(err) = result {
                assert!(matches!(
                    err,
                    AssignError::NotFeasible(_) | AssignError::Contention { .. }
                ));
            }
        }

        let stored = store.get_node(NODE_A).unwrap().unwrap();
        assert_eq!(stored.tasks.len(), 1);
        assert!(stored.committed_cpu() <= u64::from(stored.cpu_cores));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn single_attempt_coordinator_surfaces_contention_only() {
        // With the retry budget cut to one attempt, a lost swap surfaces
        // as Contention instead of being retried. Racing several jointly
        // feasible attaches, every outcome must be either a success or a
        // Contention, and the stored taskset must match the successes.
        let store = StateStore::open_in_memory().unwrap();
        let coordinator = Coordinator::with_max_attempts(store.clone(), 1);
        store
            .insert_node(&node(NODE_A, "edge-1", 8, CpuArch::X86_64, &[]))
            .unwrap();

        let task_ids = [
            "d1d1d1d1d1d1d1d1d1d1d1d1",
            "d2d2d2d2d2d2d2d2d2d2d2d2",
            "d3d3d3d3d3d3d3d3d3d3d3d3",
            "d4d4d4d4d4d4d4d4d4d4d4d4",
        ];
        for (i, id) in task_ids.iter().copied().enumerate() {
            store
                .insert_task(&task(id, &format!("small-{i}"), 1, None, &[]))
                .unwrap();
        }

        let mut handles = Vec::new();
        for id in task_ids {
            let c = coordinator.clone();
            handles.push(tokio::spawn(async move { c.attach(NODE_A, id).await }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AssignError::Contention { attempts, .. }) => assert_eq!(attempts, 1),
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let stored = store.get_node(NODE_A).unwrap().unwrap();
        assert_eq!(stored.tasks.len(), successes);
        assert_eq!(stored.revision, successes as u64);
    }

    #[tokio::test]
    async fn invariant_holds_after_every_successful_mutation() {
        let (store, coordinator) = setup();
        store
            .insert_node(&node(NODE_A, "edge-1", 4, CpuArch::X86_64, &["gpu0"]))
            .unwrap();
        store
            .insert_task(&task(TASK_1, "a", 2, None, &["gpu0"]))
            .unwrap();
        store
            .insert_task(&task(TASK_2, "b", 2, None, &[]))
            .unwrap();

        coordinator.attach(NODE_A, TASK_1).await.unwrap();
        coordinator.attach(NODE_A, TASK_2).await.unwrap();
        coordinator.detach(NODE_A, TASK_1).await.unwrap();

        let stored = store.get_node(NODE_A).unwrap().unwrap();
        assert!(stored.committed_cpu() <= u64::from(stored.cpu_cores));
        assert_eq!(stored.tasks.len(), 1);
        assert_eq!(stored.tasks[0].task_id, TASK_2);
    }
}
