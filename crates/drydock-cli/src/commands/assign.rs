//! `drydock attach` / `detach` / `plan` commands.

use drydock_admission::Verdict;
use drydock_assign::Coordinator;

pub async fn attach(
    coordinator: &Coordinator,
    node_id: &str,
    task_id: &str,
) -> anyhow::Result<()> {
    let node = coordinator.attach(node_id, task_id).await?;
    println!(
        "attached {task_id} to {node_id}: {} task(s), {}/{} cores committed",
        node.tasks.len(),
        node.committed_cpu(),
        node.cpu_cores,
    );
    Ok(())
}

pub async fn detach(
    coordinator: &Coordinator,
    node_id: &str,
    task_id: &str,
) -> anyhow::Result<()> {
    let node = coordinator.detach(node_id, task_id).await?;
    println!(
        "detached {task_id} from {node_id}: {} task(s), {}/{} cores committed",
        node.tasks.len(),
        node.committed_cpu(),
        node.cpu_cores,
    );
    Ok(())
}

pub async fn plan(
    coordinator: &Coordinator,
    node_id: &str,
    task_id: &str,
) -> anyhow::Result<()> {
    match coordinator.dry_run(node_id, task_id).await? {
        Verdict::Feasible => println!("feasible"),
        Verdict::Infeasible(rejection) => println!("infeasible: {rejection}"),
    }
    Ok(())
}
