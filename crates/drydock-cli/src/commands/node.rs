//! `drydock node` subcommands.

use anyhow::bail;
use drydock_assign::mint_id;
use drydock_state::{CpuArch, NodeRecord, StateStore};

use super::epoch_secs;

pub fn add(
    store: &StateStore,
    name: &str,
    address: &str,
    cpu_cores: u32,
    cpu_arch: &str,
    devices: Vec<String>,
) -> anyhow::Result<()> {
    if cpu_cores == 0 {
        bail!("--cpu-cores must be positive");
    }
    let cpu_arch: CpuArch = cpu_arch.parse().map_err(anyhow::Error::msg)?;

    let now = epoch_secs();
    let node = NodeRecord {
        id: mint_id(name),
        name: name.to_string(),
        address: address.to_string(),
        cpu_cores,
        cpu_arch,
        devices: devices.into_iter().collect(),
        tasks: Vec::new(),
        revision: 0,
        created_at: now,
        updated_at: now,
    };
    store.insert_node(&node)?;
    println!("{}", node.id);
    Ok(())
}

pub fn list(store: &StateStore) -> anyhow::Result<()> {
    for node in store.list_nodes()? {
        println!(
            "{}  {}  {}  {} cores  {}  {} task(s)",
            node.id,
            node.name,
            node.address,
            node.cpu_cores,
            node.cpu_arch,
            node.tasks.len(),
        );
    }
    Ok(())
}

pub fn get(store: &StateStore, id: &str) -> anyhow::Result<()> {
    let Some(node) = store.get_node(id)? else {
        bail!("node not found: {id}");
    };

    println!("id:       {}", node.id);
    println!("name:     {}", node.name);
    println!("address:  {}", node.address);
    println!("cpu:      {} cores ({})", node.cpu_cores, node.cpu_arch);
    println!(
        "devices:  {}",
        node.devices.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    println!(
        "tasks:    {} ({} cores committed)",
        node.tasks.len(),
        node.committed_cpu()
    );
    for task in &node.tasks {
        println!("  {}  {}  {} cores", task.task_id, task.name, task.cpu_cores);
    }
    Ok(())
}

pub fn delete(store: &StateStore, id: &str) -> anyhow::Result<()> {
    match store.delete_node(id)? {
        Some(node) => {
            println!("deleted node {} ({})", node.id, node.name);
            Ok(())
        }
        None => bail!("node not found: {id}"),
    }
}
