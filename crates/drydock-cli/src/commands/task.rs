//! `drydock task` subcommands.

use anyhow::bail;
use drydock_assign::mint_id;
use drydock_state::{CpuArch, StateStore, TaskRecord};

use super::epoch_secs;

pub fn add(
    store: &StateStore,
    name: &str,
    runtime: &str,
    cpu_cores: u32,
    cpu_arch: Option<&str>,
    devices: Vec<String>,
) -> anyhow::Result<()> {
    let cpu_arch: Option<CpuArch> = cpu_arch
        .map(|s| s.parse().map_err(anyhow::Error::msg))
        .transpose()?;

    let now = epoch_secs();
    let task = TaskRecord {
        id: mint_id(name),
        name: name.to_string(),
        runtime: runtime.to_string(),
        cpu_cores,
        cpu_arch,
        devices: devices.into_iter().collect(),
        created_at: now,
        updated_at: now,
    };
    store.insert_task(&task)?;
    println!("{}", task.id);
    Ok(())
}

pub fn list(store: &StateStore) -> anyhow::Result<()> {
    for task in store.list_tasks()? {
        let arch = task
            .cpu_arch
            .map(|a| a.to_string())
            .unwrap_or_else(|| "any".to_string());
        println!(
            "{}  {}  {} cores  {}  {}",
            task.id, task.name, task.cpu_cores, arch, task.runtime,
        );
    }
    Ok(())
}

pub fn get(store: &StateStore, id: &str) -> anyhow::Result<()> {
    let Some(task) = store.get_task(id)? else {
        bail!("task not found: {id}");
    };

    println!("id:       {}", task.id);
    println!("name:     {}", task.name);
    println!("runtime:  {}", task.runtime);
    println!("cpu:      {} cores", task.cpu_cores);
    println!(
        "arch:     {}",
        task.cpu_arch
            .map(|a| a.to_string())
            .unwrap_or_else(|| "any".to_string())
    );
    println!(
        "devices:  {}",
        task.devices.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    Ok(())
}

pub fn delete(store: &StateStore, id: &str) -> anyhow::Result<()> {
    match store.delete_task(id)? {
        Some(task) => {
            println!("deleted task {} ({})", task.id, task.name);
            Ok(())
        }
        None => bail!("task not found: {id}"),
    }
}
