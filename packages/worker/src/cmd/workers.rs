//! `whatsnext worker` inspection subcommands.

use anyhow::Result;

use crate::client::BrokerClient;

pub async fn status(client: &BrokerClient, worker_id: &str) -> Result<()> {
    let worker = client.get_worker(worker_id).await?;
    println!(
        "{} ({}): active={} cpu={} accelerators={}",
        worker.name, worker.id, worker.is_active, worker.available_cpu, worker.available_accelerators
    );
    Ok(())
}
