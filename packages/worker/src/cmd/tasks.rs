//! `whatsnext task` subcommands.

use anyhow::Result;

use crate::client::BrokerClient;

pub async fn create(client: &BrokerClient, project_name: &str, task_name: &str) -> Result<()> {
    let project = client.get_project_by_name(project_name).await?;
    let task = client.create_task(project.id, task_name).await?;
    println!("created task '{}' (id {}) in project '{}'", task.name, task.id, project.name);
    Ok(())
}
