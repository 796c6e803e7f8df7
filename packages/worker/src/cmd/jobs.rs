//! `whatsnext job` subcommands.

use anyhow::Result;

use crate::client::BrokerClient;

pub async fn submit(
    client: &BrokerClient,
    project_name: &str,
    job_name: &str,
    task_name: &str,
    parameters: serde_json::Value,
    priority: i32,
) -> Result<()> {
    let project = client.get_project_by_name(project_name).await?;
    let job = client
        .append_queue(project.id, job_name, task_name, parameters, priority)
        .await?;
    println!("queued job '{}' (id {}) in project '{}'", job.name, job.id, project.name);
    Ok(())
}

pub async fn list(client: &BrokerClient, project_name: &str) -> Result<()> {
    let project = client.get_project_by_name(project_name).await?;
    let jobs = client.get_queue(project.id).await?;
    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }
    for job in jobs {
        println!("{:>4}  {:<24} {:<10?} priority={}", job.id, job.name, job.status, job.priority);
    }
    Ok(())
}
