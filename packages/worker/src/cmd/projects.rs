//! `whatsnext project` subcommands.

use anyhow::Result;

use crate::client::BrokerClient;

pub async fn list(client: &BrokerClient, status: &str, limit: i64, skip: i64) -> Result<()> {
    let projects = client.list_projects(status, limit, skip).await?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    for project in projects {
        println!("{:>4}  {:<24} {:<10} {}", project.id, project.name, project.status, project.description);
    }
    Ok(())
}

pub async fn create(client: &BrokerClient, name: &str, description: &str) -> Result<()> {
    let project = client.create_project(name, description).await?;
    println!("created project '{}' (id {})", project.name, project.id);
    Ok(())
}

pub async fn delete(client: &BrokerClient, name: &str) -> Result<()> {
    let deleted = client.delete_project_by_name(name).await?;
    if deleted {
        println!("deleted project '{name}'");
    } else {
        println!("project '{name}' not found");
    }
    Ok(())
}
