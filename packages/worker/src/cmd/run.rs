//! `whatsnext run` — start the worker dispatch loop (C6).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::client::BrokerClient;
use crate::config::WorkerConfig;
use crate::dispatch::DispatchLoop;
use crate::formatter::Formatter;

pub async fn run(config: WorkerConfig, project_name: &str, poll_interval_secs: u64, one_shot: bool) -> Result<()> {
    let client = BrokerClient::new(
        &config.server.host,
        config.server.port,
        config.server.api_key.clone(),
    )?;
    client
        .check_connection()
        .await
        .context("cannot connect to broker, refusing to start")?;

    let project = client
        .get_project_by_name(project_name)
        .await
        .context("failed to resolve project")?;

    let worker_id = Uuid::new_v4().to_string();
    let entity = config.client.entity.clone().unwrap_or_else(|| "default".to_string());
    let name = config.client.name.clone().unwrap_or_else(|| worker_id.clone());

    let worker = client
        .register_worker(&worker_id, &name, &entity, config.client.cpus, config.client.accelerators)
        .await
        .context("failed to register with broker")?;
    tracing::info!(worker_id = %worker.id, "registered with broker");

    let shutdown_requested = Arc::new(AtomicBool::new(false));
    install_signal_handlers(shutdown_requested.clone());

    let formatter = Formatter::from_config(&config.formatter);
    let dispatch = DispatchLoop::new(
        client,
        formatter,
        worker.id,
        project.id,
        config.client.cpus,
        config.client.accelerators,
        Duration::from_secs(poll_interval_secs),
        one_shot,
    );

    dispatch.run(shutdown_requested).await?;
    Ok(())
}

/// Sets `shutdown_requested` on SIGINT/SIGTERM. The dispatch loop only
/// checks the flag between jobs, so an in-flight job always finishes.
fn install_signal_handlers(shutdown_requested: Arc<AtomicBool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
            let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = interrupt.recv() => {},
                _ = terminate.recv() => {},
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        tracing::info!("shutdown requested, draining current job");
        shutdown_requested.store(true, Ordering::Relaxed);
    });
}
