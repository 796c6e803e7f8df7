//! Worker-side dispatch loop (C6): fetch -> run -> report -> heartbeat.
//!
//! Single-threaded and cooperative — this worker process owns one
//! capacity declaration and runs jobs on it serially. Multiple worker
//! processes run independently and never coordinate directly; all
//! coordination happens through the broker's dispatch selector.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::client::BrokerClient;
use crate::error::WorkerResult;
use crate::formatter::Formatter;
use crate::model::JobStatus;

pub struct DispatchLoop {
    client: BrokerClient,
    formatter: Formatter,
    worker_id: String,
    project_id: i32,
    cpus: i32,
    accelerators: i32,
    poll_interval: Duration,
    one_shot: bool,
}

impl DispatchLoop {
    pub fn new(
        client: BrokerClient,
        formatter: Formatter,
        worker_id: String,
        project_id: i32,
        cpus: i32,
        accelerators: i32,
        poll_interval: Duration,
        one_shot: bool,
    ) -> Self {
        Self {
            client,
            formatter,
            worker_id,
            project_id,
            cpus,
            accelerators,
            poll_interval,
            one_shot,
        }
    }

    /// Runs until `shutdown_requested` flips, or immediately after the
    /// first empty fetch when `one_shot` is set. The flag is only
    /// consulted between jobs: an in-flight job always runs to
    /// completion.
    pub async fn run(&self, shutdown_requested: Arc<AtomicBool>) -> WorkerResult<()> {
        loop {
            if shutdown_requested.load(Ordering::Relaxed) {
                break;
            }

            match self.client.fetch_job(self.project_id, self.cpus, self.accelerators).await {
                Ok(response) => match response.job {
                    Some(job) => {
                        tracing::info!(job_id = job.id, job_name = %job.name, "dispatched");
                        self.run_one(job.id).await;
                    }
                    None if self.one_shot => {
                        tracing::info!(num_pending = response.num_pending, "queue empty, exiting (one-shot)");
                        break;
                    }
                    None => {
                        tracing::debug!(num_pending = response.num_pending, "no ready job, sleeping");
                        tokio::time::sleep(self.poll_interval).await;
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "fetch failed, backing off");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }

            if let Err(e) = self.client.heartbeat(&self.worker_id).await {
                tracing::warn!(error = %e, "heartbeat failed");
            }
        }

        self.client.deactivate(&self.worker_id).await?;
        Ok(())
    }

    async fn run_one(&self, job_id: i32) {
        if let Err(e) = self.client.set_job_status(job_id, JobStatus::Running).await {
            tracing::error!(job_id, error = %e, "failed to mark job running");
            return;
        }

        let job = match self.client.get_job(job_id).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(job_id, error = %e, "failed to reload job before execution");
                let _ = self.client.set_job_status(job_id, JobStatus::Failed).await;
                return;
            }
        };

        let task = match self.client.get_task(job.task_id).await {
            Ok(task) => task,
            Err(e) => {
                tracing::error!(job_id, error = %e, "failed to load task for execution");
                let _ = self.client.set_job_status(job_id, JobStatus::Failed).await;
                return;
            }
        };

        let argv = match self.formatter.format(&task.name, &job.parameters) {
            Ok(argv) => argv,
            Err(e) => {
                tracing::error!(job_id, error = %e, "command formatting failed");
                let _ = self.client.set_job_status(job_id, JobStatus::Failed).await;
                return;
            }
        };

        let outcome = self.formatter.execute(&argv).await;
        let final_status = match outcome {
            Ok(output) if output.exit_code == 0 => {
                tracing::info!(job_id, "job completed");
                JobStatus::Completed
            }
            Ok(output) => {
                tracing::warn!(job_id, exit_code = output.exit_code, stderr = %output.stderr, "job exited non-zero");
                JobStatus::Failed
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "job execution raised");
                JobStatus::Failed
            }
        };

        if let Err(e) = self.client.set_job_status(job_id, final_status).await {
            tracing::error!(job_id, error = %e, "failed to report final status");
        }
    }
}
