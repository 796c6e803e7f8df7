//! Work dispatch (C3): handing the next ready job in a project to a
//! polling worker under row-level locking, so two workers racing the same
//! project never receive the same job.

use sqlx::PgPool;

use crate::dependency;
use crate::error::DomainResult;
use crate::model::{Job, JobStatus};

#[derive(sqlx::FromRow)]
struct TaskCapacity {
    id: i32,
    required_cpu: i32,
    required_accelerators: i32,
}

impl TaskCapacity {
    fn fits(&self, available_cpu: i32, available_accelerators: i32) -> bool {
        self.required_cpu <= available_cpu && self.required_accelerators <= available_accelerators
    }
}

/// Outcome of a dispatch attempt, mirroring the two shapes a polling
/// worker needs to distinguish: something to run, or nothing ready yet
/// (with a count so the worker can back off when the queue is merely
/// blocked rather than empty).
pub enum DispatchOutcome {
    Dispatched(Job),
    Idle { pending: i64 },
}

/// Selects and claims the next ready job in `project_id`.
///
/// Runs as a single transaction: take the full project snapshot under
/// `FOR UPDATE` on the candidate row only (the snapshot read itself is
/// plain, matching the original scheduler's approach of recomputing
/// readiness from scratch on every poll rather than maintaining a queue),
/// pick the best candidate in memory, re-lock and re-verify that row is
/// still PENDING, then flip it to QUEUED before committing. If a
/// `worker_cpu`/`worker_accelerators` capacity is given, candidates whose
/// task requirements exceed it are skipped.
pub async fn fetch_next(
    pool: &PgPool,
    project_id: i32,
    worker_cpu: Option<i32>,
    worker_accelerators: Option<i32>,
) -> DomainResult<DispatchOutcome> {
    let mut tx = pool.begin().await?;

    let jobs = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs WHERE project_id = $1",
        Job::COLUMNS
    ))
    .bind(project_id)
    .fetch_all(&mut *tx)
    .await?;

    let pending = jobs.iter().filter(|j| j.status == JobStatus::Pending).count() as i64;
    let jobs_by_id: std::collections::HashMap<i32, Job> = jobs.into_iter().map(|j| (j.id, j)).collect();

    let task_ids: Vec<i32> = jobs_by_id.values().map(|j| j.task_id).collect();
    let tasks = sqlx::query_as::<_, TaskCapacity>(
        "SELECT id, required_cpu, required_accelerators FROM tasks WHERE id = ANY($1)",
    )
    .bind(&task_ids)
    .fetch_all(&mut *tx)
    .await?;
    let task_cache: std::collections::HashMap<i32, TaskCapacity> =
        tasks.into_iter().map(|t| (t.id, t)).collect();

    // Negative capacity inputs are normalized to 0 rather than treated as
    // "no limit", so a worker that reports -1 still only matches
    // zero-requirement tasks.
    let worker_cpu = worker_cpu.map(|c| c.max(0));
    let worker_accelerators = worker_accelerators.map(|a| a.max(0));

    let fits = |task_id: i32| -> bool {
        match (worker_cpu, worker_accelerators, task_cache.get(&task_id)) {
            (Some(cpu), Some(acc), Some(task)) => task.fits(cpu, acc),
            _ => true,
        }
    };

    let candidate_id = dependency::ready_jobs(&jobs_by_id, fits).first().map(|j| j.id);

    let Some(candidate_id) = candidate_id else {
        tx.commit().await?;
        return Ok(DispatchOutcome::Idle { pending });
    };

    // Re-lock and re-verify: another transaction may have claimed this
    // row between the snapshot read above and now.
    let locked = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs WHERE id = $1 FOR UPDATE",
        Job::COLUMNS
    ))
    .bind(candidate_id)
    .fetch_one(&mut *tx)
    .await?;

    if locked.status != JobStatus::Pending {
        tx.commit().await?;
        return Ok(DispatchOutcome::Idle { pending });
    }

    let dispatched = sqlx::query_as::<_, Job>(&format!(
        "UPDATE jobs SET status = 'queued', updated_at = NOW() WHERE id = $1 RETURNING {}",
        Job::COLUMNS
    ))
    .bind(candidate_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(DispatchOutcome::Dispatched(dispatched))
}
