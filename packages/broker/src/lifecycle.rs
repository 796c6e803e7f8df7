//! Job status transitions and failure propagation (C4).

use sqlx::{PgPool, Postgres, Transaction};

use crate::dependency;
use crate::error::{DomainError, DomainResult};
use crate::model::{Job, JobStatus};

/// Legal transitions, per the lifecycle table. A job may always be
/// re-set to its current status (idempotent no-op) regardless of this
/// table.
fn is_legal(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;

    if from == to {
        return true;
    }

    matches!(
        (from, to),
        (Pending, Queued)
            | (Pending, Blocked)
            | (Queued, Running)
            | (Queued, Failed)
            | (Running, Completed)
            | (Running, Failed)
            | (Blocked, Pending) // explicit retry only
            | (Blocked, Failed)
            | (Failed, Pending) // explicit operator retry
    )
}

/// Transitions a job's status, enforcing the legality table and, when the
/// new status is FAILED, propagating BLOCKED to every transitive
/// dependent in the same transaction (C2.4.4 / C4.3).
///
/// Returns the updated job and the ids of jobs newly marked BLOCKED as a
/// side effect.
pub async fn transition(pool: &PgPool, job_id: i32, to: JobStatus) -> DomainResult<(Job, Vec<i32>)> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs WHERE id = $1 FOR UPDATE",
        Job::COLUMNS
    ))
    .bind(job_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| DomainError::not_found("job", job_id))?;

    if !is_legal(current.status, to) {
        return Err(DomainError::conflict(format!(
            "cannot transition job {job_id} from {:?} to {:?}",
            current.status, to
        )));
    }

    let updated = set_status(&mut tx, job_id, to).await?;

    let mut blocked = Vec::new();
    if to == JobStatus::Failed {
        blocked = propagate_failure(&mut tx, updated.project_id, job_id).await?;
    }

    tx.commit().await?;

    Ok((updated, blocked))
}

async fn set_status(tx: &mut Transaction<'_, Postgres>, job_id: i32, to: JobStatus) -> DomainResult<Job> {
    let job = sqlx::query_as::<_, Job>(&format!(
        "UPDATE jobs SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
        Job::COLUMNS
    ))
    .bind(to)
    .bind(job_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(job)
}

/// Marks every transitive dependent of `failed_id` as BLOCKED, skipping
/// jobs already in a terminal state. Runs on a snapshot of the project
/// taken inside the same transaction as the triggering status write, so
/// it sees a consistent view of the dependency graph.
async fn propagate_failure(
    tx: &mut Transaction<'_, Postgres>,
    project_id: i32,
    failed_id: i32,
) -> DomainResult<Vec<i32>> {
    let jobs = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs WHERE project_id = $1",
        Job::COLUMNS
    ))
    .bind(project_id)
    .fetch_all(&mut **tx)
    .await?;

    let jobs_by_id = jobs.into_iter().map(|j| (j.id, j)).collect();
    let downstream = dependency::downstream_of(failed_id, &jobs_by_id);

    let mut newly_blocked = Vec::new();
    for id in downstream {
        let Some(job) = jobs_by_id.get(&id) else { continue };
        if job.status.is_terminal() || job.status == JobStatus::Blocked {
            continue;
        }

        sqlx::query("UPDATE jobs SET status = 'blocked', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        newly_blocked.push(id);
    }

    Ok(newly_blocked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_status_is_always_legal() {
        assert!(is_legal(JobStatus::Running, JobStatus::Running));
    }

    #[test]
    fn forward_transitions_allowed() {
        assert!(is_legal(JobStatus::Pending, JobStatus::Queued));
        assert!(is_legal(JobStatus::Queued, JobStatus::Running));
        assert!(is_legal(JobStatus::Running, JobStatus::Completed));
        assert!(is_legal(JobStatus::Running, JobStatus::Failed));
    }

    #[test]
    fn blocked_only_leaves_via_explicit_retry() {
        assert!(is_legal(JobStatus::Blocked, JobStatus::Pending));
        assert!(!is_legal(JobStatus::Blocked, JobStatus::Queued));
        assert!(!is_legal(JobStatus::Blocked, JobStatus::Running));
    }

    #[test]
    fn completed_is_a_sink() {
        assert!(!is_legal(JobStatus::Completed, JobStatus::Pending));
        assert!(!is_legal(JobStatus::Completed, JobStatus::Running));
    }

    #[test]
    fn failed_leaves_only_via_explicit_retry() {
        assert!(is_legal(JobStatus::Failed, JobStatus::Pending));
        assert!(!is_legal(JobStatus::Failed, JobStatus::Running));
        assert!(!is_legal(JobStatus::Failed, JobStatus::Queued));
    }

    #[test]
    fn failure_reachable_from_queued_and_blocked() {
        assert!(is_legal(JobStatus::Queued, JobStatus::Failed));
        assert!(is_legal(JobStatus::Blocked, JobStatus::Failed));
    }

    #[test]
    fn cannot_skip_queued() {
        assert!(!is_legal(JobStatus::Pending, JobStatus::Running));
    }
}
