//! Dependency-graph logic for jobs within a project (C2).
//!
//! Jobs reference their dependencies by id in the `depends` JSON column
//! (see [`crate::model::Job::dependency_ids`]). Everything here treats that
//! as an in-memory DAG over a snapshot of a project's jobs; callers pull
//! the snapshot with a single query and reuse it across the checks below,
//! the same way the original scheduler reasoned about readiness as a pure
//! function of the job table rather than maintaining a separate graph
//! structure.

use std::collections::{HashMap, HashSet, VecDeque};

use sqlx::PgPool;

use crate::error::DomainResult;
use crate::model::{Job, JobStatus};

/// Loads every job in a project, keyed by id, for graph analysis.
pub async fn load_project_jobs(pool: &PgPool, project_id: i32) -> DomainResult<HashMap<i32, Job>> {
    let jobs = Job::list(pool, Some(project_id), i64::MAX, 0).await?;
    Ok(jobs.into_iter().map(|j| (j.id, j)).collect())
}

/// A job is ready when it is PENDING and every dependency is COMPLETED.
/// A dependency id absent from the table does not count as satisfied —
/// a missing row can't be vouched for, so the job stays blocked on it.
pub fn is_ready(job: &Job, jobs: &HashMap<i32, Job>) -> bool {
    if job.status != JobStatus::Pending {
        return false;
    }

    job.dependency_ids().iter().all(|dep_id| {
        jobs.get(dep_id)
            .map(|dep| dep.status == JobStatus::Completed)
            .unwrap_or(false)
    })
}

/// Detects whether adding an edge `new_job -> depends_on` (recorded as
/// `new_job.depends` containing `depends_on`) would create a cycle,
/// via DFS from `depends_on` looking for a path back to `new_job`.
///
/// `jobs` must already include every job but `new_job` itself when
/// validating a not-yet-inserted job; for validating an update to an
/// existing job's dependencies, include it with its proposed dependency
/// set temporarily layered over `jobs`.
pub fn creates_cycle(new_job_id: i32, proposed_depends: &[i32], jobs: &HashMap<i32, Job>) -> bool {
    let mut stack: Vec<i32> = proposed_depends.to_vec();
    let mut visited: HashSet<i32> = HashSet::new();

    while let Some(current) = stack.pop() {
        if current == new_job_id {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(job) = jobs.get(&current) {
            stack.extend(job.dependency_ids());
        }
    }

    false
}

/// BFS over dependents (C2.4.4): given a job that just transitioned to
/// FAILED, returns the ids of every job transitively blocked by it, in
/// breadth-first order, so the lifecycle layer can mark each BLOCKED in
/// that order and keep `updated_at` monotonically increasing.
pub fn downstream_of(failed_id: i32, jobs: &HashMap<i32, Job>) -> Vec<i32> {
    let mut dependents: HashMap<i32, Vec<i32>> = HashMap::new();
    for job in jobs.values() {
        for dep_id in job.dependency_ids() {
            dependents.entry(dep_id).or_default().push(job.id);
        }
    }

    let mut seen: HashSet<i32> = HashSet::new();
    let mut queue: VecDeque<i32> = VecDeque::from(dependents.get(&failed_id).cloned().unwrap_or_default());
    let mut ordered = Vec::new();

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        ordered.push(id);
        if let Some(children) = dependents.get(&id) {
            queue.extend(children.iter().copied());
        }
    }

    ordered
}

/// The ready set for dispatch (C2.5): PENDING jobs whose dependencies are
/// all COMPLETED, ordered by descending priority then ascending id, and
/// optionally filtered to those that fit within advertised capacity.
pub fn ready_jobs<'a>(
    jobs: &'a HashMap<i32, Job>,
    task_fits: impl Fn(i32) -> bool,
) -> Vec<&'a Job> {
    let mut ready: Vec<&Job> = jobs
        .values()
        .filter(|job| is_ready(job, jobs))
        .filter(|job| task_fits(job.task_id))
        .collect();

    ready.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    ready
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(id: i32, status: JobStatus, priority: i32, depends: &[i32]) -> Job {
        let depends_obj: serde_json::Map<String, serde_json::Value> = depends
            .iter()
            .map(|d| (d.to_string(), serde_json::Value::String(format!("job-{d}"))))
            .collect();

        Job {
            id,
            name: format!("job-{id}"),
            project_id: 1,
            task_id: 1,
            parameters: serde_json::json!({}),
            status,
            priority,
            depends: serde_json::Value::Object(depends_obj),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn ready_requires_all_deps_completed() {
        let mut jobs = HashMap::new();
        jobs.insert(1, job(1, JobStatus::Completed, 0, &[]));
        jobs.insert(2, job(2, JobStatus::Pending, 0, &[1]));
        assert!(is_ready(jobs.get(&2).unwrap(), &jobs));

        jobs.insert(1, job(1, JobStatus::Running, 0, &[]));
        assert!(!is_ready(jobs.get(&2).unwrap(), &jobs));
    }

    #[test]
    fn missing_dependency_blocks_readiness() {
        let mut jobs = HashMap::new();
        jobs.insert(2, job(2, JobStatus::Pending, 0, &[999]));
        assert!(!is_ready(jobs.get(&2).unwrap(), &jobs));
    }

    #[test]
    fn detects_direct_and_transitive_cycles() {
        let mut jobs = HashMap::new();
        jobs.insert(1, job(1, JobStatus::Pending, 0, &[2]));
        jobs.insert(2, job(2, JobStatus::Pending, 0, &[3]));
        jobs.insert(3, job(3, JobStatus::Pending, 0, &[]));

        // 3 -> 1 would close the loop 1 -> 2 -> 3 -> 1
        assert!(creates_cycle(3, &[1], &jobs));
        // 3 -> nothing new is fine
        assert!(!creates_cycle(3, &[], &jobs));
    }

    #[test]
    fn downstream_bfs_order() {
        let mut jobs = HashMap::new();
        jobs.insert(1, job(1, JobStatus::Failed, 0, &[]));
        jobs.insert(2, job(2, JobStatus::Pending, 0, &[1]));
        jobs.insert(3, job(3, JobStatus::Pending, 0, &[1]));
        jobs.insert(4, job(4, JobStatus::Pending, 0, &[2]));

        let mut downstream = downstream_of(1, &jobs);
        downstream.sort();
        assert_eq!(downstream, vec![2, 3, 4]);
    }

    #[test]
    fn ready_jobs_orders_by_priority_then_id() {
        let mut jobs = HashMap::new();
        jobs.insert(1, job(1, JobStatus::Pending, 5, &[]));
        jobs.insert(2, job(2, JobStatus::Pending, 10, &[]));
        jobs.insert(3, job(3, JobStatus::Pending, 10, &[]));

        let ready = ready_jobs(&jobs, |_| true);
        let ids: Vec<i32> = ready.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn ready_jobs_respects_capacity_filter() {
        let mut jobs = HashMap::new();
        jobs.insert(1, job(1, JobStatus::Pending, 0, &[]));
        jobs.get_mut(&1).unwrap().task_id = 42;

        let ready = ready_jobs(&jobs, |task_id| task_id != 42);
        assert!(ready.is_empty());
    }
}
