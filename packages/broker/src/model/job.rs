use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::{DomainError, DomainResult};

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Blocked,
}

impl JobStatus {
    /// Statuses from which no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A job's dependency set: dependent job id -> cached job name.
///
/// Stored as a JSON object keyed by the stringified job id, matching the
/// shape the original service persisted it in (kept for readability, not
/// used as a join key).
pub type Dependencies = BTreeMap<String, String>;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: i32,
    pub name: String,
    pub project_id: i32,
    pub task_id: i32,
    pub parameters: serde_json::Value,
    pub status: JobStatus,
    pub priority: i32,
    #[sqlx(json)]
    pub depends: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const JOB_COLUMNS: &str =
    "id, name, project_id, task_id, parameters, status, priority, depends, created_at, updated_at";

impl Job {
    pub fn dependency_ids(&self) -> Vec<i32> {
        self.depends
            .as_object()
            .map(|map| map.keys().filter_map(|k| k.parse::<i32>().ok()).collect())
            .unwrap_or_default()
    }

    pub async fn create(
        pool: &PgPool,
        name: &str,
        project_id: i32,
        task_id: i32,
        parameters: serde_json::Value,
        priority: i32,
        depends: serde_json::Value,
    ) -> DomainResult<Self> {
        let job = sqlx::query_as::<_, Self>(&format!(
            r#"
            INSERT INTO jobs (name, project_id, task_id, parameters, status, priority, depends)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(project_id)
        .bind(task_id)
        .bind(parameters)
        .bind(priority)
        .bind(depends)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                DomainError::validation(format!(
                    "project {project_id} or task {task_id} does not exist"
                ))
            }
            other => DomainError::Database(other),
        })?;

        Ok(job)
    }

    pub async fn list(pool: &PgPool, project_id: Option<i32>, limit: i64, skip: i64) -> DomainResult<Vec<Self>> {
        let jobs = match project_id {
            Some(project_id) => {
                sqlx::query_as::<_, Self>(&format!(
                    "SELECT {JOB_COLUMNS} FROM jobs WHERE project_id = $1 ORDER BY id LIMIT $2 OFFSET $3"
                ))
                .bind(project_id)
                .bind(limit)
                .bind(skip)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Self>(&format!(
                    "SELECT {JOB_COLUMNS} FROM jobs ORDER BY id LIMIT $1 OFFSET $2"
                ))
                .bind(limit)
                .bind(skip)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(jobs)
    }

    /// Full-record update (used by `PUT /jobs/{id}`). Status changes made
    /// through this path still go through the legality check in
    /// `lifecycle::transition` when the status actually differs. `depends`
    /// is written unconditionally (the caller passes the job's existing
    /// map back unchanged when the request didn't touch dependencies), so
    /// the name/parameters/priority/depends write is one atomic statement.
    pub async fn update_fields(
        pool: &PgPool,
        id: i32,
        name: &str,
        parameters: serde_json::Value,
        priority: i32,
        depends: serde_json::Value,
    ) -> DomainResult<Self> {
        let job = sqlx::query_as::<_, Self>(&format!(
            r#"
            UPDATE jobs
            SET name = $1, parameters = $2, priority = $3, depends = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(parameters)
        .bind(priority)
        .bind(depends)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        job.ok_or_else(|| DomainError::not_found("job", id))
    }

    pub async fn delete_pending_for_project(pool: &PgPool, project_id: i32) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM jobs WHERE project_id = $1 AND status = 'pending'")
            .bind(project_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_in_project(pool: &PgPool, project_id: i32, job_id: i32) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND project_id = $2")
            .bind(job_id)
            .bind(project_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_pending(pool: &PgPool, project_id: i32) -> DomainResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE project_id = $1 AND status = 'pending'",
        )
        .bind(project_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

impl Job {
    pub(crate) const COLUMNS: &'static str = JOB_COLUMNS;
}

#[async_trait]
impl Record for Job {
    type Id = i32;

    async fn find_by_id(pool: &PgPool, id: i32) -> DomainResult<Option<Self>> {
        let job = sqlx::query_as::<_, Self>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(job)
    }

    async fn delete(pool: &PgPool, id: i32) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Blocked.is_terminal());
    }

    #[test]
    fn dependency_ids_parses_keys() {
        let job = Job {
            id: 1,
            name: "x".into(),
            project_id: 1,
            task_id: 1,
            parameters: serde_json::json!({}),
            status: JobStatus::Pending,
            priority: 0,
            depends: serde_json::json!({"2": "upstream", "3": "other"}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut ids = job.dependency_ids();
        ids.sort();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn dependency_ids_empty_when_absent() {
        let job = Job {
            id: 1,
            name: "x".into(),
            project_id: 1,
            task_id: 1,
            parameters: serde_json::json!({}),
            status: JobStatus::Pending,
            priority: 0,
            depends: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(job.dependency_ids().is_empty());
    }
}
