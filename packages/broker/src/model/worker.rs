use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use typed_builder::TypedBuilder;

use crate::error::{DomainError, DomainResult};

use super::Record;

/// A registered worker process (C5).
///
/// `id` is caller-supplied (the worker generates its own opaque identity on
/// startup, per the original connector's registration flow) rather than a
/// database sequence, so registration is an upsert keyed on `id`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub entity: String,
    #[builder(default, setter(strip_option))]
    pub description: Option<String>,
    #[builder(default)]
    pub available_cpu: i32,
    #[builder(default)]
    pub available_accelerators: i32,
    #[builder(default = true)]
    pub is_active: bool,
    #[builder(default = Utc::now())]
    pub last_heartbeat: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

const WORKER_COLUMNS: &str =
    "id, name, entity, description, available_cpu, available_accelerators, is_active, last_heartbeat, created_at";

impl Worker {
    /// Registers a worker, or re-registers one that restarted under the
    /// same id, resetting its capacity and marking it active again.
    pub async fn register(
        pool: &PgPool,
        id: &str,
        name: &str,
        entity: &str,
        description: Option<&str>,
        available_cpu: i32,
        available_accelerators: i32,
    ) -> DomainResult<Self> {
        let worker = sqlx::query_as::<_, Self>(&format!(
            r#"
            INSERT INTO workers (id, name, entity, description, available_cpu, available_accelerators, is_active, last_heartbeat)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW())
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                entity = EXCLUDED.entity,
                description = EXCLUDED.description,
                available_cpu = EXCLUDED.available_cpu,
                available_accelerators = EXCLUDED.available_accelerators,
                is_active = TRUE,
                last_heartbeat = NOW()
            RETURNING {WORKER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(entity)
        .bind(description)
        .bind(available_cpu.max(0))
        .bind(available_accelerators.max(0))
        .fetch_one(pool)
        .await?;

        Ok(worker)
    }

    pub async fn list(pool: &PgPool, active_only: bool, limit: i64, skip: i64) -> DomainResult<Vec<Self>> {
        let workers = if active_only {
            sqlx::query_as::<_, Self>(&format!(
                "SELECT {WORKER_COLUMNS} FROM workers WHERE is_active = TRUE ORDER BY id LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(skip)
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as::<_, Self>(&format!(
                "SELECT {WORKER_COLUMNS} FROM workers ORDER BY id LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(skip)
            .fetch_all(pool)
            .await?
        };

        Ok(workers)
    }

    pub async fn heartbeat(
        pool: &PgPool,
        id: &str,
        available_cpu: Option<i32>,
        available_accelerators: Option<i32>,
    ) -> DomainResult<Self> {
        let worker = sqlx::query_as::<_, Self>(&format!(
            r#"
            UPDATE workers
            SET last_heartbeat = NOW(),
                is_active = TRUE,
                available_cpu = COALESCE($2, available_cpu),
                available_accelerators = COALESCE($3, available_accelerators)
            WHERE id = $1
            RETURNING {WORKER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(available_cpu)
        .bind(available_accelerators)
        .fetch_optional(pool)
        .await?;

        worker.ok_or_else(|| DomainError::not_found("worker", id))
    }

    pub async fn deactivate(pool: &PgPool, id: &str) -> DomainResult<Self> {
        let worker = sqlx::query_as::<_, Self>(&format!(
            "UPDATE workers SET is_active = FALSE WHERE id = $1 RETURNING {WORKER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        worker.ok_or_else(|| DomainError::not_found("worker", id))
    }

    /// Partial capacity update: a `None` field leaves the stored value
    /// unchanged. When both are `None` there is nothing to write, so this
    /// just reloads the current record instead of issuing an `UPDATE`.
    pub async fn update_capacity(
        pool: &PgPool,
        id: &str,
        available_cpu: Option<i32>,
        available_accelerators: Option<i32>,
    ) -> DomainResult<Self> {
        if available_cpu.is_none() && available_accelerators.is_none() {
            return <Self as Record>::find_by_id(pool, id.to_string())
                .await?
                .ok_or_else(|| DomainError::not_found("worker", id));
        }

        let worker = sqlx::query_as::<_, Self>(&format!(
            r#"
            UPDATE workers
            SET available_cpu = COALESCE($2, available_cpu),
                available_accelerators = COALESCE($3, available_accelerators)
            WHERE id = $1
            RETURNING {WORKER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(available_cpu.map(|v| v.max(0)))
        .bind(available_accelerators.map(|v| v.max(0)))
        .fetch_optional(pool)
        .await?;

        worker.ok_or_else(|| DomainError::not_found("worker", id))
    }

    /// Workers are considered stale (C5.3) once their last heartbeat is
    /// older than `stale_after`; callers decide what to do with the list
    /// (the dispatch loop excludes stale workers' advertised capacity from
    /// nothing, since capacity lives in the request, not a reservation —
    /// staleness only affects the worker registry view).
    pub async fn list_stale(pool: &PgPool, stale_after_seconds: i64) -> DomainResult<Vec<Self>> {
        let workers = sqlx::query_as::<_, Self>(&format!(
            "SELECT {WORKER_COLUMNS} FROM workers \
             WHERE is_active = TRUE AND last_heartbeat < NOW() - make_interval(secs => $1)"
        ))
        .bind(stale_after_seconds as f64)
        .fetch_all(pool)
        .await?;

        Ok(workers)
    }
}

#[async_trait]
impl Record for Worker {
    type Id = String;

    async fn find_by_id(pool: &PgPool, id: String) -> DomainResult<Option<Self>> {
        let worker = sqlx::query_as::<_, Self>(&format!("SELECT {WORKER_COLUMNS} FROM workers WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(worker)
    }

    async fn delete(pool: &PgPool, id: String) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM workers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
