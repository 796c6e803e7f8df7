use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use typed_builder::TypedBuilder;

use crate::error::{DomainError, DomainResult};

use super::Record;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Task {
    #[builder(default)]
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    #[builder(default, setter(strip_option))]
    pub command_template: Option<String>,
    #[builder(default)]
    pub required_cpu: i32,
    #[builder(default)]
    pub required_accelerators: i32,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub async fn create(
        pool: &PgPool,
        project_id: i32,
        name: &str,
        command_template: Option<&str>,
        required_cpu: i32,
        required_accelerators: i32,
    ) -> DomainResult<Self> {
        let task = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO tasks (project_id, name, command_template, required_cpu, required_accelerators)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, project_id, name, command_template, required_cpu, required_accelerators, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(name)
        .bind(command_template)
        .bind(required_cpu.max(0))
        .bind(required_accelerators.max(0))
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => DomainError::conflict(format!(
                "task named '{name}' already exists in project {project_id}"
            )),
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                DomainError::not_found("project", project_id)
            }
            other => DomainError::Database(other),
        })?;

        Ok(task)
    }

    pub async fn find_by_name(pool: &PgPool, project_id: i32, name: &str) -> DomainResult<Option<Self>> {
        let task = sqlx::query_as::<_, Self>(
            "SELECT id, project_id, name, command_template, required_cpu, required_accelerators, created_at, updated_at \
             FROM tasks WHERE project_id = $1 AND name = $2",
        )
        .bind(project_id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    pub async fn list(pool: &PgPool, project_id: Option<i32>, limit: i64, skip: i64) -> DomainResult<Vec<Self>> {
        let tasks = match project_id {
            Some(project_id) => {
                sqlx::query_as::<_, Self>(
                    "SELECT id, project_id, name, command_template, required_cpu, required_accelerators, created_at, updated_at \
                     FROM tasks WHERE project_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
                )
                .bind(project_id)
                .bind(limit)
                .bind(skip)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Self>(
                    "SELECT id, project_id, name, command_template, required_cpu, required_accelerators, created_at, updated_at \
                     FROM tasks ORDER BY id LIMIT $1 OFFSET $2",
                )
                .bind(limit)
                .bind(skip)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(tasks)
    }

    pub async fn update(
        pool: &PgPool,
        id: i32,
        name: &str,
        command_template: Option<&str>,
        required_cpu: i32,
        required_accelerators: i32,
    ) -> DomainResult<Self> {
        let task = sqlx::query_as::<_, Self>(
            r#"
            UPDATE tasks
            SET name = $1, command_template = $2, required_cpu = $3, required_accelerators = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING id, project_id, name, command_template, required_cpu, required_accelerators, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(command_template)
        .bind(required_cpu.max(0))
        .bind(required_accelerators.max(0))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        task.ok_or_else(|| DomainError::not_found("task", id))
    }
}

#[async_trait]
impl Record for Task {
    type Id = i32;

    async fn find_by_id(pool: &PgPool, id: i32) -> DomainResult<Option<Self>> {
        let task = sqlx::query_as::<_, Self>(
            "SELECT id, project_id, name, command_template, required_cpu, required_accelerators, created_at, updated_at \
             FROM tasks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    async fn delete(pool: &PgPool, id: i32) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
