use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use typed_builder::TypedBuilder;

use crate::error::{DomainError, DomainResult};

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Project {
    #[builder(default)]
    pub id: i32,
    pub name: String,
    pub description: String,
    #[builder(default)]
    pub status: ProjectStatus,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub async fn create(pool: &PgPool, name: &str, description: &str) -> DomainResult<Self> {
        let project = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO projects (name, description, status)
            VALUES ($1, $2, 'active')
            RETURNING id, name, description, status, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DomainError::conflict(format!("project named '{name}' already exists"))
            }
            other => DomainError::Database(other),
        })?;

        Ok(project)
    }

    pub async fn find_by_name(pool: &PgPool, name: &str) -> DomainResult<Option<Self>> {
        let project = sqlx::query_as::<_, Self>(
            "SELECT id, name, description, status, created_at, updated_at FROM projects WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    pub async fn list(pool: &PgPool, status: Option<ProjectStatus>, limit: i64, skip: i64) -> DomainResult<Vec<Self>> {
        let projects = match status {
            Some(status) => {
                sqlx::query_as::<_, Self>(
                    "SELECT id, name, description, status, created_at, updated_at FROM projects \
                     WHERE status = $1 ORDER BY id LIMIT $2 OFFSET $3",
                )
                .bind(status)
                .bind(limit)
                .bind(skip)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Self>(
                    "SELECT id, name, description, status, created_at, updated_at FROM projects \
                     ORDER BY id LIMIT $1 OFFSET $2",
                )
                .bind(limit)
                .bind(skip)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(projects)
    }

    pub async fn update(
        pool: &PgPool,
        id: i32,
        name: &str,
        description: &str,
        status: ProjectStatus,
    ) -> DomainResult<Self> {
        let project = sqlx::query_as::<_, Self>(
            r#"
            UPDATE projects
            SET name = $1, description = $2, status = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING id, name, description, status, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(status)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        project.ok_or_else(|| DomainError::not_found("project", id))
    }

    pub async fn delete_by_name(pool: &PgPool, name: &str) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE name = $1")
            .bind(name)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub fn is_archived(&self) -> bool {
        self.status == ProjectStatus::Archived
    }
}

#[async_trait]
impl Record for Project {
    type Id = i32;

    async fn find_by_id(pool: &PgPool, id: i32) -> DomainResult<Option<Self>> {
        let project = sqlx::query_as::<_, Self>(
            "SELECT id, name, description, status, created_at, updated_at FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    async fn delete(pool: &PgPool, id: i32) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
