use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiResult, DomainError};
use crate::model::{Project, Record, Task};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    project_id: Option<i32>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    skip: i64,
}

fn default_limit() -> i64 {
    100
}

pub async fn list_tasks(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list(&state.db_pool, query.project_id, query.limit, query.skip).await?;
    Ok(Json(tasks))
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    project_id: i32,
    name: String,
    #[serde(default)]
    command_template: Option<String>,
    #[serde(default)]
    required_cpu: i32,
    #[serde(default)]
    required_accelerators: i32,
}

pub async fn create_task(
    Extension(state): Extension<AppState>,
    Json(body): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    if body.name.trim().is_empty() {
        return Err(DomainError::validation("task name must not be empty").into());
    }

    let project = Project::find_by_id(&state.db_pool, body.project_id)
        .await?
        .ok_or_else(|| DomainError::not_found("project", body.project_id))?;
    if project.is_archived() {
        return Err(DomainError::validation("cannot add tasks to an archived project").into());
    }

    let task = Task::create(
        &state.db_pool,
        body.project_id,
        &body.name,
        body.command_template.as_deref(),
        body.required_cpu,
        body.required_accelerators,
    )
    .await?;
    Ok(Json(task))
}

pub async fn get_task(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| DomainError::not_found("task", id))?;
    Ok(Json(task))
}

#[derive(Deserialize)]
pub struct NameQuery {
    project_id: i32,
}

pub async fn get_task_by_name(
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
    Query(query): Query<NameQuery>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_name(&state.db_pool, query.project_id, &name)
        .await?
        .ok_or_else(|| DomainError::not_found("task", &name))?;
    Ok(Json(task))
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    name: String,
    #[serde(default)]
    command_template: Option<String>,
    #[serde(default)]
    required_cpu: i32,
    #[serde(default)]
    required_accelerators: i32,
}

pub async fn update_task(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = Task::update(
        &state.db_pool,
        id,
        &body.name,
        body.command_template.as_deref(),
        body.required_cpu,
        body.required_accelerators,
    )
    .await?;
    Ok(Json(task))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    deleted: bool,
}

pub async fn delete_task(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<DeletedResponse>> {
    let deleted = Task::delete(&state.db_pool, id).await?;
    Ok(Json(DeletedResponse { deleted }))
}
