use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiResult, DomainError};
use crate::model::{Record, Worker};
use crate::AppState;

#[derive(Deserialize)]
pub struct RegisterWorkerRequest {
    id: String,
    name: String,
    entity: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    available_cpu: i32,
    #[serde(default)]
    available_accelerators: i32,
}

/// `POST /clients/register`.
pub async fn register_worker(
    Extension(state): Extension<AppState>,
    Json(body): Json<RegisterWorkerRequest>,
) -> ApiResult<Json<Worker>> {
    if body.id.trim().is_empty() {
        return Err(DomainError::validation("worker id must not be empty").into());
    }
    let worker = Worker::register(
        &state.db_pool,
        &body.id,
        &body.name,
        &body.entity,
        body.description.as_deref(),
        body.available_cpu,
        body.available_accelerators,
    )
    .await?;
    Ok(Json(worker))
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    active_only: bool,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    skip: i64,
}

fn default_limit() -> i64 {
    100
}

pub async fn list_workers(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Worker>>> {
    let workers = Worker::list(&state.db_pool, query.active_only, query.limit, query.skip).await?;
    Ok(Json(workers))
}

pub async fn get_worker(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Worker>> {
    let worker = Worker::find_by_id(&state.db_pool, id.clone())
        .await?
        .ok_or_else(|| DomainError::not_found("worker", id))?;
    Ok(Json(worker))
}

#[derive(Deserialize)]
pub struct UpdateWorkerRequest {
    #[serde(default)]
    available_cpu: Option<i32>,
    #[serde(default)]
    available_accelerators: Option<i32>,
}

pub async fn update_worker(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateWorkerRequest>,
) -> ApiResult<Json<Worker>> {
    let worker = Worker::update_capacity(&state.db_pool, &id, body.available_cpu, body.available_accelerators).await?;
    Ok(Json(worker))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    deleted: bool,
}

pub async fn delete_worker(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    let deleted = Worker::delete(&state.db_pool, id).await?;
    Ok(Json(DeletedResponse { deleted }))
}

#[derive(Deserialize)]
pub struct HeartbeatRequest {
    #[serde(default)]
    available_cpu: Option<i32>,
    #[serde(default)]
    available_accelerators: Option<i32>,
}

pub async fn heartbeat_worker(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(body): Json<HeartbeatRequest>,
) -> ApiResult<Json<Worker>> {
    let worker = Worker::heartbeat(&state.db_pool, &id, body.available_cpu, body.available_accelerators).await?;
    Ok(Json(worker))
}

pub async fn deactivate_worker(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Worker>> {
    let worker = Worker::deactivate(&state.db_pool, &id).await?;
    Ok(Json(worker))
}
