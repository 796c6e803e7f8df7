use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::dependency;
use crate::dispatch::{self, DispatchOutcome};
use crate::error::{ApiResult, DomainError};
use crate::model::{Job, Project, ProjectStatus, Record};
use crate::server::routes::jobs::build_depends_map;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<ProjectStatus>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    skip: i64,
}

fn default_limit() -> i64 {
    100
}

pub async fn list_projects(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = Project::list(&state.db_pool, query.status, query.limit, query.skip).await?;
    Ok(Json(projects))
}

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    name: String,
    #[serde(default)]
    description: String,
}

pub async fn create_project(
    Extension(state): Extension<AppState>,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<Json<Project>> {
    if body.name.trim().is_empty() {
        return Err(DomainError::validation("project name must not be empty").into());
    }
    let project = Project::create(&state.db_pool, &body.name, &body.description).await?;
    Ok(Json(project))
}

pub async fn get_project(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Project>> {
    let project = Project::find_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| DomainError::not_found("project", id))?;
    Ok(Json(project))
}

pub async fn get_project_by_name(
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Project>> {
    let project = Project::find_by_name(&state.db_pool, &name)
        .await?
        .ok_or_else(|| DomainError::not_found("project", &name))?;
    Ok(Json(project))
}

#[derive(Deserialize)]
pub struct UpdateProjectRequest {
    name: String,
    description: String,
    #[serde(default)]
    status: ProjectStatus,
}

pub async fn update_project(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    let project = Project::update(&state.db_pool, id, &body.name, &body.description, body.status).await?;
    Ok(Json(project))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    deleted: bool,
}

pub async fn delete_project(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<DeletedResponse>> {
    let deleted = Project::delete(&state.db_pool, id).await?;
    Ok(Json(DeletedResponse { deleted }))
}

pub async fn delete_project_by_name(
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    let deleted = Project::delete_by_name(&state.db_pool, &name).await?;
    Ok(Json(DeletedResponse { deleted }))
}

#[derive(Deserialize)]
pub struct FetchJobQuery {
    available_cpu: Option<i32>,
    available_accelerators: Option<i32>,
}

#[derive(Serialize)]
pub struct FetchJobResponse {
    job: Option<Job>,
    num_pending: i64,
}

/// `GET /projects/{id}/fetch_job` — dispatch (C3).
pub async fn fetch_job(
    Extension(state): Extension<AppState>,
    Path(project_id): Path<i32>,
    Query(query): Query<FetchJobQuery>,
) -> ApiResult<Json<FetchJobResponse>> {
    Project::find_by_id(&state.db_pool, project_id)
        .await?
        .ok_or_else(|| DomainError::not_found("project", project_id))?;

    let outcome = dispatch::fetch_next(
        &state.db_pool,
        project_id,
        query.available_cpu,
        query.available_accelerators,
    )
    .await?;

    let response = match outcome {
        DispatchOutcome::Dispatched(job) => FetchJobResponse {
            num_pending: 0,
            job: Some(job),
        },
        DispatchOutcome::Idle { pending } => FetchJobResponse {
            job: None,
            num_pending: pending,
        },
    };

    Ok(Json(response))
}

#[derive(Serialize)]
pub struct QueueClearedResponse {
    deleted: u64,
}

/// `DELETE /projects/{id}/queue` — drop every PENDING job.
pub async fn clear_queue(
    Extension(state): Extension<AppState>,
    Path(project_id): Path<i32>,
) -> ApiResult<Json<QueueClearedResponse>> {
    let deleted = Job::delete_pending_for_project(&state.db_pool, project_id).await?;
    Ok(Json(QueueClearedResponse { deleted }))
}

#[derive(Deserialize)]
pub struct BatchJobRequest {
    name: String,
    task_id: i32,
    #[serde(default = "serde_json::Value::default")]
    parameters: serde_json::Value,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    depends_on: Vec<i32>,
}

#[derive(Serialize)]
pub struct BatchInsertResponse {
    created: usize,
    job_ids: Vec<i32>,
}

/// `POST /projects/{id}/jobs/batch` — atomic batch insert (C1.4.2.3 cycle
/// checks apply to each job against the project's existing graph, plus
/// the rest of the batch inserted so far).
pub async fn batch_insert_jobs(
    Extension(state): Extension<AppState>,
    Path(project_id): Path<i32>,
    Json(body): Json<Vec<BatchJobRequest>>,
) -> ApiResult<Json<BatchInsertResponse>> {
    let project = Project::find_by_id(&state.db_pool, project_id)
        .await?
        .ok_or_else(|| DomainError::not_found("project", project_id))?;
    if project.is_archived() {
        return Err(DomainError::validation("cannot add jobs to an archived project").into());
    }

    let mut jobs = dependency::load_project_jobs(&state.db_pool, project_id).await?;

    let mut tx = state.db_pool.begin().await?;
    let mut job_ids = Vec::with_capacity(body.len());

    for req in body {
        for dep_id in &req.depends_on {
            let dep = jobs
                .get(dep_id)
                .ok_or_else(|| DomainError::validation(format!("dependency job {dep_id} does not exist")))?;
            if dep.project_id != project_id {
                return Err(DomainError::validation("dependencies must be within the same project").into());
            }
        }
        let depends = build_depends_map(&req.depends_on, &jobs);

        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs (name, project_id, task_id, parameters, status, priority, depends)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING {}
            "#,
            Job::COLUMNS
        ))
        .bind(&req.name)
        .bind(project_id)
        .bind(req.task_id)
        .bind(&req.parameters)
        .bind(req.priority)
        .bind(&depends)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                DomainError::validation(format!("task {} does not exist", req.task_id))
            }
            other => DomainError::Database(other),
        })?;

        job_ids.push(job.id);
        jobs.insert(job.id, job);
    }

    tx.commit().await?;

    Ok(Json(BatchInsertResponse {
        created: job_ids.len(),
        job_ids,
    }))
}

/// `DELETE /projects/{project_id}/jobs/{job_id}`.
pub async fn delete_project_job(
    Extension(state): Extension<AppState>,
    Path((project_id, job_id)): Path<(i32, i32)>,
) -> ApiResult<Json<DeletedResponse>> {
    let deleted = Job::delete_in_project(&state.db_pool, project_id, job_id).await?;
    Ok(Json(DeletedResponse { deleted }))
}
