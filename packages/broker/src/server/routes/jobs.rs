use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::dependency;
use crate::error::{ApiResult, DomainError};
use crate::lifecycle;
use crate::model::{Job, JobStatus, Project, Record};
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

pub async fn list_jobs(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    let jobs = Job::list(&state.db_pool, query.project_id, query.limit, query.skip).await?;
    Ok(Json(jobs))
}

#[derive(Deserialize)]
pub struct CreateJobRequest {
    name: String,
    project_id: i32,
    task_id: i32,
    #[serde(default = "serde_json::Value::default")]
    parameters: serde_json::Value,
    #[serde(default)]
    priority: i32,
    /// Dependency ids this job waits on; stored as the `depends` JSON map.
    #[serde(default)]
    depends_on: Vec<i32>,
}

pub async fn create_job(
    Extension(state): Extension<AppState>,
    Json(body): Json<CreateJobRequest>,
) -> ApiResult<Json<Job>> {
    if body.name.trim().is_empty() {
        return Err(DomainError::validation("job name must not be empty").into());
    }

    let project = Project::find_by_id(&state.db_pool, body.project_id)
        .await?
        .ok_or_else(|| DomainError::not_found("project", body.project_id))?;
    if project.is_archived() {
        return Err(DomainError::validation("cannot add jobs to an archived project").into());
    }

    let jobs = dependency::load_project_jobs(&state.db_pool, body.project_id).await?;
    for dep_id in &body.depends_on {
        let dep = jobs
            .get(dep_id)
            .ok_or_else(|| DomainError::validation(format!("dependency job {dep_id} does not exist")))?;
        if dep.project_id != body.project_id {
            return Err(DomainError::validation("dependencies must be within the same project").into());
        }
    }

    let depends = build_depends_map(&body.depends_on, &jobs);

    let job = Job::create(
        &state.db_pool,
        &body.name,
        body.project_id,
        body.task_id,
        body.parameters,
        body.priority,
        depends,
    )
    .await?;

    Ok(Json(job))
}

pub(crate) fn build_depends_map(ids: &[i32], jobs: &std::collections::HashMap<i32, Job>) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = ids
        .iter()
        .map(|id| {
            let name = jobs.get(id).map(|j| j.name.clone()).unwrap_or_default();
            (id.to_string(), serde_json::Value::String(name))
        })
        .collect();
    serde_json::Value::Object(map)
}

pub async fn get_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Job>> {
    let job = Job::find_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| DomainError::not_found("job", id))?;
    Ok(Json(job))
}

#[derive(Deserialize)]
pub struct UpdateJobRequest {
    name: String,
    #[serde(default = "serde_json::Value::default")]
    parameters: serde_json::Value,
    #[serde(default)]
    priority: i32,
    /// When present and different from the stored status, the update goes
    /// through [`lifecycle::transition`] instead of a plain field write.
    #[serde(default)]
    status: Option<JobStatus>,
    /// When present, replaces the job's dependency set. Rejected with
    /// Validation (and no field on either job written) if it would create
    /// a cycle or reference a job outside the project.
    #[serde(default)]
    depends_on: Option<Vec<i32>>,
}

pub async fn update_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateJobRequest>,
) -> ApiResult<Json<Job>> {
    let current = Job::find_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| DomainError::not_found("job", id))?;

    let project = Project::find_by_id(&state.db_pool, current.project_id)
        .await?
        .ok_or_else(|| DomainError::not_found("project", current.project_id))?;
    if project.is_archived() {
        return Err(DomainError::validation("cannot modify jobs in an archived project").into());
    }

    let depends = match &body.depends_on {
        Some(ids) => {
            let jobs = dependency::load_project_jobs(&state.db_pool, current.project_id).await?;
            for dep_id in ids {
                let dep = jobs
                    .get(dep_id)
                    .ok_or_else(|| DomainError::validation(format!("dependency job {dep_id} does not exist")))?;
                if dep.project_id != current.project_id {
                    return Err(DomainError::validation("dependencies must be within the same project").into());
                }
            }
            if dependency::creates_cycle(id, ids, &jobs) {
                return Err(DomainError::validation("update would create a circular dependency").into());
            }
            build_depends_map(ids, &jobs)
        }
        None => current.depends.clone(),
    };

    let job = Job::update_fields(&state.db_pool, id, &body.name, body.parameters, body.priority, depends).await?;

    let job = match body.status {
        Some(status) if status != job.status => lifecycle::transition(&state.db_pool, id, status).await?.0,
        _ => job,
    };

    Ok(Json(job))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    deleted: bool,
}

pub async fn delete_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<DeletedResponse>> {
    let deleted = Job::delete(&state.db_pool, id).await?;
    Ok(Json(DeletedResponse { deleted }))
}

#[derive(Serialize)]
pub struct DependencyView {
    id: i32,
    name: String,
    status: JobStatus,
}

#[derive(Serialize)]
pub struct JobDependenciesResponse {
    job_id: i32,
    job_name: String,
    status: JobStatus,
    dependencies: Vec<DependencyView>,
    all_completed: bool,
    has_failed: bool,
}

/// `GET /jobs/{id}/dependencies`.
pub async fn job_dependencies(
    Extension(state): Extension<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<JobDependenciesResponse>> {
    let job = Job::find_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| DomainError::not_found("job", id))?;

    let project_jobs = dependency::load_project_jobs(&state.db_pool, job.project_id).await?;

    let dependencies: Vec<DependencyView> = job
        .dependency_ids()
        .into_iter()
        .filter_map(|dep_id| {
            project_jobs.get(&dep_id).map(|dep| DependencyView {
                id: dep.id,
                name: dep.name.clone(),
                status: dep.status,
            })
        })
        .collect();

    let all_completed = dependencies.iter().all(|d| d.status == JobStatus::Completed);
    let has_failed = dependencies.iter().any(|d| d.status == JobStatus::Failed);

    Ok(Json(JobDependenciesResponse {
        job_id: job.id,
        job_name: job.name,
        status: job.status,
        dependencies,
        all_completed,
        has_failed,
    }))
}
