//! Application setup and router configuration.

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::{Extension, Router};
use sqlx::PgPool;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::server::middleware::{extract_client_ip, governor_config};
use crate::server::routes::{health, jobs, projects, tasks, workers};
use crate::AppState;

pub fn build_app(pool: PgPool, config: Config) -> Router {
    let state = AppState::new(pool, config.clone());

    let cors = if state.config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    } else {
        let origins: Vec<_> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    };

    let mut router = Router::new()
        .route("/", get(health::health_handler))
        .route("/checkdb", get(health::checkdb_handler))
        .route("/projects/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/projects/{id}",
            get(projects::get_project).put(projects::update_project).delete(projects::delete_project),
        )
        .route(
            "/projects/name/{name}",
            get(projects::get_project_by_name).delete(projects::delete_project_by_name),
        )
        .route("/projects/{id}/fetch_job", get(projects::fetch_job))
        .route("/projects/{id}/queue", delete(projects::clear_queue))
        .route("/projects/{id}/jobs/batch", post(projects::batch_insert_jobs))
        .route(
            "/projects/{project_id}/jobs/{job_id}",
            delete(projects::delete_project_job),
        )
        .route("/jobs/", get(jobs::list_jobs).post(jobs::create_job))
        .route(
            "/jobs/{id}",
            get(jobs::get_job).put(jobs::update_job).delete(jobs::delete_job),
        )
        .route("/jobs/{id}/dependencies", get(jobs::job_dependencies))
        .route("/tasks/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/{id}",
            get(tasks::get_task).put(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/tasks/name/{name}", get(tasks::get_task_by_name))
        .route("/clients/register", post(workers::register_worker))
        .route("/clients/", get(workers::list_workers))
        .route(
            "/clients/{id}",
            get(workers::get_worker).put(workers::update_worker).delete(workers::delete_worker),
        )
        .route("/clients/{id}/heartbeat", post(workers::heartbeat_worker))
        .route("/clients/{id}/deactivate", post(workers::deactivate_worker));

    if let Some(governor_conf) = governor_config(&state.config) {
        router = router.layer(GovernorLayer {
            config: std::sync::Arc::new(governor_conf),
        });
    }

    router
        .layer(axum::middleware::from_fn(extract_client_ip))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
