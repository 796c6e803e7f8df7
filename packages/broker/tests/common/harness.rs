//! Integration test harness with testcontainers.
//!
//! A single Postgres container and one migration run are shared across
//! the whole test binary; each test gets its own connection pool and
//! creates its own project/task fixtures so tests never interfere.

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use broker_core::{server::build_app, Config};
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use tower::ServiceExt;

struct SharedInfra {
    db_url: String,
    _container: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedInfra> = OnceCell::const_new();

impl SharedInfra {
    async fn init() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let container = Postgres::default()
            .start()
            .await
            .context("failed to start postgres container")?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;
        let db_url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

        let pool = PgPool::connect(&db_url).await.context("failed to connect for migrations")?;
        sqlx::migrate!("./migrations").run(&pool).await.context("migration failed")?;
        pool.close().await;

        Ok(Self { db_url, _container: container })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA.get_or_init(|| async { Self::init().await.expect("failed to start shared infra") }).await
    }
}

pub struct TestHarness {
    pub db_pool: PgPool,
    router: axum::Router,
}

impl TestHarness {
    pub async fn new() -> Self {
        let infra = SharedInfra::get().await;
        let db_pool = PgPool::connect(&infra.db_url).await.expect("failed to connect test pool");

        let config = Config {
            database_url: infra.db_url.clone(),
            port: 0,
            max_db_connections: 5,
            rate_limit_per_second: 0,
            rate_limit_burst: 0,
            allowed_origins: Vec::new(),
        };

        let router = build_app(db_pool.clone(), config);

        Self { db_pool, router }
    }

    pub async fn get(&self, path: &str) -> (StatusCode, serde_json::Value) {
        self.request(Method::GET, path, None).await
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put_json(&self, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, serde_json::Value) {
        self.request(Method::DELETE, path, None).await
    }

    async fn request(&self, method: Method, path: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let body = match body {
            Some(v) => Body::from(serde_json::to_vec(&v).unwrap()),
            None => Body::empty(),
        };
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    pub async fn typed<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<serde_json::Value>) -> (StatusCode, T) {
        let (status, json) = self.request(method, path, body).await;
        (status, serde_json::from_value(json).expect("response did not match expected shape"))
    }

    /// Creates a project + task fixture, returning their ids.
    pub async fn seed_project(&self, project_name: &str, task_name: &str) -> (i32, i32) {
        let (_, project) = self
            .post_json("/projects/", serde_json::json!({"name": project_name, "description": ""}))
            .await;
        let project_id = project["id"].as_i64().unwrap() as i32;

        let (_, task) = self
            .post_json("/tasks/", serde_json::json!({"project_id": project_id, "name": task_name}))
            .await;
        let task_id = task["id"].as_i64().unwrap() as i32;

        (project_id, task_id)
    }
}
