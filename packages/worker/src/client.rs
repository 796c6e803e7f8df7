//! HTTP client for the broker's REST surface.
//!
//! Replaces the source's inheritance chain of per-resource "connector"
//! objects hanging off a stateful `Server` handle with a single client
//! exposing the endpoint set directly. The client itself holds no job or
//! project state — the broker remains the sole source of truth.

use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde::Serialize;

use crate::error::{WorkerError, WorkerResult};
use crate::model::{FetchJobResponse, Job, JobStatus, Project, Task, Worker};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BrokerClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl BrokerClient {
    pub fn new(host: &str, port: u16, api_key: Option<String>) -> WorkerResult<Self> {
        let http = HttpClient::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: format!("http://{host}:{port}"),
            api_key,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> WorkerResult<T> {
        let response = builder.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(WorkerError::NotFound(response.url().path().to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::BrokerError { status, body });
        }
        Ok(response.json::<T>().await?)
    }

    /// Confirms the broker is reachable; called once at startup.
    pub async fn check_connection(&self) -> WorkerResult<()> {
        let response = self.request(reqwest::Method::GET, "/").send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(WorkerError::BrokerError {
                status: response.status(),
                body: String::new(),
            })
        }
    }

    pub async fn list_projects(&self, status: &str, limit: i64, skip: i64) -> WorkerResult<Vec<Project>> {
        let path = format!("/projects/?status={status}&limit={limit}&skip={skip}");
        self.send_json(self.request(reqwest::Method::GET, &path)).await
    }

    pub async fn get_project_by_name(&self, name: &str) -> WorkerResult<Project> {
        self.send_json(self.request(reqwest::Method::GET, &format!("/projects/name/{name}")))
            .await
    }

    pub async fn create_project(&self, name: &str, description: &str) -> WorkerResult<Project> {
        #[derive(Serialize)]
        struct Body<'a> {
            name: &'a str,
            description: &'a str,
        }
        let body = Body { name, description };
        self.send_json(self.request(reqwest::Method::POST, "/projects/").json(&body))
            .await
    }

    pub async fn delete_project_by_name(&self, name: &str) -> WorkerResult<bool> {
        #[derive(serde::Deserialize)]
        struct Deleted {
            deleted: bool,
        }
        let resp: Deleted = self
            .send_json(self.request(reqwest::Method::DELETE, &format!("/projects/name/{name}")))
            .await?;
        Ok(resp.deleted)
    }

    pub async fn create_task(&self, project_id: i32, name: &str) -> WorkerResult<Task> {
        #[derive(Serialize)]
        struct Body<'a> {
            project_id: i32,
            name: &'a str,
        }
        self.send_json(
            self.request(reqwest::Method::POST, "/tasks/")
                .json(&Body { project_id, name }),
        )
        .await
    }

    pub async fn get_task(&self, task_id: i32) -> WorkerResult<Task> {
        self.send_json(self.request(reqwest::Method::GET, &format!("/tasks/{task_id}")))
            .await
    }

    pub async fn get_task_by_name(&self, project_id: i32, name: &str) -> WorkerResult<Task> {
        let path = format!("/tasks/name/{name}?project_id={project_id}");
        self.send_json(self.request(reqwest::Method::GET, &path)).await
    }

    /// Enqueues a job, looking up the task id by name first, matching the
    /// source's `append_queue` two-step flow.
    pub async fn append_queue(
        &self,
        project_id: i32,
        job_name: &str,
        task_name: &str,
        parameters: serde_json::Value,
        priority: i32,
    ) -> WorkerResult<Job> {
        let task = self.get_task_by_name(project_id, task_name).await?;

        #[derive(Serialize)]
        struct Body<'a> {
            name: &'a str,
            project_id: i32,
            task_id: i32,
            parameters: serde_json::Value,
            priority: i32,
        }
        let body = Body {
            name: job_name,
            project_id,
            task_id: task.id,
            parameters,
            priority,
        };
        self.send_json(self.request(reqwest::Method::POST, "/jobs/").json(&body))
            .await
    }

    pub async fn get_queue(&self, project_id: i32) -> WorkerResult<Vec<Job>> {
        let path = format!("/jobs/?project_id={project_id}");
        self.send_json(self.request(reqwest::Method::GET, &path)).await
    }

    pub async fn get_job(&self, job_id: i32) -> WorkerResult<Job> {
        self.send_json(self.request(reqwest::Method::GET, &format!("/jobs/{job_id}")))
            .await
    }

    /// `GET /projects/{id}/fetch_job`. Never returns `EmptyQueue` itself —
    /// that distinction is the caller's to make from `num_pending`.
    pub async fn fetch_job(
        &self,
        project_id: i32,
        available_cpu: i32,
        available_accelerators: i32,
    ) -> WorkerResult<FetchJobResponse> {
        let path = format!(
            "/projects/{project_id}/fetch_job?available_cpu={available_cpu}&available_accelerators={available_accelerators}"
        );
        self.send_json(self.request(reqwest::Method::GET, &path)).await
    }

    /// Reports a status transition, round-tripping through the current job
    /// record first so unrelated fields survive the `PUT`, matching the
    /// source's read-modify-write pattern.
    pub async fn set_job_status(&self, job_id: i32, status: JobStatus) -> WorkerResult<Job> {
        let current = self.get_job(job_id).await?;

        #[derive(Serialize)]
        struct Body {
            name: String,
            parameters: serde_json::Value,
            priority: i32,
            status: JobStatus,
        }
        let body = Body {
            name: current.name,
            parameters: current.parameters,
            priority: current.priority,
            status,
        };
        self.send_json(self.request(reqwest::Method::PUT, &format!("/jobs/{job_id}")).json(&body))
            .await
    }

    pub async fn register_worker(
        &self,
        id: &str,
        name: &str,
        entity: &str,
        available_cpu: i32,
        available_accelerators: i32,
    ) -> WorkerResult<Worker> {
        #[derive(Serialize)]
        struct Body<'a> {
            id: &'a str,
            name: &'a str,
            entity: &'a str,
            available_cpu: i32,
            available_accelerators: i32,
        }
        let body = Body {
            id,
            name,
            entity,
            available_cpu,
            available_accelerators,
        };
        self.send_json(self.request(reqwest::Method::POST, "/clients/register").json(&body))
            .await
    }

    pub async fn get_worker(&self, id: &str) -> WorkerResult<Worker> {
        self.send_json(self.request(reqwest::Method::GET, &format!("/clients/{id}")))
            .await
    }

    pub async fn heartbeat(&self, id: &str) -> WorkerResult<Worker> {
        self.send_json(
            self.request(reqwest::Method::POST, &format!("/clients/{id}/heartbeat"))
                .json(&serde_json::json!({})),
        )
        .await
    }

    pub async fn deactivate(&self, id: &str) -> WorkerResult<Worker> {
        self.send_json(self.request(reqwest::Method::POST, &format!("/clients/{id}/deactivate")))
            .await
    }
}
