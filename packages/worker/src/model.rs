//! Wire types exchanged with the broker. Kept independent of the broker's
//! own store types — this crate only ever sees them serialized over HTTP.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i32,
    pub name: String,
    pub project_id: i32,
    pub task_id: i32,
    pub parameters: serde_json::Value,
    pub status: JobStatus,
    pub priority: i32,
    #[serde(default)]
    pub depends: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub command_template: Option<String>,
    pub required_cpu: i32,
    pub required_accelerators: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchJobResponse {
    pub job: Option<Job>,
    pub num_pending: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub entity: String,
    pub description: Option<String>,
    pub available_cpu: i32,
    pub available_accelerators: i32,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_matches_broker_wire_format() {
        assert_eq!(serde_json::to_string(&JobStatus::Running).unwrap(), "\"RUNNING\"");
        assert_eq!(serde_json::from_str::<JobStatus>("\"BLOCKED\"").unwrap(), JobStatus::Blocked);
    }

    #[test]
    fn job_deserializes_broker_response_shape() {
        let raw = serde_json::json!({
            "id": 1,
            "name": "job-a",
            "project_id": 2,
            "task_id": 3,
            "parameters": {"epochs": 5},
            "status": "PENDING",
            "priority": 0,
            "depends": {"4": "upstream"},
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
        });
        let job: Job = serde_json::from_value(raw).unwrap();
        assert_eq!(job.depends.get("4").map(String::as_str), Some("upstream"));
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn job_depends_defaults_when_absent() {
        let raw = serde_json::json!({
            "id": 1,
            "name": "job-a",
            "project_id": 2,
            "task_id": 3,
            "parameters": {},
            "status": "PENDING",
            "priority": 0,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
        });
        let job: Job = serde_json::from_value(raw).unwrap();
        assert!(job.depends.is_empty());
    }

    #[test]
    fn fetch_job_response_handles_empty_queue() {
        let raw = serde_json::json!({"job": null, "num_pending": 0});
        let response: FetchJobResponse = serde_json::from_value(raw).unwrap();
        assert!(response.job.is_none());
        assert_eq!(response.num_pending, 0);
    }
}
