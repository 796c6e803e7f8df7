mod common;

use axum::http::StatusCode;
use common::TestHarness;

/// E1 — single-job round-trip: create, fetch, run, complete.
#[tokio::test]
async fn single_job_completes() {
    let harness = TestHarness::new().await;
    let (project_id, task_id) = harness.seed_project("e1-project", "train").await;

    let (status, job) = harness
        .post_json(
            "/jobs/",
            serde_json::json!({
                "name": "exp-1",
                "project_id": project_id,
                "task_id": task_id,
                "parameters": {"lr": 0.01},
                "priority": 0,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let job_id = job["id"].as_i64().unwrap();

    let (status, fetched) = harness
        .get(&format!("/projects/{project_id}/fetch_job?available_cpu=1&available_accelerators=0"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["job"]["id"].as_i64(), Some(job_id));
    assert_eq!(fetched["num_pending"].as_i64(), Some(0));

    let (status, running) = harness
        .put_json(
            &format!("/jobs/{job_id}"),
            serde_json::json!({"name": "exp-1", "parameters": {"lr": 0.01}, "priority": 0, "status": "RUNNING"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(running["status"], "RUNNING");

    let (status, completed) = harness
        .put_json(
            &format!("/jobs/{job_id}"),
            serde_json::json!({"name": "exp-1", "parameters": {"lr": 0.01}, "priority": 0, "status": "COMPLETED"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "COMPLETED");
}
