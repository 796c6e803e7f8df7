mod common;

use axum::http::StatusCode;
use common::TestHarness;

/// E6 — cycle rejection: an update that would close a dependency loop is
/// rejected and mutates neither job.
#[tokio::test]
async fn update_rejects_introduced_cycle() {
    let harness = TestHarness::new().await;
    let (project_id, task_id) = harness.seed_project("e6-project", "train").await;

    let (_, job_a) = harness
        .post_json("/jobs/", serde_json::json!({"name": "job-a", "project_id": project_id, "task_id": task_id}))
        .await;
    let job_a_id = job_a["id"].as_i64().unwrap();

    let (status, job_b) = harness
        .post_json(
            "/jobs/",
            serde_json::json!({"name": "job-b", "project_id": project_id, "task_id": task_id, "depends_on": [job_a_id]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let job_b_id = job_b["id"].as_i64().unwrap();

    let (status, _) = harness
        .put_json(
            &format!("/jobs/{job_a_id}"),
            serde_json::json!({"name": "job-a", "parameters": {}, "priority": 0, "depends_on": [job_b_id]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, a_after) = harness.get(&format!("/jobs/{job_a_id}")).await;
    assert_eq!(a_after["depends"].as_object().unwrap().len(), 0);

    let (_, b_after) = harness.get(&format!("/jobs/{job_b_id}")).await;
    assert_eq!(b_after["status"], "PENDING");
}
