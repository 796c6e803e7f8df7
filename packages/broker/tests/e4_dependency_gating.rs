mod common;

use common::TestHarness;

/// E4 — dependency gating: a job is not dispatched until its dependency
/// completes.
#[tokio::test]
async fn dependent_job_waits_for_upstream() {
    let harness = TestHarness::new().await;
    let (project_id, task_id) = harness.seed_project("e4-project", "train").await;

    let (_, job_a) = harness
        .post_json(
            "/jobs/",
            serde_json::json!({"name": "job-a", "project_id": project_id, "task_id": task_id}),
        )
        .await;
    let job_a_id = job_a["id"].as_i64().unwrap();

    let (_, job_b) = harness
        .post_json(
            "/jobs/",
            serde_json::json!({
                "name": "job-b",
                "project_id": project_id,
                "task_id": task_id,
                "depends_on": [job_a_id],
            }),
        )
        .await;
    let job_b_id = job_b["id"].as_i64().unwrap();

    let path = format!("/projects/{project_id}/fetch_job?available_cpu=1&available_accelerators=0");

    let (_, first) = harness.get(&path).await;
    assert_eq!(first["job"]["id"].as_i64(), Some(job_a_id));

    let (_, idle) = harness.get(&path).await;
    assert!(idle["job"].is_null(), "job-b must not dispatch before job-a completes");

    harness
        .put_json(
            &format!("/jobs/{job_a_id}"),
            serde_json::json!({"name": "job-a", "parameters": {}, "priority": 0, "status": "RUNNING"}),
        )
        .await;
    harness
        .put_json(
            &format!("/jobs/{job_a_id}"),
            serde_json::json!({"name": "job-a", "parameters": {}, "priority": 0, "status": "COMPLETED"}),
        )
        .await;

    let (_, next) = harness.get(&path).await;
    assert_eq!(next["job"]["id"].as_i64(), Some(job_b_id));
}
