mod common;

use common::TestHarness;

/// E5 — failure cascade: failing an upstream job blocks every downstream
/// job transitively, in one transaction.
#[tokio::test]
async fn failure_blocks_transitive_dependents() {
    let harness = TestHarness::new().await;
    let (project_id, task_id) = harness.seed_project("e5-project", "train").await;

    let (_, job_a) = harness
        .post_json("/jobs/", serde_json::json!({"name": "job-a", "project_id": project_id, "task_id": task_id}))
        .await;
    let job_a_id = job_a["id"].as_i64().unwrap();

    let (_, job_b) = harness
        .post_json(
            "/jobs/",
            serde_json::json!({"name": "job-b", "project_id": project_id, "task_id": task_id, "depends_on": [job_a_id]}),
        )
        .await;
    let job_b_id = job_b["id"].as_i64().unwrap();

    let (_, job_c) = harness
        .post_json(
            "/jobs/",
            serde_json::json!({"name": "job-c", "project_id": project_id, "task_id": task_id, "depends_on": [job_b_id]}),
        )
        .await;
    let job_c_id = job_c["id"].as_i64().unwrap();

    harness
        .put_json(
            &format!("/jobs/{job_a_id}"),
            serde_json::json!({"name": "job-a", "parameters": {}, "priority": 0, "status": "QUEUED"}),
        )
        .await;
    harness
        .put_json(
            &format!("/jobs/{job_a_id}"),
            serde_json::json!({"name": "job-a", "parameters": {}, "priority": 0, "status": "RUNNING"}),
        )
        .await;
    let (_, failed) = harness
        .put_json(
            &format!("/jobs/{job_a_id}"),
            serde_json::json!({"name": "job-a", "parameters": {}, "priority": 0, "status": "FAILED"}),
        )
        .await;
    assert_eq!(failed["status"], "FAILED");

    let (_, b) = harness.get(&format!("/jobs/{job_b_id}")).await;
    let (_, c) = harness.get(&format!("/jobs/{job_c_id}")).await;
    assert_eq!(b["status"], "BLOCKED");
    assert_eq!(c["status"], "BLOCKED");

    let path = format!("/projects/{project_id}/fetch_job?available_cpu=1&available_accelerators=0");
    let (_, idle) = harness.get(&path).await;
    assert!(idle["job"].is_null());
    assert_eq!(idle["num_pending"].as_i64(), Some(0));
}
