mod common;

use axum::http::StatusCode;
use common::TestHarness;

/// Testable property 7: no write to jobs succeeds on an archived project.
#[tokio::test]
async fn cannot_add_job_to_archived_project() {
    let harness = TestHarness::new().await;
    let (project_id, task_id) = harness.seed_project("archived-project", "train").await;

    let (_, project) = harness.get(&format!("/projects/{project_id}")).await;
    let (status, _) = harness
        .put_json(
            &format!("/projects/{project_id}"),
            serde_json::json!({"name": project["name"], "description": project["description"], "status": "ARCHIVED"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = harness
        .post_json(
            "/jobs/",
            serde_json::json!({"name": "late-job", "project_id": project_id, "task_id": task_id}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().contains("archived"));
}
