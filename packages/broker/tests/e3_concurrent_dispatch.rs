mod common;

use common::TestHarness;

/// E3 — concurrent dispatch: exactly one of two simultaneous callers gets
/// the single pending job.
#[tokio::test]
async fn only_one_concurrent_fetch_wins() {
    let harness = TestHarness::new().await;
    let (project_id, task_id) = harness.seed_project("e3-project", "train").await;

    harness
        .post_json(
            "/jobs/",
            serde_json::json!({"name": "only-job", "project_id": project_id, "task_id": task_id}),
        )
        .await;

    let path = format!("/projects/{project_id}/fetch_job?available_cpu=1&available_accelerators=0");
    let (a, b) = tokio::join!(harness.get(&path), harness.get(&path));

    let jobs_returned = [&a.1["job"], &b.1["job"]]
        .iter()
        .filter(|j| !j.is_null())
        .count();
    assert_eq!(jobs_returned, 1, "exactly one caller should receive the job");

    let pendings: Vec<i64> = [&a.1, &b.1].iter().map(|r| r["num_pending"].as_i64().unwrap()).collect();
    assert!(pendings.contains(&0));
}
