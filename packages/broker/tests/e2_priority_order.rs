mod common;

use common::TestHarness;

/// E2 — priority order: highest priority first, ties broken by ascending id.
#[tokio::test]
async fn fetch_returns_priority_desc_id_asc() {
    let harness = TestHarness::new().await;
    let (project_id, task_id) = harness.seed_project("e2-project", "train").await;

    let priorities = [0, 5, 5, 10];
    let mut ids = Vec::new();
    for (i, priority) in priorities.iter().enumerate() {
        let (_, job) = harness
            .post_json(
                "/jobs/",
                serde_json::json!({
                    "name": format!("job-{i}"),
                    "project_id": project_id,
                    "task_id": task_id,
                    "priority": priority,
                }),
            )
            .await;
        ids.push(job["id"].as_i64().unwrap());
    }

    // ids in insertion order correspond to priorities [0, 5, 5, 10];
    // expected dispatch order is highest priority first, lower id wins ties.
    let expected = vec![ids[3], ids[1], ids[2], ids[0]];

    let mut observed = Vec::new();
    for _ in 0..4 {
        let (_, resp) = harness
            .get(&format!("/projects/{project_id}/fetch_job?available_cpu=1&available_accelerators=0"))
            .await;
        observed.push(resp["job"]["id"].as_i64().unwrap());
    }

    assert_eq!(observed, expected);

    let (_, idle) = harness
        .get(&format!("/projects/{project_id}/fetch_job?available_cpu=1&available_accelerators=0"))
        .await;
    assert!(idle["job"].is_null());
}
