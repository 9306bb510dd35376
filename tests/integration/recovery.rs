//! Failure recovery: worker expiry, reclamation, stale results, and the
//! retry ceiling.

use std::time::Duration;

use crate::make_coordinator;
use hive_services::TaskDispatch;

fn assigned(dispatch: TaskDispatch) -> hive_core::task::Task {
    match dispatch {
        TaskDispatch::Assigned(task) => task,
        other => panic!("expected an assignment, got {other:?}"),
    }
}

/// The canonical failure scenario: two tasks, worker A dies mid-task,
/// its task is reclaimed and finished by someone else, and the job is
/// only done once both results are in.
#[tokio::test]
async fn expired_worker_task_is_redispatched() {
    let coordinator = make_coordinator(2).await;

    coordinator.handle_job_request("a").await;
    coordinator.handle_job_request("b").await;
    let task_a = assigned(coordinator.handle_task_request("a").await);
    let task_b = assigned(coordinator.handle_task_request("b").await);

    // A goes silent; B keeps heartbeating past A's deadline.
    tokio::time::sleep(Duration::from_millis(60)).await;
    coordinator.handle_heartbeat("b");

    let reclaimed = coordinator.sweep(Duration::from_millis(30)).await;
    assert_eq!(reclaimed, 1, "only A's task should be reclaimed");

    // B completes its own task; the job is not done yet.
    coordinator
        .handle_task_result(task_b.task_id, "b", b"b-result".to_vec())
        .await
        .unwrap();
    assert!(!coordinator.is_job_done().await);

    // A fresh worker picks up A's abandoned task.
    let retry = assigned(coordinator.handle_task_request("c").await);
    assert_eq!(retry.task_id, task_a.task_id);
    coordinator
        .handle_task_result(retry.task_id, "c", b"c-result".to_vec())
        .await
        .unwrap();

    assert!(coordinator.is_job_done().await);
}

#[tokio::test]
async fn stale_result_does_not_corrupt_the_retry() {
    let coordinator = make_coordinator(1).await;

    coordinator.handle_job_request("a").await;
    let task = assigned(coordinator.handle_task_request("a").await);

    tokio::time::sleep(Duration::from_millis(40)).await;
    coordinator.sweep(Duration::from_millis(20)).await;

    // The replacement takes over and finishes first.
    let retry = assigned(coordinator.handle_task_request("b").await);
    coordinator
        .handle_task_result(retry.task_id, "b", b"fresh".to_vec())
        .await
        .unwrap();

    // A's zombie result must be rejected, not overwrite B's.
    let err = coordinator
        .handle_task_result(task.task_id, "a", b"stale".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        hive_services::LedgerError::InvalidTransition { .. }
    ));
    assert_eq!(coordinator.completed_tasks().await[0].result, b"fresh");
}

#[tokio::test]
async fn reactivated_worker_keeps_working() {
    let coordinator = make_coordinator(2).await;

    coordinator.handle_job_request("a").await;
    assigned(coordinator.handle_task_request("a").await);

    tokio::time::sleep(Duration::from_millis(40)).await;
    coordinator.sweep(Duration::from_millis(20)).await;

    // A comes back. Its old assignment is gone, but it can take new work —
    // expiry is a lifecycle event, not a ban.
    coordinator.handle_heartbeat("a");
    let next = assigned(coordinator.handle_task_request("a").await);
    coordinator
        .handle_task_result(next.task_id, "a", vec![])
        .await
        .unwrap();
}

#[tokio::test]
async fn repeated_abandonment_fails_the_task_and_finishes_the_job() {
    // Ceiling of 1: the second reclaim permanently fails the task.
    let coordinator = hive_services::Coordinator::new(
        crate::make_job(1, std::env::temp_dir()),
        vec![crate::make_task(1), crate::make_task(2)],
        1,
    )
    .await
    .unwrap();

    // The steady worker takes task 1 and holds it.
    coordinator.handle_job_request("steady").await;
    let ok_task = assigned(coordinator.handle_task_request("steady").await);
    assert_eq!(ok_task.task_id, 1);

    // Task 1 is abandoned twice.
    for round in 0..2 {
        let flaky = format!("flaky-{round}");
        let task = assigned(coordinator.handle_task_request(&flaky).await);
        assert_eq!(task.task_id, 2, "flaky worker gets the other task");
        tokio::time::sleep(Duration::from_millis(40)).await;
        coordinator.handle_heartbeat("steady");
        coordinator.sweep(Duration::from_millis(20)).await;
    }

    coordinator
        .handle_task_result(ok_task.task_id, "steady", b"ok".to_vec())
        .await
        .unwrap();

    // One complete, one permanently failed — the job still terminates.
    assert!(coordinator.is_job_done().await);
    let status = coordinator.status().await;
    assert_eq!(status.tasks.complete, 1);
    assert_eq!(status.tasks.failed, 1);
    assert!(matches!(
        coordinator.handle_task_request("steady").await,
        TaskDispatch::Exhausted
    ));
}
