//! Happy-path coordination: handshake, dispatch, file exchange, and the
//! transition to job completion.

use crate::{make_coordinator, make_job, make_task};
use hive_core::envelope::{Envelope, MessageKind};
use hive_core::task::JobStatus;
use hive_services::{Coordinator, TaskDispatch};

fn assigned(dispatch: TaskDispatch) -> hive_core::task::Task {
    match dispatch {
        TaskDispatch::Assigned(task) => task,
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[tokio::test]
async fn handshake_then_work_to_completion() {
    let coordinator = make_coordinator(3).await;

    let descriptor = coordinator.handle_job_request("w1").await;
    assert_eq!(descriptor.task_count, 3);
    assert_eq!(coordinator.status().await.job_status, JobStatus::Running);

    // One worker drains the whole batch in FIFO order.
    for expected in 1..=3u64 {
        let task = assigned(coordinator.handle_task_request("w1").await);
        assert_eq!(task.task_id, expected);
        coordinator
            .handle_task_result(task.task_id, "w1", format!("result-{expected}").into_bytes())
            .await
            .unwrap();
    }

    assert!(coordinator.is_job_done().await);
    assert_eq!(coordinator.status().await.job_status, JobStatus::Done);

    // Results come back in ledger order, ready for reassembly.
    let completed = coordinator.completed_tasks().await;
    let results: Vec<_> = completed.iter().map(|c| c.result.clone()).collect();
    assert_eq!(results, vec![b"result-1".to_vec(), b"result-2".to_vec(), b"result-3".to_vec()]);
}

#[tokio::test]
async fn two_workers_split_the_batch() {
    let coordinator = make_coordinator(2).await;
    coordinator.handle_job_request("a").await;
    coordinator.handle_job_request("b").await;

    let task_a = assigned(coordinator.handle_task_request("a").await);
    let task_b = assigned(coordinator.handle_task_request("b").await);
    assert_ne!(task_a.task_id, task_b.task_id);

    // Pool drained but not done: both workers are told to wait.
    assert!(matches!(
        coordinator.handle_task_request("a").await,
        TaskDispatch::Starved
    ));

    coordinator
        .handle_task_result(task_a.task_id, "a", vec![1])
        .await
        .unwrap();
    coordinator
        .handle_task_result(task_b.task_id, "b", vec![2])
        .await
        .unwrap();

    assert!(matches!(
        coordinator.handle_task_request("a").await,
        TaskDispatch::Exhausted
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_workers_never_share_a_task() {
    let coordinator = std::sync::Arc::new(make_coordinator(24).await);

    let mut handles = Vec::new();
    for i in 0..24 {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("worker-{i}");
            coordinator.handle_job_request(&id).await;
            match coordinator.handle_task_request(&id).await {
                TaskDispatch::Assigned(task) => Some(task.task_id),
                _ => None,
            }
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        if let Some(id) = handle.await.unwrap() {
            ids.push(id);
        }
    }
    assert_eq!(ids.len(), 24, "every worker should get a task");
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 24, "a task was dispatched to two workers");
}

#[tokio::test]
async fn file_exchange_round_trips_through_envelopes() {
    let dir = std::env::temp_dir().join(format!("hive-int-files-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let contents = b"shared input data".repeat(1000);
    std::fs::write(dir.join("shared.bin"), &contents).unwrap();

    let mut job = make_job(9, dir.clone());
    job.file_names = vec!["shared.bin".into()];
    let coordinator = Coordinator::new(job, vec![make_task(1)], 3).await.unwrap();

    let bytes = coordinator.handle_file_request(9, "shared.bin").unwrap();
    let envelope = Envelope::decode(&bytes).unwrap();
    assert_eq!(envelope.kind, MessageKind::FileData);
    assert_eq!(envelope.job_id, 9);
    // The payload travels compressed and reinflates exactly.
    assert!((envelope.compressed_size as usize) < contents.len());
    assert_eq!(envelope.data().unwrap().unwrap(), contents);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn task_assignment_survives_envelope_framing() {
    // What the API layer does: task → JSON → TaskData envelope → bytes →
    // back. The worker must reconstruct the exact task.
    let coordinator = make_coordinator(1).await;
    let task = assigned(coordinator.handle_task_request("w").await);

    let payload = serde_json::to_vec(&task).unwrap();
    let envelope = Envelope::encode(MessageKind::TaskData, 1, Some(&payload)).unwrap();
    let decoded = Envelope::decode(&envelope.to_bytes()).unwrap();
    let back: hive_core::task::Task =
        serde_json::from_slice(&decoded.data().unwrap().unwrap()).unwrap();

    assert_eq!(back.task_id, task.task_id);
    assert_eq!(back.program, task.program);
    assert_eq!(back.payload, task.payload);
    assert_eq!(back.output_file_name, task.output_file_name);
}
