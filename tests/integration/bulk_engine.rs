//! Integration tests for batched execution, dry-runs and cancellation

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clickup_toolkit::bulk::{
    BulkError, BulkExecutor, BulkPlanner, RecordOutcome, TaskFilter,
};
use clickup_toolkit::cancel::CancelHandle;
use clickup_toolkit::client::{HttpMethod, TaskUpdate};
use clickup_toolkit::{RemoteId, Task};

use crate::support::{client_with, json_reply, task_json, FakeTransport};

/// Transport that echoes created or updated tasks back
fn echo_transport() -> Arc<FakeTransport> {
    FakeTransport::responding(|request| {
        let body = request.body.clone().unwrap_or(Value::Null);
        let id = match request.method {
            HttpMethod::Put => request.path.trim_start_matches("/task/").to_string(),
            _ => format!("new-{}", body["name"].as_str().unwrap_or("task")),
        };
        let name = body["name"].as_str().unwrap_or("Existing").to_string();
        json_reply(200, task_json(&id, &name, "open"))
    })
}

fn named_records(count: usize) -> Vec<Value> {
    (0..count).map(|i| json!({"name": format!("r{i}")})).collect()
}

fn list() -> RemoteId {
    RemoteId::new("901")
}

#[tokio::test]
async fn test_every_batch_size_keeps_order_and_length() {
    for batch_size in [1, 4, 7, 50] {
        let transport = echo_transport();
        let (client, _clock) = client_with(transport.clone());

        let job = BulkPlanner::new(batch_size).import(named_records(7), &list());
        let result = BulkExecutor::new(client).execute(job).await;

        assert_eq!(result.len(), 7, "batch size {batch_size}");
        let names: Vec<String> = result
            .records
            .iter()
            .map(|r| match &r.outcome {
                RecordOutcome::Succeeded { task } => task.name.clone(),
                other => panic!("unexpected outcome {other:?}"),
            })
            .collect();
        assert_eq!(names, (0..7).map(|i| format!("r{i}")).collect::<Vec<_>>());
        assert_eq!(transport.calls(), 7);
    }
}

#[tokio::test]
async fn test_batches_are_sized_in_order() {
    let (client, _clock) = client_with(echo_transport());

    let job = BulkPlanner::new(5).import(named_records(12), &list());
    let result = BulkExecutor::new(client).execute(job).await;

    assert_eq!(result.batches, vec![5, 5, 2]);
    assert_eq!(result.summary().succeeded, 12);
    assert!(!result.cancelled);
}

#[tokio::test]
async fn test_dry_run_makes_no_calls_and_matches_live_failures() {
    let records = vec![
        json!({"name": "ok"}),
        json!({"name": ""}),
        json!({"name": "bad priority", "priority": "9"}),
        json!({"name": "bad date", "due_date": "next week"}),
        json!({"name": "fine", "tags": "a;b"}),
    ];

    let dry_transport = FakeTransport::scripted(vec![]);
    let (dry_client, _clock) = client_with(dry_transport.clone());
    let dry_job = BulkPlanner::new(2).import(records.clone(), &list()).with_dry_run(true);
    let preview = BulkExecutor::new(dry_client).execute(dry_job).await;
    assert_eq!(dry_transport.calls(), 0);
    assert!(preview.dry_run);

    let (live_client, _clock) = client_with(echo_transport());
    let live_job = BulkPlanner::new(2).import(records, &list());
    let live = BulkExecutor::new(live_client).execute(live_job).await;

    let dry_failures: Vec<usize> = preview.failures().map(|r| r.index).collect();
    let live_failures: Vec<usize> = live.failures().map(|r| r.index).collect();
    assert_eq!(dry_failures, vec![1, 2, 3]);
    assert_eq!(dry_failures, live_failures);

    let summary = preview.summary();
    assert_eq!(summary.would_succeed, 2);
    assert_eq!(summary.would_fail, 3);
    match &preview.records[4].outcome {
        RecordOutcome::WouldSucceed { request } => {
            assert_eq!(request.path, "/list/901/task");
            assert_eq!(request.body, Some(json!({"name": "fine", "tags": ["a", "b"]})));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_one_bad_record_does_not_stop_the_rest() {
    let records = vec![
        json!({"id": "a1", "status": "done"}),
        json!({"id": "a2", "status": "done"}),
        json!({"id": "a3", "status": "done"}),
        json!({"status": "done"}),
        json!({"id": "a5", "status": "done"}),
    ];
    let transport = echo_transport();
    let (client, _clock) = client_with(transport.clone());

    let job = BulkPlanner::new(2).updates_from_records(records);
    let result = BulkExecutor::new(client).execute(job).await;

    let summary = result.summary();
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    let failure = result.failures().next().unwrap();
    assert_eq!(failure.index, 3);
    assert_eq!(failure.raw, json!({"status": "done"}));
    assert_eq!(transport.calls(), 4);
}

#[tokio::test]
async fn test_remote_failures_are_recorded_per_record() {
    let transport = FakeTransport::responding(|request| {
        if request.body.as_ref().and_then(|b| b["name"].as_str()) == Some("r1") {
            json_reply(400, json!({"err": "Status does not exist", "ECODE": "ITEM_114"}))
        } else {
            json_reply(200, task_json("x", "created", "open"))
        }
    });
    let (client, _clock) = client_with(transport);

    let job = BulkPlanner::default().import(named_records(3), &list());
    let result = BulkExecutor::new(client).execute(job).await;

    match &result.records[1].outcome {
        RecordOutcome::Failed { message, .. } => assert!(message.contains("Status does not exist")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(result.records[2].outcome, RecordOutcome::Succeeded { .. }));

    let err = result.into_result().unwrap_err();
    assert!(matches!(err, BulkError::PartialBatchFailure(_)));
    assert_eq!(err.to_string(), "1 of 3 records failed");
}

#[tokio::test]
async fn test_cancelled_before_start_skips_everything() {
    let transport = FakeTransport::scripted(vec![]);
    let (client, _clock) = client_with(transport.clone());
    let cancel = CancelHandle::new();
    cancel.cancel();

    let job = BulkPlanner::new(2).import(named_records(5), &list());
    let result = BulkExecutor::new(client).with_cancel(cancel).execute(job).await;

    assert!(result.cancelled);
    assert_eq!(result.len(), 5);
    assert!(result.batches.is_empty());
    assert!(result
        .records
        .iter()
        .all(|r| matches!(r.outcome, RecordOutcome::Skipped)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_cancel_mid_run_finishes_current_batch() {
    let cancel = CancelHandle::new();
    let trigger = cancel.clone();
    let transport = FakeTransport::responding(move |_| {
        trigger.cancel();
        json_reply(200, task_json("x", "created", "open"))
    });
    let (client, _clock) = client_with(transport.clone());

    let job = BulkPlanner::new(3).import(named_records(8), &list());
    let result = BulkExecutor::new(client).with_cancel(cancel).execute(job).await;

    assert!(result.cancelled);
    assert_eq!(result.batches, vec![3]);
    assert_eq!(transport.calls(), 3);
    let summary = result.summary();
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.skipped, 5);
    let indices: Vec<usize> = result.records.iter().map(|r| r.index).collect();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_concurrent_batches_keep_input_order() {
    let counter = Arc::new(AtomicUsize::new(0));
    let seen = counter.clone();
    let transport = FakeTransport::responding(move |request| {
        seen.fetch_add(1, Ordering::SeqCst);
        let name = request.body.as_ref().and_then(|b| b["name"].as_str()).unwrap_or("?");
        json_reply(200, task_json(&format!("id-{name}"), name, "open"))
    });
    let (client, _clock) = client_with(transport);

    let job = BulkPlanner::new(10).import(named_records(20), &list());
    let result = BulkExecutor::new(client)
        .with_concurrency(4)
        .execute(job)
        .await;

    assert_eq!(counter.load(Ordering::SeqCst), 20);
    for (position, record) in result.records.iter().enumerate() {
        assert_eq!(record.index, position);
        match &record.outcome {
            RecordOutcome::Succeeded { task } => assert_eq!(task.name, format!("r{position}")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_filtered_update_applies_to_matching_tasks() {
    let tasks: Vec<Task> = vec![
        task_json("a", "Fix login", "open"),
        task_json("b", "Write docs", "done"),
        task_json("c", "Fix logout", "Open"),
    ]
    .into_iter()
    .map(|v| serde_json::from_value(v).unwrap())
    .collect();
    let filter = TaskFilter {
        status: Some("open".to_string()),
        name_contains: Some("fix".to_string()),
        ..TaskFilter::default()
    };
    let update = TaskUpdate {
        status: Some("in progress".to_string()),
        ..TaskUpdate::default()
    };

    let transport = echo_transport();
    let (client, _clock) = client_with(transport.clone());
    let job = BulkPlanner::default().update_matching(&tasks, &filter, &update);
    let result = BulkExecutor::new(client).execute(job).await;

    assert_eq!(result.summary().succeeded, 2);
    let paths: Vec<String> = transport.requests().iter().map(|r| r.path.clone()).collect();
    assert_eq!(paths, vec!["/task/a", "/task/c"]);
    assert!(transport
        .requests()
        .iter()
        .all(|r| r.body == Some(json!({"status": "in progress"}))));
}
