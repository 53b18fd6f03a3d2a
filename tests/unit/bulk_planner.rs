//! Unit tests for record coercion and job planning

use serde_json::json;

use clickup_toolkit::bulk::{BulkAction, BulkPlanner, JobKind};
use clickup_toolkit::RemoteId;

#[test]
fn test_csv_style_record_becomes_new_task() {
    // every CSV cell arrives as a string
    let record = json!({
        "name": "Quarterly report",
        "description": "Numbers for Q3",
        "status": "to do",
        "priority": "2",
        "assignees": "101;102",
        "tags": "finance;q3",
        "due_date": "1719792000000"
    });

    let job = BulkPlanner::default().import(vec![record], &RemoteId::new("900"));
    let Ok(BulkAction::Create { list_id, task }) = &job.operations[0].action else {
        panic!("record should plan a create");
    };
    assert_eq!(list_id.as_str(), "900");
    assert_eq!(task.priority, Some(2));
    assert_eq!(task.assignees, vec![101, 102]);
    assert_eq!(task.tags, vec!["finance", "q3"]);
    assert_eq!(task.due_date, Some(1_719_792_000_000));
}

#[test]
fn test_json_style_record_with_native_types() {
    let record = json!({
        "name": "Ship",
        "priority": 1,
        "assignees": [7, "8"],
        "tags": ["release"],
        "start_date": "2024-06-01T09:30:00Z"
    });

    let job = BulkPlanner::default().import(vec![record], &RemoteId::new("900"));
    let Ok(BulkAction::Create { task, .. }) = &job.operations[0].action else {
        panic!("record should plan a create");
    };
    assert_eq!(task.priority, Some(1));
    assert_eq!(task.assignees, vec![7, 8]);
    assert_eq!(task.start_date, Some(1_717_234_200_000));
}

#[test]
fn test_every_record_is_planned_in_order() {
    let records = vec![
        json!({"name": "a"}),
        json!({"name": ""}),
        json!({"name": "c", "priority": "someday"}),
        json!({"name": "d"}),
    ];
    let job = BulkPlanner::new(3).import(records, &RemoteId::new("900"));

    assert_eq!(job.kind, JobKind::Import);
    assert_eq!(job.len(), 4);
    assert_eq!(job.batch_count(), 2);
    let indices: Vec<_> = job.operations.iter().map(|op| op.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(job.invalid_count(), 2);
    assert_eq!(job.operations[1].raw, json!({"name": ""}));
}

#[test]
fn test_update_records_need_an_id() {
    let job = BulkPlanner::default().updates_from_records(vec![
        json!({"id": "abc", "status": "done"}),
        json!({"status": "done"}),
        json!({"id": "def"}),
    ]);

    assert_eq!(job.kind, JobKind::Update);
    assert!(matches!(
        &job.operations[0].action,
        Ok(BulkAction::Update { task_id, .. }) if task_id.as_str() == "abc"
    ));
    assert!(job.operations[1].action.as_ref().unwrap_err().contains("`id`"));
    assert!(job.operations[2].action.as_ref().unwrap_err().contains("no fields"));
}

#[test]
fn test_preview_envelope_for_update() {
    let job = BulkPlanner::default()
        .updates_from_records(vec![json!({"id": "abc", "priority": "low", "assignees": "5"})]);
    let envelope = job.operations[0].prepare().unwrap();

    assert_eq!(envelope.path, "/task/abc");
    assert_eq!(
        envelope.body,
        Some(json!({"priority": 4, "assignees": {"add": [5]}}))
    );
}
