//! Integration tests for typed operations over a scripted transport

use serde_json::{json, Value};

use clickup_toolkit::client::{HttpMethod, NewTask, TaskQuery, TaskUpdate};
use clickup_toolkit::ApiError;

use crate::support::{client_with, json_reply, task_json, FakeTransport};

fn page(ids: std::ops::Range<usize>, last_page: bool) -> Value {
    let tasks: Vec<Value> = ids
        .map(|i| task_json(&format!("t{i}"), &format!("Task {i}"), "open"))
        .collect();
    json!({"tasks": tasks, "last_page": last_page})
}

#[tokio::test]
async fn test_list_all_tasks_follows_pages_until_last() {
    let transport = FakeTransport::scripted(vec![
        json_reply(200, page(0..100, false)),
        json_reply(200, page(100..200, false)),
        json_reply(200, page(200..230, true)),
    ]);
    let (client, _clock) = client_with(transport.clone());

    let query = TaskQuery {
        statuses: vec!["open".to_string()],
        ..TaskQuery::default()
    };
    let tasks = client.list_all_tasks("901", &query).await.unwrap();

    assert_eq!(tasks.len(), 230);
    assert_eq!(tasks[229].id.as_str(), "t229");
    let pages: Vec<String> = transport
        .requests()
        .iter()
        .map(|r| {
            r.query
                .iter()
                .find(|(k, _)| k == "page")
                .map(|(_, v)| v.clone())
                .unwrap()
        })
        .collect();
    assert_eq!(pages, vec!["0", "1", "2"]);
    assert!(transport.requests()[0]
        .query
        .contains(&("statuses[]".to_string(), "open".to_string())));
}

#[tokio::test]
async fn test_short_page_ends_listing_without_flag() {
    let transport = FakeTransport::scripted(vec![json_reply(200, json!({"tasks": [task_json("a", "Only", "open")]}))]);
    let (client, _clock) = client_with(transport.clone());

    let tasks = client.list_all_tasks("901", &TaskQuery::default()).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_empty_ids_rejected_before_sending() {
    let transport = FakeTransport::scripted(vec![]);
    let (client, _clock) = client_with(transport.clone());

    assert!(matches!(client.get_task("").await, Err(ApiError::Validation(_))));
    assert!(matches!(client.list_spaces(" ").await, Err(ApiError::Validation(_))));
    assert!(matches!(
        client.create_task("", &NewTask::named("x")).await,
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(
        client.update_task("t1", &TaskUpdate::default()).await,
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(
        client.create_comment("t1", "   ").await,
        Err(ApiError::Validation(_))
    ));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_malformed_payloads_are_decode_errors() {
    let transport = FakeTransport::scripted(vec![
        json_reply(200, json!({"id": "t1", "name": "No status"})),
        json_reply(200, json!({"lists": "not an array"})),
        json_reply(200, json!({"id": "", "name": "Blank id"})),
    ]);
    let (client, _clock) = client_with(transport.clone());

    assert!(matches!(client.get_task("t1").await, Err(ApiError::Decode(_))));
    assert!(matches!(client.list_lists("55").await, Err(ApiError::Decode(_))));
    assert!(matches!(client.get_list("901").await, Err(ApiError::Decode(_))));
    // decode failures are not retried
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_validate_auth_reports_user_and_workspaces() {
    let transport = FakeTransport::scripted(vec![
        json_reply(200, json!({"user": {"id": 183, "username": "ana", "email": "ana@example.com"}})),
        json_reply(
            200,
            json!({"teams": [
                {"id": "1", "name": "Engineering", "members": [{"user": {"id": 183}}]},
                {"id": 2, "name": "Ops"}
            ]}),
        ),
    ]);
    let (client, _clock) = client_with(transport.clone());

    let report = client.validate_auth().await.unwrap();
    assert_eq!(report.user.id.as_str(), "183");
    assert_eq!(report.user.username.as_deref(), Some("ana"));
    let names: Vec<_> = report.workspaces.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["Engineering", "Ops"]);
    assert_eq!(report.workspaces[1].id.as_str(), "2");

    let paths: Vec<_> = transport.requests().iter().map(|r| r.path.clone()).collect();
    assert_eq!(paths, vec!["/user", "/team"]);
}

#[tokio::test]
async fn test_members_accept_wrapped_and_flat_entries() {
    let transport = FakeTransport::scripted(vec![json_reply(
        200,
        json!({"members": [{"user": {"id": 1, "username": "a"}}, {"id": 2, "username": "b"}]}),
    )]);
    let (client, _clock) = client_with(transport);

    let members = client.list_members("7").await.unwrap();
    let ids: Vec<_> = members.iter().map(|m| m.id.to_string()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_create_task_sends_payload() {
    let transport = FakeTransport::scripted(vec![json_reply(200, task_json("new1", "Write docs", "to do"))]);
    let (client, _clock) = client_with(transport.clone());

    let task = NewTask {
        priority: Some(2),
        assignees: vec![183],
        ..NewTask::named("Write docs")
    };
    let created = client.create_task("901", &task).await.unwrap();
    assert_eq!(created.id.as_str(), "new1");

    let request = &transport.requests()[0];
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.path, "/list/901/task");
    assert_eq!(
        request.body,
        Some(json!({"name": "Write docs", "priority": 2, "assignees": [183]}))
    );
}

#[tokio::test]
async fn test_search_filters_text_locally() {
    let transport = FakeTransport::scripted(vec![json_reply(
        200,
        json!({"tasks": [
            task_json("1", "Fix login bug", "open"),
            task_json("2", "Write changelog", "open"),
            {
                "id": "3",
                "name": "Triage",
                "description": "includes a LOGIN regression",
                "status": {"status": "open"}
            }
        ]}),
    )]);
    let (client, _clock) = client_with(transport.clone());

    let found = client
        .search_tasks("7", "login", &TaskQuery::default())
        .await
        .unwrap();
    let ids: Vec<_> = found.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(transport.requests()[0].path, "/team/7/task");
}

#[tokio::test]
async fn test_comments_round_trip() {
    let transport = FakeTransport::scripted(vec![
        json_reply(200, json!({"id": 458, "hist_id": "abc", "date": 1700000000000_u64})),
        json_reply(
            200,
            json!({"comments": [{
                "id": "458",
                "comment_text": "Looks good",
                "user": {"id": 183, "username": "ana"},
                "date": "1700000000000"
            }]}),
        ),
    ]);
    let (client, _clock) = client_with(transport.clone());

    let id = client.create_comment("t1", "Looks good").await.unwrap();
    assert_eq!(id.as_str(), "458");

    let comments = client.list_comments("t1").await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].comment_text, "Looks good");
    assert_eq!(
        transport.requests()[0].body,
        Some(json!({"comment_text": "Looks good"}))
    );
}

#[tokio::test]
async fn test_comment_without_id_is_decode_error() {
    let transport = FakeTransport::scripted(vec![json_reply(200, json!({"hist_id": "abc"}))]);
    let (client, _clock) = client_with(transport);

    assert!(matches!(
        client.create_comment("t1", "hello").await,
        Err(ApiError::Decode(_))
    ));
}

#[tokio::test]
async fn test_hierarchy_lookups_hit_their_paths() {
    let transport = FakeTransport::scripted(vec![
        json_reply(200, json!({"team": {"id": "7", "name": "Acme", "color": "#123456"}})),
        json_reply(
            200,
            json!({"id": "55", "name": "Engineering", "private": true, "multiple_assignees": true}),
        ),
        json_reply(200, json!({"id": "66", "name": "Sprints", "hidden": false, "task_count": "12"})),
        json_reply(
            200,
            json!({"lists": [{"id": "901", "name": "Inbox"}, {"id": "902", "name": "Ideas", "archived": true}]}),
        ),
    ]);
    let (client, _clock) = client_with(transport.clone());

    let workspace = client.get_workspace("7").await.unwrap();
    assert_eq!(workspace.name, "Acme");
    assert_eq!(workspace.color.as_deref(), Some("#123456"));

    let space = client.get_space("55").await.unwrap();
    assert_eq!(space.id.as_str(), "55");
    assert!(space.private && space.multiple_assignees);

    let folder = client.get_folder("66").await.unwrap();
    assert_eq!(folder.name, "Sprints");
    assert_eq!(folder.task_count, Some(12));

    let lists = client.list_folderless_lists("55").await.unwrap();
    let names: Vec<_> = lists.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Inbox", "Ideas"]);
    assert!(lists[1].archived);

    let paths: Vec<_> = transport
        .requests()
        .into_iter()
        .map(|r| {
            assert_eq!(r.method, HttpMethod::Get);
            assert_eq!(r.body, None);
            r.path
        })
        .collect();
    assert_eq!(paths, vec!["/team/7", "/space/55", "/folder/66", "/space/55/list"]);
}

#[tokio::test]
async fn test_create_list_posts_name_and_content() {
    let transport = FakeTransport::scripted(vec![
        json_reply(200, json!({"id": "903", "name": "Backlog", "content": "Later"})),
        json_reply(200, json!({"id": "904", "name": "Bare"})),
    ]);
    let (client, _clock) = client_with(transport.clone());

    let list = client.create_list("66", "Backlog", Some("Later")).await.unwrap();
    assert_eq!(list.id.as_str(), "903");
    assert_eq!(list.content.as_deref(), Some("Later"));
    client.create_list("66", "Bare", None).await.unwrap();
    assert!(matches!(
        client.create_list("66", "  ", None).await,
        Err(ApiError::Validation(_))
    ));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].path, "/folder/66/list");
    assert_eq!(requests[0].body, Some(json!({"name": "Backlog", "content": "Later"})));
    assert_eq!(requests[1].body, Some(json!({"name": "Bare"})));
}

#[tokio::test]
async fn test_delete_task_sends_delete() {
    let transport = FakeTransport::scripted(vec![json_reply(200, json!({}))]);
    let (client, _clock) = client_with(transport.clone());

    client.delete_task("t9").await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.method, HttpMethod::Delete);
    assert_eq!(request.path, "/task/t9");
    assert_eq!(request.body, None);
}

#[tokio::test]
async fn test_missing_resources_are_not_found() {
    let transport = FakeTransport::responding(|_| json_reply(404, json!({"err": "Not found", "ECODE": "ITEM_015"})));
    let (client, _clock) = client_with(transport.clone());

    assert!(matches!(client.get_folder("404").await, Err(ApiError::NotFound(_))));
    assert!(matches!(client.get_space("404").await, Err(ApiError::NotFound(_))));
    assert!(matches!(client.delete_task("404").await, Err(ApiError::NotFound(_))));
    // not retried
    assert_eq!(transport.calls(), 3);
}
