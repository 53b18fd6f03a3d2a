//! Integration tests for the reqwest transport against a mock server

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clickup_toolkit::client::{
    Credentials, HttpTransport, ManualClock, RateLimiter, RequestEnvelope, ReqwestTransport,
    ResourceClient, RetryPolicy, RetryingTransport, TaskQuery, TransportFailureKind,
};
use clickup_toolkit::ApiError;

use crate::support::task_json;

fn transport(base_url: &str, credentials: Credentials) -> ReqwestTransport {
    ReqwestTransport::new(
        base_url,
        credentials,
        Duration::from_secs(5),
        Duration::from_secs(2),
    )
    .unwrap()
}

fn client(server: &MockServer) -> (ResourceClient, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(60), clock.clone()));
    let inner = Arc::new(transport(&server.uri(), Credentials::api_token("pk_test_token")));
    let retrying = RetryingTransport::new(inner, limiter)
        .with_policy(RetryPolicy::default().with_max_retries(2).without_jitter());
    (ResourceClient::new(retrying), clock)
}

#[tokio::test]
async fn test_raw_token_sent_as_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/team"))
        .and(header("Authorization", "pk_test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"teams": [{"id": "1", "name": "Eng"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _clock) = client(&server);
    let workspaces = client.list_workspaces().await.unwrap();
    assert_eq!(workspaces[0].name, "Eng");
}

#[tokio::test]
async fn test_client_credentials_send_secret() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("Authorization", "app-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"id": 1}})))
        .expect(1)
        .mount(&server)
        .await;

    let inner = transport(&server.uri(), Credentials::client("app-id", "app-secret"));
    let response = inner.send(&RequestEnvelope::get("/user")).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_query_and_body_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list/901/task"))
        .and(query_param("statuses[]", "open"))
        .and(query_param("include_closed", "true"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [task_json("t1", "First", "open")],
            "last_page": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/task/t1"))
        .and(body_json(json!({"status": "done"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json("t1", "First", "done")))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _clock) = client(&server);
    let query = TaskQuery {
        statuses: vec!["open".to_string()],
        include_closed: true,
        ..TaskQuery::default()
    };
    let tasks = client.list_all_tasks("901", &query).await.unwrap();
    assert_eq!(tasks.len(), 1);

    let update = clickup_toolkit::client::TaskUpdate {
        status: Some("done".to_string()),
        ..Default::default()
    };
    let updated = client.update_task("t1", &update).await.unwrap();
    assert_eq!(updated.status.status, "done");
}

#[tokio::test]
async fn test_retry_after_honoured_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list/901"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "4")
                .set_body_json(json!({"err": "Rate limit reached", "ECODE": "APP_002"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list/901"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "901", "name": "Backlog"})))
        .mount(&server)
        .await;

    let (client, clock) = client(&server);
    let list = client.get_list("901").await.unwrap();
    assert_eq!(list.name, "Backlog");
    assert!(clock.total_slept() >= Duration::from_secs(4));
}

#[tokio::test]
async fn test_error_body_reaches_caller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/task/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"err": "Task not found", "ECODE": "ITEM_013"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _clock) = client(&server);
    match client.get_task("missing").await {
        Err(ApiError::NotFound(message)) => assert!(message.contains("Task not found")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_refused_connection_is_connect_failure() {
    // port 1 is reserved and nothing listens on it
    let inner = transport("http://127.0.0.1:1", Credentials::api_token("pk"));
    let failure = inner.send(&RequestEnvelope::get("/team")).await.unwrap_err();
    assert_eq!(failure.kind, TransportFailureKind::Connect);
}
