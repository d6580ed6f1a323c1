use std::time::Duration;

use board_remote::{sign_in, Api, ErrorKind, RemoteSettings, RestApi, RowQuery, SortDir};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> RestApi {
    RestApi::new(RemoteSettings::new(server.uri(), "anon-key")).expect("client")
}

#[tokio::test]
async fn fetch_rows_applies_filter_order_and_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("channel_id", "eq.chan-1"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "50"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "m2", "content": "newer"},
            {"id": "m1", "content": "older"}
        ])))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let query = RowQuery::ordered("created_at", SortDir::Descending)
        .eq("channel_id", "chan-1")
        .limit(50);
    let rows = api.fetch_rows("messages", &query).await.expect("rows");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], "m2");
}

#[tokio::test]
async fn session_token_replaces_the_key_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let api = api_for(&server).with_session("session-token");
    let rows = api
        .fetch_rows("tasks", &RowQuery::default())
        .await
        .expect("rows");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn fetch_rows_maps_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api
        .fetch_rows("tasks", &RowQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::HttpStatus(500));
}

#[tokio::test]
async fn unauthorized_fetch_maps_to_auth_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api
        .fetch_rows("tasks", &RowQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthRejected);
}

#[tokio::test]
async fn fetch_rows_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let mut settings = RemoteSettings::new(server.uri(), "anon-key");
    settings.request_timeout = Duration::from_millis(50);
    let api = RestApi::new(settings).expect("client");

    let err = api
        .fetch_rows("tasks", &RowQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn update_row_patches_and_returns_the_representation() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("id", "eq.t1"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(json!({"status": "in-progress"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "t1", "status": "in-progress"}
        ])))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let row = api
        .update_row("tasks", "t1", json!({"status": "in-progress"}))
        .await
        .expect("updated row");
    assert_eq!(row["status"], "in-progress");
}

#[tokio::test]
async fn update_matching_no_rows_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api
        .update_row("tasks", "gone", json!({"status": "review"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn insert_row_posts_and_accepts_a_bare_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .and(body_json(json!({
            "channel_id": "chan-1",
            "sender_id": "user-1",
            "content": "hello",
            "message_type": "text"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!(
            {"id": "m9", "channel_id": "chan-1", "content": "hello"}
        )))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let row = api
        .insert_row(
            "messages",
            json!({
                "channel_id": "chan-1",
                "sender_id": "user-1",
                "content": "hello",
                "message_type": "text"
            }),
        )
        .await
        .expect("created row");
    assert_eq!(row["id"], "m9");
}

#[tokio::test]
async fn sign_in_exchanges_credentials_for_a_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_json(json!({
            "email": "ada@studio.example",
            "password": "hunter2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 3600,
            "user": {"id": "user-1"}
        })))
        .mount(&server)
        .await;

    let settings = RemoteSettings::new(server.uri(), "anon-key");
    let session = sign_in(&settings, "ada@studio.example", "hunter2")
        .await
        .expect("session");
    assert_eq!(session.access_token, "tok-1");
    assert_eq!(session.user_id, "user-1");
    assert!(!session.is_expired(chrono::Utc::now()));
}

#[tokio::test]
async fn sign_in_maps_client_errors_to_auth_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let settings = RemoteSettings::new(server.uri(), "anon-key");
    let err = sign_in(&settings, "ada@studio.example", "wrong")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthRejected);
}
