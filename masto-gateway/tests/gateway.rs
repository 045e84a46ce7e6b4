//! End-to-end tests against a local axum server.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures::StreamExt;
use masto_gateway::{
    CallOptions, ErrorKind, Gateway, GatewayError, KeyCase, LoginParams, MULTIPART_FORM_DATA,
    PageDirective,
};
use serde::Deserialize;
use serde_json::{Value, json};

async fn instance(State(addr): State<SocketAddr>) -> Json<Value> {
    Json(json!({
        "uri": "example.com",
        "version": "4.2.1",
        "urls": { "streaming_api": format!("ws://{addr}") },
    }))
}

async fn verify_credentials(headers: HeaderMap) -> Response {
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some("Bearer secret") => Json(json!({
            "id": "1",
            "display_name": "Alice",
            "source": { "follow_requests_count": 0 },
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "The access token is invalid"})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct TimelineQuery {
    max_id: Option<String>,
    limit: Option<usize>,
}

async fn timeline(State(addr): State<SocketAddr>, Query(query): Query<TimelineQuery>) -> Response {
    let limit = query.limit.unwrap_or(2);
    let ids: Vec<u32> = match query.max_id.as_deref() {
        None => (1..=3).rev().take(limit).collect(),
        Some(max) => {
            let max: u32 = max.parse().unwrap_or(0);
            (1..max).rev().take(limit).collect()
        }
    };
    let body: Vec<Value> = ids.iter().map(|id| json!({"id": id.to_string()})).collect();

    match ids.last() {
        Some(&last) if last > 1 => {
            let link = format!(
                r#"<http://{addr}/api/v1/timelines/home?max_id={last}&limit={limit}>; rel="next", <http://{addr}/api/v1/timelines/home?min_id=3>; rel="prev""#
            );
            ([(header::LINK, link)], Json(body)).into_response()
        }
        _ => Json(body).into_response(),
    }
}

async fn create_status(headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let received: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let keys: Vec<String> = received
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();
    Json(json!({
        "content_type": content_type,
        "received_keys": keys,
        "echo": received,
    }))
    .into_response()
}

async fn upload_media(headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let text = String::from_utf8_lossy(&body);
    Json(json!({
        "multipart": content_type.starts_with("multipart/form-data; boundary="),
        "has_description": text.contains(r#"name="description""#),
        "has_focus": text.contains(r#"name="focus[x]""#),
    }))
    .into_response()
}

async fn teapot() -> impl IntoResponse {
    (StatusCode::IM_A_TEAPOT, "short and stout")
}

async fn gone() -> impl IntoResponse {
    (StatusCode::GONE, Json(json!({"error": "This account is gone"})))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({}))
}

async fn spawn_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new()
        .route("/api/v1/instance", get(instance))
        .route("/api/v1/accounts/verify_credentials", get(verify_credentials))
        .route("/api/v1/timelines/home", get(timeline))
        .route("/api/v1/statuses", post(create_status))
        .route("/api/v2/media", post(upload_media))
        .route("/teapot", get(teapot))
        .route("/gone", get(gone))
        .route("/slow", get(slow))
        .with_state(addr);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_login_discovers_instance() {
    let addr = spawn_server().await;
    let gateway = Gateway::login(LoginParams::new(format!("http://{addr}")).access_token("secret"))
        .await
        .unwrap();

    let config = gateway.config();
    assert_eq!(config.remote_version().map(ToString::to_string).as_deref(), Some("4.2.1"));
    assert_eq!(config.streaming_uri().to_string(), format!("ws://{addr}/"));
}

#[tokio::test]
async fn test_get_with_credentials() {
    let addr = spawn_server().await;
    let gateway = Gateway::builder(format!("http://{addr}"))
        .access_token("secret")
        .build()
        .unwrap();

    let account = gateway
        .get::<Value, _>("/api/v1/accounts/verify_credentials", &())
        .await
        .unwrap();
    assert_eq!(account["displayName"], "Alice");
    assert_eq!(account["source"]["followRequestsCount"], 0);
    assert!(account.metadata().contains("content-type"));
}

#[tokio::test]
async fn test_preserve_key_case() {
    let addr = spawn_server().await;
    let gateway = Gateway::builder(format!("http://{addr}"))
        .access_token("secret")
        .key_case(KeyCase::Preserve)
        .build()
        .unwrap();

    let account = gateway
        .get::<Value, _>("/api/v1/accounts/verify_credentials", &())
        .await
        .unwrap();
    assert_eq!(account["display_name"], "Alice");
}

#[tokio::test]
async fn test_unauthorized_is_classified() {
    let addr = spawn_server().await;
    let gateway = Gateway::builder(format!("http://{addr}")).build().unwrap();

    let err = gateway
        .get::<Value, _>("/api/v1/accounts/verify_credentials", &())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(err.as_api().unwrap().message(), "The access token is invalid");

    let err = gateway.get::<Value, _>("/gone", &()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Gone);
}

#[tokio::test]
async fn test_unclassified_status_is_passed_through() {
    let addr = spawn_server().await;
    let gateway = Gateway::builder(format!("http://{addr}")).build().unwrap();

    let err = gateway.get::<Value, _>("/teapot", &()).await.unwrap_err();
    match err {
        GatewayError::Http { status, body, .. } => {
            assert_eq!(status, StatusCode::IM_A_TEAPOT);
            assert_eq!(&body[..], b"short and stout");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_json_body_is_snake_cased() {
    let addr = spawn_server().await;
    let gateway = Gateway::builder(format!("http://{addr}")).build().unwrap();

    let response = gateway
        .post::<Value, _>(
            "/api/v1/statuses",
            &json!({"status": "hello", "inReplyToId": "9", "mediaIds": ["1", "2"]}),
        )
        .await
        .unwrap();
    assert_eq!(response["contentType"], "application/json");
    assert_eq!(
        response["receivedKeys"],
        json!(["in_reply_to_id", "media_ids", "status"])
    );
    assert_eq!(
        response["echo"],
        json!({"status": "hello", "inReplyToId": "9", "mediaIds": ["1", "2"]})
    );
}

#[tokio::test]
async fn test_multipart_upload() {
    let addr = spawn_server().await;
    let gateway = Gateway::builder(format!("http://{addr}")).build().unwrap();

    let response = gateway
        .post_with_options::<Value, _>(
            "/api/v2/media",
            &json!({"description": "a cat", "focus": {"x": 0.5, "y": -0.2}}),
            CallOptions::new().content_type(MULTIPART_FORM_DATA),
        )
        .await
        .unwrap();
    assert_eq!(response["multipart"], true);
    assert_eq!(response["hasDescription"], true);
    assert_eq!(response["hasFocus"], true);
}

#[tokio::test]
async fn test_timeout() {
    let addr = spawn_server().await;
    let gateway = Gateway::builder(format!("http://{addr}"))
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let err = gateway.get::<Value, _>("/slow", &()).await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_pagination_follows_links() {
    let addr = spawn_server().await;
    let gateway = Gateway::builder(format!("http://{addr}")).build().unwrap();

    let mut timeline = gateway
        .paginate::<Vec<Value>, _>("/api/v1/timelines/home", &())
        .unwrap();

    let first = timeline.next_page().await.unwrap().unwrap();
    assert_eq!(first, vec![json!({"id": "3"}), json!({"id": "2"})]);

    let second = timeline.next_page().await.unwrap().unwrap();
    assert_eq!(second, vec![json!({"id": "1"})]);
    assert!(timeline.is_exhausted());
    assert_eq!(timeline.next_page().await.unwrap(), None);

    let again = timeline
        .advance(Some(PageDirective::Reset))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again, first);
}

#[tokio::test]
async fn test_pagination_stream() {
    let addr = spawn_server().await;
    let gateway = Gateway::builder(format!("http://{addr}")).build().unwrap();

    let pages: Vec<Vec<Value>> = gateway
        .paginate::<Vec<Value>, _>("/api/v1/timelines/home", &json!({"limit": 1}))
        .unwrap()
        .into_stream()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[2], vec![json!({"id": "1"})]);
}
