//! HTTP surface tests against the assembled router
//!
//! Publishing uses the in-process transport, so no Redis is required.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use notification_hub::bus::LocalTransport;
use notification_hub::config::{
    ApiConfig, HubConfig, JwtConfig, RedisConfig, ServerConfig, Settings, WebSocketConfig,
};
use notification_hub::hub::{ConnectionLimits, Hub, HubHandle, UserId};
use notification_hub::notification::{
    Envelope, NotificationPublisher, UnreadCounter, ZeroUnreadCounter,
};
use notification_hub::server::{create_app, AppState, API_KEY_HEADER};

const API_KEY: &str = "test-api-key";

fn test_settings() -> Settings {
    Settings {
        server: ServerConfig::default(),
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            issuer: None,
            audience: None,
        },
        redis: RedisConfig {
            enabled: false,
            ..Default::default()
        },
        api: ApiConfig {
            key: Some(API_KEY.to_string()),
        },
        websocket: WebSocketConfig::default(),
        hub: HubConfig::default(),
    }
}

fn test_app() -> (Router, HubHandle) {
    test_app_with(test_settings())
}

fn test_app_with(settings: Settings) -> (Router, HubHandle) {
    let (hub, worker) = Hub::new(ConnectionLimits::default(), 64);
    tokio::spawn(worker.run());

    let counter: Arc<dyn UnreadCounter> = Arc::new(ZeroUnreadCounter);
    let publisher =
        NotificationPublisher::new(Arc::new(LocalTransport::new(hub.clone())), counter.clone());
    let state = AppState::new(settings, hub.clone(), publisher, counter);

    (create_app(state), hub)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn publish_request(body: Value, api_key: Option<&str>) -> Request<Body> {
    post_request("/api/v1/notifications/publish", body, api_key)
}

fn post_request(uri: &str, body: Value, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_reports_hub_and_transport() {
    let (app, _hub) = test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["bus"]["transport"], "local");
    assert_eq!(body["connections"]["total_connections"], 0);
}

#[tokio::test]
async fn test_stats_counts_connections() {
    let (app, hub) = test_app();
    let (tx, _rx) = mpsc::channel(4);
    hub.register(UserId(7), tx).await.unwrap();

    let response = app
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["connections"]["total_connections"], 1);
    assert_eq!(body["connections"]["unique_users"], 1);
    assert_eq!(body["max_connections_per_user"], 10);
}

#[tokio::test]
async fn test_publish_requires_api_key() {
    let (app, _hub) = test_app();
    let body = json!({"user_id": 7});

    let response = app
        .clone()
        .oneshot(publish_request(body.clone(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(publish_request(body, Some("wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_publish_delivers_envelope_to_connected_user() {
    let (app, hub) = test_app();
    let (tx, mut rx) = mpsc::channel(4);
    hub.register(UserId(7), tx).await.unwrap();

    let body = json!({
        "user_id": 7,
        "message": {"message_id": "n-1", "message": "New follower", "category": "social"},
        "deltas": {"notice": 1}
    });
    let response = app
        .oneshot(publish_request(body, Some(API_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let counts = body_json(response).await;
    assert_eq!(counts["unread_notice_count"], 1);
    assert_eq!(counts["unread_message_count"], 0);

    let frame = rx.recv().await.unwrap();
    let envelope: Envelope = serde_json::from_str(&frame).unwrap();
    assert!(envelope.new_message);
    assert_eq!(envelope.message.message_id, "n-1");
    assert_eq!(envelope.message.uid, 7);
    assert_eq!(envelope.counts.unread_notice_count, 1);
}

#[tokio::test]
async fn test_publish_rejects_mismatched_uid() {
    let (app, _hub) = test_app();

    let body = json!({"user_id": 7, "message": {"uid": 8}});
    let response = app
        .oneshot(publish_request(body, Some(API_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_hub_gauges() {
    let (app, _hub) = test_app();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("notification_hub_connections_total"));
}

#[tokio::test]
async fn test_broadcast_reaches_every_connected_user() {
    let (app, hub) = test_app();
    let (tx_a, mut rx_a) = mpsc::channel(4);
    let (tx_b, mut rx_b) = mpsc::channel(4);
    hub.register(UserId(7), tx_a).await.unwrap();
    hub.register(UserId(8), tx_b).await.unwrap();

    let body = json!({"maintenance": true});
    let response = app
        .oneshot(post_request(
            "/api/v1/notifications/broadcast",
            body.clone(),
            Some(API_KEY),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    for rx in [&mut rx_a, &mut rx_b] {
        let frame: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame, body);
    }
}

#[tokio::test]
async fn test_broadcast_requires_api_key_and_object_body() {
    let (app, _hub) = test_app();
    let uri = "/api/v1/notifications/broadcast";

    let response = app
        .clone()
        .oneshot(post_request(uri, json!({"maintenance": true}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post_request(uri, json!("text"), Some(API_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_allows_only_configured_origins() {
    let mut settings = test_settings();
    settings.server.cors_origins = vec!["https://app.example.com".to_string()];
    let (app, _hub) = test_app_with(settings);

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/notifications/publish")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(preflight("https://app.example.com"))
        .await
        .unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://app.example.com"
    );

    let response = app
        .oneshot(preflight("https://evil.example.net"))
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
