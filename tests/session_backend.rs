mod common;

use axum::{Extension, Router, extract::Path, routing::get};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use tower_sessions::{MemoryStore, SessionManagerLayer};
use serde_json::{Value, json};
use tower_tempdata::{
    DEFAULT_SESSION_KEY, Error, Session, SessionBackend, TempData, TempDataLayer, TempMap,
    TempValue, format,
};

const SESSION_COOKIE: &str = "id";

fn app() -> Router {
    app_with(SessionBackend::new())
}

fn app_with(backend: SessionBackend) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
    let read_key = backend.key().to_string();
    let write_key = read_key.clone();

    common::routes()
        .route(
            "/slot",
            get(|Extension(session): Extension<Session>| async move {
                match session
                    .get_value(&read_key)
                    .await
                    .expect("session get succeeds")
                {
                    Some(Value::String(encoded)) => encoded,
                    Some(other) => format!("unexpected:{other}"),
                    None => "empty".to_string(),
                }
            }),
        )
        .route(
            "/slot/{content}",
            get(
                |Extension(session): Extension<Session>, Path(content): Path<String>| async move {
                    // Written behind the backend's back, as an older or buggy deployment might.
                    let value = match content.as_str() {
                        "number" => json!(42),
                        "not-base64" => json!("***"),
                        "future-version" => json!(STANDARD.encode([0x02, 0x00])),
                        other => panic!("unknown slot content {other}"),
                    };
                    session
                        .insert_value(&write_key, value)
                        .await
                        .expect("session insert succeeds");
                },
            ),
        )
        .layer(TempDataLayer::new(backend))
        .layer(session_layer)
}

#[tokio::test]
async fn values_survive_exactly_one_request() {
    let app = app();

    let res = common::send(&app, "/set", None).await;
    let session_cookie = common::get_cookie(res.headers(), SESSION_COOKIE);

    let res = common::send(&app, "/get", Some(&session_cookie)).await;
    assert_eq!(common::body_string(res.into_body()).await, "hi");

    let res = common::send(&app, "/get", Some(&session_cookie)).await;
    assert_eq!(common::body_string(res.into_body()).await, "none");
}

#[tokio::test]
async fn slot_holds_base64_of_the_binary_payload() {
    let app = app();

    let res = common::send(&app, "/set", None).await;
    let session_cookie = common::get_cookie(res.headers(), SESSION_COOKIE);

    let res = common::send(&app, "/slot", Some(&session_cookie)).await;
    let encoded = common::body_string(res.into_body()).await;

    let mut expected = TempMap::new();
    expected.insert("greeting".to_string(), TempValue::from("hi"));
    let bytes = STANDARD.decode(encoded).expect("slot is standard base64");
    assert_eq!(format::decode(&bytes).expect("slot decodes"), expected);
}

#[tokio::test]
async fn reading_everything_clears_the_slot() {
    let app = app();

    let res = common::send(&app, "/set", None).await;
    let session_cookie = common::get_cookie(res.headers(), SESSION_COOKIE);

    common::send(&app, "/get", Some(&session_cookie)).await;
    let res = common::send(&app, "/slot", Some(&session_cookie)).await;

    assert_eq!(common::body_string(res.into_body()).await, "empty");
}

#[tokio::test]
async fn redirect_keeps_values_in_the_session() {
    let app = app();

    let res = common::send(&app, "/set", None).await;
    let session_cookie = common::get_cookie(res.headers(), SESSION_COOKIE);

    let res = common::send(&app, "/get-and-redirect", Some(&session_cookie)).await;
    assert!(res.status().is_redirection());

    let res = common::send(&app, "/get", Some(&session_cookie)).await;
    assert_eq!(common::body_string(res.into_body()).await, "hi");
}

#[tokio::test]
async fn missing_session_layer_surfaces_to_the_handler() {
    let app = Router::new()
        .route(
            "/",
            get(|Extension(temp_data): Extension<TempData>| async move {
                match temp_data.get("greeting").await {
                    Err(Error::SessionUnavailable) => "unavailable".to_string(),
                    Err(err) => format!("other:{err}"),
                    Ok(_) => "loaded".to_string(),
                }
            }),
        )
        .layer(TempDataLayer::session());

    let res = common::send(&app, "/", None).await;

    assert_eq!(common::body_string(res.into_body()).await, "unavailable");
}

#[tokio::test]
async fn unreadable_slot_reads_as_empty() {
    for content in ["number", "not-base64", "future-version"] {
        let app = app();

        let res = common::send(&app, &format!("/slot/{content}"), None).await;
        let session_cookie = common::get_cookie(res.headers(), SESSION_COOKIE);

        let res = common::send(&app, "/get", Some(&session_cookie)).await;
        assert_eq!(res.status(), http::StatusCode::OK, "{content}");
        assert_eq!(common::body_string(res.into_body()).await, "none", "{content}");

        // The load counted as a read of nothing, so the bad slot is dropped on save.
        let res = common::send(&app, "/slot", Some(&session_cookie)).await;
        assert_eq!(common::body_string(res.into_body()).await, "empty", "{content}");
    }
}

#[tokio::test]
async fn custom_slot_key_is_used() {
    assert_eq!(SessionBackend::new().key(), DEFAULT_SESSION_KEY);
    let app = app_with(SessionBackend::new().with_key("flash"));

    let res = common::send(&app, "/set", None).await;
    let session_cookie = common::get_cookie(res.headers(), SESSION_COOKIE);

    let res = common::send(&app, "/slot", Some(&session_cookie)).await;
    assert_ne!(common::body_string(res.into_body()).await, "empty");

    let res = common::send(&app, "/get", Some(&session_cookie)).await;
    assert_eq!(common::body_string(res.into_body()).await, "hi");
}
