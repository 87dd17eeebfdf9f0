#![allow(dead_code)]

// Shared helpers for integration tests.
//
// Cookies are parsed from `Set-Cookie` with `tower_cookies::Cookie` and sent back as plain
// `name=value` pairs, the way a browser would.
use axum::{
    Extension, Router,
    body::Body,
    response::{IntoResponse, Redirect},
    routing::get,
};
use http::{HeaderMap, Request, header};
use http_body_util::BodyExt as _;
use tower::ServiceExt as _;
use tower_cookies::Cookie;
use tower_tempdata::{KeepTempData, Protector, Result, TempData};

/// Protector that leaves bytes untouched, so tests can predict cookie values.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughProtector;

impl Protector for PassThroughProtector {
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>> {
        Ok(protected.to_vec())
    }
}

pub async fn body_string(body: Body) -> String {
    // Collect an Axum body into a UTF-8 string for assertions.
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<Cookie<'static>> {
    // Responses can carry several `Set-Cookie` headers (temp data plus session id).
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| {
            let value = value.to_str().expect("set-cookie header is valid utf-8");
            Cookie::parse_encoded(value)
                .expect("set-cookie parses successfully")
                .into_owned()
        })
        .find(|cookie| cookie.name() == name)
}

pub fn get_cookie(headers: &HeaderMap, name: &str) -> Cookie<'static> {
    find_cookie(headers, name).expect("response sets the cookie")
}

pub fn is_removal(cookie: &Cookie<'_>) -> bool {
    cookie.value().is_empty() && cookie.max_age() == Some(time::Duration::ZERO)
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    format!("{}={}", cookie.name(), cookie.value())
}

pub async fn send(app: &Router, uri: &str, cookie: Option<&Cookie<'_>>) -> http::Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie_header_value(cookie));
    }
    let req = builder
        .body(Body::empty())
        .expect("request builds successfully");
    app.clone().oneshot(req).await.expect("service call succeeds")
}

/// Routes that mirror how an application uses temp data: write, read once, peek, redirect.
pub fn routes() -> Router {
    Router::new()
        .route(
            "/set",
            get(|Extension(temp_data): Extension<TempData>| async move {
                temp_data
                    .insert("greeting", "hi")
                    .await
                    .expect("temp data insert succeeds");
            }),
        )
        .route(
            "/get",
            get(|Extension(temp_data): Extension<TempData>| async move {
                read_greeting(&temp_data).await
            }),
        )
        .route(
            "/peek",
            get(|Extension(temp_data): Extension<TempData>| async move {
                temp_data
                    .peek("greeting")
                    .await
                    .expect("temp data peek succeeds")
                    .and_then(|value| value.as_str().map(str::to_owned))
                    .unwrap_or_else(|| "none".to_string())
            }),
        )
        .route(
            "/get-and-redirect",
            get(|Extension(temp_data): Extension<TempData>| async move {
                read_greeting(&temp_data).await;
                Redirect::to("/get")
            }),
        )
        .route(
            "/get-and-keep",
            get(|Extension(temp_data): Extension<TempData>| async move {
                let greeting = read_greeting(&temp_data).await;
                (Extension(KeepTempData), greeting).into_response()
            }),
        )
        .route("/noop", get(|| async { "noop" }))
}

async fn read_greeting(temp_data: &TempData) -> String {
    temp_data
        .get("greeting")
        .await
        .expect("temp data get succeeds")
        .and_then(|value| value.as_str().map(str::to_owned))
        .unwrap_or_else(|| "none".to_string())
}
