use std::net::SocketAddr;

use axum::{
    Extension, Router,
    response::{Html, Redirect},
    routing::{get, post},
};
use tower_tempdata::{CookieBackend, CookieTempDataConfig, Key, SameSite, TempData, TempDataLayer};

async fn index(Extension(temp_data): Extension<TempData>) -> Html<String> {
    let flash = temp_data
        .get("flash")
        .await
        .expect("temp data get succeeds")
        .and_then(|value| value.as_str().map(str::to_owned))
        .unwrap_or_default();
    Html(format!(
        "<p>{flash}</p><form method=\"post\" action=\"/save\"><button>save</button></form>"
    ))
}

async fn save(Extension(temp_data): Extension<TempData>) -> Redirect {
    temp_data
        .insert("flash", "Saved.")
        .await
        .expect("temp data insert succeeds");
    Redirect::to("/")
}

#[tokio::main]
async fn main() {
    let key = Key::generate();
    let config = CookieTempDataConfig::default()
        // Default: ".tempdata"
        .with_name(".tempdata")
        // Default: true
        .with_http_only(true)
        // Default: None
        .with_same_site(SameSite::Lax)
        // Default: true (set to false for local HTTP development)
        .with_secure(false)
        // Default: the request's PathBase, or "/"
        .with_path("/")
        // Default: None
        .without_domain()
        // Default: 4096
        .with_max_cookie_bytes(4096);
    let backend = CookieBackend::private(key).with_config(config);

    let app = Router::new()
        .route("/", get(index))
        .route("/save", post(save))
        .layer(TempDataLayer::new(backend));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    println!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
