use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub type Hits = Arc<AtomicU64>;

pub fn app() -> Router {
    let hits: Hits = Arc::new(AtomicU64::new(0));
    Router::new()
        .route("/echo", any(echo))
        .route("/text", get(text))
        .route("/json", get(json))
        .route("/hits", get(count_hit))
        .route("/status/{code}", get(status))
        .route("/redirect", get(redirect))
        .route("/slow", get(slow))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.as_str().to_string(),
        headers,
        body,
    })
}

async fn text() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        AppendHeaders([("x-dup", "first"), ("x-dup", "second")]),
        "hello",
    )
}

async fn json() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "id": 1, "title": "delectus aut autem", "completed": false }))
}

async fn count_hit(State(hits): State<Hits>) -> String {
    (hits.fetch_add(1, Ordering::SeqCst) + 1).to_string()
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/text")], "moved")
}

/// How long `/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

async fn slow() -> &'static str {
    tokio::time::sleep(SLOW_DELAY).await;
    "late"
}
