//! A small demo API used by the integration tests and the examples in the
//! docs. Every request except `/hits` is counted per path so tests can
//! observe how many requests really reached the server.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

pub const ZEN: &str = "Half measures are as bad as nothing at all.";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub login: String,
    pub id: u64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub stars: u32,
}

/// What `/echo` saw of the request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    /// Lowercased header names.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub type Hits = Arc<RwLock<HashMap<String, u64>>>;

pub fn app() -> Router {
    let hits: Hits = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/zen", get(zen))
        .route("/users/{name}", get(user))
        .route("/users/{name}/repos", get(repos))
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/delay/{ms}", get(delay))
        .route("/files/{name}", get(file))
        .route("/hits", get(list_hits))
        .layer(middleware::from_fn_with_state(hits.clone(), count_hit))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn count_hit(State(hits): State<Hits>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if path != "/hits" {
        tracing::debug!(method = %request.method(), %path, "hit");
        *hits.write().await.entry(path).or_insert(0) += 1;
    }
    next.run(request).await
}

fn known_user(name: &str) -> Option<User> {
    let (id, full_name) = match name {
        "ashfurrow" => (498212, "Ash Furrow"),
        "octocat" => (583231, "The Octocat"),
        _ => return None,
    };
    Some(User {
        login: name.to_string(),
        id,
        name: full_name.to_string(),
    })
}

async fn zen() -> &'static str {
    ZEN
}

async fn user(Path(name): Path<String>) -> Result<Json<User>, StatusCode> {
    known_user(&name).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn repos(Path(name): Path<String>) -> Result<Json<Vec<Repository>>, StatusCode> {
    let user = known_user(&name).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(vec![
        Repository {
            name: format!("{}-dotfiles", user.login),
            stars: 12,
        },
        Repository {
            name: format!("{}-blog", user.login),
            stars: 3,
        },
    ]))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid status code").into_response(),
    }
}

async fn delay(Path(ms): Path<u64>) -> String {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    format!("delayed {ms}ms")
}

async fn file(Path(name): Path<String>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        format!("contents of {name}").into_bytes(),
    )
}

async fn list_hits(State(hits): State<Hits>) -> Json<BTreeMap<String, u64>> {
    let hits = hits.read().await;
    Json(hits.iter().map(|(k, v)| (k.clone(), *v)).collect())
}
