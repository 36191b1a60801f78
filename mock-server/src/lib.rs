use std::{collections::BTreeMap, env, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub const DEDICATED_ENDPOINTS_ENV: &str = "MOCK_DEDICATED_ENDPOINTS";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub post: u64,
    pub content: String,
    pub approved: bool,
    pub admin_reply: Option<String>,
}

/// The post reference may arrive as a number or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PostRef {
    Number(u64),
    Text(String),
}

impl PostRef {
    pub fn resolve(&self) -> Option<u64> {
        match self {
            PostRef::Number(n) => Some(*n),
            PostRef::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    pub post: PostRef,
    pub content: String,
    #[serde(default)]
    pub admin_reply: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub post: Option<String>,
    pub approved: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub comment_ids: Vec<Value>,
}

/// Which optional routes the server registers.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Serve `/all/` and `/pending-count/`. Off simulates a backend that
    /// predates them, so clients must use their fallbacks.
    pub dedicated_endpoints: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dedicated_endpoints: true,
        }
    }
}

impl Options {
    pub fn from_env() -> Self {
        let dedicated_endpoints = match env::var(DEDICATED_ENDPOINTS_ENV) {
            Ok(value) => !matches!(value.trim().to_ascii_lowercase().as_str(), "false" | "0" | "off"),
            Err(_) => true,
        };
        Self { dedicated_endpoints }
    }
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    comments: BTreeMap<u64, Comment>,
}

impl Store {
    pub fn insert(&mut self, post: u64, content: String, admin_reply: Option<String>) -> Comment {
        self.next_id += 1;
        let comment = Comment {
            id: self.next_id,
            post,
            content,
            approved: false,
            admin_reply,
        };
        self.comments.insert(comment.id, comment.clone());
        comment
    }

    /// Newest first.
    fn filtered(&self, post: Option<u64>, approved: Option<bool>) -> Vec<Comment> {
        self.comments
            .values()
            .rev()
            .filter(|c| post.map_or(true, |p| c.post == p))
            .filter(|c| approved.map_or(true, |a| c.approved == a))
            .cloned()
            .collect()
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Options::default())
}

pub fn app_with(options: Options) -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let mut router = Router::new()
        .route("/api/comments/", get(list_comments).post(create_comment))
        .route("/api/comments/pending_count/", get(pending_count))
        .route("/api/comments/bulk_approve/", post(bulk_approve))
        .route("/api/comments/bulk_reject/", post(bulk_reject))
        .route("/api/comments/{id}/approve/", post(approve_comment))
        .route("/api/comments/{id}/reject/", post(reject_comment));
    if options.dedicated_endpoints {
        router = router
            .route("/api/comments/all/", get(all_for_post))
            .route("/api/comments/pending-count/", get(pending_count));
    }
    router.with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Options::default()).await
}

pub async fn run_with(listener: TcpListener, options: Options) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(options)).await
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." })))
}

fn parse_post_param(raw: Option<&str>) -> Result<Option<u64>, (StatusCode, Json<Value>)> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| bad_request("Invalid post ID")),
    }
}

fn parse_approved_param(raw: Option<&str>) -> Option<bool> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

fn parse_ids(raw: &[Value]) -> Vec<u64> {
    raw.iter()
        .filter_map(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect()
}

async fn list_comments(State(db): State<Db>, Query(params): Query<ListParams>) -> Result<Json<Vec<Comment>>, (StatusCode, Json<Value>)> {
    let post = parse_post_param(params.post.as_deref())?;
    let approved = parse_approved_param(params.approved.as_deref());
    debug!(?post, ?approved, "list comments");
    Ok(Json(db.read().await.filtered(post, approved)))
}

async fn create_comment(
    State(db): State<Db>,
    Json(input): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>), (StatusCode, Json<Value>)> {
    let post = input.post.resolve().ok_or_else(|| bad_request("Invalid post ID"))?;
    let comment = db.write().await.insert(post, input.content, input.admin_reply);
    debug!(id = comment.id, post, "created comment");
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn all_for_post(State(db): State<Db>, Query(params): Query<ListParams>) -> ApiResult {
    let post = parse_post_param(params.post.as_deref())?.ok_or_else(|| bad_request("Post ID is required"))?;
    let store = db.read().await;
    let approved = store.filtered(Some(post), Some(true));
    let pending = store.filtered(Some(post), Some(false));
    let total = approved.len() + pending.len();
    Ok(Json(json!({ "approved": approved, "pending": pending, "total": total })))
}

async fn pending_count(State(db): State<Db>) -> Json<Value> {
    let count = db.read().await.filtered(None, Some(false)).len();
    Json(json!({ "count": count }))
}

async fn approve_comment(State(db): State<Db>, Path(id): Path<u64>) -> ApiResult {
    let mut store = db.write().await;
    let comment = store.comments.get_mut(&id).ok_or_else(not_found)?;
    comment.approved = true;
    Ok(Json(json!({ "status": "comment approved" })))
}

async fn reject_comment(State(db): State<Db>, Path(id): Path<u64>) -> ApiResult {
    let mut store = db.write().await;
    store.comments.remove(&id).ok_or_else(not_found)?;
    Ok(Json(json!({ "status": "comment rejected and deleted" })))
}

async fn bulk_approve(State(db): State<Db>, Json(input): Json<BulkRequest>) -> ApiResult {
    if input.comment_ids.is_empty() {
        return Err(bad_request("No comment IDs provided"));
    }
    let mut store = db.write().await;
    let mut count = 0;
    for id in parse_ids(&input.comment_ids) {
        if let Some(comment) = store.comments.get_mut(&id).filter(|c| !c.approved) {
            comment.approved = true;
            count += 1;
        }
    }
    Ok(Json(json!({ "status": format!("{count} comments approved") })))
}

async fn bulk_reject(State(db): State<Db>, Json(input): Json<BulkRequest>) -> ApiResult {
    if input.comment_ids.is_empty() {
        return Err(bad_request("No comment IDs provided"));
    }
    let mut store = db.write().await;
    let count = parse_ids(&input.comment_ids)
        .into_iter()
        .filter(|id| store.comments.remove(id).is_some())
        .count();
    Ok(Json(json!({ "status": format!("{count} comments rejected") })))
}
