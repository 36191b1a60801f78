//! Stateless HTTP request builder and response normalizer for the comments
//! API.
//!
//! # Design
//! `CommentClient` holds only a `base_url`. Each endpoint is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. Nothing here touches the network, so the
//! fallback and error policies in `CommentApi` can be layered on top and
//! tested with scripted responses.
//!
//! Write builders validate their input and fail with
//! `ApiError::MissingField` before a request exists.

use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{Comment, CommentPage, CommentQuery, NewComment, PendingCount, PostComments, ResourceId};

#[derive(Debug, Clone)]
pub struct CommentClient {
    base_url: String,
}

impl CommentClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/api/comments/{suffix}", self.base_url)
    }

    /// `GET /api/comments/` with optional `post` and `approved` filters.
    pub fn build_list(&self, query: &CommentQuery) -> HttpRequest {
        HttpRequest::get(self.url(&query.to_query_string()))
    }

    /// `GET /api/comments/all/?post=<id>`, the dedicated combined endpoint.
    pub fn build_list_for_post(&self, post: &ResourceId) -> HttpRequest {
        HttpRequest::get(self.url(&format!("all/?post={}", post.encoded())))
    }

    pub fn build_pending_count(&self) -> HttpRequest {
        HttpRequest::get(self.url("pending-count/"))
    }

    /// Underscore spelling of the pending count route.
    pub fn build_pending_count_alt(&self) -> HttpRequest {
        HttpRequest::get(self.url("pending_count/"))
    }

    pub fn build_approve(&self, comment_id: &ResourceId) -> Result<HttpRequest, ApiError> {
        if comment_id.is_missing() {
            return Err(ApiError::MissingField("comment ID"));
        }
        Ok(HttpRequest::post_json(self.url(&format!("{}/approve/", comment_id.encoded())), None))
    }

    pub fn build_reject(&self, comment_id: &ResourceId) -> Result<HttpRequest, ApiError> {
        if comment_id.is_missing() {
            return Err(ApiError::MissingField("comment ID"));
        }
        Ok(HttpRequest::post_json(self.url(&format!("{}/reject/", comment_id.encoded())), None))
    }

    pub fn build_create(&self, comment: &NewComment) -> Result<HttpRequest, ApiError> {
        if comment.post.is_missing() {
            return Err(ApiError::MissingField("post ID"));
        }
        let body = serde_json::to_string(comment).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest::post_json(self.url(""), Some(body)))
    }

    pub fn build_bulk_approve<I: Serialize>(&self, comment_ids: &[I]) -> Result<HttpRequest, ApiError> {
        self.build_bulk("bulk_approve/", comment_ids)
    }

    pub fn build_bulk_reject<I: Serialize>(&self, comment_ids: &[I]) -> Result<HttpRequest, ApiError> {
        self.build_bulk("bulk_reject/", comment_ids)
    }

    fn build_bulk<I: Serialize>(&self, suffix: &str, comment_ids: &[I]) -> Result<HttpRequest, ApiError> {
        if comment_ids.is_empty() {
            return Err(ApiError::MissingField("comment IDs"));
        }

        #[derive(Serialize)]
        struct BulkBody<'a, I> {
            comment_ids: &'a [I],
        }

        let body = serde_json::to_string(&BulkBody { comment_ids })
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest::post_json(self.url(suffix), Some(body)))
    }

    /// Whatever JSON the server sent, regardless of status.
    pub fn parse_raw(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_json(&response.body)
    }

    /// Normalize a list response into a `CommentPage`.
    ///
    /// Accepts a bare array or a paginated `{results, count}` object. Any
    /// other JSON value yields an empty page; `count` always equals
    /// `results.len()`.
    pub fn parse_page(&self, response: HttpResponse) -> Result<CommentPage, ApiError> {
        check_status(&response)?;
        let results = match parse_json(&response.body)? {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("results") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(CommentPage::from_results(results.into_iter().map(Comment::from).collect()))
    }

    /// Parse the combined endpoint's `{approved, pending, total}` shape.
    ///
    /// Both arrays are required. A missing `total` is computed from them.
    pub fn parse_post_comments(&self, response: HttpResponse) -> Result<PostComments, ApiError> {
        #[derive(serde::Deserialize)]
        struct Combined {
            approved: Vec<Comment>,
            pending: Vec<Comment>,
            total: Option<usize>,
        }

        check_status(&response)?;
        let combined: Combined =
            serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        let total = combined
            .total
            .unwrap_or(combined.approved.len() + combined.pending.len());
        Ok(PostComments {
            approved: combined.approved,
            pending: combined.pending,
            total,
        })
    }

    pub fn parse_pending_count(&self, response: HttpResponse) -> Result<u64, ApiError> {
        check_status(&response)?;
        let parsed: PendingCount =
            serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        Ok(parsed.count)
    }

    /// Response of a state-changing request, returned unfiltered. An empty
    /// 2xx body parses as `null`.
    pub fn parse_write(&self, response: HttpResponse) -> Result<Value, ApiError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        parse_json(&response.body)
    }
}

fn parse_json(body: &str) -> Result<Value, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-2xx status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
