//! Executing facade over `CommentClient`.
//!
//! # Design
//! Two error policies coexist here, chosen by read versus write:
//!
//! - Reads never fail. A missing post id, a transport error, a non-2xx
//!   status, or an unparsable body all collapse into an empty, well-typed
//!   result. Reads backed by a dedicated endpoint go through
//!   `fetch_with_fallback`, which makes exactly one more attempt against the
//!   always-available route before giving up.
//! - Writes validate their input before any request is built and propagate
//!   every later failure unchanged.
//!
//! There is no retry beyond the single fallback, no backoff and no caching.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::client::CommentClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{ApprovalFilter, CommentPage, CommentQuery, NewComment, PostComments, ResourceId};

/// Normalizes a response into a typed read result.
type Normalizer<R> = fn(&CommentClient, HttpResponse) -> Result<R, ApiError>;

pub struct CommentApi<T> {
    client: CommentClient,
    transport: T,
}

impl CommentApi<UreqTransport> {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(CommentClient::from_config(config), UreqTransport::from_config(config))
    }
}

impl<T: Transport> CommentApi<T> {
    pub fn new(client: CommentClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &CommentClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Unfiltered listing, optionally narrowed to one post.
    ///
    /// Returns the server's JSON as-is with no shape normalization. Transport
    /// and parse failures propagate.
    pub fn list_all(&self, post: impl Into<ResourceId>) -> Result<Value, ApiError> {
        let query = CommentQuery::for_post(post);
        let response = self.send(self.client.build_list(&query))?;
        self.client.parse_raw(response)
    }

    /// Generic filtered listing. Never fails.
    pub fn query(&self, query: &CommentQuery) -> CommentPage {
        self.fetch_or_default("query", self.client.build_list(query), CommentClient::parse_page)
    }

    pub fn list_approved(&self, post: impl Into<ResourceId>) -> CommentPage {
        self.list_by_approval("list_approved", post.into(), ApprovalFilter::Approved)
    }

    pub fn list_pending(&self, post: impl Into<ResourceId>) -> CommentPage {
        self.list_by_approval("list_pending", post.into(), ApprovalFilter::Pending)
    }

    fn list_by_approval(&self, operation: &'static str, post: ResourceId, approval: ApprovalFilter) -> CommentPage {
        if post.is_missing() {
            error!(operation, "no post id provided");
            return CommentPage::empty();
        }
        let query = CommentQuery::for_post(post).with_approval(approval);
        self.fetch_or_default(operation, self.client.build_list(&query), CommentClient::parse_page)
    }

    /// Approved and pending comments for one post.
    ///
    /// Tries the combined endpoint first. On any failure, fetches the
    /// approved and pending lists separately and merges them.
    pub fn list_all_for_post(&self, post: impl Into<ResourceId>) -> PostComments {
        let post = post.into();
        if post.is_missing() {
            error!(operation = "list_all_for_post", "no post id provided");
            return PostComments::empty();
        }

        self.fetch_with_fallback(
            "list_all_for_post",
            self.client.build_list_for_post(&post),
            || {
                let approved = self.list_approved(&post);
                let pending = self.list_pending(&post);
                Ok(PostComments::merge(approved, pending))
            },
            CommentClient::parse_post_comments,
        )
    }

    /// Site-wide number of unapproved comments, `0` when unavailable.
    pub fn pending_count(&self) -> u64 {
        self.fetch_with_fallback(
            "pending_count",
            self.client.build_pending_count(),
            || self.fetch(self.client.build_pending_count_alt(), CommentClient::parse_pending_count),
            CommentClient::parse_pending_count,
        )
    }

    pub fn approve(&self, comment_id: impl Into<ResourceId>) -> Result<Value, ApiError> {
        let request = validated("approve", self.client.build_approve(&comment_id.into()))?;
        self.write(request)
    }

    pub fn reject(&self, comment_id: impl Into<ResourceId>) -> Result<Value, ApiError> {
        let request = validated("reject", self.client.build_reject(&comment_id.into()))?;
        self.write(request)
    }

    pub fn create(&self, comment: &NewComment) -> Result<Value, ApiError> {
        let request = validated("create", self.client.build_create(comment))?;
        self.write(request)
    }

    pub fn bulk_approve<I: Serialize>(&self, comment_ids: &[I]) -> Result<Value, ApiError> {
        let request = validated("bulk_approve", self.client.build_bulk_approve(comment_ids))?;
        self.write(request)
    }

    pub fn bulk_reject<I: Serialize>(&self, comment_ids: &[I]) -> Result<Value, ApiError> {
        let request = validated("bulk_reject", self.client.build_bulk_reject(comment_ids))?;
        self.write(request)
    }

    fn write(&self, request: HttpRequest) -> Result<Value, ApiError> {
        let response = self.send(request)?;
        self.client.parse_write(response)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        self.transport.execute(request)
    }

    fn fetch<R>(&self, request: HttpRequest, normalize: Normalizer<R>) -> Result<R, ApiError> {
        let response = self.send(request)?;
        normalize(&self.client, response)
    }

    /// Single-attempt read: any failure becomes `R::default()`.
    fn fetch_or_default<R: Default>(&self, operation: &'static str, request: HttpRequest, normalize: Normalizer<R>) -> R {
        self.fetch(request, normalize).unwrap_or_else(|err| {
            error!(operation, error = %err, "read failed, returning empty result");
            R::default()
        })
    }

    /// Try `primary`; on any failure run `fallback` once. If that fails too,
    /// return `R::default()`.
    fn fetch_with_fallback<R: Default>(
        &self,
        operation: &'static str,
        primary: HttpRequest,
        fallback: impl FnOnce() -> Result<R, ApiError>,
        normalize: Normalizer<R>,
    ) -> R {
        match self.fetch(primary, normalize) {
            Ok(result) => result,
            Err(err) => {
                warn!(operation, error = %err, "dedicated endpoint failed, falling back");
                fallback().unwrap_or_else(|err| {
                    error!(operation, error = %err, "fallback failed, returning empty result");
                    R::default()
                })
            }
        }
    }
}

fn validated(operation: &'static str, built: Result<HttpRequest, ApiError>) -> Result<HttpRequest, ApiError> {
    built.inspect_err(|err| error!(operation, error = %err, "rejected before sending"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const BASE: &str = "http://api.test";

    enum Reply {
        Status(u16, &'static str),
        Unreachable,
    }

    /// Replies by exact URL and records every request it sees. Unknown URLs
    /// get a 404.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: HashMap<String, Reply>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn reply(mut self, path: &str, status: u16, body: &'static str) -> Self {
            self.replies.insert(format!("{BASE}{path}"), Reply::Status(status, body));
            self
        }

        fn unreachable(mut self, path: &str) -> Self {
            self.replies.insert(format!("{BASE}{path}"), Reply::Unreachable);
            self
        }

        fn urls(&self) -> Vec<String> {
            self.seen.lock().unwrap().iter().map(|r| r.url.clone()).collect()
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            let url = request.url.clone();
            self.seen.lock().unwrap().push(request);
            match self.replies.get(&url) {
                Some(Reply::Status(status, body)) => Ok(HttpResponse {
                    status: *status,
                    headers: Vec::new(),
                    body: body.to_string(),
                }),
                Some(Reply::Unreachable) => Err(ApiError::Transport("connection refused".to_string())),
                None => Ok(HttpResponse {
                    status: 404,
                    headers: Vec::new(),
                    body: String::new(),
                }),
            }
        }
    }

    fn api(transport: &ScriptedTransport) -> CommentApi<&ScriptedTransport> {
        CommentApi::new(CommentClient::new(BASE), transport)
    }

    #[test]
    fn list_approved_normalizes_bare_array() {
        let transport = ScriptedTransport::default().reply(
            "/api/comments/?post=5&approved=true",
            200,
            r#"[{"id":1,"approved":true},{"id":2,"approved":true}]"#,
        );
        let page = api(&transport).list_approved(5u64);
        assert_eq!(page.count, 2);
        assert_eq!(page.results[0].as_value(), &json!({"id": 1, "approved": true}));
        assert_eq!(transport.urls(), vec![format!("{BASE}/api/comments/?post=5&approved=true")]);
    }

    #[test]
    fn list_approved_and_pending_swallow_transport_errors() {
        let transport = ScriptedTransport::default()
            .unreachable("/api/comments/?post=5&approved=true")
            .unreachable("/api/comments/?post=5&approved=false");
        let api = api(&transport);
        assert_eq!(api.list_approved(5u64), CommentPage::empty());
        assert_eq!(api.list_pending(5u64), CommentPage::empty());
    }

    #[test]
    fn list_pending_swallows_error_status_and_bad_json() {
        let transport = ScriptedTransport::default()
            .reply("/api/comments/?post=1&approved=false", 500, "oops")
            .reply("/api/comments/?post=2&approved=false", 200, "<html>");
        let api = api(&transport);
        assert_eq!(api.list_pending(1u64), CommentPage::empty());
        assert_eq!(api.list_pending(2u64), CommentPage::empty());
    }

    #[test]
    fn reads_without_post_send_nothing() {
        let transport = ScriptedTransport::default();
        let api = api(&transport);
        assert_eq!(api.list_approved(ResourceId::missing()), CommentPage::empty());
        assert_eq!(api.list_pending(""), CommentPage::empty());
        assert_eq!(api.list_all_for_post(None::<u64>), PostComments::empty());
        assert!(transport.urls().is_empty());
    }

    #[test]
    fn list_all_for_post_uses_combined_endpoint() {
        let transport = ScriptedTransport::default().reply(
            "/api/comments/all/?post=3",
            200,
            r#"{"approved":[{"id":1}],"pending":[{"id":2},{"id":4}],"total":3}"#,
        );
        let all = api(&transport).list_all_for_post(3u64);
        assert_eq!(all.approved.len(), 1);
        assert_eq!(all.pending.len(), 2);
        assert_eq!(all.total, 3);
        assert_eq!(transport.urls().len(), 1);
    }

    #[test]
    fn list_all_for_post_falls_back_on_error_status() {
        let transport = ScriptedTransport::default()
            .reply("/api/comments/all/?post=3", 500, "server error")
            .reply("/api/comments/?post=3&approved=true", 200, r#"[{"id":1}]"#)
            .reply("/api/comments/?post=3&approved=false", 200, r#"[{"id":2},{"id":4}]"#);
        let all = api(&transport).list_all_for_post(3u64);

        assert_eq!(
            transport.urls(),
            vec![
                format!("{BASE}/api/comments/all/?post=3"),
                format!("{BASE}/api/comments/?post=3&approved=true"),
                format!("{BASE}/api/comments/?post=3&approved=false"),
            ]
        );
        assert_eq!(all.total, all.approved.len() + all.pending.len());
        assert_eq!(all.total, 3);
    }

    #[test]
    fn list_all_for_post_falls_back_on_missing_endpoint_and_bad_shape() {
        // 404 from an unregistered route.
        let transport = ScriptedTransport::default()
            .reply("/api/comments/?post=8&approved=true", 200, "[]")
            .reply("/api/comments/?post=8&approved=false", 200, r#"[{"id":9}]"#);
        let all = api(&transport).list_all_for_post(8u64);
        assert_eq!(all.pending.len(), 1);
        assert_eq!(all.total, 1);

        let transport = ScriptedTransport::default()
            .reply("/api/comments/all/?post=8", 200, r#"{"unexpected":true}"#)
            .reply("/api/comments/?post=8&approved=true", 200, r#"[{"id":1}]"#);
        let all = api(&transport).list_all_for_post(8u64);
        assert_eq!(all.approved.len(), 1);
        assert_eq!(all.total, 1);
        assert_eq!(transport.urls().len(), 3);
    }

    #[test]
    fn list_all_for_post_recovers_from_unreachable_combined_endpoint() {
        let transport = ScriptedTransport::default()
            .unreachable("/api/comments/all/?post=3")
            .reply("/api/comments/?post=3&approved=true", 200, r#"[{"id":1},{"id":5}]"#)
            .reply("/api/comments/?post=3&approved=false", 200, r#"[{"id":2}]"#);
        let all = api(&transport).list_all_for_post(3u64);

        assert_eq!(all.approved.len(), 2);
        assert_eq!(all.pending.len(), 1);
        assert_eq!(all.total, 3);
        assert_eq!(all.pending[0].id(), Some(ResourceId::from(2u64)));
        assert_eq!(transport.urls().len(), 3);
    }

    #[test]
    fn numeric_zero_ids_are_treated_as_missing() {
        let transport = ScriptedTransport::default();
        let api = api(&transport);
        assert_eq!(api.list_approved(0u64), CommentPage::empty());
        assert_eq!(api.list_all_for_post(0u64), PostComments::empty());
        assert!(matches!(api.approve(0u64), Err(ApiError::MissingField(_))));
        assert!(transport.urls().is_empty());
    }

    #[test]
    fn list_all_for_post_is_empty_when_everything_fails() {
        let transport = ScriptedTransport::default()
            .unreachable("/api/comments/all/?post=3")
            .unreachable("/api/comments/?post=3&approved=true")
            .unreachable("/api/comments/?post=3&approved=false");
        let all = api(&transport).list_all_for_post(3u64);
        assert_eq!(all, PostComments::empty());
        assert_eq!(transport.urls().len(), 3);
    }

    #[test]
    fn pending_count_falls_back_to_underscore_route() {
        let transport = ScriptedTransport::default().reply("/api/comments/pending_count/", 200, r#"{"count":6}"#);
        assert_eq!(api(&transport).pending_count(), 6);
        assert_eq!(
            transport.urls(),
            vec![
                format!("{BASE}/api/comments/pending-count/"),
                format!("{BASE}/api/comments/pending_count/"),
            ]
        );
    }

    #[test]
    fn pending_count_is_zero_when_unavailable() {
        let transport = ScriptedTransport::default();
        assert_eq!(api(&transport).pending_count(), 0);
        assert_eq!(transport.urls().len(), 2);
    }

    #[test]
    fn query_without_filters_lists_everything() {
        let transport = ScriptedTransport::default().reply("/api/comments/", 200, r#"[{"id":1},{"id":2}]"#);
        let page = api(&transport).query(&CommentQuery::default());
        assert_eq!(page.count, 2);
    }

    #[test]
    fn list_all_returns_server_json_unchanged() {
        let transport = ScriptedTransport::default()
            .reply("/api/comments/?post=5", 200, r#"[{"id":1}]"#)
            .reply("/api/comments/", 200, r#"{"count":0,"results":[]}"#);
        let api = api(&transport);
        assert_eq!(api.list_all(5u64).unwrap(), json!([{"id": 1}]));
        assert_eq!(api.list_all(None::<u64>).unwrap(), json!({"count": 0, "results": []}));
    }

    #[test]
    fn list_all_propagates_transport_errors() {
        let transport = ScriptedTransport::default().unreachable("/api/comments/");
        let err = api(&transport).list_all(ResourceId::missing()).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn approve_and_reject_require_id_before_sending() {
        let transport = ScriptedTransport::default();
        let api = api(&transport);
        assert!(matches!(api.approve(None::<u64>), Err(ApiError::MissingField(_))));
        assert!(matches!(api.reject(""), Err(ApiError::MissingField(_))));
        assert!(transport.urls().is_empty());
    }

    #[test]
    fn approve_posts_and_returns_body() {
        let transport =
            ScriptedTransport::default().reply("/api/comments/12/approve/", 200, r#"{"status":"comment approved"}"#);
        let body = api(&transport).approve(12u64).unwrap();
        assert_eq!(body, json!({"status": "comment approved"}));
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Post);
    }

    #[test]
    fn write_errors_propagate_unchanged() {
        let transport = ScriptedTransport::default()
            .unreachable("/api/comments/12/reject/")
            .reply("/api/comments/13/reject/", 500, "boom");
        let api = api(&transport);
        assert!(matches!(api.reject(12u64), Err(ApiError::Transport(_))));
        assert!(matches!(
            api.reject(13u64),
            Err(ApiError::HttpError { status: 500, .. })
        ));
        assert!(matches!(api.approve(99u64), Err(ApiError::NotFound)));
        // No fallback on writes: exactly one request each.
        assert_eq!(transport.urls().len(), 3);
    }

    #[test]
    fn create_requires_post_before_sending() {
        let transport = ScriptedTransport::default();
        let err = api(&transport).create(&NewComment::default()).unwrap_err();
        assert!(matches!(err, ApiError::MissingField("post ID")));
        assert!(transport.urls().is_empty());
    }

    #[test]
    fn create_sends_post_as_string() {
        let transport = ScriptedTransport::default().reply(
            "/api/comments/",
            201,
            r#"{"id":10,"post":5,"content":"hi","approved":false}"#,
        );
        let created = api(&transport).create(&NewComment::new(5u64, "hi")).unwrap();
        assert_eq!(created["id"], 10);

        let requests = transport.requests();
        let body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"post": "5", "content": "hi"}));
    }

    #[test]
    fn bulk_approve_requires_ids() {
        let transport = ScriptedTransport::default();
        let empty: Vec<u64> = Vec::new();
        assert!(matches!(api(&transport).bulk_approve(&empty), Err(ApiError::MissingField(_))));
        assert!(matches!(api(&transport).bulk_reject(&empty), Err(ApiError::MissingField(_))));
        assert!(transport.urls().is_empty());
    }

    #[test]
    fn bulk_approve_sends_one_post_with_ids() {
        let transport =
            ScriptedTransport::default().reply("/api/comments/bulk_approve/", 200, r#"{"status":"3 comments approved"}"#);
        let body = api(&transport).bulk_approve(&[1, 2, 3]).unwrap();
        assert_eq!(body["status"], "3 comments approved");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].url, format!("{BASE}/api/comments/bulk_approve/"));
        let sent: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, json!({"comment_ids": [1, 2, 3]}));
    }
}
