//! Domain types for the comments API.
//!
//! # Design
//! Comments pass through opaquely: the server owns their schema and the
//! client only checks that list responses are arrays. `Comment` therefore
//! wraps the raw JSON value and exposes typed accessors for the attributes
//! callers commonly read. Identifiers are coerced to strings on the way in so
//! they interpolate cleanly into URLs.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, PercentEncode, NON_ALPHANUMERIC};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Everything except RFC 3986 unreserved characters is escaped, so an id can
/// neither add query parameters nor split a path segment.
const ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// A post or comment identifier in its canonical string form.
///
/// Blank identifiers and the number `0` count as missing.
/// `ResourceId::default()` is missing. The string `"0"` is a present id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(raw: impl fmt::Display) -> Self {
        Self(raw.to_string().trim().to_string())
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn is_missing(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form for interpolation into a query value or a path
    /// segment.
    pub fn encoded(&self) -> PercentEncode<'_> {
        utf8_percent_encode(&self.0, ID_ENCODE_SET)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! resource_id_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ResourceId {
                fn from(value: $ty) -> Self {
                    ResourceId::new(value)
                }
            }
        )*
    };
}

resource_id_from_display!(&str, String, &String);

macro_rules! resource_id_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ResourceId {
                fn from(value: $ty) -> Self {
                    if value == 0 {
                        ResourceId::missing()
                    } else {
                        ResourceId::new(value)
                    }
                }
            }
        )*
    };
}

resource_id_from_number!(u32, u64, i32, i64, usize);

impl From<&Number> for ResourceId {
    fn from(value: &Number) -> Self {
        if value.as_f64() == Some(0.0) {
            ResourceId::missing()
        } else {
            ResourceId::new(value)
        }
    }
}

impl From<&ResourceId> for ResourceId {
    fn from(value: &ResourceId) -> Self {
        value.clone()
    }
}

impl<T: Into<ResourceId>> From<Option<T>> for ResourceId {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(Number),
            Text(String),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Number(n)) => (&n).into(),
            Some(Raw::Text(s)) => s.into(),
            None => ResourceId::missing(),
        })
    }
}

/// A single comment as returned by the server, attributes untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Comment(Value);

impl Comment {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn id(&self) -> Option<ResourceId> {
        self.get("id").and_then(value_to_id)
    }

    /// Identifier of the parent post.
    pub fn post(&self) -> Option<ResourceId> {
        self.get("post").and_then(value_to_id)
    }

    pub fn content(&self) -> Option<&str> {
        self.get("content").and_then(Value::as_str)
    }

    pub fn approved(&self) -> Option<bool> {
        self.get("approved").and_then(Value::as_bool)
    }

    pub fn created_at(&self) -> Option<&str> {
        self.get("created_at").and_then(Value::as_str)
    }

    pub fn admin_reply(&self) -> Option<&str> {
        self.get("admin_reply").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Comment {
    fn from(value: Value) -> Self {
        Comment(value)
    }
}

fn value_to_id(value: &Value) -> Option<ResourceId> {
    let id = match value {
        Value::Number(n) => ResourceId::from(n),
        Value::String(s) => ResourceId::new(s),
        _ => return None,
    };
    (!id.is_missing()).then_some(id)
}

/// Approval state to filter a listing by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApprovalFilter {
    Approved,
    Pending,
    #[default]
    All,
}

impl ApprovalFilter {
    /// Value of the `approved` query parameter, if one is sent.
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            ApprovalFilter::Approved => Some("true"),
            ApprovalFilter::Pending => Some("false"),
            ApprovalFilter::All => None,
        }
    }
}

/// Filters for the generic list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentQuery {
    pub post: Option<ResourceId>,
    pub approval: ApprovalFilter,
}

impl CommentQuery {
    pub fn for_post(post: impl Into<ResourceId>) -> Self {
        let post = post.into();
        Self {
            post: (!post.is_missing()).then_some(post),
            approval: ApprovalFilter::All,
        }
    }

    pub fn with_approval(mut self, approval: ApprovalFilter) -> Self {
        self.approval = approval;
        self
    }

    /// Render as `?post=<id>&approved=<bool>`, omitting absent parts.
    pub fn to_query_string(&self) -> String {
        let mut params = Vec::new();
        if let Some(post) = self.post.as_ref().filter(|post| !post.is_missing()) {
            params.push(format!("post={}", post.encoded()));
        }
        if let Some(approved) = self.approval.query_value() {
            params.push(format!("approved={approved}"));
        }
        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

/// A normalized list of comments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentPage {
    pub results: Vec<Comment>,
    pub count: usize,
}

impl CommentPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_results(results: Vec<Comment>) -> Self {
        let count = results.len();
        Self { results, count }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Every comment on one post, split by approval state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostComments {
    pub approved: Vec<Comment>,
    pub pending: Vec<Comment>,
    pub total: usize,
}

impl PostComments {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge two independently fetched pages. `total` is recomputed.
    pub fn merge(approved: CommentPage, pending: CommentPage) -> Self {
        let total = approved.results.len() + pending.results.len();
        Self {
            approved: approved.results,
            pending: pending.results,
            total,
        }
    }
}

/// Payload for creating a comment.
///
/// `post` is required and always sent as a string. Any other attributes in
/// `fields` are flattened next to it in the JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub post: ResourceId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NewComment {
    pub fn new(post: impl Into<ResourceId>, content: impl Into<String>) -> Self {
        Self::default()
            .with_post(post)
            .with_field("content", content.into())
    }

    pub fn with_post(mut self, post: impl Into<ResourceId>) -> Self {
        self.post = post.into();
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if key == "post" {
            self.post = serde_json::from_value(value).unwrap_or_default();
        } else {
            self.fields.insert(key.to_string(), value);
        }
        self
    }
}

/// Site-wide number of comments awaiting moderation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCount {
    pub count: u64,
}
