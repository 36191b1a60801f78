//! Client for the blog "comments" REST resource.
//!
//! # Overview
//! `CommentClient` builds `HttpRequest` values and normalizes `HttpResponse`
//! values without touching the network. `CommentApi` pairs it with a
//! `Transport` and applies the error policies callers rely on:
//!
//! - Reads (`list_approved`, `list_pending`, `list_all_for_post`, `query`,
//!   `pending_count`) never fail. Dedicated endpoints are a best-effort
//!   optimization with one fallback to the generic query-parameter route;
//!   anything that still fails becomes an empty result.
//! - Writes (`approve`, `reject`, `create`, `bulk_approve`, `bulk_reject`)
//!   reject malformed input before any request and propagate transport and
//!   HTTP failures unchanged.
//!
//! Diagnostics are emitted as `tracing` events; install any subscriber to
//! see them.
//!
//! ```no_run
//! use comments_core::{ClientConfig, CommentApi};
//!
//! let api = CommentApi::from_config(&ClientConfig::from_env());
//! let comments = api.list_all_for_post(5u64);
//! println!("{} approved, {} pending", comments.approved.len(), comments.pending.len());
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use api::CommentApi;
pub use client::CommentClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{
    ApprovalFilter, Comment, CommentPage, CommentQuery, NewComment, PendingCount, PostComments, ResourceId,
};
