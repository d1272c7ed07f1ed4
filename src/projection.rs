//! Client-facing shapes of stored threads and replies.
//!
//! Credential hashes and report flags are stored but never projected.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Id, Reply, Thread};

/// Replies shown per thread in the board listing.
pub const SUMMARY_REPLY_LIMIT: usize = 3;

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct ReplyView {
    #[serde(rename = "_id")]
    pub id: Id,
    pub text: String,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct ThreadSummary {
    #[serde(rename = "_id")]
    pub id: Id,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
    pub replies: Vec<ReplyView>,
    pub replycount: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct ThreadDetail {
    #[serde(rename = "_id")]
    pub id: Id,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
    pub replies: Vec<ReplyView>,
}

impl From<&Reply> for ReplyView {
    fn from(r: &Reply) -> Self {
        Self { id: r.id, text: r.text.clone(), created_on: r.created_on }
    }
}

pub fn project_thread_summary(thread: &Thread) -> ThreadSummary {
    let skip = thread.replies.len().saturating_sub(SUMMARY_REPLY_LIMIT);
    ThreadSummary {
        id: thread.id,
        text: thread.text.clone(),
        created_on: thread.created_on,
        bumped_on: thread.bumped_on,
        replies: thread.replies.iter().skip(skip).map(ReplyView::from).collect(),
        replycount: thread.replies.len(),
    }
}

pub fn project_thread_detail(thread: &Thread) -> ThreadDetail {
    ThreadDetail {
        id: thread.id,
        text: thread.text.clone(),
        created_on: thread.created_on,
        bumped_on: thread.bumped_on,
        replies: thread.replies.iter().map(ReplyView::from).collect(),
    }
}
