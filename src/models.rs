use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = Uuid;

/// Text a reply carries once its author has deleted it.
pub const REDACTED_TEXT: &str = "[deleted]";

pub const DEFAULT_BOARDS: &[&str] = &["general", "movies", "tech", "games", "testaroo"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thread {
    pub id: Id,
    pub board: String,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
    pub reported: bool,
    #[serde(skip_serializing)]
    pub delete_password_hash: String, // never leaves the store
    pub replies: Vec<Reply>, // insertion order == chronological order
}

impl Thread {
    pub fn new(board: &str, text: String, delete_password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            board: board.to_string(),
            text,
            created_on: now,
            bumped_on: now,
            reported: false,
            delete_password_hash,
            replies: Vec::new(),
        }
    }

    pub fn reply(&self, reply_id: Id) -> Option<&Reply> {
        self.replies.iter().find(|r| r.id == reply_id)
    }

    pub fn reply_mut(&mut self, reply_id: Id) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| r.id == reply_id)
    }

    /// Appends `reply` and bumps the thread. The bump is strictly later than
    /// the previous one; the reply's `created_on` is set to the bump time.
    pub fn push_reply(&mut self, mut reply: Reply) -> Reply {
        let bump = next_bump(self.bumped_on, reply.created_on);
        reply.created_on = bump;
        self.bumped_on = bump;
        self.replies.push(reply.clone());
        reply
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    pub id: Id,
    pub text: String,
    pub created_on: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub delete_password_hash: String,
    pub reported: bool,
}

impl Reply {
    pub fn new(text: String, delete_password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            created_on: Utc::now(),
            delete_password_hash,
            reported: false,
        }
    }

    pub fn redact(&mut self) {
        self.text = REDACTED_TEXT.to_string();
    }

    pub fn is_redacted(&self) -> bool {
        self.text == REDACTED_TEXT
    }
}

/// Bump timestamp: `now`, unless that would not move past `previous`
/// (clock granularity), in which case one microsecond after it.
pub fn next_bump(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + chrono::Duration::microseconds(1);
    if now >= floor { now } else { floor }
}

/// The fixed set of boards a store accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardList(Vec<String>);

impl BoardList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, board: &str) -> bool {
        self.0.iter().any(|b| b == board)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for BoardList {
    fn default() -> Self {
        Self::new(DEFAULT_BOARDS.iter().copied())
    }
}
