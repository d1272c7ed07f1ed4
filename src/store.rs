//! Board-scoped thread and reply operations.
//!
//! `BoardStore` is the entry point for every request: it rejects unknown
//! boards and incomplete input before any storage access, hashes and checks
//! delete passwords, and bounds each storage call by a timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::credential::{CredentialCodec, CredentialError};
use crate::models::*;
use crate::moderation::Moderator;
use crate::repo::{Repo, RepoError};

/// Threads returned by a board listing.
pub const LIST_LIMIT: usize = 10;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid board: {0}")] InvalidBoard(String),
    #[error("not found")] NotFound,
    #[error("incorrect password")] Unauthorized,
    #[error("storage unavailable: {0}")] StorageUnavailable(String),
    #[error("validation failed: {0}")] Validation(&'static str),
}

impl From<RepoError> for StoreError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => StoreError::NotFound,
            RepoError::Unavailable(reason) => StoreError::StorageUnavailable(reason),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Parses a client-supplied id. Anything that is not a valid id cannot
/// resolve, so it is reported as `NotFound`.
pub fn parse_id(raw: &str) -> StoreResult<Id> {
    Id::parse_str(raw.trim()).map_err(|_| StoreError::NotFound)
}

/// A thread or reply id as handed to the store: already parsed, or raw
/// client input. Raw ids are parsed only after the board and the request
/// body have been checked.
pub trait ToId {
    fn to_id(&self) -> StoreResult<Id>;
}

impl ToId for Id {
    fn to_id(&self) -> StoreResult<Id> {
        Ok(*self)
    }
}

impl ToId for str {
    fn to_id(&self) -> StoreResult<Id> {
        parse_id(self)
    }
}

impl ToId for String {
    fn to_id(&self) -> StoreResult<Id> {
        parse_id(self)
    }
}

impl<T: ToId + ?Sized> ToId for &T {
    fn to_id(&self) -> StoreResult<Id> {
        (**self).to_id()
    }
}

#[derive(Clone)]
pub struct BoardStore {
    repo: Arc<dyn Repo>,
    boards: BoardList,
    moderator: Moderator,
    timeout: Duration,
}

impl BoardStore {
    pub fn new(repo: Arc<dyn Repo>, boards: BoardList, codec: CredentialCodec) -> Self {
        Self { repo, boards, moderator: Moderator::new(codec), timeout: DEFAULT_STORE_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn board<'a>(&self, board: &'a str) -> StoreResult<&'a str> {
        if self.boards.contains(board) {
            Ok(board)
        } else {
            warn!(board, "rejected request for unknown board");
            Err(StoreError::InvalidBoard(board.to_string()))
        }
    }

    fn require_password(password: &str) -> StoreResult<()> {
        if password.is_empty() {
            return Err(StoreError::Validation("delete_password is required"));
        }
        Ok(())
    }

    /// Runs password hashing or checking on the blocking pool.
    async fn with_moderator<T, F>(&self, op: &'static str, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Moderator) -> T + Send + 'static,
    {
        let moderator = self.moderator.clone();
        tokio::task::spawn_blocking(move || f(&moderator))
            .await
            .map_err(|e| {
                error!(op, error = %e, "credential task failed");
                StoreError::StorageUnavailable(format!("{op}: credential task failed"))
            })
    }

    async fn hash_password(&self, op: &'static str, password: &str) -> StoreResult<String> {
        let password = password.to_string();
        self.with_moderator(op, move |m| m.codec().hash(&password))
            .await?
            .map_err(|e| match e {
                CredentialError::Empty => StoreError::Validation("delete_password is required"),
                _ => StoreError::Validation("delete_password could not be hashed"),
            })
    }

    /// Runs one storage call, bounded by the store timeout.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, RepoError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(RepoError::NotFound)) => Err(StoreError::NotFound),
            Ok(Err(RepoError::Unavailable(reason))) => {
                error!(op, %reason, "storage call failed");
                Err(StoreError::StorageUnavailable(reason))
            }
            Err(_) => {
                error!(op, timeout_ms = self.timeout.as_millis() as u64, "storage call timed out");
                Err(StoreError::StorageUnavailable(format!("{op} timed out")))
            }
        }
    }

    pub async fn create_thread(&self, board: &str, text: &str, password: &str) -> StoreResult<Thread> {
        let board = self.board(board)?;
        if text.trim().is_empty() {
            return Err(StoreError::Validation("text is required"));
        }
        Self::require_password(password)?;
        let hash = self.hash_password("create_thread", password).await?;
        let thread = Thread::new(board, text.to_string(), hash);
        let thread = self.bounded("create_thread", self.repo.insert_thread(thread)).await?;
        info!(board, thread_id = %thread.id, "thread created");
        Ok(thread)
    }

    pub async fn list_threads(&self, board: &str) -> StoreResult<Vec<Thread>> {
        let board = self.board(board)?;
        self.bounded("list_threads", self.repo.recent_threads(board, LIST_LIMIT)).await
    }

    pub async fn get_thread(&self, board: &str, thread_id: impl ToId) -> StoreResult<Thread> {
        let board = self.board(board)?;
        let thread_id = thread_id.to_id()?;
        self.bounded("get_thread", self.repo.get_thread(board, thread_id)).await
    }

    pub async fn report_thread(&self, board: &str, thread_id: impl ToId) -> StoreResult<()> {
        let board = self.board(board)?;
        let thread_id = thread_id.to_id()?;
        self.bounded("report_thread", self.repo.report_thread(board, thread_id)).await?;
        info!(board, thread_id = %thread_id, "thread reported");
        Ok(())
    }

    /// Lookup, then authorize, then delete.
    pub async fn delete_thread(&self, board: &str, thread_id: impl ToId, password: &str) -> StoreResult<()> {
        let board = self.board(board)?;
        Self::require_password(password)?;
        let thread_id = thread_id.to_id()?;
        let thread = self.bounded("delete_thread", self.repo.get_thread(board, thread_id)).await?;
        let password = password.to_string();
        let decision = self
            .with_moderator("delete_thread", move |m| m.authorize_thread_delete(&thread, &password))
            .await?;
        if !decision.is_granted() {
            warn!(board, thread_id = %thread_id, "thread delete refused: incorrect password");
            return Err(StoreError::Unauthorized);
        }
        self.bounded("delete_thread", self.repo.delete_thread(board, thread_id)).await?;
        info!(board, thread_id = %thread_id, "thread deleted");
        Ok(())
    }

    pub async fn append_reply(&self, board: &str, thread_id: impl ToId, text: &str, password: &str) -> StoreResult<Reply> {
        let board = self.board(board)?;
        if text.trim().is_empty() {
            return Err(StoreError::Validation("text is required"));
        }
        Self::require_password(password)?;
        let thread_id = thread_id.to_id()?;
        let hash = self.hash_password("append_reply", password).await?;
        let reply = Reply::new(text.to_string(), hash);
        let reply = self.bounded("append_reply", self.repo.append_reply(board, thread_id, reply)).await?;
        info!(board, thread_id = %thread_id, reply_id = %reply.id, "reply appended");
        Ok(reply)
    }

    pub async fn report_reply(&self, board: &str, thread_id: impl ToId, reply_id: impl ToId) -> StoreResult<()> {
        let board = self.board(board)?;
        let thread_id = thread_id.to_id()?;
        let reply_id = reply_id.to_id()?;
        self.bounded("report_reply", self.repo.report_reply(board, thread_id, reply_id)).await?;
        info!(board, thread_id = %thread_id, reply_id = %reply_id, "reply reported");
        Ok(())
    }

    /// Redacts the reply's text when `password` matches the reply's own
    /// credential. Redacting twice is not an error.
    pub async fn delete_reply(&self, board: &str, thread_id: impl ToId, reply_id: impl ToId, password: &str) -> StoreResult<()> {
        let board = self.board(board)?;
        Self::require_password(password)?;
        let thread_id = thread_id.to_id()?;
        let reply_id = reply_id.to_id()?;
        let reply = self.bounded("delete_reply", self.repo.get_reply(board, thread_id, reply_id)).await?;
        let already_redacted = reply.is_redacted();
        let password = password.to_string();
        let decision = self
            .with_moderator("delete_reply", move |m| m.authorize_reply_delete(&reply, &password))
            .await?;
        if !decision.is_granted() {
            warn!(board, thread_id = %thread_id, reply_id = %reply_id, "reply delete refused: incorrect password");
            return Err(StoreError::Unauthorized);
        }
        if already_redacted {
            info!(board, thread_id = %thread_id, reply_id = %reply_id, "reply already redacted");
            return Ok(());
        }
        self.bounded("delete_reply", self.repo.redact_reply(board, thread_id, reply_id)).await?;
        info!(board, thread_id = %thread_id, reply_id = %reply_id, "reply redacted");
        Ok(())
    }
}
