use async_trait::async_trait;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("storage unavailable: {0}")] Unavailable(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            other => RepoError::Unavailable(other.to_string()),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Thread documents, addressed by board and thread id.
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn insert_thread(&self, thread: Thread) -> RepoResult<Thread>;
    /// Most recently bumped first, at most `limit`.
    async fn recent_threads(&self, board: &str, limit: usize) -> RepoResult<Vec<Thread>>;
    async fn get_thread(&self, board: &str, id: Id) -> RepoResult<Thread>;
    async fn report_thread(&self, board: &str, id: Id) -> RepoResult<()>;
    async fn delete_thread(&self, board: &str, id: Id) -> RepoResult<()>;
}

/// Replies embedded in a thread. Every method is a single atomic update of
/// the owning thread.
#[async_trait]
pub trait ReplyRepo: Send + Sync {
    /// Appends `reply` and bumps the thread together. Returns the reply as
    /// stored (its `created_on` is the new bump time).
    async fn append_reply(&self, board: &str, thread_id: Id, reply: Reply) -> RepoResult<Reply>;
    async fn get_reply(&self, board: &str, thread_id: Id, reply_id: Id) -> RepoResult<Reply>;
    async fn report_reply(&self, board: &str, thread_id: Id, reply_id: Id) -> RepoResult<()>;
    async fn redact_reply(&self, board: &str, thread_id: Id, reply_id: Id) -> RepoResult<()>;
}

pub trait Repo: ThreadRepo + ReplyRepo {}

impl<T> Repo for T where T: ThreadRepo + ReplyRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use dashmap::DashMap;
    use std::sync::Arc;

    type Key = (String, Id);

    /// Process-local store. Each thread lives in its own map entry, so a
    /// mutation holds only that entry's shard lock.
    #[derive(Clone, Default)]
    pub struct InMemRepo {
        threads: Arc<DashMap<Key, Thread>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }

        fn key(board: &str, id: Id) -> Key {
            (board.to_string(), id)
        }

        fn with_thread<T>(&self, board: &str, id: Id, f: impl FnOnce(&mut Thread) -> RepoResult<T>) -> RepoResult<T> {
            let mut entry = self.threads.get_mut(&Self::key(board, id)).ok_or(RepoError::NotFound)?;
            f(entry.value_mut())
        }
    }

    #[async_trait]
    impl ThreadRepo for InMemRepo {
        async fn insert_thread(&self, thread: Thread) -> RepoResult<Thread> {
            self.threads.insert(Self::key(&thread.board, thread.id), thread.clone());
            Ok(thread)
        }
        async fn recent_threads(&self, board: &str, limit: usize) -> RepoResult<Vec<Thread>> {
            let mut v: Vec<Thread> = self.threads.iter()
                .filter(|e| e.key().0 == board)
                .map(|e| e.value().clone())
                .collect();
            v.sort_by(|a, b| b.bumped_on.cmp(&a.bumped_on)); // latest first
            v.truncate(limit);
            Ok(v)
        }
        async fn get_thread(&self, board: &str, id: Id) -> RepoResult<Thread> {
            self.threads.get(&Self::key(board, id)).map(|e| e.value().clone()).ok_or(RepoError::NotFound)
        }
        async fn report_thread(&self, board: &str, id: Id) -> RepoResult<()> {
            self.with_thread(board, id, |t| {
                t.reported = true;
                Ok(())
            })
        }
        async fn delete_thread(&self, board: &str, id: Id) -> RepoResult<()> {
            self.threads.remove(&Self::key(board, id)).map(|_| ()).ok_or(RepoError::NotFound)
        }
    }

    #[async_trait]
    impl ReplyRepo for InMemRepo {
        async fn append_reply(&self, board: &str, thread_id: Id, reply: Reply) -> RepoResult<Reply> {
            self.with_thread(board, thread_id, |t| Ok(t.push_reply(reply)))
        }
        async fn get_reply(&self, board: &str, thread_id: Id, reply_id: Id) -> RepoResult<Reply> {
            self.threads.get(&Self::key(board, thread_id))
                .and_then(|t| t.reply(reply_id).cloned())
                .ok_or(RepoError::NotFound)
        }
        async fn report_reply(&self, board: &str, thread_id: Id, reply_id: Id) -> RepoResult<()> {
            self.with_thread(board, thread_id, |t| {
                t.reply_mut(reply_id).ok_or(RepoError::NotFound)?.reported = true;
                Ok(())
            })
        }
        async fn redact_reply(&self, board: &str, thread_id: Id, reply_id: Id) -> RepoResult<()> {
            self.with_thread(board, thread_id, |t| {
                t.reply_mut(reply_id).ok_or(RepoError::NotFound)?.redact();
                Ok(())
            })
        }
    }
}

#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use chrono::{DateTime, Utc};
    use sqlx::{Pool, Postgres, Transaction};
    use std::collections::HashMap;

    const THREAD_COLUMNS: &str = "id, board, text, created_on, bumped_on, reported, delete_password_hash";
    const REPLY_COLUMNS: &str = "r.id, r.thread_id, r.text, r.created_on, r.delete_password_hash, r.reported";

    #[derive(sqlx::FromRow)]
    struct ThreadRow {
        id: Id,
        board: String,
        text: String,
        created_on: DateTime<Utc>,
        bumped_on: DateTime<Utc>,
        reported: bool,
        delete_password_hash: String,
    }

    #[derive(sqlx::FromRow)]
    struct ReplyRow {
        id: Id,
        thread_id: Id,
        text: String,
        created_on: DateTime<Utc>,
        delete_password_hash: String,
        reported: bool,
    }

    impl ThreadRow {
        fn into_thread(self, replies: Vec<Reply>) -> Thread {
            Thread {
                id: self.id,
                board: self.board,
                text: self.text,
                created_on: self.created_on,
                bumped_on: self.bumped_on,
                reported: self.reported,
                delete_password_hash: self.delete_password_hash,
                replies,
            }
        }
    }

    impl From<ReplyRow> for Reply {
        fn from(r: ReplyRow) -> Self {
            Reply {
                id: r.id,
                text: r.text,
                created_on: r.created_on,
                delete_password_hash: r.delete_password_hash,
                reported: r.reported,
            }
        }
    }

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self {
            Self { pool }
        }

        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            sqlx::migrate!("./migrations").run(&self.pool).await
        }

        /// Reads see one snapshot, so a thread's bump and its replies agree.
        async fn snapshot(&self) -> RepoResult<Transaction<'_, Postgres>> {
            let mut tx = self.pool.begin().await?;
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                .execute(&mut *tx).await?;
            Ok(tx)
        }

        async fn replies_for(tx: &mut Transaction<'_, Postgres>, ids: &[Id]) -> RepoResult<HashMap<Id, Vec<Reply>>> {
            let rows = sqlx::query_as::<_, ReplyRow>(&format!(
                "SELECT {REPLY_COLUMNS} FROM replies r WHERE r.thread_id = ANY($1) ORDER BY r.seq ASC"
            ))
                .bind(ids)
                .fetch_all(&mut **tx).await?;
            let mut grouped: HashMap<Id, Vec<Reply>> = HashMap::new();
            for row in rows {
                grouped.entry(row.thread_id).or_default().push(row.into());
            }
            Ok(grouped)
        }
    }

    #[async_trait]
    impl ThreadRepo for PgRepo {
        async fn insert_thread(&self, thread: Thread) -> RepoResult<Thread> {
            sqlx::query(
                "INSERT INTO threads (id, board, text, created_on, bumped_on, reported, delete_password_hash) VALUES ($1,$2,$3,$4,$5,$6,$7)"
            )
                .bind(thread.id)
                .bind(&thread.board)
                .bind(&thread.text)
                .bind(thread.created_on)
                .bind(thread.bumped_on)
                .bind(thread.reported)
                .bind(&thread.delete_password_hash)
                .execute(&self.pool).await?;
            Ok(thread)
        }
        async fn recent_threads(&self, board: &str, limit: usize) -> RepoResult<Vec<Thread>> {
            let mut tx = self.snapshot().await?;
            let rows = sqlx::query_as::<_, ThreadRow>(&format!(
                "SELECT {THREAD_COLUMNS} FROM threads WHERE board = $1 ORDER BY bumped_on DESC LIMIT $2"
            ))
                .bind(board)
                .bind(limit as i64)
                .fetch_all(&mut *tx).await?;
            let ids: Vec<Id> = rows.iter().map(|r| r.id).collect();
            let mut replies = Self::replies_for(&mut tx, &ids).await?;
            tx.commit().await?;
            Ok(rows.into_iter()
                .map(|row| {
                    let rs = replies.remove(&row.id).unwrap_or_default();
                    row.into_thread(rs)
                })
                .collect())
        }
        async fn get_thread(&self, board: &str, id: Id) -> RepoResult<Thread> {
            let mut tx = self.snapshot().await?;
            let row = sqlx::query_as::<_, ThreadRow>(&format!(
                "SELECT {THREAD_COLUMNS} FROM threads WHERE board = $1 AND id = $2"
            ))
                .bind(board)
                .bind(id)
                .fetch_optional(&mut *tx).await?
                .ok_or(RepoError::NotFound)?;
            let mut replies = Self::replies_for(&mut tx, &[id]).await?;
            tx.commit().await?;
            Ok(row.into_thread(replies.remove(&id).unwrap_or_default()))
        }
        async fn report_thread(&self, board: &str, id: Id) -> RepoResult<()> {
            let res = sqlx::query("UPDATE threads SET reported = TRUE WHERE board = $1 AND id = $2")
                .bind(board).bind(id)
                .execute(&self.pool).await?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
        async fn delete_thread(&self, board: &str, id: Id) -> RepoResult<()> {
            // replies go with it (ON DELETE CASCADE)
            let res = sqlx::query("DELETE FROM threads WHERE board = $1 AND id = $2")
                .bind(board).bind(id)
                .execute(&self.pool).await?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ReplyRepo for PgRepo {
        async fn append_reply(&self, board: &str, thread_id: Id, mut reply: Reply) -> RepoResult<Reply> {
            let mut tx = self.pool.begin().await?;
            // The row lock taken here serializes appends to the same thread
            // until commit.
            let bumped: DateTime<Utc> = sqlx::query_scalar(
                "UPDATE threads SET bumped_on = GREATEST($3, bumped_on + interval '1 microsecond') WHERE board = $1 AND id = $2 RETURNING bumped_on"
            )
                .bind(board).bind(thread_id).bind(reply.created_on)
                .fetch_optional(&mut *tx).await?
                .ok_or(RepoError::NotFound)?;
            reply.created_on = bumped;
            sqlx::query(
                "INSERT INTO replies (id, thread_id, text, created_on, delete_password_hash, reported) VALUES ($1,$2,$3,$4,$5,$6)"
            )
                .bind(reply.id)
                .bind(thread_id)
                .bind(&reply.text)
                .bind(reply.created_on)
                .bind(&reply.delete_password_hash)
                .bind(reply.reported)
                .execute(&mut *tx).await?;
            tx.commit().await?;
            Ok(reply)
        }
        async fn get_reply(&self, board: &str, thread_id: Id, reply_id: Id) -> RepoResult<Reply> {
            let row = sqlx::query_as::<_, ReplyRow>(&format!(
                "SELECT {REPLY_COLUMNS} FROM replies r JOIN threads t ON t.id = r.thread_id WHERE t.board = $1 AND r.thread_id = $2 AND r.id = $3"
            ))
                .bind(board).bind(thread_id).bind(reply_id)
                .fetch_optional(&self.pool).await?
                .ok_or(RepoError::NotFound)?;
            Ok(row.into())
        }
        async fn report_reply(&self, board: &str, thread_id: Id, reply_id: Id) -> RepoResult<()> {
            let res = sqlx::query(
                "UPDATE replies r SET reported = TRUE FROM threads t WHERE t.id = r.thread_id AND t.board = $1 AND r.thread_id = $2 AND r.id = $3"
            )
                .bind(board).bind(thread_id).bind(reply_id)
                .execute(&self.pool).await?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
        async fn redact_reply(&self, board: &str, thread_id: Id, reply_id: Id) -> RepoResult<()> {
            let res = sqlx::query(
                "UPDATE replies r SET text = $4 FROM threads t WHERE t.id = r.thread_id AND t.board = $1 AND r.thread_id = $2 AND r.id = $3"
            )
                .bind(board).bind(thread_id).bind(reply_id).bind(REDACTED_TEXT)
                .execute(&self.pool).await?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }
}
