//! # citadel-db-sqlite
//!
//! SQLite implementation of every persistence port in `citadel-core`.
//!
//! Multi-row mutations run in a single transaction whose first statement is a
//! write. That takes SQLite's writer lock up front, so two concurrent
//! read-modify-write cycles (two votes by the same user on the same post, a vote
//! racing a cascade delete) are serialized instead of interleaved. The unique
//! `(user_id, post_id)` index on votes remains the backstop: a failed insert is
//! retried as a toggle/switch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citadel_core::error::{AppError, Result};
use citadel_core::ledger::VoteTransition;
use citadel_core::models::{
    Author, Comment, CommentId, NewComment, NewPost, Post, PostId, PostPatch, User,
    UserCredentials, UserId, Vote, VoteTally,
};
use citadel_core::traits::{CommentRepo, PostRepo, UserRepo, VoteRepo};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const MAX_CONNECTIONS: u32 = 8;
/// How long a writer waits for the lock before SQLite reports BUSY.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);
/// Retries of a vote whose insert lost a race on the unique index.
const VOTE_ATTEMPTS: u32 = 3;

const POST_SELECT: &str = "SELECT p.id, p.title, p.content, p.board, p.link, p.score, \
     p.created_at, p.author_id, u.username AS author_name \
     FROM posts p JOIN users u ON u.id = p.author_id";

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.parent_id, c.content, c.created_at, \
     c.author_id, u.username AS author_name \
     FROM comments c JOIN users u ON u.id = c.author_id";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database at `url` and applies pending migrations.
    ///
    /// In-memory databases live inside a single connection, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };
        let pool = pool_options.connect_with(options).await.map_err(db_error)?;

        MIGRATOR.run(&pool).await.map_err(|e| {
            error!(error = %e, "migration failed");
            AppError::Internal("database migration failed".into())
        })?;
        info!(url, "sqlite store ready");
        Ok(Self { pool })
    }

    async fn fetch_post(&self, id: PostId) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("{POST_SELECT} WHERE p.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(map_post).transpose().map_err(db_error)
    }

    async fn fetch_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        let row = sqlx::query(&format!("{COMMENT_SELECT} WHERE c.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(map_comment).transpose().map_err(db_error)
    }

    /// One attempt at the toggle/switch transition plus score adjustment.
    async fn try_apply_vote(
        &self,
        user_id: UserId,
        post_id: PostId,
        value: i32,
    ) -> Result<VoteTally> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // No-op write: takes the writer lock and proves the post exists.
        let touched = sqlx::query("UPDATE posts SET score = score WHERE id = ?")
            .bind(post_id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if touched.rows_affected() == 0 {
            return Err(AppError::not_found("post", post_id));
        }

        let existing: Option<i32> =
            sqlx::query_scalar("SELECT value FROM votes WHERE user_id = ? AND post_id = ?")
                .bind(user_id.0)
                .bind(post_id.0)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;

        let transition = VoteTransition::resolve(existing, value);
        match transition {
            VoteTransition::Insert { value } => {
                sqlx::query("INSERT INTO votes (user_id, post_id, value) VALUES (?, ?, ?)")
                    .bind(user_id.0)
                    .bind(post_id.0)
                    .bind(value)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| missing_reference(e, "user", user_id))?;
            }
            VoteTransition::Remove { .. } => {
                sqlx::query("DELETE FROM votes WHERE user_id = ? AND post_id = ?")
                    .bind(user_id.0)
                    .bind(post_id.0)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error)?;
            }
            VoteTransition::Switch { value, .. } => {
                sqlx::query("UPDATE votes SET value = ? WHERE user_id = ? AND post_id = ?")
                    .bind(value)
                    .bind(user_id.0)
                    .bind(post_id.0)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error)?;
            }
        }

        let score: i64 =
            sqlx::query_scalar("UPDATE posts SET score = score + ? WHERE id = ? RETURNING score")
                .bind(transition.score_delta())
                .bind(post_id.0)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(VoteTally {
            score,
            user_vote: transition.effective_vote(),
        })
    }
}

/// Maps driver failures onto the core taxonomy. Details stay in the log.
fn db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Conflict("record already exists".into());
        }
    }
    error!(error = %err, "database failure");
    AppError::Internal("database failure".into())
}

/// Like [`db_error`], but a foreign-key failure means the referenced row is gone.
fn missing_reference(err: sqlx::Error, kind: &str, id: impl ToString) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return AppError::not_found(kind, id);
        }
    }
    db_error(err)
}

fn map_user(row: &SqliteRow) -> std::result::Result<User, sqlx::Error> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_post(row: &SqliteRow) -> std::result::Result<Post, sqlx::Error> {
    Ok(Post {
        id: PostId(row.try_get("id")?),
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        board: row.try_get("board")?,
        link: row.try_get("link")?,
        score: row.try_get("score")?,
        author: Author {
            id: UserId(row.try_get("author_id")?),
            username: row.try_get("author_name")?,
        },
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn map_comment(row: &SqliteRow) -> std::result::Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: CommentId(row.try_get("id")?),
        post_id: PostId(row.try_get("post_id")?),
        parent_id: row.try_get::<Option<i64>, _>("parent_id")?.map(CommentId),
        author: Author {
            id: UserId(row.try_get("author_id")?),
            username: row.try_get("author_name")?,
        },
        content: row.try_get("content")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn map_vote(row: &SqliteRow) -> std::result::Result<Vote, sqlx::Error> {
    Ok(Vote {
        user_id: UserId(row.try_get("user_id")?),
        post_id: PostId(row.try_get("post_id")?),
        value: row.try_get("value")?,
    })
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn find_user_by_name(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(map_user).transpose().map_err(db_error)
    }

    async fn find_credentials(&self, username: &str) -> Result<Option<UserCredentials>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => Ok(Some(UserCredentials {
                user: map_user(&row).map_err(db_error)?,
                password_hash: row.try_get("password_hash").map_err(db_error)?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?) \
             RETURNING id, username, created_at",
        )
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match db_error(e) {
            AppError::Conflict(_) => AppError::Conflict("username already taken".into()),
            other => other,
        })?;
        map_user(&row).map_err(db_error)
    }

    async fn ensure_user(&self, username: &str, password_hash: &str) -> Result<User> {
        sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.find_user_by_name(username)
            .await?
            .ok_or_else(|| AppError::Internal(format!("user '{username}' vanished after insert")))
    }
}

#[async_trait]
impl PostRepo for SqliteStore {
    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        let id = sqlx::query(
            "INSERT INTO posts (title, content, board, link, score, author_id, created_at) \
             VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(post.title)
        .bind(post.content)
        .bind(post.board)
        .bind(post.link)
        .bind(post.author_id.0)
        .bind(post.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| missing_reference(e, "user", post.author_id))?
        .last_insert_rowid();

        self.fetch_post(PostId(id))
            .await?
            .ok_or_else(|| AppError::not_found("post", id))
    }

    async fn get_post(&self, id: PostId) -> Result<Option<Post>> {
        self.fetch_post(id).await
    }

    async fn list_posts(&self, board: Option<String>) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "{POST_SELECT} WHERE (? IS NULL OR p.board = ? COLLATE NOCASE) \
             ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(board.clone())
        .bind(board)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter()
            .map(map_post)
            .collect::<std::result::Result<_, _>>()
            .map_err(db_error)
    }

    async fn update_post(&self, id: PostId, patch: PostPatch) -> Result<Post> {
        let updated = sqlx::query(
            "UPDATE posts SET title = COALESCE(?, title), content = COALESCE(?, content) \
             WHERE id = ?",
        )
        .bind(patch.title)
        .bind(patch.content)
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found("post", id));
        }

        self.fetch_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("post", id))
    }

    /// Votes, then comments, then the post itself, all-or-nothing.
    async fn delete_post_cascade(&self, id: PostId) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let votes = sqlx::query("DELETE FROM votes WHERE post_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        let comments = sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        let posts = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        if posts.rows_affected() == 0 {
            // Dropping the transaction rolls back the child deletes.
            return Err(AppError::not_found("post", id));
        }
        tx.commit().await.map_err(db_error)?;

        debug!(
            post_id = %id,
            votes = votes.rows_affected(),
            comments = comments.rows_affected(),
            "post cascade committed"
        );
        Ok(())
    }
}

#[async_trait]
impl CommentRepo for SqliteStore {
    /// Post and parent are re-checked under the writer lock, so a concurrent
    /// delete of either is reported as NotFound (post) or InvalidArgument (parent).
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // No-op write: takes the writer lock and proves the post exists.
        let touched = sqlx::query("UPDATE posts SET score = score WHERE id = ?")
            .bind(comment.post_id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if touched.rows_affected() == 0 {
            return Err(AppError::not_found("post", comment.post_id));
        }

        if let Some(parent_id) = comment.parent_id {
            let parent: Option<i64> =
                sqlx::query_scalar("SELECT id FROM comments WHERE id = ? AND post_id = ?")
                    .bind(parent_id.0)
                    .bind(comment.post_id.0)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error)?;
            if parent.is_none() {
                return Err(AppError::invalid(format!(
                    "parent comment {parent_id} is not on post {}",
                    comment.post_id
                )));
            }
        }

        let id = sqlx::query(
            "INSERT INTO comments (post_id, parent_id, author_id, content, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(comment.post_id.0)
        .bind(comment.parent_id.map(|p| p.0))
        .bind(comment.author_id.0)
        .bind(comment.content)
        .bind(comment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| missing_reference(e, "user", comment.author_id))?
        .last_insert_rowid();
        tx.commit().await.map_err(db_error)?;

        self.fetch_comment(CommentId(id))
            .await?
            .ok_or_else(|| AppError::not_found("mark", id))
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        self.fetch_comment(id).await
    }

    async fn comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC"
        ))
        .bind(post_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter()
            .map(map_comment)
            .collect::<std::result::Result<_, _>>()
            .map_err(db_error)
    }

    async fn update_comment(&self, id: CommentId, content: String) -> Result<Comment> {
        let updated = sqlx::query("UPDATE comments SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found("mark", id));
        }

        self.fetch_comment(id)
            .await?
            .ok_or_else(|| AppError::not_found("mark", id))
    }

    async fn delete_comment(&self, id: CommentId) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Replies move up one level before their parent disappears.
        let moved = sqlx::query(
            "UPDATE comments SET parent_id = (SELECT parent_id FROM comments WHERE id = ?) \
             WHERE parent_id = ?",
        )
        .bind(id.0)
        .bind(id.0)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let removed = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if removed.rows_affected() == 0 {
            return Err(AppError::not_found("mark", id));
        }
        tx.commit().await.map_err(db_error)?;

        debug!(comment_id = %id, reparented = moved.rows_affected(), "comment deleted");
        Ok(())
    }
}

#[async_trait]
impl VoteRepo for SqliteStore {
    async fn apply_vote(&self, user_id: UserId, post_id: PostId, value: i32) -> Result<VoteTally> {
        let mut attempt = 1;
        loop {
            match self.try_apply_vote(user_id, post_id, value).await {
                Err(AppError::Conflict(_)) if attempt < VOTE_ATTEMPTS => {
                    debug!(user_id = %user_id, post_id = %post_id, attempt, "vote raced, retrying");
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn find_vote(&self, user_id: UserId, post_id: PostId) -> Result<Option<Vote>> {
        let row = sqlx::query(
            "SELECT user_id, post_id, value FROM votes WHERE user_id = ? AND post_id = ?",
        )
        .bind(user_id.0)
        .bind(post_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.as_ref().map(map_vote).transpose().map_err(db_error)
    }

    async fn votes_for_post(&self, post_id: PostId) -> Result<Vec<Vote>> {
        let rows =
            sqlx::query("SELECT user_id, post_id, value FROM votes WHERE post_id = ? ORDER BY id")
                .bind(post_id.0)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        rows.iter()
            .map(map_vote)
            .collect::<std::result::Result<_, _>>()
            .map_err(db_error)
    }
}
