//! # Core Traits (Ports)
//!
//! Any persistence or credential plugin must implement these traits to be
//! wired into the binary. Components receive them as `Arc<dyn ...>` handles,
//! so tests can substitute doubles and each test owns its own database.

use crate::error::Result;
use crate::models::{
    Comment, CommentId, NewComment, NewPost, Post, PostId, PostPatch, User, UserCredentials,
    UserId, Vote, VoteTally,
};
use async_trait::async_trait;

/// User identities, unique by display name.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_name(&self, username: &str) -> Result<Option<User>>;

    async fn find_credentials(&self, username: &str) -> Result<Option<UserCredentials>>;

    /// Inserts a new user. Fails with `Conflict` when the name is taken.
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User>;

    /// Inserts the user unless the name already exists, then returns the
    /// stored row. Concurrent callers all observe the same identity.
    async fn ensure_user(&self, username: &str, password_hash: &str) -> Result<User>;
}

/// Post lifecycle. The implementation is the sole writer of `Post::score`
/// outside of [`VoteRepo::apply_vote`].
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn insert_post(&self, post: NewPost) -> Result<Post>;

    async fn get_post(&self, id: PostId) -> Result<Option<Post>>;

    /// Newest first; `board` is matched case-insensitively.
    async fn list_posts(&self, board: Option<String>) -> Result<Vec<Post>>;

    /// Fails with `NotFound` when the post no longer exists.
    async fn update_post(&self, id: PostId, patch: PostPatch) -> Result<Post>;

    /// Removes the post with all of its votes and comments in one transaction.
    /// Fails with `NotFound` (and removes nothing) when the post is absent.
    async fn delete_post_cascade(&self, id: PostId) -> Result<()>;
}

/// Comment storage. Comments form a forest per post through `parent_id`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Fails with `NotFound` when the post vanished before the insert and with
    /// `InvalidArgument` when the parent is gone or belongs to another post.
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>>;

    /// All comments of a post, oldest first.
    async fn comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>>;

    async fn update_comment(&self, id: CommentId, content: String) -> Result<Comment>;

    /// Deletes exactly one comment. Its direct replies are re-attached to the
    /// deleted comment's own parent in the same transaction.
    async fn delete_comment(&self, id: CommentId) -> Result<()>;
}

/// The vote ledger's storage. `apply_vote` must run the toggle/switch
/// transition and the score adjustment as one atomic, serialized unit.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VoteRepo: Send + Sync {
    /// Fails with `NotFound` when the post does not exist.
    async fn apply_vote(&self, user_id: UserId, post_id: PostId, value: i32) -> Result<VoteTally>;

    async fn find_vote(&self, user_id: UserId, post_id: PostId) -> Result<Option<Vote>>;

    async fn votes_for_post(&self, post_id: PostId) -> Result<Vec<Vote>>;
}

/// Credential hashing contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Produces a self-describing hash (salt included) for storage.
    async fn hash_password(&self, password: &str) -> Result<String>;

    /// Verifies a password against a stored hash. Malformed hashes never verify.
    async fn verify_password(&self, password: &str, hash: &str) -> bool;
}
