//! # Domain Models
//!
//! These structs represent the core entities of Citadel: scrolls (posts),
//! marks (comments), votes and the users behind them.
//! Identifiers are database-assigned integers wrapped in newtypes so a post ID
//! can never be passed where a comment ID is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display name of the shared identity used for unattributed actions.
pub const ANONYMOUS_USERNAME: &str = "Anonymous";

/// Board assigned to posts created without one.
pub const DEFAULT_BOARD: &str = "General";

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(UserId);
id_type!(PostId);
id_type!(CommentId);

/// A registered or lazily provisioned identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_anonymous(&self) -> bool {
        self.username == ANONYMOUS_USERNAME
    }

    pub fn as_author(&self) -> Author {
        Author {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// A user row together with its stored credential. Only the account flow
/// ever sees this; it is deliberately not serializable.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// The author reference embedded in posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub username: String,
}

/// A scroll: the unit of submission on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    /// Category label; matched case-insensitively when filtering
    pub board: String,
    pub link: Option<String>,
    /// Always equal to the sum of the post's vote values
    pub score: i64,
    pub author: Author,
    pub created_at: DateTime<Utc>,
}

/// What an author submits when scribing a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    /// Blank or absent means [`DEFAULT_BOARD`]
    pub board: Option<String>,
    pub link: Option<String>,
}

/// Fields for a post about to be inserted. The score always starts at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub board: String,
    pub link: Option<String>,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A partial update; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// A mark: a comment on a post, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    /// `None` for top-level comments
    pub parent_id: Option<CommentId>,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A comment with its replies, as assembled by the comment tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// One user's vote on one post. At most one exists per (user, post).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: UserId,
    pub post_id: PostId,
    pub value: i32,
}

/// Result of casting a vote: the post's new score and the caller's
/// vote after the toggle/switch rules were applied (0 when toggled off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub score: i64,
    pub user_vote: i32,
}

/// Everything a reader needs to render a single post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetail {
    pub post: Post,
    /// Flat, creation-ordered; `parent_id` carries the forest structure
    pub comments: Vec<Comment>,
    pub user_vote: i32,
}
