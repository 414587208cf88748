//! # Post Store
//!
//! Owns the scroll lifecycle. Deleting a post takes its votes and comments
//! with it in a single persistence transaction.

use crate::error::{require, AppError, Result};
use crate::identity::ensure_author;
use crate::models::{NewPost, Post, PostDraft, PostId, PostPatch, User, DEFAULT_BOARD};
use crate::traits::PostRepo;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub struct PostStore {
    posts: Arc<dyn PostRepo>,
}

/// Treats blank optional text as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl PostStore {
    pub fn new(posts: Arc<dyn PostRepo>) -> Self {
        Self { posts }
    }

    pub async fn create_post(&self, author: &User, draft: PostDraft) -> Result<Post> {
        require("title", &draft.title)?;
        require("content", &draft.content)?;

        let post = self
            .posts
            .insert_post(NewPost {
                title: draft.title,
                content: draft.content,
                board: non_blank(draft.board).unwrap_or_else(|| DEFAULT_BOARD.to_string()),
                link: non_blank(draft.link),
                author_id: author.id,
                created_at: Utc::now(),
            })
            .await?;
        info!(post_id = %post.id, board = %post.board, author = %author.username, "scroll scribed");
        Ok(post)
    }

    pub async fn get_post(&self, id: PostId) -> Result<Post> {
        self.posts
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("post", id))
    }

    /// Newest first. A blank filter lists every board.
    pub async fn list_posts(&self, board: Option<&str>) -> Result<Vec<Post>> {
        let board = non_blank(board.map(str::to_string));
        self.posts.list_posts(board).await
    }

    /// Author-only partial update. Blank fields are left unchanged.
    pub async fn update_post(&self, id: PostId, actor: &User, patch: PostPatch) -> Result<Post> {
        let post = self.get_post(id).await?;
        ensure_author(&post.author, actor, "rewrite this scroll")?;

        let patch = PostPatch {
            title: non_blank(patch.title),
            content: non_blank(patch.content),
        };
        if patch.is_empty() {
            return Ok(post);
        }
        self.posts.update_post(id, patch).await
    }

    /// Author-only. Votes and comments go with the post.
    pub async fn delete_post(&self, id: PostId, actor: &User) -> Result<()> {
        let post = self.get_post(id).await?;
        ensure_author(&post.author, actor, "burn this scroll")?;
        self.posts.delete_post_cascade(id).await?;
        info!(post_id = %id, "scroll burned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, UserId};
    use crate::traits::MockPostRepo;

    fn user(id: i64, name: &str) -> User {
        User {
            id: UserId(id),
            username: name.into(),
            created_at: Utc::now(),
        }
    }

    fn stored(new: NewPost) -> Post {
        Post {
            id: PostId(1),
            title: new.title,
            content: new.content,
            board: new.board,
            link: new.link,
            score: 0,
            author: Author {
                id: new.author_id,
                username: "alice".into(),
            },
            created_at: new.created_at,
        }
    }

    fn existing() -> Post {
        stored(NewPost {
            title: "old".into(),
            content: "body".into(),
            board: "General".into(),
            link: None,
            author_id: UserId(1),
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn blank_board_defaults_to_general() {
        let mut posts = MockPostRepo::new();
        posts
            .expect_insert_post()
            .withf(|new| new.board == DEFAULT_BOARD && new.link.is_none())
            .times(1)
            .returning(|new| Ok(stored(new)));
        let store = PostStore::new(Arc::new(posts));

        let draft = PostDraft {
            title: "Hello".into(),
            content: "World".into(),
            board: Some("  ".into()),
            link: Some(String::new()),
        };
        let post = store.create_post(&user(1, "alice"), draft).await.unwrap();
        assert_eq!(post.board, "General");
        assert_eq!(post.score, 0);
    }

    #[tokio::test]
    async fn missing_title_is_rejected() {
        let mut posts = MockPostRepo::new();
        posts.expect_insert_post().never();
        let store = PostStore::new(Arc::new(posts));

        let draft = PostDraft {
            content: "body".into(),
            ..PostDraft::default()
        };
        let err = store.create_post(&user(1, "alice"), draft).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn non_author_cannot_update_or_delete() {
        let mut posts = MockPostRepo::new();
        posts.expect_get_post().returning(|_| Ok(Some(existing())));
        posts.expect_update_post().never();
        posts.expect_delete_post_cascade().never();
        let store = PostStore::new(Arc::new(posts));
        let bob = user(2, "bob");

        let patch = PostPatch {
            title: Some("hijacked".into()),
            content: None,
        };
        let err = store.update_post(PostId(1), &bob, patch).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = store.delete_post(PostId(1), &bob).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn update_of_missing_post_is_not_found() {
        let mut posts = MockPostRepo::new();
        posts.expect_get_post().returning(|_| Ok(None));
        let store = PostStore::new(Arc::new(posts));

        let err = store
            .update_post(PostId(4), &user(1, "alice"), PostPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::not_found("post", 4));
    }

    #[tokio::test]
    async fn blank_patch_fields_are_dropped() {
        let mut posts = MockPostRepo::new();
        posts.expect_get_post().returning(|_| Ok(Some(existing())));
        posts
            .expect_update_post()
            .withf(|_, patch| patch.title.is_none() && patch.content.as_deref() == Some("new"))
            .times(1)
            .returning(|_, patch| {
                let mut post = existing();
                post.content = patch.content.unwrap_or_default();
                Ok(post)
            });
        let store = PostStore::new(Arc::new(posts));

        let patch = PostPatch {
            title: Some(String::new()),
            content: Some("new".into()),
        };
        let post = store
            .update_post(PostId(1), &user(1, "alice"), patch)
            .await
            .unwrap();
        assert_eq!(post.title, "old");
        assert_eq!(post.content, "new");
    }

    #[tokio::test]
    async fn author_delete_cascades() {
        let mut posts = MockPostRepo::new();
        posts.expect_get_post().returning(|_| Ok(Some(existing())));
        posts
            .expect_delete_post_cascade()
            .withf(|id| *id == PostId(1))
            .times(1)
            .returning(|_| Ok(()));
        let store = PostStore::new(Arc::new(posts));

        store.delete_post(PostId(1), &user(1, "alice")).await.unwrap();
    }

    #[tokio::test]
    async fn blank_board_filter_lists_everything() {
        let mut posts = MockPostRepo::new();
        posts
            .expect_list_posts()
            .withf(|board| board.is_none())
            .times(1)
            .returning(|_| Ok(vec![]));
        let store = PostStore::new(Arc::new(posts));

        assert!(store.list_posts(Some("")).await.unwrap().is_empty());
    }
}
