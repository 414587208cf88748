//! # Comment Tree
//!
//! Marks are stored flat, each pointing at its post and optionally at a parent
//! mark on the same post. Callers rebuild the reply forest from `parent_id`,
//! or ask for it pre-assembled through [`build_forest`].

use crate::error::{require, AppError, Result};
use crate::identity::ensure_author;
use crate::models::{Comment, CommentId, CommentNode, NewComment, PostId, User};
use crate::traits::{CommentRepo, PostRepo};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

pub struct CommentTree {
    posts: Arc<dyn PostRepo>,
    comments: Arc<dyn CommentRepo>,
}

impl CommentTree {
    pub fn new(posts: Arc<dyn PostRepo>, comments: Arc<dyn CommentRepo>) -> Self {
        Self { posts, comments }
    }

    /// Adds a comment to a post, optionally as a reply.
    ///
    /// The parent must be an existing comment on the same post; dangling and
    /// cross-post parents are rejected with `InvalidArgument`.
    pub async fn add_comment(
        &self,
        post_id: PostId,
        parent_id: Option<CommentId>,
        author: &User,
        content: &str,
    ) -> Result<Comment> {
        require("content", content)?;
        if self.posts.get_post(post_id).await?.is_none() {
            return Err(AppError::not_found("post", post_id));
        }
        if let Some(parent_id) = parent_id {
            match self.comments.get_comment(parent_id).await? {
                Some(parent) if parent.post_id == post_id => {}
                Some(_) => {
                    return Err(AppError::invalid(format!(
                        "parent comment {parent_id} belongs to another post"
                    )))
                }
                None => {
                    return Err(AppError::invalid(format!(
                        "parent comment {parent_id} does not exist"
                    )))
                }
            }
        }

        let comment = self
            .comments
            .insert_comment(NewComment {
                post_id,
                parent_id,
                author_id: author.id,
                content: content.to_string(),
                created_at: Utc::now(),
            })
            .await?;
        info!(comment_id = %comment.id, post_id = %post_id, author = %author.username, "mark left");
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        id: CommentId,
        actor: &User,
        content: &str,
    ) -> Result<Comment> {
        require("content", content)?;
        let comment = self.fetch(id).await?;
        ensure_author(&comment.author, actor, "amend this mark")?;
        self.comments.update_comment(id, content.to_string()).await
    }

    /// Deletes exactly one comment; its replies move up to its parent.
    pub async fn delete_comment(&self, id: CommentId, actor: &User) -> Result<()> {
        let comment = self.fetch(id).await?;
        ensure_author(&comment.author, actor, "erase this mark")?;
        self.comments.delete_comment(id).await?;
        info!(comment_id = %id, post_id = %comment.post_id, "mark erased");
        Ok(())
    }

    /// Flat list for a post, oldest first.
    pub async fn comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>> {
        self.comments.comments_for_post(post_id).await
    }

    /// The post's comments assembled into reply trees.
    pub async fn forest(&self, post_id: PostId) -> Result<Vec<CommentNode>> {
        if self.posts.get_post(post_id).await?.is_none() {
            return Err(AppError::not_found("post", post_id));
        }
        Ok(build_forest(self.comments.comments_for_post(post_id).await?))
    }

    async fn fetch(&self, id: CommentId) -> Result<Comment> {
        self.comments
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::not_found("mark", id))
    }
}

/// Assembles a flat comment list into a forest.
///
/// Siblings are ordered by creation time (ties by ID). A comment whose parent is
/// not in the list is treated as a root so that nothing is silently dropped.
pub fn build_forest(mut comments: Vec<Comment>) -> Vec<CommentNode> {
    type Children = HashMap<Option<CommentId>, Vec<Comment>>;

    comments.sort_by_key(|c| (c.created_at, c.id));
    let present: HashSet<CommentId> = comments.iter().map(|c| c.id).collect();

    let mut children: Children = HashMap::new();
    for comment in comments {
        let slot = comment.parent_id.filter(|parent| present.contains(parent));
        children.entry(slot).or_default().push(comment);
    }

    fn attach(parent: Option<CommentId>, children: &mut Children) -> Vec<CommentNode> {
        children
            .remove(&parent)
            .unwrap_or_default()
            .into_iter()
            .map(|comment| {
                let replies = attach(Some(comment.id), children);
                CommentNode { comment, replies }
            })
            .collect()
    }

    attach(None, &mut children)
}
