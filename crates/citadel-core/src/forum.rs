//! # Forum
//!
//! The surface the routing layer talks to. Every operation takes display names
//! as supplied by the client and resolves them through the [`IdentityResolver`]
//! before handing off to the component that owns the data.

use crate::accounts::Accounts;
use crate::comments::CommentTree;
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::ledger::VoteLedger;
use crate::models::{
    Comment, CommentId, CommentNode, Post, PostDetail, PostDraft, PostId, PostPatch, User,
    VoteTally,
};
use crate::posts::PostStore;
use crate::traits::{AuthProvider, CommentRepo, PostRepo, UserRepo, VoteRepo};
use secrecy::SecretString;
use std::sync::Arc;

/// The persistence and credential collaborators, injected explicitly.
pub struct ForumPorts {
    pub users: Arc<dyn UserRepo>,
    pub posts: Arc<dyn PostRepo>,
    pub comments: Arc<dyn CommentRepo>,
    pub votes: Arc<dyn VoteRepo>,
    pub auth: Arc<dyn AuthProvider>,
}

impl ForumPorts {
    /// Uses one store for every persistence port.
    pub fn from_store<R>(store: Arc<R>, auth: Arc<dyn AuthProvider>) -> Self
    where
        R: UserRepo + PostRepo + CommentRepo + VoteRepo + 'static,
    {
        Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            votes: store,
            auth,
        }
    }
}

pub struct Forum {
    identity: IdentityResolver,
    ledger: VoteLedger,
    comments: CommentTree,
    posts: PostStore,
    accounts: Accounts,
}

impl Forum {
    pub fn new(ports: ForumPorts, anonymous_secret: SecretString) -> Self {
        Self {
            identity: IdentityResolver::new(
                ports.users.clone(),
                ports.auth.clone(),
                anonymous_secret,
            ),
            ledger: VoteLedger::new(ports.votes),
            comments: CommentTree::new(ports.posts.clone(), ports.comments),
            posts: PostStore::new(ports.posts),
            accounts: Accounts::new(ports.users, ports.auth),
        }
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<User> {
        self.accounts.register(username, password).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        self.accounts.login(username, password).await
    }

    pub async fn cast_vote(
        &self,
        username: &str,
        post_id: PostId,
        value: i32,
    ) -> Result<VoteTally> {
        let voter = self.identity.resolve(username).await?;
        self.ledger.cast_vote(&voter, post_id, value).await
    }

    pub async fn add_comment(
        &self,
        post_id: PostId,
        parent_id: Option<CommentId>,
        username: &str,
        content: &str,
    ) -> Result<Comment> {
        let author = self.identity.resolve(username).await?;
        self.comments
            .add_comment(post_id, parent_id, &author, content)
            .await
    }

    pub async fn update_comment(
        &self,
        id: CommentId,
        acting: &str,
        content: &str,
    ) -> Result<Comment> {
        let actor = self.identity.resolve_actor(acting).await?;
        self.comments.update_comment(id, &actor, content).await
    }

    pub async fn delete_comment(&self, id: CommentId, acting: &str) -> Result<()> {
        let actor = self.identity.resolve_actor(acting).await?;
        self.comments.delete_comment(id, &actor).await
    }

    pub async fn comment_forest(&self, post_id: PostId) -> Result<Vec<CommentNode>> {
        self.comments.forest(post_id).await
    }

    pub async fn create_post(&self, username: &str, draft: PostDraft) -> Result<Post> {
        let author = self.identity.resolve(username).await?;
        self.posts.create_post(&author, draft).await
    }

    pub async fn update_post(&self, id: PostId, acting: &str, patch: PostPatch) -> Result<Post> {
        let actor = self.identity.resolve_actor(acting).await?;
        self.posts.update_post(id, &actor, patch).await
    }

    pub async fn delete_post(&self, id: PostId, acting: &str) -> Result<()> {
        let actor = self.identity.resolve_actor(acting).await?;
        self.posts.delete_post(id, &actor).await
    }

    /// The post with its comments and the viewer's vote (0 for unknown viewers).
    pub async fn get_post(&self, id: PostId, viewer: Option<&str>) -> Result<PostDetail> {
        let post = self.posts.get_post(id).await?;
        let comments = self.comments.comments_for_post(id).await?;
        let user_vote = match viewer {
            Some(name) => match self.identity.lookup(name).await? {
                Some(user) => self.ledger.user_vote_for(user.id, id).await?,
                None => 0,
            },
            None => 0,
        };
        Ok(PostDetail {
            post,
            comments,
            user_vote,
        })
    }

    pub async fn list_posts(&self, board: Option<&str>) -> Result<Vec<Post>> {
        self.posts.list_posts(board).await
    }
}
