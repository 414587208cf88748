//! Shared fixtures for the end-to-end suites: a `Forum` wired to a real SQLite
//! store, with a cheap credential double so tests do not pay for Argon2.

use async_trait::async_trait;
use citadel_core::error::Result;
use citadel_core::models::{Post, PostDraft, User, Vote};
use citadel_core::traits::{AuthProvider, VoteRepo};
use citadel_core::{Forum, ForumPorts, PostId};
use citadel_db_sqlite::SqliteStore;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reversible "hash" for tests only.
pub struct PlainCredentials;

#[async_trait]
impl AuthProvider for PlainCredentials {
    async fn hash_password(&self, password: &str) -> Result<String> {
        Ok(format!("plain${password}"))
    }

    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("plain$") == Some(password)
    }
}

/// A database file in the temp dir, removed together with its WAL
/// side files when dropped.
pub struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "citadel-it-{}-{}.db",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        let db = Self { path };
        db.remove_files();
        db
    }

    fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }

    fn remove_files(&self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        self.remove_files();
    }
}

pub struct Harness {
    pub forum: Forum,
    pub store: Arc<SqliteStore>,
    // Declared last so the store is dropped before the files go.
    db_file: Option<TempDb>,
}

impl Harness {
    /// Single-connection in-memory database.
    pub async fn in_memory() -> Self {
        Self::open("sqlite::memory:").await
    }

    /// A fresh database file with a full connection pool, for concurrency tests.
    pub async fn on_disk() -> Self {
        let db_file = TempDb::fresh();
        let mut harness = Self::open(&db_file.url()).await;
        harness.db_file = Some(db_file);
        harness
    }

    async fn open(url: &str) -> Self {
        let store = Arc::new(SqliteStore::new(url).await.expect("open test database"));
        let ports = ForumPorts::from_store(store.clone(), Arc::new(PlainCredentials));
        let forum = Forum::new(ports, SecretString::from("test-anon-secret".to_string()));
        Self {
            forum,
            store,
            db_file: None,
        }
    }

    /// Backing file of an on-disk harness.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_file.as_ref().map(|db| db.path.as_path())
    }

    pub async fn user(&self, name: &str) -> User {
        self.forum.register(name, "password").await.expect("register")
    }

    pub async fn post_by(&self, author: &str, title: &str) -> Post {
        self.forum
            .create_post(
                author,
                PostDraft {
                    title: title.into(),
                    content: "body".into(),
                    ..PostDraft::default()
                },
            )
            .await
            .expect("create post")
    }

    pub async fn votes(&self, post_id: PostId) -> Vec<Vote> {
        self.store.votes_for_post(post_id).await.expect("votes")
    }

    /// Sum of the post's vote rows, to compare against its stored score.
    pub async fn vote_sum(&self, post_id: PostId) -> i64 {
        self.votes(post_id)
            .await
            .iter()
            .map(|v| i64::from(v.value))
            .sum()
    }

    pub async fn score(&self, post_id: PostId) -> i64 {
        self.forum
            .get_post(post_id, None)
            .await
            .expect("get post")
            .post
            .score
    }
}
