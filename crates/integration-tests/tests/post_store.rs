use citadel_core::traits::CommentRepo;
use citadel_core::{AppError, PostDraft, PostId, PostPatch};
use integration_tests::Harness;

fn draft(title: &str, board: Option<&str>) -> PostDraft {
    PostDraft {
        title: title.into(),
        content: "words".into(),
        board: board.map(String::from),
        link: None,
    }
}

#[tokio::test]
async fn test_board_defaults_and_filter() {
    let h = Harness::in_memory().await;
    h.user("alice").await;

    let general = h.forum.create_post("alice", draft("A", None)).await.unwrap();
    assert_eq!(general.board, "General");
    assert_eq!(general.score, 0);
    h.forum
        .create_post("alice", draft("B", Some("Rust")))
        .await
        .unwrap();
    h.forum
        .create_post("alice", draft("C", Some("rust")))
        .await
        .unwrap();

    let rust = h.forum.list_posts(Some("RUST")).await.unwrap();
    let titles: Vec<_> = rust.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["C", "B"]);

    assert_eq!(h.forum.list_posts(None).await.unwrap().len(), 3);
    assert_eq!(h.forum.list_posts(Some("")).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_missing_title_is_rejected() {
    let h = Harness::in_memory().await;
    let err = h
        .forum
        .create_post("alice", draft("  ", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_only_the_author_may_change_a_post() {
    let h = Harness::in_memory().await;
    h.user("alice").await;
    h.user("bob").await;
    let post = h.post_by("alice", "Mine").await;

    let patch = PostPatch {
        title: Some("Stolen".into()),
        content: None,
    };
    let err = h
        .forum
        .update_post(post.id, "bob", patch.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = h.forum.delete_post(post.id, "bob").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = h
        .forum
        .update_post(post.id, "mallory", patch.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let unchanged = h.forum.get_post(post.id, None).await.unwrap().post;
    assert_eq!(unchanged.title, "Mine");

    let updated = h.forum.update_post(post.id, "alice", patch).await.unwrap();
    assert_eq!(updated.title, "Stolen");
    assert_eq!(updated.content, "body");
}

#[tokio::test]
async fn test_delete_cascades_to_comments_and_votes() {
    let h = Harness::in_memory().await;
    h.user("alice").await;
    h.user("bob").await;
    let doomed = h.post_by("alice", "Doomed").await;
    let survivor = h.post_by("alice", "Survivor").await;

    let root = h
        .forum
        .add_comment(doomed.id, None, "bob", "first")
        .await
        .unwrap();
    h.forum
        .add_comment(doomed.id, Some(root.id), "alice", "reply")
        .await
        .unwrap();
    h.forum.cast_vote("bob", doomed.id, 1).await.unwrap();
    h.forum.cast_vote("", doomed.id, -1).await.unwrap();
    h.forum.cast_vote("bob", survivor.id, 1).await.unwrap();
    h.forum
        .add_comment(survivor.id, None, "bob", "kept")
        .await
        .unwrap();

    h.forum.delete_post(doomed.id, "alice").await.unwrap();

    let err = h.forum.get_post(doomed.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)));
    assert!(h.votes(doomed.id).await.is_empty());
    assert!(h.store.comments_for_post(doomed.id).await.unwrap().is_empty());

    let err = h.forum.cast_vote("bob", doomed.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)));

    let kept = h.forum.get_post(survivor.id, Some("bob")).await.unwrap();
    assert_eq!(kept.comments.len(), 1);
    assert_eq!(kept.user_vote, 1);
    assert_eq!(kept.post.score, 1);
}

#[tokio::test]
async fn test_delete_missing_post_is_not_found() {
    let h = Harness::in_memory().await;
    h.user("alice").await;
    let err = h.forum.delete_post(PostId(31), "alice").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)));
}

#[tokio::test]
async fn test_detail_reports_the_viewer_vote() {
    let h = Harness::in_memory().await;
    h.user("alice").await;
    h.user("bob").await;
    let post = h.post_by("alice", "Voted").await;
    h.forum.cast_vote("bob", post.id, -1).await.unwrap();

    let seen_by_bob = h.forum.get_post(post.id, Some("bob")).await.unwrap();
    assert_eq!(seen_by_bob.user_vote, -1);
    let seen_by_alice = h.forum.get_post(post.id, Some("alice")).await.unwrap();
    assert_eq!(seen_by_alice.user_vote, 0);
    let seen_by_stranger = h.forum.get_post(post.id, Some("stranger")).await.unwrap();
    assert_eq!(seen_by_stranger.user_vote, 0);
}

#[tokio::test]
async fn test_link_is_stored_and_blank_link_is_dropped() {
    let h = Harness::in_memory().await;
    h.user("alice").await;

    let linked = h
        .forum
        .create_post(
            "alice",
            PostDraft {
                link: Some("https://example.org/scroll".into()),
                ..draft("Linked", Some("Links"))
            },
        )
        .await
        .unwrap();
    assert_eq!(linked.link.as_deref(), Some("https://example.org/scroll"));

    let detail = h.forum.get_post(linked.id, None).await.unwrap();
    assert_eq!(detail.post.link.as_deref(), Some("https://example.org/scroll"));
    let listed = h.forum.list_posts(Some("links")).await.unwrap();
    assert_eq!(listed[0].link.as_deref(), Some("https://example.org/scroll"));

    let unlinked = h
        .forum
        .create_post(
            "alice",
            PostDraft {
                link: Some("   ".into()),
                ..draft("Plain", None)
            },
        )
        .await
        .unwrap();
    let detail = h.forum.get_post(unlinked.id, None).await.unwrap();
    assert_eq!(detail.post.link, None);
}
