use citadel_core::{AppError, PostId};
use integration_tests::Harness;
use std::sync::Arc;

#[tokio::test]
async fn test_toggle_then_switch_scenario() {
    let h = Harness::in_memory().await;
    h.user("alice").await;
    let post = h.post_by("alice", "First").await;

    let tally = h.forum.cast_vote("alice", post.id, 1).await.unwrap();
    assert_eq!((tally.score, tally.user_vote), (1, 1));

    // Same value again retracts the vote.
    let tally = h.forum.cast_vote("alice", post.id, 1).await.unwrap();
    assert_eq!((tally.score, tally.user_vote), (0, 0));
    assert!(h.votes(post.id).await.is_empty());

    let tally = h.forum.cast_vote("alice", post.id, -1).await.unwrap();
    assert_eq!((tally.score, tally.user_vote), (-1, -1));

    // Opposite value switches in place.
    let tally = h.forum.cast_vote("alice", post.id, 1).await.unwrap();
    assert_eq!((tally.score, tally.user_vote), (1, 1));
    assert_eq!(h.votes(post.id).await.len(), 1);
}

#[tokio::test]
async fn test_weighted_votes_move_score_by_value() {
    let h = Harness::in_memory().await;
    h.user("alice").await;
    let post = h.post_by("alice", "Heavy").await;

    let tally = h.forum.cast_vote("alice", post.id, 5).await.unwrap();
    assert_eq!(tally.score, 5);
    let tally = h.forum.cast_vote("alice", post.id, -2).await.unwrap();
    assert_eq!((tally.score, tally.user_vote), (-2, -2));
    assert_eq!(h.vote_sum(post.id).await, -2);
}

#[tokio::test]
async fn test_score_matches_vote_sum_over_mixed_sequence() {
    let h = Harness::in_memory().await;
    let names = ["alice", "bob", "carol"];
    for name in names {
        h.user(name).await;
    }
    let post = h.post_by("alice", "Busy").await;

    // Deterministic mix of toggles and switches across several voters.
    let mut seed: u32 = 7;
    for _ in 0..60 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let voter = names[(seed >> 16) as usize % names.len()];
        let value = if (seed >> 8) & 1 == 0 { 1 } else { -1 };
        h.forum.cast_vote(voter, post.id, value).await.unwrap();

        assert_eq!(h.score(post.id).await, h.vote_sum(post.id).await);
        assert!(h.votes(post.id).await.len() <= names.len());
    }
}

#[tokio::test]
async fn test_zero_vote_is_rejected_without_effect() {
    let h = Harness::in_memory().await;
    h.user("alice").await;
    let post = h.post_by("alice", "Quiet").await;

    let err = h.forum.cast_vote("alice", post.id, 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
    assert_eq!(h.score(post.id).await, 0);
    assert!(h.votes(post.id).await.is_empty());
}

#[tokio::test]
async fn test_vote_on_missing_post_is_not_found() {
    let h = Harness::in_memory().await;
    h.user("alice").await;

    let err = h.forum.cast_vote("alice", PostId(404), 1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)));
}

#[tokio::test]
async fn test_unknown_voter_counts_as_anonymous() {
    let h = Harness::in_memory().await;
    h.user("alice").await;
    let post = h.post_by("alice", "Open").await;

    h.forum.cast_vote("ghost", post.id, 1).await.unwrap();
    // A second unnamed voter is the same identity and therefore toggles.
    let tally = h.forum.cast_vote("", post.id, 1).await.unwrap();
    assert_eq!((tally.score, tally.user_vote), (0, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_by_one_user_serialize() {
    let h = Arc::new(Harness::on_disk().await);
    h.user("alice").await;
    let post = h.post_by("alice", "Contended").await;

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let h = h.clone();
            tokio::spawn(async move { h.forum.cast_vote("alice", post.id, 1).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Ten serialized toggles cancel out.
    let votes = h.votes(post.id).await;
    assert!(votes.len() <= 1);
    assert_eq!(h.score(post.id).await, h.vote_sum(post.id).await);
    assert_eq!(h.score(post.id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_by_many_users_all_count() {
    let h = Arc::new(Harness::on_disk().await);
    let names: Vec<String> = (0..8).map(|i| format!("voter{i}")).collect();
    for name in &names {
        h.user(name).await;
    }
    let post = h.post_by("voter0", "Popular").await;

    let tasks: Vec<_> = names
        .iter()
        .cloned()
        .map(|name| {
            let h = h.clone();
            tokio::spawn(async move { h.forum.cast_vote(&name, post.id, 1).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.score(post.id).await, 8);
    assert_eq!(h.votes(post.id).await.len(), 8);
}
