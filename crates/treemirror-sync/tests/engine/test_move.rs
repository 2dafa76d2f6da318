//! Move/rename rewriting

use treemirror_core::domain::AvailableOffline::{NotOffline, Offline, OfflineByParent};
use treemirror_sync::mover::MoveOutcome;
use treemirror_sync::MirrorError;

use crate::common::{harness, path, Harness, MediaEvent};

async fn set_pin(h: &Harness, p: &str) {
    h.engine
        .offline()
        .set_status(&h.account, &h.node(p).await, Offline)
        .await
        .unwrap();
}

async fn move_to(h: &Harness, from: &str, to: &str) -> Result<MoveOutcome, MirrorError> {
    let target = path(to);
    let parent = target.parent().unwrap();
    h.engine
        .mover()
        .move_node(&h.account, &h.node(from).await, &target, &parent)
        .await
}

#[tokio::test]
async fn test_rename_folder_rewrites_subtree_and_local_tree() {
    let h = harness().await;
    let tree = h.seed().await;
    let old_a = h.local("/Docs/a.txt");
    let old_b = h.local("/Docs/Sub/b.txt");

    let outcome = move_to(&h, "/Docs/", "/Papers/").await.unwrap();

    assert_eq!(outcome.moved, 4);
    assert!(outcome.local_failures.is_empty());
    assert!(!h.exists("/Docs/").await);
    assert_eq!(h.node("/Papers/").await.id(), Some(tree.docs));
    assert_eq!(h.node("/Papers/a.txt").await.id(), Some(tree.a));
    assert_eq!(h.node("/Papers/Sub/").await.id(), Some(tree.sub));
    assert_eq!(h.node("/Papers/Sub/b.txt").await.id(), Some(tree.b));

    let new_a = h.local("/Papers/a.txt");
    let new_b = h.local("/Papers/Sub/b.txt");
    assert_eq!(h.node("/Papers/a.txt").await.local_path(), Some(new_a.as_path()));
    assert_eq!(h.node("/Papers/Sub/b.txt").await.local_path(), Some(new_b.as_path()));
    assert!(new_a.exists());
    assert!(new_b.exists());
    assert!(!old_a.exists());

    assert_eq!(
        outcome.relocated,
        vec![(old_b.clone(), new_b.clone()), (old_a.clone(), new_a.clone())]
    );
    assert_eq!(
        h.media.events(),
        vec![
            MediaEvent::Removed(old_b),
            MediaEvent::Added(new_b),
            MediaEvent::Removed(old_a),
            MediaEvent::Added(new_a),
        ]
    );
}

#[tokio::test]
async fn test_move_reparents_node() {
    let h = harness().await;
    let tree = h.seed().await;

    move_to(&h, "/Docs/a.txt", "/Music/a.txt").await.unwrap();

    let moved = h.node("/Music/a.txt").await;
    assert_eq!(moved.parent_id(), tree.music);
    assert_eq!(moved.local_path(), Some(h.local("/Music/a.txt").as_path()));
    assert!(h.local("/Music/a.txt").exists());
}

#[tokio::test]
async fn test_content_outside_default_location_is_not_rebased() {
    let h = harness().await;
    let tree = h.seed().await;
    let elsewhere = h.content.path().join("elsewhere.txt");
    std::fs::write(&elsewhere, b"x").unwrap();
    h.insert(h.file("/Docs/c.txt", tree.docs).with_local_path(elsewhere.clone()))
        .await;

    let outcome = move_to(&h, "/Docs/", "/Papers/").await.unwrap();

    assert_eq!(
        h.node("/Papers/c.txt").await.local_path(),
        Some(elsewhere.as_path())
    );
    assert!(elsewhere.exists());
    assert!(outcome.relocated.iter().all(|(old, _)| old != &elsewhere));
}

#[tokio::test]
async fn test_move_into_pinned_folder_inherits() {
    let h = harness().await;
    h.seed().await;
    set_pin(&h, "/Music/").await;
    set_pin(&h, "/Docs/").await;

    move_to(&h, "/Docs/", "/Music/Docs/").await.unwrap();

    assert_eq!(h.status("/Music/Docs/").await, OfflineByParent);
    assert_eq!(h.status("/Music/Docs/a.txt").await, OfflineByParent);
    assert_eq!(h.status("/Music/Docs/Sub/b.txt").await, OfflineByParent);
}

#[tokio::test]
async fn test_move_out_of_pinned_folder_drops_inherited_state() {
    let h = harness().await;
    h.seed().await;
    set_pin(&h, "/Docs/").await;

    move_to(&h, "/Docs/Sub/", "/Music/Sub/").await.unwrap();

    assert_eq!(h.status("/Music/Sub/").await, NotOffline);
    assert_eq!(h.status("/Music/Sub/b.txt").await, NotOffline);
    assert_eq!(h.status("/Docs/a.txt").await, OfflineByParent);
}

#[tokio::test]
async fn test_pin_inside_moved_subtree_survives() {
    let h = harness().await;
    h.seed().await;
    set_pin(&h, "/Docs/").await;
    set_pin(&h, "/Docs/Sub/").await;

    move_to(&h, "/Docs/", "/Archive/").await.unwrap();

    assert_eq!(h.status("/Archive/").await, Offline);
    assert_eq!(h.status("/Archive/a.txt").await, OfflineByParent);
    assert_eq!(h.status("/Archive/Sub/").await, Offline);
    assert_eq!(h.status("/Archive/Sub/b.txt").await, OfflineByParent);
}

#[tokio::test]
async fn test_conflicts_follow_the_moved_file() {
    let h = harness().await;
    h.seed().await;
    h.engine
        .conflicts()
        .set_conflict(&h.account, &h.node("/Docs/a.txt").await, Some("etag-a".into()))
        .await
        .unwrap();

    move_to(&h, "/Docs/a.txt", "/Music/a.txt").await.unwrap();

    assert_eq!(h.marker("/Music/a.txt").await.as_deref(), Some("etag-a"));
    assert_eq!(h.marker("/Music/").await.as_deref(), Some("etag-a"));
    assert_eq!(h.marker("/").await.as_deref(), Some("etag-a"));
    assert_eq!(h.marker("/Docs/").await, None);
}

#[tokio::test]
async fn test_usage_errors_leave_tree_untouched() {
    let h = harness().await;
    h.seed().await;
    let before = h.snapshot().await;
    let mover = h.engine.mover();
    let docs = h.node("/Docs/").await;
    let a = h.node("/Docs/a.txt").await;
    let root = h.node("/").await;

    let cases = [
        (&root, "/Root/", "/"),
        (&docs, "/Missing/Docs/", "/Missing/"),
        (&docs, "/Docs/a.txt/Docs/", "/Docs/a.txt/"),
        (&docs, "/Music/", "/"),
        (&docs, "/Docs/Sub/Docs/", "/Docs/Sub/"),
        (&docs, "/Papers", "/"),
        (&a, "/Music/a.txt", "/Docs/"),
    ];

    for (node, to, parent) in cases {
        let result = mover
            .move_node(&h.account, node, &path(to), &path(parent))
            .await;
        assert!(
            matches!(result, Err(MirrorError::Usage(_))),
            "{} -> {to} should be rejected",
            node.remote_path()
        );
    }

    assert_eq!(h.snapshot().await, before);
    assert!(h.media.events().is_empty());
}

#[tokio::test]
async fn test_move_to_same_path_is_a_no_op() {
    let h = harness().await;
    h.seed().await;
    let before = h.snapshot().await;

    let outcome = move_to(&h, "/Docs/", "/Docs/").await.unwrap();

    assert_eq!(outcome.moved, 0);
    assert_eq!(h.snapshot().await, before);
}
