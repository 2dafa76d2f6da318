//! Folder reconciliation

use treemirror_core::domain::{AvailableOffline, Node, NodeId};
use treemirror_core::ports::{INodeStore, NodeChanges, NodeOp};
use treemirror_sync::MirrorError;

use crate::common::{failing_harness, harness, path, MediaEvent};

#[tokio::test]
async fn test_listing_under_pinned_folder() {
    let h = harness().await;
    let tree = h.seed().await;
    h.engine
        .offline()
        .set_status(&h.account, &h.node("/Docs/").await, AvailableOffline::Offline)
        .await
        .unwrap();

    let docs = h.node("/Docs/").await.with_etag("docs-2");
    let mut listing = vec![
        h.file("/Docs/a.txt", tree.docs).with_etag("a-2"),
        h.file("/Docs/b.txt", tree.docs).with_etag("b-1"),
    ];

    let outcome = h
        .engine
        .reconciler()
        .reconcile(&h.account, &docs, &mut listing, &[])
        .await
        .unwrap();

    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.updated, 1);
    assert!(outcome.local_failures.is_empty());

    let a = h.node("/Docs/a.txt").await;
    assert_eq!(a.id(), Some(tree.a));
    assert_eq!(a.etag(), Some("a-2"));
    assert_eq!(a.available_offline(), AvailableOffline::OfflineByParent);

    let b = h.node("/Docs/b.txt").await;
    assert_eq!(b.parent_id(), tree.docs);
    assert_eq!(b.available_offline(), AvailableOffline::OfflineByParent);
    assert_eq!(listing[0].id(), Some(tree.a));
    assert_eq!(listing[1].id(), b.id());

    assert_eq!(h.node("/Docs/").await.etag(), Some("docs-2"));
}

#[tokio::test]
async fn test_reconcile_twice_is_a_no_op() {
    let h = harness().await;
    let tree = h.seed().await;
    let docs = h.node("/Docs/").await.with_tree_etag("t-2");
    let sub = h.node("/Docs/Sub/").await;
    let mut listing = vec![
        h.file("/Docs/a.txt", tree.docs).with_size(10),
        h.file("/Docs/new.txt", tree.docs),
    ];

    h.engine
        .reconciler()
        .reconcile(&h.account, &docs, &mut listing, &[sub.clone()])
        .await
        .unwrap();
    let first = h.snapshot().await;

    let outcome = h
        .engine
        .reconciler()
        .reconcile(&h.account, &docs, &mut listing, &[sub])
        .await
        .unwrap();
    let second = h.snapshot().await;

    assert_eq!(first, second);
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.removed, 0);
}

#[tokio::test]
async fn test_caller_offline_state_is_ignored_on_insert() {
    let h = harness().await;
    let tree = h.seed().await;
    let music = h.node("/Music/").await;
    let mut listing =
        vec![h.file("/Music/song.mp3", tree.music).with_available_offline(AvailableOffline::Offline)];

    h.engine
        .reconciler()
        .reconcile(&h.account, &music, &mut listing, &[])
        .await
        .unwrap();

    assert_eq!(h.status("/Music/song.mp3").await, AvailableOffline::NotOffline);
    assert_eq!(listing[0].available_offline(), AvailableOffline::NotOffline);
}

#[tokio::test]
async fn test_listing_keeps_client_state() {
    let h = harness().await;
    let tree = h.seed().await;
    h.engine
        .conflicts()
        .set_conflict(&h.account, &h.node("/Docs/a.txt").await, Some("etag-x".into()))
        .await
        .unwrap();
    h.engine
        .offline()
        .set_status(&h.account, &h.node("/Docs/a.txt").await, AvailableOffline::Offline)
        .await
        .unwrap();
    let before = h.node("/Docs/a.txt").await;

    let docs = h.node("/Docs/").await;
    let mut listing = vec![h.file("/Docs/a.txt", tree.docs).with_etag("a-3")];
    h.engine
        .reconciler()
        .reconcile(&h.account, &docs, &mut listing, &[])
        .await
        .unwrap();

    let after = h.node("/Docs/a.txt").await;
    assert_eq!(after.etag(), Some("a-3"));
    assert_eq!(after.local_path(), before.local_path());
    assert_eq!(after.conflict_marker(), Some("etag-x"));
    assert_eq!(after.available_offline(), AvailableOffline::Offline);
}

#[tokio::test]
async fn test_vanished_folder_is_deleted_and_purged() {
    let h = harness().await;
    let tree = h.seed().await;
    let docs = h.node("/Docs/").await;
    let sub = h.node("/Docs/Sub/").await;
    let b_local = h.local("/Docs/Sub/b.txt");
    let mut listing = vec![h.file("/Docs/a.txt", tree.docs)];

    let outcome = h
        .engine
        .reconciler()
        .reconcile(&h.account, &docs, &mut listing, &[sub])
        .await
        .unwrap();

    assert_eq!(outcome.removed, 2);
    assert!(!h.exists("/Docs/Sub/").await);
    assert!(!h.exists("/Docs/Sub/b.txt").await);
    assert!(!h.local("/Docs/Sub/").exists());
    assert!(h.local("/Docs/a.txt").exists());
    assert_eq!(h.media.events(), vec![MediaEvent::Removed(b_local)]);
}

#[tokio::test]
async fn test_vanished_folder_without_cache_still_purges_directory() {
    let h = harness().await;
    h.seed().await;
    let root = h.node("/").await;
    let music = h.node("/Music/").await;
    std::fs::create_dir_all(h.local("/Music/")).unwrap();

    h.engine
        .reconciler()
        .reconcile(&h.account, &root, &mut [], &[music])
        .await
        .unwrap();

    assert!(!h.exists("/Music/").await);
    assert!(!h.local("/Music/").exists());
    assert!(h.media.events().is_empty());
}

#[tokio::test]
async fn test_removal_of_node_owned_by_another_folder_is_skipped() {
    let h = harness().await;
    h.seed().await;
    let docs = h.node("/Docs/").await;
    let b = h.node("/Docs/Sub/b.txt").await;

    let outcome = h
        .engine
        .reconciler()
        .reconcile(&h.account, &docs, &mut [], &[b])
        .await
        .unwrap();

    assert_eq!(outcome.removed, 0);
    assert!(h.exists("/Docs/Sub/b.txt").await);
    assert!(h.local("/Docs/Sub/b.txt").exists());
}

#[tokio::test]
async fn test_rename_overlapping_removal_keeps_row_and_bytes() {
    let h = harness().await;
    let tree = h.seed().await;
    let docs = h.node("/Docs/").await;
    let old = h.node("/Docs/a.txt").await;
    let mut listing = vec![h.file("/Docs/renamed.txt", tree.docs).with_id(tree.a)];

    let outcome = h
        .engine
        .reconciler()
        .reconcile(&h.account, &docs, &mut listing, &[old.clone()])
        .await
        .unwrap();

    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.removed, 0);
    assert!(!h.exists("/Docs/a.txt").await);
    let renamed = h.node("/Docs/renamed.txt").await;
    assert_eq!(renamed.id(), Some(tree.a));
    assert_eq!(renamed.local_path(), old.local_path());
    assert!(old.local_path().unwrap().exists());
    assert!(h.media.events().is_empty());
}

#[tokio::test]
async fn test_folder_rename_overlapping_removal_keeps_descendants() {
    let h = harness().await;
    let tree = h.seed().await;
    h.engine
        .conflicts()
        .set_conflict(&h.account, &h.node("/Docs/Sub/b.txt").await, Some("etag-b".into()))
        .await
        .unwrap();
    let docs = h.node("/Docs/").await;
    let old_sub = h.node("/Docs/Sub/").await;
    let b = h.node("/Docs/Sub/b.txt").await;
    let mut listing = vec![
        h.file("/Docs/a.txt", tree.docs).with_id(tree.a),
        h.folder("/Docs/Sub2/", tree.docs).with_id(tree.sub),
    ];

    let outcome = h
        .engine
        .reconciler()
        .reconcile(&h.account, &docs, &mut listing, &[old_sub])
        .await
        .unwrap();

    assert_eq!(outcome.updated, 2);
    assert_eq!(outcome.removed, 0);
    assert_eq!(h.node("/Docs/Sub2/").await.id(), Some(tree.sub));
    let kept = h.node("/Docs/Sub/b.txt").await;
    assert_eq!(kept.id(), Some(tree.b));
    assert_eq!(kept.parent_id(), tree.sub);
    assert!(b.local_path().unwrap().exists());
    for p in ["/Docs/Sub/b.txt", "/Docs/Sub2/", "/Docs/"] {
        assert_eq!(h.marker(p).await.as_deref(), Some("etag-b"), "{p}");
    }
    assert!(h.media.events().is_empty());
}

#[tokio::test]
async fn test_removing_conflicted_files_retracts_ancestor_markers() {
    let h = harness().await;
    h.seed().await;
    let conflicts = h.engine.conflicts();
    for p in ["/Docs/a.txt", "/Docs/Sub/b.txt"] {
        conflicts
            .set_conflict(&h.account, &h.node(p).await, Some("etag-x".into()))
            .await
            .unwrap();
    }

    let docs = h.node("/Docs/").await;
    let a = h.node("/Docs/a.txt").await;
    let sub = h.node("/Docs/Sub/").await;
    h.engine
        .reconciler()
        .reconcile(&h.account, &docs, &mut [], &[a, sub])
        .await
        .unwrap();

    assert_eq!(h.marker("/Docs/").await, None);
    assert_eq!(h.marker("/").await, None);
}

#[tokio::test]
async fn test_reconcile_requires_stored_folder() {
    let h = harness().await;
    let tree = h.seed().await;

    let unsaved = h.folder("/Ghost/", tree.root);
    let result = h
        .engine
        .reconciler()
        .reconcile(&h.account, &unsaved, &mut [], &[])
        .await;
    assert!(matches!(result, Err(MirrorError::Usage(_))));

    let a = h.node("/Docs/a.txt").await;
    let result = h
        .engine
        .reconciler()
        .reconcile(&h.account, &a, &mut [], &[])
        .await;
    assert!(matches!(result, Err(MirrorError::Usage(_))));

    let missing = h.folder("/Gone/", tree.root).with_id(NodeId::new(4242).unwrap());
    let result = h
        .engine
        .reconciler()
        .reconcile(&h.account, &missing, &mut [], &[])
        .await;
    assert!(matches!(result, Err(MirrorError::Usage(_))));
}

#[tokio::test]
async fn test_failed_batch_leaves_tree_and_disk_untouched() {
    let h = failing_harness().await;
    let tree = h.seed().await;
    let before = h.snapshot().await;

    let docs = h.node("/Docs/").await.with_etag("docs-2");
    let sub = h.node("/Docs/Sub/").await;
    let mut listing = vec![
        h.file("/Docs/a.txt", tree.docs).with_etag("a-2"),
        h.file("/Docs/c.txt", tree.docs),
    ];

    let result = h
        .engine
        .reconciler()
        .reconcile(&h.account, &docs, &mut listing, &[sub])
        .await;

    assert!(matches!(result, Err(MirrorError::Persistence(_))));
    assert_eq!(h.snapshot().await, before);
    assert!(h.local("/Docs/Sub/b.txt").exists());
    assert!(h.media.events().is_empty());
    assert_eq!(listing[1].id(), None);
}

#[tokio::test]
async fn test_store_apply_rolls_back_mid_batch() {
    let h = harness().await;
    let tree = h.seed().await;
    let before = h.snapshot().await;

    let result = h
        .store
        .apply(vec![
            NodeOp::update_id(
                &h.account,
                tree.a,
                NodeChanges::default().with_remote_path(path("/Docs/z.txt")),
            ),
            NodeOp::Insert(Node::root(h.account.clone())),
        ])
        .await;

    assert!(result.is_err());
    assert_eq!(h.snapshot().await, before);
}
