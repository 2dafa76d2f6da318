//! Single-node saves, copies, removals and queries

use treemirror_core::domain::AvailableOffline::{NotOffline, Offline, OfflineByParent};
use treemirror_core::domain::{AccountName, Node, NodeId, RemoteId};
use treemirror_core::ports::INodeStore;
use treemirror_sync::MirrorError;

use crate::common::{harness, path, Harness, MediaEvent};

async fn pin(h: &Harness, p: &str) {
    h.engine
        .offline()
        .set_status(&h.account, &h.node(p).await, Offline)
        .await
        .unwrap();
}

async fn mark(h: &Harness, p: &str) {
    h.engine
        .conflicts()
        .set_conflict(&h.account, &h.node(p).await, Some("etag-x".into()))
        .await
        .unwrap();
}

// ============================================================================
// NodeWriter
// ============================================================================

#[tokio::test]
async fn test_save_new_node_inherits_pin() {
    let h = harness().await;
    let tree = h.seed().await;
    pin(&h, "/Docs/").await;

    let mut node = h
        .file("/Docs/Sub/new.txt", tree.sub)
        .with_available_offline(NotOffline);
    let overwritten = h.engine.writer().save_node(&h.account, &mut node).await.unwrap();

    assert!(!overwritten);
    assert!(node.id().is_some());
    assert_eq!(node.available_offline(), OfflineByParent);
    assert_eq!(h.status("/Docs/Sub/new.txt").await, OfflineByParent);
}

#[tokio::test]
async fn test_save_existing_node_keeps_propagated_state() {
    let h = harness().await;
    let tree = h.seed().await;
    pin(&h, "/Docs/a.txt").await;
    mark(&h, "/Docs/a.txt").await;

    let mut node = h
        .file("/Docs/a.txt", tree.docs)
        .with_etag("a-2")
        .with_local_path(h.local("/Docs/a.txt"));
    let overwritten = h.engine.writer().save_node(&h.account, &mut node).await.unwrap();

    assert!(overwritten);
    assert_eq!(node.id(), Some(tree.a));
    assert_eq!(node.available_offline(), Offline);
    let stored = h.node("/Docs/a.txt").await;
    assert_eq!(stored.etag(), Some("a-2"));
    assert_eq!(stored.available_offline(), Offline);
    assert_eq!(stored.conflict_marker(), Some("etag-x"));
}

#[tokio::test]
async fn test_save_with_known_id_renames() {
    let h = harness().await;
    let tree = h.seed().await;

    let mut node = h.file("/Docs/renamed.txt", tree.docs).with_id(tree.a);
    let overwritten = h.engine.writer().save_node(&h.account, &mut node).await.unwrap();

    assert!(overwritten);
    assert!(!h.exists("/Docs/a.txt").await);
    assert_eq!(h.node("/Docs/renamed.txt").await.id(), Some(tree.a));
}

#[tokio::test]
async fn test_save_rejects_missing_parent_and_foreign_account() {
    let h = harness().await;
    h.seed().await;
    let writer = h.engine.writer();

    let mut orphan = h.file("/Nowhere/x.txt", NodeId::new(4242).unwrap());
    let result = writer.save_node(&h.account, &mut orphan).await;
    assert!(matches!(result, Err(MirrorError::Usage(_))));

    let bob = AccountName::new("bob").unwrap();
    let mut foreign = Node::root(bob);
    let result = writer.save_node(&h.account, &mut foreign).await;
    assert!(matches!(result, Err(MirrorError::Usage(_))));
}

#[tokio::test]
async fn test_ensure_root_is_idempotent() {
    let h = harness().await;
    let writer = h.engine.writer();

    let first = writer.ensure_root(&h.account).await.unwrap();
    let second = writer.ensure_root(&h.account).await.unwrap();

    assert!(first.id().is_some());
    assert_eq!(first.id(), second.id());
    assert_eq!(first.parent_id(), NodeId::ROOT_PARENT);
    assert_eq!(h.snapshot().await.len(), 1);
}

// ============================================================================
// NodeCopier
// ============================================================================

#[tokio::test]
async fn test_copy_links_existing_target() {
    let h = harness().await;
    let tree = h.seed().await;
    h.insert(h.file("/Music/a-copy.txt", tree.music)).await;

    let outcome = h
        .engine
        .copier()
        .copy_local(&h.account, &h.node("/Docs/a.txt").await, &path("/Music/a-copy.txt"))
        .await
        .unwrap();

    let dst = h.local("/Music/a-copy.txt");
    assert_eq!(outcome.copied_to.as_deref(), Some(dst.as_path()));
    assert!(outcome.linked);
    assert_eq!(std::fs::read(&dst).unwrap(), b"a");
    assert_eq!(
        h.node("/Music/a-copy.txt").await.local_path(),
        Some(dst.as_path())
    );
    assert_eq!(h.media.events(), vec![MediaEvent::Added(dst)]);
}

#[tokio::test]
async fn test_copy_without_cached_source_is_a_no_op() {
    let h = harness().await;
    let tree = h.seed().await;
    h.insert(h.file("/Music/song.mp3", tree.music)).await;

    let outcome = h
        .engine
        .copier()
        .copy_local(&h.account, &h.node("/Music/song.mp3").await, &path("/Music/copy.mp3"))
        .await
        .unwrap();

    assert_eq!(outcome.copied_to, None);
    assert!(!h.local("/Music/copy.mp3").exists());
}

#[tokio::test]
async fn test_copy_reports_failed_bytes_without_linking() {
    let h = harness().await;
    let tree = h.seed().await;
    let a = h.node("/Docs/a.txt").await;
    std::fs::remove_file(a.local_path().unwrap()).unwrap();
    h.insert(h.file("/Music/a-copy.txt", tree.music)).await;

    let outcome = h
        .engine
        .copier()
        .copy_local(&h.account, &a, &path("/Music/a-copy.txt"))
        .await
        .unwrap();

    assert_eq!(outcome.local_failures.len(), 1);
    assert_eq!(outcome.local_failures[0].operation, "copy");
    assert!(!outcome.linked);
    assert_eq!(h.node("/Music/a-copy.txt").await.local_path(), None);
}

#[tokio::test]
async fn test_copy_of_folder_is_rejected() {
    let h = harness().await;
    h.seed().await;

    let result = h
        .engine
        .copier()
        .copy_local(&h.account, &h.node("/Docs/").await, &path("/Copy/"))
        .await;
    assert!(matches!(result, Err(MirrorError::Usage(_))));
}

// ============================================================================
// NodeRemover
// ============================================================================

#[tokio::test]
async fn test_remove_file_entirely() {
    let h = harness().await;
    h.seed().await;
    mark(&h, "/Docs/a.txt").await;
    let local = h.local("/Docs/a.txt");

    let outcome = h
        .engine
        .remover()
        .remove_file(&h.account, &h.node("/Docs/a.txt").await, true, true)
        .await
        .unwrap();

    assert_eq!(outcome.rows_deleted, 1);
    assert!(!h.exists("/Docs/a.txt").await);
    assert!(!local.exists());
    assert_eq!(h.marker("/Docs/").await, None);
    assert_eq!(h.marker("/").await, None);
    assert_eq!(h.media.events(), vec![MediaEvent::Removed(local)]);
}

#[tokio::test]
async fn test_remove_local_content_keeps_row() {
    let h = harness().await;
    h.seed().await;
    mark(&h, "/Docs/Sub/b.txt").await;
    let local = h.local("/Docs/Sub/b.txt");

    let outcome = h
        .engine
        .remover()
        .remove_file(&h.account, &h.node("/Docs/Sub/b.txt").await, false, true)
        .await
        .unwrap();

    assert_eq!(outcome.rows_deleted, 0);
    assert_eq!(outcome.content_released, 1);
    let b = h.node("/Docs/Sub/b.txt").await;
    assert_eq!(b.local_path(), None);
    assert_eq!(b.conflict_marker(), None);
    assert_eq!(h.marker("/Docs/Sub/").await, None);
    assert_eq!(h.marker("/").await, None);
    assert!(!local.exists());
}

#[tokio::test]
async fn test_remove_metadata_only_keeps_bytes() {
    let h = harness().await;
    h.seed().await;

    h.engine
        .remover()
        .remove_file(&h.account, &h.node("/Docs/a.txt").await, true, false)
        .await
        .unwrap();

    assert!(!h.exists("/Docs/a.txt").await);
    assert!(h.local("/Docs/a.txt").exists());
}

#[tokio::test]
async fn test_remove_folder_with_content() {
    let h = harness().await;
    let tree = h.seed().await;
    let outside = h.content.path().join("outside.txt");
    std::fs::write(&outside, b"o").unwrap();
    h.insert(h.file("/Docs/Sub/c.txt", tree.sub).with_local_path(outside.clone()))
        .await;

    let outcome = h
        .engine
        .remover()
        .remove_folder(&h.account, &h.node("/Docs/").await, true, true)
        .await
        .unwrap();

    assert_eq!(outcome.rows_deleted, 5);
    assert!(!h.exists("/Docs/").await);
    assert!(h.exists("/Music/").await);
    assert!(!h.local("/Docs/").exists());
    assert!(!outside.exists());
    assert_eq!(h.media.events().len(), 3);
}

#[tokio::test]
async fn test_remove_folder_local_only_releases_every_file() {
    let h = harness().await;
    h.seed().await;
    mark(&h, "/Docs/a.txt").await;

    let outcome = h
        .engine
        .remover()
        .remove_folder(&h.account, &h.node("/Docs/").await, false, true)
        .await
        .unwrap();

    assert_eq!(outcome.content_released, 2);
    assert_eq!(h.node("/Docs/a.txt").await.local_path(), None);
    assert_eq!(h.node("/Docs/Sub/b.txt").await.local_path(), None);
    assert_eq!(h.marker("/Docs/").await, None);
    assert_eq!(h.marker("/").await, None);
    assert!(!h.local("/Docs/").exists());
}

#[tokio::test]
async fn test_remove_kind_mismatch_is_rejected() {
    let h = harness().await;
    h.seed().await;
    let remover = h.engine.remover();

    let result = remover
        .remove_file(&h.account, &h.node("/Docs/").await, true, true)
        .await;
    assert!(matches!(result, Err(MirrorError::Usage(_))));

    let result = remover
        .remove_folder(&h.account, &h.node("/Docs/a.txt").await, true, true)
        .await;
    assert!(matches!(result, Err(MirrorError::Usage(_))));
}

// ============================================================================
// MirrorQueries
// ============================================================================

#[tokio::test]
async fn test_queries_bind_content_at_default_location() {
    let h = harness().await;
    let tree = h.seed().await;
    h.insert(h.file("/Music/song.mp3", tree.music)).await;
    let local = h.write_cached("/Music/song.mp3", b"la");

    let queries = h.engine.queries();
    let song = queries
        .get_by_path(&h.account, &path("/Music/song.mp3"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(song.local_path(), Some(local.as_path()));
    assert_eq!(h.node("/Music/song.mp3").await.local_path(), None);
}

#[tokio::test]
async fn test_queries_children_and_offline_views() {
    let h = harness().await;
    h.seed().await;
    pin(&h, "/Docs/Sub/").await;

    let bob = AccountName::new("bob").unwrap();
    let bob_root = h.insert(Node::root(bob.clone())).await;
    let bob_file = Node::new_file(bob.clone(), path("/x.txt"), bob_root, "text/plain")
        .unwrap()
        .with_available_offline(Offline);
    h.insert(bob_file).await;

    let queries = h.engine.queries();
    let docs = h.node("/Docs/").await;

    let children: Vec<String> = queries
        .children(&h.account, &docs, false)
        .await
        .unwrap()
        .iter()
        .map(|n| n.remote_path().to_string())
        .collect();
    assert_eq!(children, vec!["/Docs/Sub/", "/Docs/a.txt"]);

    let offline_children = queries.children(&h.account, &docs, true).await.unwrap();
    assert_eq!(offline_children.len(), 1);

    let a = h.node("/Docs/a.txt").await;
    assert!(queries.children(&h.account, &a, false).await.unwrap().is_empty());

    let offline_files: Vec<String> = queries
        .available_offline_files()
        .await
        .unwrap()
        .iter()
        .map(|n| format!("{}:{}", n.account(), n.remote_path()))
        .collect();
    assert!(offline_files.contains(&"alice:/Docs/Sub/b.txt".to_string()));
    assert!(offline_files.contains(&"bob:/x.txt".to_string()));
    assert_eq!(offline_files.len(), 2);

    let pinned = queries.pinned_nodes(&h.account).await.unwrap();
    assert_eq!(pinned.len(), 1);
    assert_eq!(pinned[0].remote_path().as_str(), "/Docs/Sub/");

    let ancestor = queries
        .offline_ancestor(&h.account, &h.node("/Docs/Sub/b.txt").await)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ancestor.remote_path().as_str(), "/Docs/Sub/");
}

#[tokio::test]
async fn test_queries_by_local_path_and_remote_id() {
    let h = harness().await;
    let tree = h.seed().await;
    let queries = h.engine.queries();

    let found = queries
        .get_by_local_path(&h.account, &h.local("/Docs/a.txt"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id(), Some(tree.a));

    let rid = RemoteId::new("rid-music").unwrap();
    let mut music = h.node("/Music/").await;
    music.set_remote_id(Some(rid.clone()));
    h.engine.writer().save_node(&h.account, &mut music).await.unwrap();

    let by_rid = queries.get_by_remote_id(&h.account, &rid).await.unwrap().unwrap();
    assert_eq!(by_rid.id(), Some(tree.music));
    assert!(h
        .store
        .get_by_id(&h.account, tree.music)
        .await
        .unwrap()
        .is_some());
}
