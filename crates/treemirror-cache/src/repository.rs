//! SQLite implementation of INodeStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! node store port defined in treemirror-core. It handles row mapping and
//! SQL construction, including the dynamic `UPDATE` statements built from
//! [`NodeChanges`].
//!
//! ## Type Mapping
//!
//! | Domain Type       | SQL Type | Strategy                                     |
//! |-------------------|----------|----------------------------------------------|
//! | NodeId            | INTEGER  | `as_i64()` / `NodeId::new()`                 |
//! | AccountName       | TEXT     | `as_str()` / `AccountName::new()`            |
//! | RemotePath        | TEXT     | `as_str()` / `RemotePath::new()`             |
//! | RemoteId          | TEXT     | `as_str()` / `RemoteId::new()`               |
//! | PathBuf           | TEXT     | UTF-8 only, rejected otherwise               |
//! | AvailableOffline  | INTEGER  | `as_i64()` / `AvailableOffline::from_i64()`  |
//! | DateTime<Utc>     | TEXT     | RFC 3339                                     |
//!
//! ## Prefix ranges
//!
//! Subtree scans are half-open ranges over the `(account, remote_path)`
//! unique index: a folder prefix `p` ending in `/` covers
//! `p <= path < p'` where `p'` replaces the trailing `/` with its successor
//! `0`. This avoids `LIKE` and its case folding and wildcard escaping.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use treemirror_core::domain::{
    AccountName, AvailableOffline, Node, NodeId, RemoteId, RemotePath, FOLDER_MIME_TYPE,
};
use treemirror_core::ports::{INodeStore, NodeChanges, NodeOp, NodeTarget, OpResult};

use crate::CacheError;

/// SQLite-based implementation of the node store port
///
/// All reads go through the pool; every [`INodeStore::apply`] call runs in
/// its own transaction.
pub struct SqliteNodeStore {
    pool: SqlitePool,
}

impl SqliteNodeStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        sql: &str,
        account: &AccountName,
        value: String,
    ) -> Result<Option<Node>, CacheError> {
        let row = sqlx::query(sql)
            .bind(account.as_str())
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(node_from_row).transpose()
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Exclusive upper bound of the range of strings starting with `prefix`
fn prefix_upper_bound(prefix: &str) -> String {
    let mut bound = prefix.to_string();
    if let Some(last) = bound.pop() {
        let next = char::from_u32(last as u32 + 1).unwrap_or(char::MAX);
        bound.push(next);
    }
    bound
}

fn path_to_text(path: &Path) -> Result<String, CacheError> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        CacheError::SerializationError(format!(
            "Local path is not valid UTF-8: {}",
            path.display()
        ))
    })
}

fn size_to_i64(size: u64) -> Result<i64, CacheError> {
    i64::try_from(size)
        .map_err(|_| CacheError::SerializationError(format!("Size out of range: {size}")))
}

fn datetime_to_text(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(|dt| dt.to_rfc3339())
}

/// Parse a DateTime<Utc> from its stored representation
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite default format, for rows written by hand
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, CacheError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

// ============================================================================
// Row mapping
// ============================================================================

/// Reconstruct a Node from a database row
fn node_from_row(row: &SqliteRow) -> Result<Node, CacheError> {
    let id: i64 = row.try_get("id")?;
    let account = AccountName::new(row.try_get::<String, _>("account")?)?;
    let parent_id = NodeId::new(row.try_get("parent_id")?)?;
    let remote_path = RemotePath::new(row.try_get::<String, _>("remote_path")?)?;
    let mime_type: String = row.try_get("mime_type")?;

    let mut node = if mime_type == FOLDER_MIME_TYPE {
        Node::new_folder(account, remote_path, parent_id)?
    } else {
        Node::new_file(account, remote_path, parent_id, mime_type)?
    };
    node.set_id(NodeId::new(id)?);

    let size: i64 = row.try_get("size")?;
    node.set_size(u64::try_from(size).map_err(|_| {
        CacheError::SerializationError(format!("Negative size in row {id}: {size}"))
    })?);
    node.set_etag(row.try_get("etag")?);
    node.set_tree_etag(row.try_get("tree_etag")?);
    node.set_local_path(row.try_get::<Option<String>, _>("local_path")?.map(PathBuf::from));
    node.set_available_offline(AvailableOffline::from_i64(row.try_get("available_offline")?)?);
    node.set_conflict_marker(row.try_get("conflict_marker")?);
    node.set_created_at(parse_optional_datetime(row.try_get("created_at")?)?);
    node.set_modified_at(parse_optional_datetime(row.try_get("modified_at")?)?);
    node.set_modified_at_last_sync_for_data(parse_optional_datetime(
        row.try_get("modified_at_last_sync_for_data")?,
    )?);
    node.set_last_sync_for_properties(parse_optional_datetime(
        row.try_get("last_sync_for_properties")?,
    )?);
    node.set_last_sync_for_data(parse_optional_datetime(row.try_get("last_sync_for_data")?)?);
    node.set_sharing(
        row.try_get("shared_via_link")?,
        row.try_get("shared_with_sharee")?,
    );
    node.set_permissions(row.try_get("permissions")?);
    node.set_remote_id(
        row.try_get::<Option<String>, _>("remote_id")?
            .map(RemoteId::new)
            .transpose()?,
    );
    node.set_private_link(row.try_get("private_link")?);
    node.set_needs_thumbnail_update(row.try_get("needs_thumbnail_update")?);
    node.set_downloading(row.try_get("is_downloading")?);

    Ok(node)
}

fn nodes_from_rows(rows: &[SqliteRow]) -> Result<Vec<Node>, CacheError> {
    rows.iter().map(node_from_row).collect()
}

// ============================================================================
// Write helpers
// ============================================================================

/// A bound value of a dynamic UPDATE
enum Bound {
    Int(i64),
    Text(Option<String>),
    Bool(bool),
}

/// Column assignments described by a change set, in a fixed order
fn assignments(changes: &NodeChanges) -> Result<Vec<(&'static str, Bound)>, CacheError> {
    let mut cols = Vec::new();

    if let Some(parent_id) = changes.parent_id {
        cols.push(("parent_id", Bound::Int(parent_id.as_i64())));
    }
    if let Some(ref path) = changes.remote_path {
        cols.push(("remote_path", Bound::Text(Some(path.as_str().to_string()))));
    }
    if let Some(ref mime) = changes.mime_type {
        cols.push(("mime_type", Bound::Text(Some(mime.clone()))));
    }
    if let Some(size) = changes.size {
        cols.push(("size", Bound::Int(size_to_i64(size)?)));
    }
    if let Some(ref etag) = changes.etag {
        cols.push(("etag", Bound::Text(etag.clone())));
    }
    if let Some(ref tree_etag) = changes.tree_etag {
        cols.push(("tree_etag", Bound::Text(tree_etag.clone())));
    }
    if let Some(ref local) = changes.local_path {
        let text = local.as_deref().map(path_to_text).transpose()?;
        cols.push(("local_path", Bound::Text(text)));
    }
    if let Some(status) = changes.available_offline {
        cols.push(("available_offline", Bound::Int(status.as_i64())));
    }
    if let Some(ref marker) = changes.conflict_marker {
        cols.push(("conflict_marker", Bound::Text(marker.clone())));
    }
    if let Some(at) = changes.created_at {
        cols.push(("created_at", Bound::Text(datetime_to_text(at))));
    }
    if let Some(at) = changes.modified_at {
        cols.push(("modified_at", Bound::Text(datetime_to_text(at))));
    }
    if let Some(at) = changes.modified_at_last_sync_for_data {
        cols.push((
            "modified_at_last_sync_for_data",
            Bound::Text(datetime_to_text(at)),
        ));
    }
    if let Some(at) = changes.last_sync_for_properties {
        cols.push(("last_sync_for_properties", Bound::Text(datetime_to_text(at))));
    }
    if let Some(at) = changes.last_sync_for_data {
        cols.push(("last_sync_for_data", Bound::Text(datetime_to_text(at))));
    }
    if let Some(flag) = changes.shared_via_link {
        cols.push(("shared_via_link", Bound::Bool(flag)));
    }
    if let Some(flag) = changes.shared_with_sharee {
        cols.push(("shared_with_sharee", Bound::Bool(flag)));
    }
    if let Some(ref permissions) = changes.permissions {
        cols.push(("permissions", Bound::Text(permissions.clone())));
    }
    if let Some(ref remote_id) = changes.remote_id {
        let text = remote_id.as_ref().map(|id| id.as_str().to_string());
        cols.push(("remote_id", Bound::Text(text)));
    }
    if let Some(ref link) = changes.private_link {
        cols.push(("private_link", Bound::Text(link.clone())));
    }
    if let Some(flag) = changes.needs_thumbnail_update {
        cols.push(("needs_thumbnail_update", Bound::Bool(flag)));
    }
    if let Some(flag) = changes.is_downloading {
        cols.push(("is_downloading", Bound::Bool(flag)));
    }

    Ok(cols)
}

/// Start an `UPDATE nodes SET ...` statement, `None` if nothing changes
fn update_builder(changes: &NodeChanges) -> Result<Option<QueryBuilder<'static, Sqlite>>, CacheError> {
    let cols = assignments(changes)?;
    if cols.is_empty() {
        return Ok(None);
    }

    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE nodes SET ");
    for (i, (col, value)) in cols.into_iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(col).push(" = ");
        match value {
            Bound::Int(v) => qb.push_bind(v),
            Bound::Text(v) => qb.push_bind(v),
            Bound::Bool(v) => qb.push_bind(v),
        };
    }
    Ok(Some(qb))
}

async fn insert_node(conn: &mut SqliteConnection, node: &Node) -> Result<NodeId, CacheError> {
    let local_path = node.local_path().map(path_to_text).transpose()?;

    let result = sqlx::query(
        r#"
        INSERT INTO nodes (
            account, parent_id, remote_path, mime_type, size, etag, tree_etag,
            local_path, available_offline, conflict_marker, created_at, modified_at,
            modified_at_last_sync_for_data, last_sync_for_properties, last_sync_for_data,
            shared_via_link, shared_with_sharee, permissions, remote_id, private_link,
            needs_thumbnail_update, is_downloading
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(node.account().as_str())
    .bind(node.parent_id().as_i64())
    .bind(node.remote_path().as_str())
    .bind(node.mime_type())
    .bind(size_to_i64(node.size())?)
    .bind(node.etag())
    .bind(node.tree_etag())
    .bind(local_path)
    .bind(node.available_offline().as_i64())
    .bind(node.conflict_marker())
    .bind(datetime_to_text(node.created_at()))
    .bind(datetime_to_text(node.modified_at()))
    .bind(datetime_to_text(node.modified_at_last_sync_for_data()))
    .bind(datetime_to_text(node.last_sync_for_properties()))
    .bind(datetime_to_text(node.last_sync_for_data()))
    .bind(node.shared_via_link())
    .bind(node.shared_with_sharee())
    .bind(node.permissions())
    .bind(node.remote_id().map(RemoteId::as_str))
    .bind(node.private_link())
    .bind(node.needs_thumbnail_update())
    .bind(node.is_downloading())
    .execute(&mut *conn)
    .await?;

    Ok(NodeId::new(result.last_insert_rowid())?)
}

async fn apply_op(conn: &mut SqliteConnection, op: &NodeOp) -> Result<OpResult, CacheError> {
    match op {
        NodeOp::Insert(node) => insert_node(conn, node).await.map(OpResult::Inserted),

        NodeOp::Update {
            account,
            target,
            changes,
        } => {
            let Some(mut qb) = update_builder(changes)? else {
                return Ok(OpResult::Updated(0));
            };
            qb.push(" WHERE account = ")
                .push_bind(account.as_str().to_string());
            match target {
                NodeTarget::Id(id) => qb.push(" AND id = ").push_bind(id.as_i64()),
                NodeTarget::Path(path) => qb
                    .push(" AND remote_path = ")
                    .push_bind(path.as_str().to_string()),
            };
            let done = qb.build().execute(&mut *conn).await?;
            Ok(OpResult::Updated(done.rows_affected()))
        }

        NodeOp::UpdateDescendants {
            account,
            root,
            changes,
        } => {
            if !root.is_folder() {
                return Ok(OpResult::Updated(0));
            }
            let Some(mut qb) = update_builder(changes)? else {
                return Ok(OpResult::Updated(0));
            };
            qb.push(" WHERE account = ")
                .push_bind(account.as_str().to_string())
                .push(" AND remote_path > ")
                .push_bind(root.as_str().to_string())
                .push(" AND remote_path < ")
                .push_bind(prefix_upper_bound(root.as_str()));
            let done = qb.build().execute(&mut *conn).await?;
            Ok(OpResult::Updated(done.rows_affected()))
        }

        NodeOp::Delete { account, path } => {
            let done = if path.is_folder() {
                sqlx::query(
                    "DELETE FROM nodes WHERE account = ? AND remote_path >= ? AND remote_path < ?",
                )
                .bind(account.as_str())
                .bind(path.as_str())
                .bind(prefix_upper_bound(path.as_str()))
                .execute(&mut *conn)
                .await?
            } else {
                sqlx::query("DELETE FROM nodes WHERE account = ? AND remote_path = ?")
                    .bind(account.as_str())
                    .bind(path.as_str())
                    .execute(&mut *conn)
                    .await?
            };
            Ok(OpResult::Deleted(done.rows_affected()))
        }
    }
}

// ============================================================================
// INodeStore implementation
// ============================================================================

#[async_trait::async_trait]
impl INodeStore for SqliteNodeStore {
    async fn get_by_path(
        &self,
        account: &AccountName,
        path: &RemotePath,
    ) -> anyhow::Result<Option<Node>> {
        Ok(self
            .fetch_one_where(
                "SELECT * FROM nodes WHERE account = ? AND remote_path = ?",
                account,
                path.as_str().to_string(),
            )
            .await?)
    }

    async fn get_by_id(&self, account: &AccountName, id: NodeId) -> anyhow::Result<Option<Node>> {
        let row = sqlx::query("SELECT * FROM nodes WHERE account = ? AND id = ?")
            .bind(account.as_str())
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(node_from_row).transpose()?)
    }

    async fn get_by_remote_id(
        &self,
        account: &AccountName,
        remote_id: &RemoteId,
    ) -> anyhow::Result<Option<Node>> {
        Ok(self
            .fetch_one_where(
                "SELECT * FROM nodes WHERE account = ? AND remote_id = ?",
                account,
                remote_id.as_str().to_string(),
            )
            .await?)
    }

    async fn get_by_local_path(
        &self,
        account: &AccountName,
        local_path: &Path,
    ) -> anyhow::Result<Option<Node>> {
        Ok(self
            .fetch_one_where(
                "SELECT * FROM nodes WHERE account = ? AND local_path = ?",
                account,
                path_to_text(local_path)?,
            )
            .await?)
    }

    async fn exists_by_path(
        &self,
        account: &AccountName,
        path: &RemotePath,
    ) -> anyhow::Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM nodes WHERE account = ? AND remote_path = ?",
        )
        .bind(account.as_str())
        .bind(path.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn exists_by_id(&self, account: &AccountName, id: NodeId) -> anyhow::Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM nodes WHERE account = ? AND id = ?")
                .bind(account.as_str())
                .bind(id.as_i64())
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn children(
        &self,
        account: &AccountName,
        parent_id: NodeId,
        offline_only: bool,
    ) -> anyhow::Result<Vec<Node>> {
        let sql = if offline_only {
            "SELECT * FROM nodes WHERE account = ? AND parent_id = ? \
             AND available_offline IN (1, 2) ORDER BY remote_path"
        } else {
            "SELECT * FROM nodes WHERE account = ? AND parent_id = ? ORDER BY remote_path"
        };
        let rows = sqlx::query(sql)
            .bind(account.as_str())
            .bind(parent_id.as_i64())
            .fetch_all(&self.pool)
            .await?;

        Ok(nodes_from_rows(&rows)?)
    }

    async fn subtree(
        &self,
        account: &AccountName,
        root: &RemotePath,
    ) -> anyhow::Result<Vec<Node>> {
        let rows = if root.is_folder() {
            sqlx::query(
                "SELECT * FROM nodes WHERE account = ? AND remote_path >= ? AND remote_path < ? \
                 ORDER BY remote_path",
            )
            .bind(account.as_str())
            .bind(root.as_str())
            .bind(prefix_upper_bound(root.as_str()))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query("SELECT * FROM nodes WHERE account = ? AND remote_path = ?")
                .bind(account.as_str())
                .bind(root.as_str())
                .fetch_all(&self.pool)
                .await?
        };
        Ok(nodes_from_rows(&rows)?)
    }

    async fn count_conflicted_files(
        &self,
        account: &AccountName,
        prefix: &RemotePath,
    ) -> anyhow::Result<u64> {
        if !prefix.is_folder() {
            return Ok(0);
        }
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM nodes WHERE account = ? AND mime_type != ? \
             AND conflict_marker IS NOT NULL AND remote_path > ? AND remote_path < ?",
        )
        .bind(account.as_str())
        .bind(FOLDER_MIME_TYPE)
        .bind(prefix.as_str())
        .bind(prefix_upper_bound(prefix.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn available_offline_files(&self) -> anyhow::Result<Vec<Node>> {
        let rows = sqlx::query(
            "SELECT * FROM nodes WHERE mime_type != ? AND available_offline IN (1, 2) \
             ORDER BY account, remote_path",
        )
        .bind(FOLDER_MIME_TYPE)
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes_from_rows(&rows)?)
    }

    async fn pinned_nodes(&self, account: &AccountName) -> anyhow::Result<Vec<Node>> {
        let rows = sqlx::query(
            "SELECT * FROM nodes WHERE account = ? AND available_offline = 1 ORDER BY remote_path",
        )
        .bind(account.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes_from_rows(&rows)?)
    }

    async fn apply(&self, ops: Vec<NodeOp>) -> anyhow::Result<Vec<OpResult>> {
        let mut tx = self.pool.begin().await.map_err(CacheError::from)?;
        let mut results = Vec::with_capacity(ops.len());

        for op in &ops {
            // An early return drops `tx`, which rolls the whole batch back
            results.push(apply_op(&mut *tx, op).await?);
        }

        tx.commit().await.map_err(CacheError::from)?;
        debug!(operations = results.len(), "Node batch committed");
        Ok(results)
    }
}
