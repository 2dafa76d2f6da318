//! `treemirror ls` and `treemirror info`

use anyhow::Result;
use clap::Args;

use crate::context::CommandContext;
use crate::output::{format_bytes, get_formatter, node_json, node_line, OutputFormat};

/// List the children of a folder
#[derive(Debug, Args)]
pub struct LsCommand {
    /// Folder to list
    #[arg(default_value = "/")]
    pub path: String,

    /// Only children that are pinned or inherit a pin
    #[arg(long)]
    pub offline: bool,
}

impl LsCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let folder = ctx.resolve(&self.path).await?;
        if !folder.is_folder() {
            anyhow::bail!("{} is not a folder", folder.remote_path());
        }

        let children = ctx
            .engine
            .queries()
            .children(&ctx.account, &folder, self.offline)
            .await?;

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "folder": folder.remote_path().as_str(),
                "children": children.iter().map(node_json).collect::<Vec<_>>(),
            }));
            return Ok(());
        }

        if children.is_empty() {
            formatter.info(&format!("{} is empty", folder.remote_path()));
            return Ok(());
        }
        for child in &children {
            println!("{}", node_line(child));
        }
        Ok(())
    }
}

/// Show every stored attribute of a node
#[derive(Debug, Args)]
pub struct InfoCommand {
    /// File or folder to describe
    pub path: String,
}

impl InfoCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let node = ctx.resolve(&self.path).await?;
        let pinned_by = ctx
            .engine
            .queries()
            .offline_ancestor(&ctx.account, &node)
            .await?;

        if format == OutputFormat::Json {
            let mut json = node_json(&node);
            json["pinned_by"] = serde_json::json!(pinned_by.map(|n| n.remote_path().to_string()));
            formatter.print_json(&json);
            return Ok(());
        }

        println!("{}", node.remote_path());
        if let Some(id) = node.id() {
            formatter.info(&format!("Id:        {id} (parent {})", node.parent_id()));
        }
        formatter.info(&format!(
            "Kind:      {}",
            if node.is_folder() { "folder" } else { node.mime_type() }
        ));
        if !node.is_folder() {
            formatter.info(&format!("Size:      {}", format_bytes(node.size())));
        }
        if let Some(etag) = node.etag() {
            formatter.info(&format!("ETag:      {etag}"));
        }
        if let Some(remote_id) = node.remote_id() {
            formatter.info(&format!("Remote id: {remote_id}"));
        }
        if let Some(modified) = node.modified_at() {
            formatter.info(&format!("Modified:  {}", modified.to_rfc3339()));
        }
        match node.local_path() {
            Some(local) => formatter.info(&format!("Cached at: {}", local.display())),
            None => formatter.info("Cached at: -"),
        }
        formatter.info(&format!("Offline:   {}", node.available_offline()));
        if let Some(ancestor) = pinned_by {
            formatter.info(&format!("Pinned by: {}", ancestor.remote_path()));
        }
        if let Some(marker) = node.conflict_marker() {
            formatter.info(&format!("Conflict:  {marker}"));
        }
        Ok(())
    }
}
