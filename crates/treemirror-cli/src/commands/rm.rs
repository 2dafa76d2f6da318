//! `treemirror rm`

use anyhow::Result;
use clap::Args;

use super::{failures_json, report_local_failures};
use crate::context::CommandContext;
use crate::output::{get_formatter, OutputFormat};

/// Remove metadata and/or cached content
#[derive(Debug, Args)]
pub struct RmCommand {
    /// File or folder to remove
    pub path: String,

    /// Keep the stored rows, only release cached content
    #[arg(long, conflicts_with = "keep_local")]
    pub keep_metadata: bool,

    /// Keep cached content on disk, only remove the stored rows
    #[arg(long)]
    pub keep_local: bool,
}

impl RmCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let node = ctx.resolve(&self.path).await?;
        let remover = ctx.engine.remover();
        let remove_metadata = !self.keep_metadata;
        let remove_local = !self.keep_local;

        let outcome = if node.is_folder() {
            remover
                .remove_folder(&ctx.account, &node, remove_metadata, remove_local)
                .await?
        } else {
            remover
                .remove_file(&ctx.account, &node, remove_metadata, remove_local)
                .await?
        };

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "path": node.remote_path().as_str(),
                "rows_deleted": outcome.rows_deleted,
                "content_released": outcome.content_released,
                "local_failures": failures_json(&outcome.local_failures),
            }));
            return Ok(());
        }

        if remove_metadata {
            formatter.success(&format!(
                "Removed {} ({} nodes)",
                node.remote_path(),
                outcome.rows_deleted
            ));
        } else {
            formatter.success(&format!(
                "Released cached content of {} ({} files)",
                node.remote_path(),
                outcome.content_released
            ));
        }
        report_local_failures(formatter.as_ref(), &outcome.local_failures);
        Ok(())
    }
}
