//! `treemirror init`

use anyhow::Result;
use clap::Args;

use crate::context::CommandContext;
use crate::output::{get_formatter, node_json, OutputFormat};

/// Create the database and the account root folder
#[derive(Debug, Args)]
pub struct InitCommand {}

impl InitCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let root = ctx.engine.writer().ensure_root(&ctx.account).await?;

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "database": ctx.database.display().to_string(),
                "root": node_json(&root),
            }));
        } else {
            formatter.success(&format!("Account {} is ready", ctx.account));
            formatter.info(&format!("Database: {}", ctx.database.display()));
            if let Some(id) = root.id() {
                formatter.info(&format!("Root folder id: {id}"));
            }
        }
        Ok(())
    }
}
