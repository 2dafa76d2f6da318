//! Output formatting shared by every command

use treemirror_core::domain::Node;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {
        // Human formatter doesn't print JSON
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

/// Format bytes into a human-readable string (e.g., "1.5 MiB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// JSON view of a node as printed by `ls`, `info` and `offline`
pub fn node_json(node: &Node) -> serde_json::Value {
    serde_json::json!({
        "id": node.id().map(|id| id.as_i64()),
        "account": node.account().as_str(),
        "path": node.remote_path().as_str(),
        "folder": node.is_folder(),
        "mime_type": node.mime_type(),
        "size": node.size(),
        "etag": node.etag(),
        "tree_etag": node.tree_etag(),
        "local_path": node.local_path().map(|p| p.display().to_string()),
        "available_offline": node.available_offline().to_string(),
        "conflict": node.conflict_marker(),
        "modified_at": node.modified_at().map(|at| at.to_rfc3339()),
    })
}

/// One-line summary: status flags, size and path
pub fn node_line(node: &Node) -> String {
    let offline = match node.available_offline() {
        treemirror_core::domain::AvailableOffline::Offline => 'P',
        treemirror_core::domain::AvailableOffline::OfflineByParent => 'p',
        treemirror_core::domain::AvailableOffline::NotOffline => '-',
    };
    let cached = if node.local_path().is_some() { 'c' } else { '-' };
    let conflict = if node.conflict_marker().is_some() { '!' } else { '-' };
    let size = if node.is_folder() {
        "-".to_string()
    } else {
        format_bytes(node.size())
    };
    format!(
        "{offline}{cached}{conflict} {size:>10}  {}",
        node.remote_path()
    )
}
