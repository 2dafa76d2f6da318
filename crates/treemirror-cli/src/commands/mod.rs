//! Subcommand implementations

pub mod conflicts;
pub mod init;
pub mod mv;
pub mod nodes;
pub mod pin;
pub mod rm;

use treemirror_sync::LocalIoFailure;

use crate::output::OutputFormatter;

/// Reports cached-content failures that happened after a commit
///
/// The metadata change stands, so these are warnings rather than errors.
pub fn report_local_failures(formatter: &dyn OutputFormatter, failures: &[LocalIoFailure]) {
    for failure in failures {
        formatter.warn(&format!(
            "{} {} failed: {}",
            failure.operation,
            failure.path.display(),
            failure.message
        ));
    }
}

pub fn failures_json(failures: &[LocalIoFailure]) -> serde_json::Value {
    serde_json::Value::Array(
        failures
            .iter()
            .map(|f| {
                serde_json::json!({
                    "path": f.path.display().to_string(),
                    "operation": f.operation,
                    "message": f.message,
                })
            })
            .collect(),
    )
}
