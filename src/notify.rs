//! Delivery seam.
//!
//! The pipeline's only outward surface is the finished file path; how it is
//! delivered (email or anything else) belongs to an external collaborator
//! implementing [`Notifier`].

use tracing::info;

use crate::foundation::error::ReelResult;
use crate::pipeline::RenderResult;

/// Delivery of a finished render.
pub trait Notifier {
    fn deliver(&self, result: &RenderResult, subject: &str) -> ReelResult<()>;
}

/// Build the delivery subject from the configured prefix and the output file
/// name.
pub fn subject_line(prefix: &str, result: &RenderResult) -> String {
    let file_name = result
        .out_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| result.out_path.display().to_string());
    format!("{prefix} — {file_name}")
}

/// Notifier that only logs; the default when no delivery is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, result: &RenderResult, subject: &str) -> ReelResult<()> {
        info!(path = %result.out_path.display(), subject, "render ready for delivery");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn subject_combines_prefix_and_file_name() {
        let result = RenderResult {
            out_path: PathBuf::from("output/daily_2026-08-08.mp4"),
        };
        assert_eq!(
            subject_line("Daily Reel", &result),
            "Daily Reel — daily_2026-08-08.mp4"
        );
    }
}
