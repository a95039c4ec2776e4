//! Progress bars for record loops.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar over `total` records, or `None` when disabled or empty.
pub fn create_record_progress(total: usize, action: &str, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total == 0 {
        return None;
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{action} [{{elapsed_precise}}] {{bar:40.cyan/blue}} {{pos}}/{{len}} records ({{eta}})"
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    Some(pb)
}

/// Increment a progress bar.
pub fn inc_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Print a line without tearing an active progress bar.
pub fn println_above(pb: Option<&ProgressBar>, line: &str) {
    match pb {
        Some(pb) => pb.println(line),
        None => tracing::info!("{line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_or_empty_has_no_bar() {
        assert!(create_record_progress(10, "Predicting", false).is_none());
        assert!(create_record_progress(0, "Predicting", true).is_none());
    }

    #[test]
    fn test_enabled_bar_tracks_length() {
        let pb = create_record_progress(3, "Exporting", true);
        inc_progress(pb.as_ref());
        assert_eq!(pb.as_ref().map(ProgressBar::position), Some(1));
        assert_eq!(pb.as_ref().and_then(ProgressBar::length), Some(3));
        finish_progress(pb, "done");
    }
}
