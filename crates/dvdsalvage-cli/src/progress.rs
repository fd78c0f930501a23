//! Progress display for copy and repair runs
//!
//! A single bar is reused for every file; completed files are printed above it.

use console::style;
use dvdsalvage_core::{CopyEvent, FileId};
use indicatif::{ProgressBar, ProgressStyle};

/// Renders [`CopyEvent`]s on the terminal
#[derive(Clone)]
pub struct CopyDisplay {
    bar: ProgressBar,
}

impl CopyDisplay {
    /// Create a display; a hidden one draws nothing
    pub fn new(hidden: bool) -> Self {
        if hidden {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{bar:30.cyan/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Self { bar }
    }

    /// Update the display for one event
    pub fn handle(&self, event: &CopyEvent) {
        match event {
            CopyEvent::FileStarted {
                id,
                start_block,
                end_block,
            } => {
                self.bar.set_length(*end_block);
                self.bar.set_position(*start_block);
                self.bar.set_message(format!("Reading {}", id.file_name()));
            }
            CopyEvent::Progress(progress) => {
                self.bar.set_position(progress.current_block);
                self.bar.set_message(progress.status_line());
            }
            CopyEvent::FileFinished { id, skipped_blocks } => {
                self.bar.println(finished_line(id, *skipped_blocks));
            }
            // Read errors, links and skips are reported through the log
            CopyEvent::ReadError(_) | CopyEvent::Linked { .. } | CopyEvent::Skipped { .. } => {}
        }
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

fn finished_line(id: &FileId, skipped_blocks: u64) -> String {
    if skipped_blocks == 0 {
        format!("  {} {}", style("✓").green(), id.file_name())
    } else {
        format!(
            "  {} {} ({} sectors missing)",
            style("✗").yellow(),
            id.file_name(),
            skipped_blocks
        )
    }
}
