//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il feedback visivo della CLI e le statistiche del batch.
//!
//! ## Componenti principali:
//! - `ProgressManager`: Barra di progresso sui task del batch (`indicatif`)
//! - `ConversionStats`: Conteggio di task completati e falliti
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:01:12] [========>-------] 2/4 (50%) ✅ never-gonna-give-you-up.mp3
//! ```

use crate::task::Task;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for a batch of conversions
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    pub fn new(total_tasks: u64) -> Self {
        let bar = ProgressBar::new(total_tasks);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing (JSON mode)
    pub fn hidden(total_tasks: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total_tasks);
        Self { bar }
    }

    /// Advance by one finished task
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

/// Outcome counters for a batch of tasks
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    pub tasks: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ConversionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a terminal task; pending tasks are ignored
    pub fn record(&mut self, task: &Task) {
        if task.is_pending {
            return;
        }
        self.tasks += 1;
        if task.succeeded() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Converted: {} tasks | Succeeded: {} | Failed: {}",
            self.tasks, self.succeeded, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConvertError, TaskError};
    use crate::task::TaskRequest;
    use std::path::PathBuf;

    #[test]
    fn test_stats_count_terminal_tasks() {
        let mut stats = ConversionStats::new();

        let pending = Task::pending(1, TaskRequest::new("u"), 0);
        stats.record(&pending);
        assert_eq!(stats.tasks, 0);

        let mut ok = pending.clone();
        ok.is_pending = false;
        ok.result = Some(PathBuf::from("/out/a.mp3"));
        stats.record(&ok);

        let mut failed = pending;
        failed.is_pending = false;
        failed.error = Some(TaskError::from(&ConvertError::Encode("bad codec".into())));
        stats.record(&failed);

        assert_eq!(stats, ConversionStats { tasks: 2, succeeded: 1, failed: 1 });
        assert!(stats.has_failures());
        assert_eq!(stats.format_summary(), "Converted: 2 tasks | Succeeded: 1 | Failed: 1");
    }

    #[test]
    fn test_hidden_manager_tracks_position() {
        let progress = ProgressManager::hidden(2);
        progress.update("a.mp3");
        progress.update("b.mp3");
        assert_eq!(progress.bar.position(), 2);
        assert_eq!(progress.bar.length(), Some(2));
    }
}
