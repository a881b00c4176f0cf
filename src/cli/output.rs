//! Output formatting and progress display

use crate::api::types::TaskStatus;
use crate::app::{Notice, NoticeLevel, View};
use crate::cli::args::VerbosityLevel;
use crate::core::lookup::Preview;
use crate::core::progress::{format_bytes, format_duration, TransferProgress};
use crate::core::search::ResultEntry;
use crate::core::tasks::{TaskCard, NO_TASKS_PLACEHOLDER};
use crate::utils::short_id;
use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Output formatter for vidq
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    progress_bar: Mutex<Option<ProgressBar>>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Mutex::new(None),
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    fn bar_slot(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.progress_bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create a progress bar for a save; a spinner when the size is unknown
    pub fn create_progress_bar(&self, total_size: Option<u64>) -> Option<ProgressBar> {
        if self.verbosity == VerbosityLevel::Quiet {
            return None;
        }

        let progress_bar = match total_size {
            Some(total) => {
                let style = ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-");
                let bar = ProgressBar::new(total);
                bar.set_style(style);
                bar
            }
            None => {
                let style = ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {bytes} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                let bar = ProgressBar::new_spinner();
                bar.set_style(style);
                bar
            }
        };
        progress_bar.set_message("Saving...");

        *self.bar_slot() = Some(progress_bar.clone());
        Some(progress_bar)
    }

    /// Update progress bar, creating it on the first update
    pub fn update_progress(&self, progress: &TransferProgress) {
        if self.bar_slot().is_none() {
            self.create_progress_bar(progress.total);
        }
        if let Some(progress_bar) = self.bar_slot().as_ref() {
            progress_bar.set_position(progress.written);
            if let Some(speed) = progress.speed {
                progress_bar.set_message(format!("{}/s", format_bytes(speed as u64)));
            }
        }
    }

    /// Finish and drop the progress bar
    pub fn finish_progress(&self, message: &str) {
        if let Some(progress_bar) = self.bar_slot().take() {
            progress_bar.finish_with_message(message.to_string());
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("ℹ️  {}", message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("✅ {}", message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("⚠️  {}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }

    /// Print debug message
    pub fn debug(&self, message: &str) {
        if self.verbosity == VerbosityLevel::Verbose {
            println!("🐛 {}", message);
        }
    }

    /// Show a session notice
    pub fn notice(&self, notice: &Notice) {
        let message = match notice.hint {
            Some(view) => format!("{} (type '{}' to see it)", notice.message, view.name()),
            None => notice.message.clone(),
        };
        match notice.level {
            NoticeLevel::Info => self.info(&message),
            NoticeLevel::Success => self.success(&message),
            NoticeLevel::Warning => self.warning(&message),
            NoticeLevel::Error => self.error(&message),
        }
    }

    /// Print the staged preview and its format choices
    pub fn print_preview(&self, preview: &Preview) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!("📹 {}", preview.title.bold());
        if let Some(seconds) = preview.duration.filter(|d| *d > 0.0) {
            println!("⏱️  {}", format_duration(Duration::from_secs_f64(seconds)));
        }
        println!("🔗 {}", preview.source_url);
        if let Some(thumbnail) = &preview.thumbnail {
            self.debug(&format!("thumbnail {}", thumbnail));
        }
        println!("📊 {} formats available", preview.formats.len());
        for (index, format) in preview.formats.iter().enumerate() {
            let marker = if index == preview.selected_index() { "▶" } else { " " };
            println!("  {} {:<10} {}", marker, format.id, format.label);
        }
        println!();
    }

    /// Print the search results view
    pub fn print_search_entries(&self, query: &str, entries: &[ResultEntry]) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        if !query.is_empty() {
            println!("🔎 {}", query.bold());
        }
        let mut number = 0;
        for entry in entries {
            match entry {
                ResultEntry::Skeleton => println!("  {}", "░░░░░░░░░░░░░░░░".dimmed()),
                ResultEntry::Item(result) => {
                    number += 1;
                    println!("  {:>3}. {}", number, result.title);
                    println!("       {}", result.url.dimmed());
                }
                ResultEntry::LoadingMore => println!("  {}", "Loading more...".dimmed()),
                ResultEntry::NoResults => println!("  No results found"),
                ResultEntry::Failed => println!("  {}", "Search failed".red()),
            }
        }
        println!();
    }

    /// Print the task cards, or the placeholder when there are none
    pub fn print_task_cards(&self, cards: &[TaskCard]) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        if cards.is_empty() {
            println!("  {}", NO_TASKS_PLACEHOLDER.dimmed());
            println!();
            return;
        }
        for card in cards {
            println!(
                "  {} {} {}",
                status_label(card.status),
                short_id(&card.task_id).dimmed(),
                card.title
            );
            println!("      {}", card_progress_line(card));
            if let Some(error) = &card.error {
                println!("      {}", error.red());
            }
        }
        println!();
    }

    /// Print query completions
    pub fn print_suggestions(&self, suggestions: &[String]) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        for suggestion in suggestions {
            println!("  💡 {}", suggestion);
        }
    }

    /// Print where a file was saved
    pub fn print_saved(&self, path: &Path, bytes: u64) {
        self.success(&format!("Saved to {} ({})", path.display(), format_bytes(bytes)));
    }

    /// Print the view header used by the shell
    pub fn print_view_header(&self, view: View) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!("── {} ──", view.name().to_uppercase().bold());
    }

    /// Print help text
    pub fn print_help(&self) {
        println!("vidq shell commands:");
        println!();
        println!("  <URL> | info <URL>   Look up a video");
        println!("  quality <FORMAT>     Choose a format of the looked-up video");
        println!("  add                  Queue the looked-up video");
        println!("  search <QUERY>       Search for videos");
        println!("  more                 Load the next page of results");
        println!("  open <N>             Look up search result N");
        println!("  suggest <TEXT>       Show query completions");
        println!("  home | search | tasks  Switch view");
        println!("  save <TASK>          Save the file of a finished task");
        println!("  forget <TASK>        Drop cached metadata of a task");
        println!("  help | quit");
        println!();
    }

    /// Print version information
    pub fn print_version(&self) {
        println!("vidq version {}", env!("CARGO_PKG_VERSION"));
    }
}

/// Create a progress callback for the download trigger
pub fn create_progress_callback(
    formatter: Arc<OutputFormatter>,
) -> impl Fn(TransferProgress) + Send + Sync + 'static {
    move |progress: TransferProgress| {
        formatter.update_progress(&progress);
    }
}

fn status_label(status: TaskStatus) -> ColoredString {
    let label = format!("[{}]", status.as_str());
    match status {
        TaskStatus::Finished => label.green(),
        TaskStatus::Error => label.red(),
        TaskStatus::Downloading => label.cyan(),
        TaskStatus::Processing => label.yellow(),
        TaskStatus::Pending | TaskStatus::Unknown => label.dimmed(),
    }
}

/// Progress, speed and ETA of a card as one line
pub fn card_progress_line(card: &TaskCard) -> String {
    let mut line = format!("{:>5.1}%", card.progress);
    if card.is_ready() {
        line.push_str("  ready to save");
        return line;
    }
    if let Some(speed) = card.speed.as_deref().filter(|s| !s.is_empty()) {
        line.push_str(&format!("  {}", speed));
    }
    if let Some(eta) = card.eta.as_deref().filter(|s| !s.is_empty()) {
        line.push_str(&format!("  ETA {}", eta));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Format, SearchResult, Task, VideoInfo};

    fn card(status: TaskStatus, progress: f64) -> TaskCard {
        let mut task = Task::new("0f8e2b1c-1111", status, progress);
        task.speed = Some("1.2MiB/s".to_string());
        task.eta = Some("00:12".to_string());
        TaskCard::render("0f8e2b1c-1111", &task, None)
    }

    #[test]
    fn test_card_progress_line() {
        assert_eq!(
            card_progress_line(&card(TaskStatus::Downloading, 42.0)),
            " 42.0%  1.2MiB/s  ETA 00:12"
        );
        assert_eq!(
            card_progress_line(&card(TaskStatus::Finished, 42.0)),
            "100.0%  ready to save"
        );
    }

    #[test]
    fn test_create_progress_bar_quiet_mode() {
        let formatter = OutputFormatter::new(VerbosityLevel::Quiet);
        assert!(formatter.create_progress_bar(Some(1000)).is_none());
    }

    #[test]
    fn test_progress_bar_lifecycle() {
        let formatter = Arc::new(OutputFormatter::new(VerbosityLevel::Normal));
        let callback = create_progress_callback(formatter.clone());

        let mut progress = TransferProgress::new("t1", Some(1000));
        progress.advance(500);
        callback(progress);
        assert!(formatter.bar_slot().is_some());

        formatter.finish_progress("Saved");
        assert!(formatter.bar_slot().is_none());

        // finishing twice is harmless
        formatter.finish_progress("Saved");
    }

    #[test]
    fn test_spinner_for_unknown_size() {
        let formatter = OutputFormatter::new(VerbosityLevel::Verbose);
        let mut progress = TransferProgress::new("t1", None);
        progress.advance(10);
        formatter.update_progress(&progress);
        assert!(formatter.bar_slot().is_some());
        formatter.finish_progress("done");
    }

    #[test]
    fn test_renderers_do_not_panic() {
        let formatter = OutputFormatter::new(VerbosityLevel::Normal);
        let preview = Preview::from_info(
            "https://v/1",
            VideoInfo {
                title: "Clip".to_string(),
                thumbnail: None,
                original_url: None,
                duration: Some(75.0),
                formats: vec![Format::new("best", "Best"), Format::new("mp3", "Audio")],
            },
        )
        .unwrap();
        formatter.print_preview(&preview);

        let entries = vec![
            ResultEntry::Item(SearchResult {
                id: None,
                title: "a".to_string(),
                url: "https://v/a".to_string(),
                thumbnail: None,
            }),
            ResultEntry::LoadingMore,
        ];
        formatter.print_search_entries("cats", &entries);
        formatter.print_search_entries("", &[ResultEntry::Skeleton, ResultEntry::NoResults]);
        formatter.print_task_cards(&[card(TaskStatus::Error, 0.0)]);
        formatter.print_task_cards(&[]);
        formatter.print_suggestions(&["rust".to_string()]);
        formatter.print_view_header(View::Tasks);
        formatter.print_help();
        formatter.print_version();
    }

    #[test]
    fn test_verbosity_levels() {
        let formatter = OutputFormatter::new(VerbosityLevel::Quiet);
        assert_eq!(formatter.verbosity(), VerbosityLevel::Quiet);
        // These should not print anything in quiet mode
        formatter.info("test");
        formatter.success("test");
        formatter.warning("test");
        formatter.debug("test");

        // Error should always print
        formatter.error("test");
    }
}
