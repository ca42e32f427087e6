use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Summary = 0,  // High-level scrape progress (default)
    Detailed = 1, // Detailed steps, results, warnings
    Debug = 2,    // All messages including debug info
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }
}

#[derive(Default)]
struct RunMetadata {
    start_time: Option<SystemTime>,
    end_time: Option<SystemTime>,
    cards_seen: usize,
    organizations_extracted: usize,
    scroll_rounds: usize,
    output_file: String,
}

/// Progress/error logging for a scrape run.
///
/// Messages go to the console (routed through the progress bar while one is
/// active, so the bar keeps its position) and, when a log path is configured,
/// are appended to that file as they happen. Errors always print regardless
/// of verbosity.
pub struct ScrapeLogger {
    verbosity: VerbosityLevel,
    progress_bar: Mutex<Option<ProgressBar>>,
    metadata: Mutex<RunMetadata>,
    log_file_path: Option<PathBuf>,
}

impl ScrapeLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Mutex::new(None),
            metadata: Mutex::new(RunMetadata::default()),
            log_file_path: None,
        }
    }

    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: &Path) -> Self {
        Self {
            verbosity,
            progress_bar: Mutex::new(None),
            metadata: Mutex::new(RunMetadata::default()),
            log_file_path: Some(log_file_path.to_path_buf()),
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("WARN", message);
        }
    }

    pub fn error(&self, message: &str) {
        // Errors are never hidden from users
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let timestamp = Local::now().format("%H:%M:%S%.3f");
        let msg = format!("[{}] {}: {}", timestamp, level, message);

        if let Some(ref path) = self.log_file_path {
            if let Err(e) = append_line(path, &msg) {
                eprintln!("Warning: failed to write log file {}: {}", path.display(), e);
            }
        }

        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }
        eprintln!("{}", msg);
    }

    /// Start the progress display. With a known limit a bar is shown;
    /// otherwise a spinner (the result count is open-ended).
    pub fn start_progress(&self, limit: Option<u64>) {
        let pb = match limit {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("##-"),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("[{elapsed_precise}] {spinner} {pos} organizations {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb
            }
        };
        pb.set_message("Starting...");

        if let Ok(mut guard) = self.progress_bar.lock() {
            *guard = Some(pb);
        }
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.start_time = Some(SystemTime::now());
        }
    }

    pub fn update_progress(&self, message: &str) {
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(message.to_string());
            }
        }
    }

    pub fn advance_progress(&self) {
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.inc(1);
            }
        }
    }

    pub fn finish_progress(&self, final_message: &str) {
        if let Ok(mut guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.end_time = Some(SystemTime::now());
        }
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", final_message);
        }
    }

    pub fn record_cards_seen(&self, count: usize) {
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.cards_seen += count;
        }
    }

    pub fn record_organization(&self) {
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.organizations_extracted += 1;
        }
        self.advance_progress();
    }

    pub fn record_scroll_round(&self) {
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.scroll_rounds += 1;
        }
    }

    pub fn record_output_file(&self, path: &str) {
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.output_file = path.to_string();
        }
    }

    pub fn organizations_extracted(&self) -> usize {
        self.metadata
            .lock()
            .map(|m| m.organizations_extracted)
            .unwrap_or(0)
    }

    pub fn print_final_summary(&self) {
        let metadata = match self.metadata.lock() {
            Ok(m) => m,
            Err(_) => return,
        };

        println!("\n=== SCRAPE SUMMARY ===");
        if let (Some(start), Some(end)) = (metadata.start_time, metadata.end_time) {
            let duration = end.duration_since(start).unwrap_or_default();
            println!("Duration: {:.2}s", duration.as_secs_f64());
        }
        println!("Result cards seen: {}", metadata.cards_seen);
        println!("Organizations extracted: {}", metadata.organizations_extracted);
        println!("Scroll rounds: {}", metadata.scroll_rounds);
        if !metadata.output_file.is_empty() {
            println!("Results written: {}", metadata.output_file);
        }
        println!("======================\n");

        if metadata.organizations_extracted > 0 {
            println!(
                "✅ Scrape completed. {} organizations extracted.",
                metadata.organizations_extracted
            );
        } else {
            println!("✅ Scrape completed. No organizations found.");
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verbosity_from_count() {
        assert_eq!(VerbosityLevel::from_verbose_count(0), VerbosityLevel::Summary);
        assert_eq!(VerbosityLevel::from_verbose_count(1), VerbosityLevel::Detailed);
        assert_eq!(VerbosityLevel::from_verbose_count(2), VerbosityLevel::Debug);
        assert_eq!(VerbosityLevel::from_verbose_count(9), VerbosityLevel::Debug);
    }

    #[test]
    fn test_log_file_lines_are_appended_with_timestamps() {
        let tmp = TempDir::new().unwrap();
        let log_path = tmp.path().join("run.log");

        let logger = ScrapeLogger::with_log_file(VerbosityLevel::Summary, &log_path);
        logger.info("first");
        logger.error("second");
        // Below the verbosity threshold: console suppressed, but errors above
        // already went to the file
        logger.debug("hidden");

        let content = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INFO: first"));
        assert!(lines[1].contains("ERROR: second"));
        // Timestamp prefix like [12:34:56.789]
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn test_metadata_accumulates() {
        let logger = ScrapeLogger::new(VerbosityLevel::Summary);
        logger.record_cards_seen(5);
        logger.record_cards_seen(3);
        logger.record_organization();
        logger.record_organization();
        assert_eq!(logger.organizations_extracted(), 2);
    }
}
