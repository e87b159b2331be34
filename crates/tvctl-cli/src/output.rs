//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;
use serde_json::Value;

use tvctl_core::models::{Backup, Channel, Playlist, Stream};
use tvctl_core::{QueryResult, TaskState, TaskStatus};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to encode output: {}", e),
        }
    }

    /// Print one page of the channel table
    pub fn print_channels(&self, page: &QueryResult<Channel>, page_size: u32) {
        match self.format {
            OutputFormat::Human => {
                if page.is_empty() {
                    println!("No channels found.");
                    return;
                }
                for channel in &page.items {
                    let number = channel
                        .channel_number
                        .map(format_number)
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:>6} | {:>7} | {} | {} stream(s)",
                        channel.id,
                        number,
                        truncate(&channel.name, 40),
                        channel.streams.len()
                    );
                }
                print_page_footer(page.page, page.page_count(page_size), page.total_count, "channel");
            }
            OutputFormat::Json => self.print_json(&page_json(page, page_size)),
            OutputFormat::Quiet => {
                for channel in &page.items {
                    println!("{}", channel.id);
                }
            }
        }
    }

    /// Print one page of the stream table
    pub fn print_streams(&self, page: &QueryResult<Stream>, page_size: u32) {
        match self.format {
            OutputFormat::Human => {
                if page.is_empty() {
                    println!("No streams found.");
                    return;
                }
                for stream in &page.items {
                    println!(
                        "{:>6} | {} | {}",
                        stream.id,
                        truncate(&stream.name, 40),
                        truncate(stream.url.as_deref().unwrap_or("-"), 45)
                    );
                }
                print_page_footer(page.page, page.page_count(page_size), page.total_count, "stream");
            }
            OutputFormat::Json => self.print_json(&page_json(page, page_size)),
            OutputFormat::Quiet => {
                for stream in &page.items {
                    println!("{}", stream.id);
                }
            }
        }
    }

    pub fn print_playlists(&self, playlists: &[Playlist]) {
        match self.format {
            OutputFormat::Human => {
                if playlists.is_empty() {
                    println!("No playlists found.");
                    return;
                }
                for playlist in playlists {
                    println!(
                        "{:>4} | {} | {} | {}",
                        playlist.id,
                        if playlist.is_active { "active  " } else { "inactive" },
                        truncate(&playlist.name, 30),
                        playlist.status.as_deref().unwrap_or("-")
                    );
                }
                println!("\n{} playlist(s)", playlists.len());
            }
            OutputFormat::Json => self.print_json(playlists),
            OutputFormat::Quiet => {
                for playlist in playlists {
                    println!("{}", playlist.id);
                }
            }
        }
    }

    pub fn print_backups(&self, backups: &[Backup]) {
        match self.format {
            OutputFormat::Human => {
                if backups.is_empty() {
                    println!("No backups found.");
                    return;
                }
                for backup in backups {
                    println!(
                        "{} | {} | {}",
                        backup.name,
                        backup.size.map(human_size).unwrap_or_else(|| "-".to_string()),
                        backup.created.as_deref().unwrap_or("-")
                    );
                }
                println!("\n{} backup(s)", backups.len());
            }
            OutputFormat::Json => self.print_json(backups),
            OutputFormat::Quiet => {
                for backup in backups {
                    println!("{}", backup.name);
                }
            }
        }
    }

    /// Print the result of a completed task
    pub fn print_task_result(&self, label: &str, result: &Value) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ {}", label);
                if let Value::Object(fields) = result {
                    for (key, value) in fields {
                        match value {
                            Value::String(s) => println!("  {}: {}", key, s),
                            other => println!("  {}: {}", key, other),
                        }
                    }
                }
            }
            OutputFormat::Json => self.print_json(result),
            OutputFormat::Quiet => {
                if let Some(name) = result.get("filename").and_then(Value::as_str) {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print a status update for a running task (stderr, human mode only)
    pub fn progress(&self, status: &TaskStatus) {
        if self.format != OutputFormat::Human || status.state.is_terminal() {
            return;
        }
        let state = match status.state {
            TaskState::Pending => "pending",
            _ => "running",
        };
        match (status.progress(), status.message()) {
            (Some(pct), Some(msg)) => eprintln!("  {} ({:.0}%): {}", state, pct, msg),
            (Some(pct), None) => eprintln!("  {} ({:.0}%)", state, pct),
            (None, Some(msg)) => eprintln!("  {}: {}", state, msg),
            (None, None) => eprintln!("  {}...", state),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr unless quiet
    pub fn warn(&self, msg: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", msg);
        }
    }
}

fn page_json<T: Serialize>(page: &QueryResult<T>, page_size: u32) -> Value {
    serde_json::json!({
        "page": page.page,
        "page_count": page.page_count(page_size),
        "total_count": page.total_count,
        "results": page.items,
    })
}

fn print_page_footer(page: u32, page_count: u64, total: u64, noun: &str) {
    println!(
        "\nPage {} of {} ({} {}(s) matching)",
        page,
        page_count.max(1),
        total,
        noun
    );
}

/// Channel numbers print without a trailing `.0`
fn format_number(number: f64) -> String {
    if number.fract() == 0.0 {
        format!("{}", number as i64)
    } else {
        format!("{}", number)
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
