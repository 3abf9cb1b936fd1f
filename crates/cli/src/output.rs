//! Output formatting utilities

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a configured default such as `json`
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format an RFC3339 timestamp for display
pub fn format_timestamp(ts: &str) -> String {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| {
            dt.with_timezone(&Utc)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| ts.to_string())
}

/// Format a duration in seconds as `1h02m03s`, `4m05s` or `6s`
pub fn format_remaining(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h{:02}m{:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Color phases, dispositions and execution statuses
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "ready" | "succeeded" | "execute" => status.green().to_string(),
        "bypass" | "dispatched" => status.cyan().to_string(),
        "pending" | "creating" | "scaling" | "deferred" | "coalesced" | "defer" => {
            status.yellow().to_string()
        }
        "deleting" | "skipped" => status.dimmed().to_string(),
        "error" | "failed" | "blocked" | "block" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color severities and alert levels
pub fn color_severity(severity: &str) -> String {
    match severity.to_lowercase().as_str() {
        "critical" => severity.red().bold().to_string(),
        "high" | "error" => severity.red().to_string(),
        "warning" | "medium" => severity.yellow().to_string(),
        "info" | "ok" => severity.green().to_string(),
        _ => severity.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(6), "6s");
        assert_eq!(format_remaining(245), "4m05s");
        assert_eq!(format_remaining(3723), "1h02m03s");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-05-01T12:00:00Z"), "2024-05-01 12:00:00");
        assert_eq!(format_timestamp("not a time"), "not a time");
    }

    #[test]
    fn test_output_format_from_config() {
        assert_eq!(OutputFormat::from_config("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_config("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_config("yaml"), None);
    }
}
