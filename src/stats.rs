use chrono::{DateTime, Local};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exhausted,
    OperatorStopped,
    Interrupted,
    Error,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Exhausted => "ranking list exhausted",
            StopReason::OperatorStopped => "stopped by operator",
            StopReason::Interrupted => "interrupted",
            StopReason::Error => "error",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct RunStats {
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub stop_reason: Option<StopReason>,
    /// Domains looked up this run.
    pub processed: usize,
    pub skipped: usize,
    pub categorized: usize,
    pub uncategorized: usize,
    pub timed_out: usize,
    pub failed: usize,
    pub malformed: usize,
    pub remaining: usize,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            finished_at: None,
            stop_reason: None,
            processed: 0,
            skipped: 0,
            categorized: 0,
            uncategorized: 0,
            timed_out: 0,
            failed: 0,
            malformed: 0,
            remaining: 0,
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

pub fn print_run_summary(stats: &RunStats) {
    use crate::utils::format_number;

    println!("\n--- Categorization Run ---");
    let finished = stats.finished_at.unwrap_or_else(Local::now);
    println!(
        "Ran from {} to {} ({}s)",
        stats.started_at.format("%B %-d, %Y %H:%M:%S"),
        finished.format("%H:%M:%S"),
        (finished - stats.started_at).num_seconds()
    );
    if let Some(reason) = stats.stop_reason {
        println!("Stopped: {}", reason);
    }
    println!("Domains looked up: {}", format_number(stats.processed));
    println!("- with categories: {}", format_number(stats.categorized));
    println!("- without a category: {}", format_number(stats.uncategorized));
    println!("- timed out: {}", format_number(stats.timed_out));
    println!("- failed: {}", format_number(stats.failed));
    println!("Already categorized, skipped: {}", format_number(stats.skipped));
    if stats.malformed > 0 {
        println!("Malformed ranking lines: {}", format_number(stats.malformed));
    }
    println!("Left in ranking list: {}", format_number(stats.remaining));
}
