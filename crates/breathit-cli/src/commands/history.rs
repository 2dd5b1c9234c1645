use std::time::Duration;

use breathit_core::format::{format_clock, to_minutes};
use breathit_core::{Database, SessionRecord};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List completed sessions, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show totals across all sessions
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all recorded sessions
    Clear,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        HistoryAction::List { json } => {
            let sessions = db.list_sessions()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("No sessions yet.");
            } else {
                for record in &sessions {
                    println!("{}", format_record(record));
                }
            }
        }
        HistoryAction::Stats { json } => {
            let stats = db.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Sessions: {}", stats.total_sessions);
                println!("Cycles:   {}", stats.total_cycles);
                println!("Minutes:  {}", stats.total_minutes);
            }
        }
        HistoryAction::Clear => {
            let removed = db.clear_history()?;
            println!("cleared {removed} sessions");
        }
    }
    Ok(())
}

fn format_record(record: &SessionRecord) -> String {
    let local = record.date.with_timezone(&chrono::Local);
    format!(
        "{}  {:>3} min ({})  {:>3} cycles  {}-{}-{}",
        local.format("%Y-%m-%d %H:%M"),
        to_minutes(record.total_ms),
        format_clock(Duration::from_millis(record.total_ms)),
        record.cycles,
        record.inhale_ms / 1000,
        record.hold_ms / 1000,
        record.exhale_ms / 1000,
    )
}
