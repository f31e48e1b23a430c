use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Local, Utc};
use clap::Args;
use healthpulse_core::{Config, SnapshotFile};

pub mod achievements;
pub mod config;
pub mod remind;
pub mod report;
pub mod streak;

/// Where to read data from and which instant counts as "now".
#[derive(Args)]
pub struct SourceArgs {
    /// JSON export with records, stats and medications
    #[arg(long)]
    pub data: PathBuf,
    /// Evaluate as of this RFC 3339 instant; its offset is the local zone
    #[arg(long, value_parser = parse_now)]
    pub now: Option<DateTime<FixedOffset>>,
}

impl SourceArgs {
    /// The pinned instant, or the current local time.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now.unwrap_or_else(|| Local::now().fixed_offset())
    }

    /// Open the export, measuring record windows from [`Self::now`].
    pub fn open(&self) -> Result<SnapshotFile, Box<dyn std::error::Error>> {
        let source = SnapshotFile::open(&self.data)?.as_of(self.now().with_timezone(&Utc));
        tracing::debug!(path = %source.path().display(), "snapshot opened");
        Ok(source)
    }
}

fn parse_now(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(raw).map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}

/// Load config, falling back to defaults if the file is unreadable.
pub fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "using default config");
            Config::default()
        }
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
