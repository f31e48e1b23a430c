use healthpulse_core::{compute_streak, motivational_message, RecordSource};
use serde_json::json;

use super::{load_config, print_json, SourceArgs};

pub fn run(args: SourceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config();
    let source = args.open()?;
    let records = source.fetch_recent_records(config.engagement.history_window_days)?;

    let streak = compute_streak(&records, &args.now());
    print_json(&json!({
        "streak": streak,
        "message": motivational_message(streak),
    }))
}
