use healthpulse_core::EngagementReport;

use super::{load_config, print_json, SourceArgs};

pub fn run(args: SourceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config();
    let source = args.open()?;
    let report = EngagementReport::from_sources(
        &source,
        &source,
        config.engagement.history_window_days,
        &args.now(),
    )?;
    print_json(&report.achievements)
}
