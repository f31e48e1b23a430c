use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "healthpulse-cli", version, about = "HealthPulse engagement and reminder CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current consecutive-day logging streak
    Streak(commands::SourceArgs),
    /// Achievement catalog with unlock status
    Achievements(commands::SourceArgs),
    /// Streak, message and achievements in one report
    Report(commands::SourceArgs),
    /// Medication reminders
    Remind {
        #[command(subcommand)]
        action: commands::remind::RemindAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("HEALTHPULSE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Streak(args) => commands::streak::run(args),
        Commands::Achievements(args) => commands::achievements::run(args),
        Commands::Report(args) => commands::report::run(args),
        Commands::Remind { action } => commands::remind::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
