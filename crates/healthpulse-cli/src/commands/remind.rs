use std::sync::Arc;

use clap::Subcommand;
use healthpulse_core::{
    AnchoredClock, Clock, Medication, MedicationSource, MemorySink, Notification,
    NotificationSink, Permission, ReminderScheduler, ScheduledReminder, SchedulerOptions,
    SystemClock,
};
use tracing::{info, warn};

use super::{load_config, print_json, SourceArgs};

#[derive(Subcommand)]
pub enum RemindAction {
    /// Print when each active medication's reminders would fire next
    Next(SourceArgs),
    /// Run reminders in the foreground until Ctrl-C
    Run(SourceArgs),
}

/// Prints each reminder to stdout as one JSON line.
struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&self) -> bool {
        true
    }

    fn emit(&self, notification: Notification) {
        match serde_json::to_string(&notification) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "failed to encode notification"),
        }
    }
}

pub fn run(action: RemindAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config();
    let options = config.reminders.scheduler_options()?;

    match action {
        RemindAction::Next(args) => {
            let medications = active_medications(&args)?;
            if !config.reminders.enabled {
                info!("reminders disabled in config");
                return print_json(&Vec::<ScheduledReminder>::new());
            }
            let pending = match args.now {
                Some(now) => preview(AnchoredClock::new(now), options, &medications)?,
                None => preview(SystemClock, options, &medications)?,
            };
            print_json(&pending)
        }
        RemindAction::Run(args) => {
            if !config.reminders.enabled {
                return Err("reminders are disabled (reminders.enabled = false)".into());
            }
            let medications = active_medications(&args)?;
            run_foreground(options, &medications)
        }
    }
}

fn active_medications(args: &SourceArgs) -> Result<Vec<Medication>, Box<dyn std::error::Error>> {
    let medications = args.open()?.fetch_active_medications()?;
    Ok(medications
        .into_iter()
        .filter(|m| match m.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(medication = %m.id, error = %e, "skipping medication");
                false
            }
        })
        .collect())
}

/// Register every reminder against `clock` and report the table without
/// letting any timer run.
fn preview<C: Clock>(
    clock: C,
    options: SchedulerOptions,
    medications: &[Medication],
) -> Result<Vec<ScheduledReminder>, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let _guard = runtime.enter();

    let scheduler = ReminderScheduler::with_options(
        clock,
        Arc::new(MemorySink::with_permission(Permission::Default)),
        options,
    );
    scheduler.schedule_all(medications)?;
    let pending = scheduler.pending();
    scheduler.shutdown();
    Ok(pending)
}

fn run_foreground(
    options: SchedulerOptions,
    medications: &[Medication],
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let scheduler = ReminderScheduler::with_options(SystemClock, Arc::new(TerminalSink), options);
        let count = scheduler.schedule_all(medications)?;
        info!(count, "reminders armed, press Ctrl-C to stop");

        tokio::signal::ctrl_c().await?;
        scheduler.shutdown();
        info!("reminders stopped");
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
