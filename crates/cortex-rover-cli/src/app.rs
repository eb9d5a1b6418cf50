use cortex_rover::training::AttemptOutcome;
use cortex_rover::{TrainingObserver, TrainingReport, TrainingUpdate};

/// Prints training progress to stdout as it happens.
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    /// Print every relayed sample, not just the validation summary.
    pub show_samples: bool,
}

impl TrainingObserver for ConsoleObserver {
    fn notify(&mut self, update: TrainingUpdate) {
        match update {
            TrainingUpdate::ActionStarted { action, attempts } => {
                println!("\n== Training '{action}' ({attempts} attempts) ==");
            }
            TrainingUpdate::AttemptStarted { action, attempt } => {
                println!("[{action} #{attempt}] Think '{action}' now...");
            }
            TrainingUpdate::Recording { .. } => {}
            TrainingUpdate::VerdictSent {
                action,
                attempt,
                status,
            } => {
                println!("[{action} #{attempt}] Sent {}", status.as_str());
            }
            TrainingUpdate::StrayEvent {
                action,
                attempt,
                event,
            } => {
                println!("[{action} #{attempt}] Ignoring unexpected {event}");
            }
            TrainingUpdate::AttemptFinished {
                action,
                attempt,
                outcome,
            } => {
                println!("[{action} #{attempt}] {}", outcome_label(outcome));
            }
            TrainingUpdate::ValidationStarted { action, samples } => {
                println!("Validating '{action}' over {samples} samples...");
            }
            TrainingUpdate::Sample {
                index,
                total,
                label,
                triggered,
            } => {
                if self.show_samples {
                    let mark = if triggered { " -> rover" } else { "" };
                    println!("  {index}/{total} {label}{mark}");
                }
            }
            TrainingUpdate::ValidationFinished { action, report } => {
                println!(
                    "Validation '{action}': {} of {} samples triggered the rover ({} failed)",
                    report.triggers, report.samples, report.failures
                );
            }
        }
    }
}

fn outcome_label(outcome: AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Accepted => "accepted",
        AttemptOutcome::Rejected => "rejected",
        AttemptOutcome::Errored => "errored",
    }
}

pub fn print_summary(report: &TrainingReport) {
    println!(
        "\nTraining complete: {} of {} attempts accepted",
        report.accepted(),
        report.attempts.len()
    );
    for validation in &report.validations {
        println!(
            "  validation: {}/{} triggers, {} relay failures",
            validation.triggers, validation.samples, validation.failures
        );
    }
}
