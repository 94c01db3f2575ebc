use super::state::RunSummary;
use tokio::sync::broadcast;

/// Run execution events for real-time status output.
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        flow_name: String,
        step_count: usize,
    },
    RunFinished {
        flow_name: String,
        passed: bool,
        duration_ms: Option<u64>,
        warnings: usize,
    },

    StepStarted {
        index: usize,
        label: String,
    },
    StepPassed {
        index: usize,
        duration_ms: u64,
    },
    StepFailed {
        index: usize,
        error: String,
        duration_ms: u64,
    },
    StepSkipped {
        index: usize,
        label: String,
    },

    /// Non-fatal notices: soft assertion failures, artifact write problems.
    Warning {
        message: String,
    },

    Log {
        message: String,
    },

    SessionFinished {
        summary: RunSummary,
    },
}

/// Broadcast emitter decoupling execution from console rendering.
pub struct EventEmitter {
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<RunEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Clone for EventEmitter {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Renders run events as human-readable status lines, one per step outcome,
/// with a spinner on the currently executing step.
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<RunEvent>) {
        use std::io::IsTerminal;

        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            // Piped output: plain lines, no escape codes.
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut spinner: Option<ProgressBar> = None;
        let mut current_text = String::new();

        while let Ok(event) = receiver.recv().await {
            match event {
                RunEvent::RunStarted {
                    run_id,
                    flow_name,
                    step_count,
                } => {
                    multi
                        .println(format!(
                            "\n{} {} ({} steps) [{}]",
                            "▶".green().bold(),
                            flow_name.white().bold(),
                            step_count,
                            run_id.dimmed()
                        ))
                        .ok();
                }

                RunEvent::RunFinished {
                    flow_name,
                    passed,
                    duration_ms,
                    warnings,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    let status = if passed {
                        "PASSED".green().bold()
                    } else {
                        "FAILED".red().bold()
                    };
                    let mut line = format!("  {} {} [{}]", "←".blue(), flow_name, status);
                    if warnings > 0 {
                        line.push_str(&format!(" {}", format!("({warnings} warnings)").yellow()));
                    }
                    println!("{line}");
                    if let Some(ms) = duration_ms {
                        println!("    Duration: {ms}ms");
                    }
                }

                RunEvent::StepStarted { index, label } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    let style = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                        .unwrap();
                    pb.set_style(style);
                    current_text = format!("[{}] {}... ", index, label.dimmed());
                    pb.set_message(current_text.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                RunEvent::StepPassed { duration_ms, .. } => {
                    let line = format!("    {} {}({duration_ms}ms)", "✓".green(), current_text);
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("{line}");
                }

                RunEvent::StepFailed {
                    error, duration_ms, ..
                } => {
                    let line = format!("    {} {}({duration_ms}ms)", "✗".red(), current_text);
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("{line}");
                    println!("      {}", error.red());
                }

                RunEvent::StepSkipped { index, label } => {
                    println!(
                        "    {} [{}] {} {}",
                        "○".yellow(),
                        index,
                        label.dimmed(),
                        "(skipped)".dimmed()
                    );
                }

                RunEvent::Warning { message } => {
                    multi
                        .println(format!("      {} {}", "⚠".yellow(), message))
                        .ok();
                }

                RunEvent::Log { message } => {
                    multi.println(format!("      {message}")).ok();
                }

                RunEvent::SessionFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    // Give any in-flight spinner clears time to render.
                    tokio::time::sleep(StdDuration::from_millis(100)).await;

                    println!("\n{} Verification finished", "■".blue().bold());
                    println!(
                        "  Runs: {} ({} passed, {} failed)",
                        summary.total_runs,
                        summary.passed_runs.to_string().green(),
                        summary.failed_runs.to_string().red()
                    );
                    println!(
                        "  Steps: {} ({} passed, {} failed, {} skipped)",
                        summary.total_steps,
                        summary.passed_steps.to_string().green(),
                        summary.failed_steps.to_string().red(),
                        summary.skipped_steps.to_string().yellow()
                    );
                    if summary.warnings > 0 {
                        println!("  Warnings: {}", summary.warnings.to_string().yellow());
                    }
                    println!("  Duration: {}ms", summary.total_duration_ms);
                }
            }
        }
    }
}
