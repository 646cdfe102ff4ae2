//! Progress reporting driven by streaming turn events

use colored::Colorize;
use council_domain::{TurnEvent, TurnPhase};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Sink for turn events as they arrive from the stream
pub trait EventReporter: Send + Sync {
    fn on_event(&self, event: &TurnEvent);
}

/// Reports turn progress with a spinner per stage
pub struct ProgressReporter {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap()
    }

    fn start_phase(&self, phase: TurnPhase) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::spinner_style());
        pb.set_prefix(phase.display_name().to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        *self.active.lock().unwrap() = Some(pb);
    }

    fn finish_phase(&self, message: String) {
        if let Some(pb) = self.active.lock().unwrap().take() {
            pb.finish_with_message(message);
        }
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventReporter for ProgressReporter {
    fn on_event(&self, event: &TurnEvent) {
        match event {
            TurnEvent::Stage1Start => self.start_phase(TurnPhase::Stage1),
            TurnEvent::Stage1Complete { data } => {
                self.finish_phase(format!("{} responses", data.len()).green().to_string());
            }
            TurnEvent::Stage2Start => self.start_phase(TurnPhase::Stage2),
            TurnEvent::Stage2Complete { data, .. } => {
                self.finish_phase(format!("{} rankings", data.len()).green().to_string());
            }
            TurnEvent::Stage3Start => self.start_phase(TurnPhase::Stage3),
            TurnEvent::Stage3Complete { .. } => {
                self.finish_phase("synthesis ready".green().to_string());
            }
            TurnEvent::TitleComplete { title } => {
                self.println(format!("{} {}", "Title:".dimmed(), title));
            }
            TurnEvent::Complete {
                metadata,
                remaining_quota,
            } => {
                self.finish_phase(String::new());
                self.println(format!(
                    "{} {} tokens across {} calls, {} remaining today",
                    "Done:".green().bold(),
                    metadata.usage.total_tokens,
                    metadata.usage.model_calls,
                    remaining_quota
                ));
            }
            TurnEvent::Cancelled { state } => {
                self.finish_phase(String::new());
                self.println(format!("{} during {:?}", "Cancelled".yellow().bold(), state));
            }
            TurnEvent::Error { message } => {
                self.finish_phase(String::new());
                self.println(format!("{} {}", "Error:".red().bold(), message));
            }
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl EventReporter for SimpleProgress {
    fn on_event(&self, event: &TurnEvent) {
        match event {
            TurnEvent::Stage1Start => {
                println!("{} {}", "->".cyan(), TurnPhase::Stage1.display_name().bold());
            }
            TurnEvent::Stage1Complete { data } => {
                println!("  {} {} responses", "v".green(), data.len());
            }
            TurnEvent::Stage2Start => {
                println!("{} {}", "->".cyan(), TurnPhase::Stage2.display_name().bold());
            }
            TurnEvent::Stage2Complete { data, .. } => {
                println!("  {} {} rankings", "v".green(), data.len());
            }
            TurnEvent::Stage3Start => {
                println!("{} {}", "->".cyan(), TurnPhase::Stage3.display_name().bold());
            }
            TurnEvent::Stage3Complete { .. } => {
                println!("  {} synthesis ready", "v".green());
            }
            TurnEvent::TitleComplete { title } => {
                println!("  {} title: {}", "v".green(), title);
            }
            TurnEvent::Complete {
                metadata,
                remaining_quota,
            } => {
                println!(
                    "{} {} tokens across {} calls, {} remaining today",
                    "Done:".green().bold(),
                    metadata.usage.total_tokens,
                    metadata.usage.model_calls,
                    remaining_quota
                );
            }
            TurnEvent::Cancelled { state } => {
                println!("{} during {:?}", "Cancelled".yellow().bold(), state);
            }
            TurnEvent::Error { message } => {
                println!("{} {}", "Error:".red().bold(), message);
            }
        }
    }
}
