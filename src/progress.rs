//! Progress reporting for apply and destroy

use colored::Colorize;
use declarative::{Action, Address, ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

/// Drives an indicatif bar from executor callbacks
pub struct ApplyProgress {
    pb: ProgressBar,
    quiet: bool,
}

impl ApplyProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            pb: ProgressBar::hidden(),
            quiet,
        }
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_start(&mut self, count: usize) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new(count as u64);
        let template = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            pb.set_style(style.progress_chars("=>-"));
        }
        self.pb = pb;
    }

    fn on_resource_start(&mut self, address: &Address, action: Action) {
        log::debug!("Starting {action} of {address}");
        self.pb.set_message(format!("{address}: {action}..."));
    }

    fn on_resource_complete(&mut self, address: &Address, result: &ApplyResult) {
        let line = match result {
            ApplyResult::NoChange => None,
            ApplyResult::Created => Some(format!("  {} {address}: Creation complete", "✓".green())),
            ApplyResult::Updated => {
                Some(format!("  {} {address}: Modifications complete", "✓".green()))
            }
            ApplyResult::Replaced => {
                Some(format!("  {} {address}: Replacement complete", "✓".green()))
            }
            ApplyResult::Deleted => {
                Some(format!("  {} {address}: Destruction complete", "✓".green()))
            }
            ApplyResult::Failed { diagnostics } => Some(format!(
                "  {} {address}: {}",
                "✗".red(),
                diagnostics
                    .iter()
                    .next()
                    .map_or("failed", |d| d.summary.as_str())
            )),
            ApplyResult::Skipped { reason } => {
                Some(format!("  {} {address}: {}", "⚠".yellow(), reason.dimmed()))
            }
        };

        if let Some(line) = line
            && !self.quiet
        {
            self.pb.suspend(|| println!("{line}"));
        }
        self.pb.inc(1);
    }

    fn on_complete(&mut self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Diagnostic;

    #[test]
    fn test_quiet_progress_stays_hidden() {
        let mut progress = ApplyProgress::new(true);
        let address = Address::new("model_garden", "weather");

        progress.on_start(2);
        progress.on_resource_start(&address, Action::Create);
        progress.on_resource_complete(&address, &ApplyResult::Created);
        progress.on_resource_complete(
            &address,
            &ApplyResult::Failed {
                diagnostics: Diagnostic::error("Empty response", "no parts").into(),
            },
        );
        progress.on_complete();

        assert!(progress.pb.is_hidden());
        assert!(progress.pb.is_finished());
    }
}
