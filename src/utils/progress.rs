//! Terminal progress indicators.
//!
//! Thin wrappers over `indicatif`. Every indicator can be created hidden, in
//! which case all calls are no-ops; the CLI hides them for `--quiet` and
//! `--no-progress`.

use std::time::Duration;

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// A progress bar or spinner that may be hidden.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// A bar counting to `len`.
    #[must_use]
    pub fn new(len: u64, visible: bool) -> Self {
        let inner = if visible {
            let bar = IndicatifBar::new(len);
            bar.set_style(default_style());
            bar
        } else {
            IndicatifBar::hidden()
        };
        Self {
            inner,
        }
    }

    /// A spinner for work of unknown length.
    #[must_use]
    pub fn new_spinner(visible: bool) -> Self {
        let inner = if visible {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            IndicatifBar::hidden()
        };
        Self {
            inner,
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

/// A visible spinner showing `msg`, or a hidden one.
#[must_use]
pub fn spinner_with_message(msg: impl Into<String>, visible: bool) -> ProgressBar {
    let spinner = ProgressBar::new_spinner(visible);
    spinner.set_message(msg);
    spinner
}

fn default_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_still_counts() {
        let bar = ProgressBar::new(3, false);
        bar.set_prefix("Installing");
        bar.inc(1);
        bar.inc(1);
        assert_eq!(bar.inner.position(), 2);
        bar.finish_and_clear();
    }

    #[test]
    fn test_hidden_spinner() {
        let spinner = spinner_with_message("Resolving", false);
        spinner.finish_and_clear();
    }
}
