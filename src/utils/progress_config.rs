// src/utils/progress_config.rs

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::utils::env::env_or;

const PROGRESS_CHARS: &str = "█▉▊▋▌▍▎▏  ";

/// Configuration for progress tracking throughout the pipeline
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Whether to show progress bars at all
    pub enabled: bool,
    /// Whether to show per-stage sub-progress bars
    pub detailed: bool,
    /// Whether to show memory usage in progress messages
    pub show_memory: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detailed: true,
            show_memory: true,
        }
    }
}

impl ProgressConfig {
    /// Create progress configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            enabled: env_or("PROGRESS_ENABLED", true),
            detailed: env_or("PROGRESS_DETAILED", true),
            show_memory: env_or("PROGRESS_SHOW_MEMORY", true),
        }
    }

    /// Create a MultiProgress instance if progress is enabled, None otherwise
    pub fn create_multi_progress(&self) -> Option<MultiProgress> {
        if self.enabled {
            Some(MultiProgress::new())
        } else {
            None
        }
    }

    /// MultiProgress handed to the pipeline stages; None unless detailed bars are wanted
    pub fn stage_progress(&self, multi_progress: &Option<MultiProgress>) -> Option<MultiProgress> {
        if self.should_show_detailed() {
            multi_progress.clone()
        } else {
            None
        }
    }

    pub fn should_show_detailed(&self) -> bool {
        self.enabled && self.detailed
    }

    pub fn should_show_memory(&self) -> bool {
        self.enabled && self.show_memory
    }
}

/// Adds a bar with the given template to `multi_progress`, if any.
pub fn add_bar(
    multi_progress: &Option<MultiProgress>,
    len: u64,
    template: &str,
    message: &'static str,
) -> Option<ProgressBar> {
    multi_progress.as_ref().map(|mp| {
        let pb = mp.add(ProgressBar::new(len));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars(PROGRESS_CHARS),
        );
        pb.set_message(message);
        pb
    })
}

/// Adds a spinner with the given template to `multi_progress`, if any.
pub fn add_spinner(
    multi_progress: &Option<MultiProgress>,
    template: &str,
    message: &'static str,
) -> Option<ProgressBar> {
    multi_progress.as_ref().map(|mp| {
        let pb = mp.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template(template)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = ProgressConfig::default();
        assert!(config.enabled);
        assert!(config.detailed);
        assert!(config.show_memory);
    }

    #[test]
    fn test_env_config() {
        env::set_var("PROGRESS_ENABLED", "false");
        env::set_var("PROGRESS_DETAILED", "false");
        env::set_var("PROGRESS_SHOW_MEMORY", "false");

        let config = ProgressConfig::from_env();
        assert!(!config.enabled);
        assert!(!config.detailed);
        assert!(!config.show_memory);

        env::remove_var("PROGRESS_ENABLED");
        env::remove_var("PROGRESS_DETAILED");
        env::remove_var("PROGRESS_SHOW_MEMORY");
    }

    #[test]
    fn test_multi_progress_creation() {
        let mut config = ProgressConfig::default();

        config.enabled = true;
        let mp = config.create_multi_progress();
        assert!(mp.is_some());
        assert!(config.stage_progress(&mp).is_some());

        config.detailed = false;
        assert!(config.stage_progress(&mp).is_none());

        config.enabled = false;
        assert!(config.create_multi_progress().is_none());
    }

    #[test]
    fn test_bars_absent_without_multi_progress() {
        assert!(add_bar(&None, 3, "{pos}/{len} {msg}", "working").is_none());
        assert!(add_spinner(&None, "{spinner} {msg}", "working").is_none());
    }
}
