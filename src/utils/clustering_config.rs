// src/utils/clustering_config.rs

use log::info;

use crate::utils::env::env_or;

/// Walk length used by Walktrap when nothing else is configured.
pub const DEFAULT_WALKTRAP_STEPS: usize = 4;
/// Records per write-back query.
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone)]
pub struct ClusteringConfig {
    /// Random-walk length for the Walktrap distance.
    pub steps: usize,
    /// Number of assignments sent per UNWIND write.
    pub write_batch_size: usize,
    /// When false the pipeline stops after computing clusters.
    pub write_enabled: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_WALKTRAP_STEPS,
            write_batch_size: DEFAULT_WRITE_BATCH_SIZE,
            write_enabled: true,
        }
    }
}

impl ClusteringConfig {
    pub fn from_env() -> Self {
        Self {
            steps: env_or("WALKTRAP_STEPS", DEFAULT_WALKTRAP_STEPS).max(1),
            write_batch_size: env_or("CLUSTER_WRITE_BATCH_SIZE", DEFAULT_WRITE_BATCH_SIZE).max(1),
            write_enabled: env_or("CLUSTER_WRITE_ENABLED", true),
        }
    }

    /// Applies command-line overrides on top of the environment values.
    pub fn with_overrides(
        mut self,
        steps: Option<usize>,
        write_batch_size: Option<usize>,
        dry_run: bool,
    ) -> Self {
        if let Some(steps) = steps {
            self.steps = steps.max(1);
        }
        if let Some(size) = write_batch_size {
            self.write_batch_size = size.max(1);
        }
        if dry_run {
            self.write_enabled = false;
        }
        self
    }

    pub fn log_config(&self) {
        info!("🧭 Walktrap walk length: {} steps", self.steps);
        if self.write_enabled {
            info!(
                "💾 Cluster write-back ENABLED (batch size {})",
                self.write_batch_size
            );
        } else {
            info!("💾 Cluster write-back DISABLED - clusters are computed and reported only");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_from_env() {
        env::set_var("WALKTRAP_STEPS", "6");
        env::set_var("CLUSTER_WRITE_BATCH_SIZE", "0");
        env::set_var("CLUSTER_WRITE_ENABLED", "false");

        let config = ClusteringConfig::from_env();
        assert_eq!(config.steps, 6);
        assert_eq!(config.write_batch_size, 1);
        assert!(!config.write_enabled);

        env::remove_var("WALKTRAP_STEPS");
        env::remove_var("CLUSTER_WRITE_BATCH_SIZE");
        env::remove_var("CLUSTER_WRITE_ENABLED");
    }

    #[test]
    fn test_overrides() {
        let config = ClusteringConfig::default().with_overrides(Some(3), Some(50), true);
        assert_eq!(config.steps, 3);
        assert_eq!(config.write_batch_size, 50);
        assert!(!config.write_enabled);

        let untouched = ClusteringConfig::default().with_overrides(None, None, false);
        assert_eq!(untouched.steps, DEFAULT_WALKTRAP_STEPS);
        assert_eq!(untouched.write_batch_size, DEFAULT_WRITE_BATCH_SIZE);
        assert!(untouched.write_enabled);
    }
}
