// src/utils/env.rs

use log::{info, warn};
use std::path::Path;

/// Loads the first `.env` file found among the usual locations.
/// Variables already present in the process environment are left untouched.
pub fn load_env() {
    let env_paths = [".env", ".env.local", "../.env"];
    let mut loaded_env = false;
    for path in env_paths.iter() {
        if Path::new(path).exists() {
            match dotenv::from_filename(path) {
                Ok(_) => {
                    info!("Loaded environment variables from {}", path);
                    loaded_env = true;
                    break;
                }
                Err(e) => warn!("Failed to load environment from {}: {}", path, e),
            }
        }
    }
    if !loaded_env {
        info!("No .env file found, using environment variables from system");
    }
}

/// Reads an environment variable and parses it, falling back to `default`
/// when the variable is missing or malformed.
pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring malformed value for {}: {:?}", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_env_or_parses_and_falls_back() {
        env::set_var("TOPIC_CLUSTERING_TEST_ENV_OR", "17");
        assert_eq!(env_or("TOPIC_CLUSTERING_TEST_ENV_OR", 3usize), 17);

        env::set_var("TOPIC_CLUSTERING_TEST_ENV_OR", "not-a-number");
        assert_eq!(env_or("TOPIC_CLUSTERING_TEST_ENV_OR", 3usize), 3);

        env::remove_var("TOPIC_CLUSTERING_TEST_ENV_OR");
        assert_eq!(env_or("TOPIC_CLUSTERING_TEST_ENV_OR", 3usize), 3);
    }
}
