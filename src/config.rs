// Configuration module for querylens
// Reads from environment variables with sensible defaults

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Hard cap on recursive reference resolution. Guarantees termination on
/// cyclic aliasing regardless of configuration.
pub const MAX_RESOLVE_DEPTH: usize = 24;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum analyzed file size in megabytes (QUERYLENS_MAX_FILE_SIZE_MB)
    pub max_file_size_mb: u64,

    /// Recursive resolution depth, clamped to MAX_RESOLVE_DEPTH
    /// (QUERYLENS_RESOLVE_DEPTH)
    pub resolve_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
            resolve_depth: MAX_RESOLVE_DEPTH,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(val) = env::var("QUERYLENS_MAX_FILE_SIZE_MB") {
            if let Ok(parsed) = val.parse() {
                config.max_file_size_mb = parsed;
            } else {
                eprintln!(
                    "querylens: Warning: Invalid QUERYLENS_MAX_FILE_SIZE_MB value: {}, using default: {}",
                    val, config.max_file_size_mb
                );
            }
        }

        if let Ok(val) = env::var("QUERYLENS_RESOLVE_DEPTH") {
            match val.parse::<usize>() {
                Ok(parsed) if parsed > 0 => {
                    config.resolve_depth = parsed.min(MAX_RESOLVE_DEPTH);
                }
                _ => {
                    eprintln!(
                        "querylens: Warning: Invalid QUERYLENS_RESOLVE_DEPTH value: {}, using default: {}",
                        val, config.resolve_depth
                    );
                }
            }
        }

        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_file_size_mb, 10);
        assert_eq!(config.resolve_depth, MAX_RESOLVE_DEPTH);
    }
}
