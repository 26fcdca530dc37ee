//! CLI argument definitions for the Parley application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Parley — a customer support chat client.
#[derive(Parser, Debug, Default)]
#[command(name = "parley", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the support backend.
    #[arg(short = 'b', long = "backend-url")]
    pub backend_url: Option<String>,

    /// Data directory for the session database and audio clips.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PARLEY_CONFIG env var > ~/.parley/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PARLEY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the backend base URL.
    ///
    /// Priority: --backend-url flag > PARLEY_BACKEND_URL env var > config.
    pub fn resolve_backend_url(&self, config_url: &str) -> String {
        if let Some(ref url) = self.backend_url {
            return url.clone();
        }
        if let Ok(url) = std::env::var("PARLEY_BACKEND_URL") {
            return url;
        }
        config_url.to_string()
    }

    /// Resolve the data directory.
    ///
    /// Priority: --data-dir flag > config, with `~` expanded.
    pub fn resolve_data_dir(&self, config_dir: &str) -> PathBuf {
        if let Some(ref p) = self.data_dir {
            return p.clone();
        }
        expand_home(config_dir)
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE");
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME");
        if let Ok(home) = home {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_flag_takes_precedence() {
        let args = CliArgs {
            config: Some(PathBuf::from("/tmp/custom.toml")),
            ..CliArgs::default()
        };
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_default_config_path_ends_with_config_toml() {
        let args = CliArgs::default();
        if std::env::var("PARLEY_CONFIG").is_err() {
            assert!(args.resolve_config_path().ends_with("config.toml"));
        }
    }

    #[test]
    fn test_backend_url_flag_takes_precedence() {
        let args = CliArgs {
            backend_url: Some("http://flag:1".to_string()),
            ..CliArgs::default()
        };
        assert_eq!(
            args.resolve_backend_url("http://config:2"),
            "http://flag:1"
        );
    }

    #[test]
    fn test_backend_url_falls_back_to_config() {
        let args = CliArgs::default();
        if std::env::var("PARLEY_BACKEND_URL").is_err() {
            assert_eq!(
                args.resolve_backend_url("http://config:2"),
                "http://config:2"
            );
        }
    }

    #[test]
    fn test_data_dir_flag_takes_precedence() {
        let args = CliArgs {
            data_dir: Some(PathBuf::from("/var/parley")),
            ..CliArgs::default()
        };
        assert_eq!(
            args.resolve_data_dir("~/.parley/data"),
            PathBuf::from("/var/parley")
        );
    }

    #[test]
    fn test_data_dir_expands_home() {
        let args = CliArgs::default();
        let resolved = args.resolve_data_dir("~/.parley/data");
        assert!(!resolved.to_string_lossy().starts_with('~'));
        assert!(resolved.ends_with(".parley/data") || resolved == PathBuf::from("~/.parley/data"));
    }

    #[test]
    fn test_log_level_resolution() {
        let args = CliArgs {
            log_level: Some("debug".to_string()),
            ..CliArgs::default()
        };
        assert_eq!(args.resolve_log_level("info"), "debug");

        let args = CliArgs::default();
        assert_eq!(args.resolve_log_level("warn"), "warn");
    }
}
