//! CLI argument definitions for the Intervue server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use intervue_core::config::IntervueConfig;
use intervue_core::error::IntervueError;

/// Intervue - a voice-driven technical interviewer.
#[derive(Parser, Debug)]
#[command(name = "intervue", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Directory holding the candidate's materials (README.md, CV, projects).
    #[arg(long = "context-dir")]
    pub context_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > INTERVUE_CONFIG env var > ~/.intervue/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(|key| std::env::var(key).ok())
    }

    fn resolve_config_path_with<F>(&self, env: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = env("INTERVUE_CONFIG") {
            return PathBuf::from(p);
        }
        match env("HOME") {
            Some(home) => PathBuf::from(home).join(".intervue").join("config.toml"),
            None => PathBuf::from("config.toml"),
        }
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > INTERVUE_PORT env var > config file value > 3030.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        self.resolve_port_with(config_port, |key| std::env::var(key).ok())
    }

    fn resolve_port_with<F>(&self, config_port: u16, env: F) -> u16
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = self.port {
            return p;
        }
        if let Some(p) = env("INTERVUE_PORT").and_then(|v| v.parse::<u16>().ok()) {
            return p;
        }
        if config_port != 0 {
            return config_port;
        }
        3030
    }

    /// Resolve the log level. Returns `None` if not overridden.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    /// Resolve the context directory. Returns `None` if not overridden.
    pub fn resolve_context_dir(&self) -> Option<String> {
        self.context_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Load the config file and apply CLI overrides.
    ///
    /// Runs before tracing is installed, so a load failure is handed back
    /// for the caller to log once the subscriber exists. Defaults fill in.
    pub fn load_config(&self) -> (IntervueConfig, Option<IntervueError>) {
        let path = self.resolve_config_path();
        let (mut config, load_error) = match IntervueConfig::load(&path) {
            Ok(config) => (config, None),
            Err(e) => (IntervueConfig::default(), Some(e)),
        };
        config.general.port = self.resolve_port(config.general.port);
        if let Some(level) = self.resolve_log_level() {
            config.general.log_level = level;
        }
        if let Some(dir) = self.resolve_context_dir() {
            config.general.context_dir = dir;
        }
        (config, load_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::try_parse_from([
            "intervue",
            "-c",
            "/tmp/i.toml",
            "-p",
            "4000",
            "-l",
            "debug",
            "--context-dir",
            "./candidate",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("/tmp/i.toml")));
        assert_eq!(args.port, Some(4000));
        assert_eq!(args.resolve_log_level().as_deref(), Some("debug"));
        assert_eq!(args.resolve_context_dir().as_deref(), Some("./candidate"));
    }

    #[test]
    fn test_port_priority() {
        let flag = CliArgs::try_parse_from(["intervue", "--port", "4000"]).unwrap();
        assert_eq!(flag.resolve_port_with(5000, |_| Some("6000".to_string())), 4000);

        let bare = CliArgs::try_parse_from(["intervue"]).unwrap();
        assert_eq!(bare.resolve_port_with(5000, |_| Some("6000".to_string())), 6000);
        assert_eq!(bare.resolve_port_with(5000, |_| Some("nope".to_string())), 5000);
        assert_eq!(bare.resolve_port_with(5000, no_env), 5000);
        assert_eq!(bare.resolve_port_with(0, no_env), 3030);
    }

    #[test]
    fn test_config_path_priority() {
        let flag = CliArgs::try_parse_from(["intervue", "-c", "a.toml"]).unwrap();
        assert_eq!(
            flag.resolve_config_path_with(|_| Some("b.toml".to_string())),
            PathBuf::from("a.toml")
        );

        let bare = CliArgs::try_parse_from(["intervue"]).unwrap();
        assert_eq!(
            bare.resolve_config_path_with(|k| (k == "INTERVUE_CONFIG").then(|| "b.toml".to_string())),
            PathBuf::from("b.toml")
        );
        assert_eq!(
            bare.resolve_config_path_with(|k| (k == "HOME").then(|| "/home/x".to_string())),
            PathBuf::from("/home/x/.intervue/config.toml")
        );
        assert_eq!(bare.resolve_config_path_with(no_env), PathBuf::from("config.toml"));
    }

    #[test]
    fn test_load_config_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general\nport = ").unwrap();

        let args = CliArgs::try_parse_from([
            "intervue",
            "-c",
            path.to_str().unwrap(),
            "-l",
            "debug",
        ])
        .unwrap();
        let (config, err) = args.load_config();

        assert!(matches!(err, Some(IntervueError::Config(_))));
        assert_eq!(config.general.log_level, "debug");
    }

    #[test]
    fn test_load_config_reads_file_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_level = \"warn\"\nport = 4100\n").unwrap();

        let args = CliArgs::try_parse_from([
            "intervue",
            "-c",
            path.to_str().unwrap(),
            "--context-dir",
            "./candidate",
        ])
        .unwrap();
        let (config, err) = args.load_config();

        assert!(err.is_none());
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.general.context_dir, "./candidate");
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(CliArgs::try_parse_from(["intervue", "--headless"]).is_err());
    }
}
