//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Fiber viewing camera actor: serves the camera command vocabulary over TCP
#[derive(Parser, Debug)]
#[command(name = "fvc-actor")]
#[command(version, about = "Fiber viewing camera actor", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Address to listen on (e.g. 127.0.0.1:9990)
    #[arg(long, global = true)]
    pub listen: Option<String>,

    /// Base data directory; images go to <DATA_ROOT>/fvc
    #[arg(long, global = true)]
    pub data_root: Option<String>,

    /// Camera device index
    #[arg(long, global = true)]
    pub device: Option<u32>,

    /// Exposure time (us) programmed on connect
    #[arg(long, global = true)]
    pub exptime: Option<i64>,

    /// Gain (db) programmed on connect
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub gain: Option<f64>,
}

impl Args {
    /// Override config file values with the ones given on the command line.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(data_root) = &self.data_root {
            config.storage.data_root = data_root.clone();
        }
        if let Some(device) = self.device {
            config.camera.device = device;
        }
        if let Some(exptime) = self.exptime {
            config.camera.exposure_time_us = Some(exptime);
        }
        if let Some(gain) = self.gain {
            config.camera.gain_db = Some(gain);
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect the camera, run one command and print its replies
    Exec {
        /// Command words, e.g. `expose object 3`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["fvc-actor"]);
        assert!(args.command.is_none());
        assert!(args.config.is_none());
        assert!(args.listen.is_none());
        assert!(args.data_root.is_none());
        assert!(args.device.is_none());
        assert!(args.exptime.is_none());
        assert!(args.gain.is_none());
    }

    #[test]
    fn test_args_config_option() {
        let args = Args::parse_from(["fvc-actor", "--config", "/tmp/config.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.toml")));

        let args = Args::parse_from(["fvc-actor", "-c", "/tmp/test.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
    }

    #[test]
    fn test_args_overrides_applied() {
        let args = Args::parse_from([
            "fvc-actor",
            "--listen",
            "0.0.0.0:5000",
            "--data-root",
            "/data",
            "--device",
            "1",
            "--exptime",
            "750",
            "--gain",
            "2.5",
        ]);
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.server.listen, "0.0.0.0:5000");
        assert_eq!(config.storage.data_root, "/data");
        assert_eq!(config.camera.device, 1);
        assert_eq!(config.camera.exposure_time_us, Some(750));
        assert_eq!(config.camera.gain_db, Some(2.5));
    }

    #[test]
    fn test_args_without_overrides_keep_config() {
        let args = Args::parse_from(["fvc-actor"]);
        let mut config = Config::default();
        config.camera.gain_db = Some(4.0);
        args.apply_to(&mut config);
        assert_eq!(config, {
            let mut expected = Config::default();
            expected.camera.gain_db = Some(4.0);
            expected
        });
    }

    #[test]
    fn test_args_exec_subcommand() {
        let args = Args::parse_from(["fvc-actor", "exec", "expose", "object", "3"]);
        match args.command {
            Some(Command::Exec { words }) => assert_eq!(words, vec!["expose", "object", "3"]),
            other => panic!("Expected Exec, got {:?}", other),
        }
    }

    #[test]
    fn test_args_exec_negative_value() {
        let args = Args::parse_from(["fvc-actor", "exec", "setexptime", "-5"]);
        match args.command {
            Some(Command::Exec { words }) => assert_eq!(words, vec!["setexptime", "-5"]),
            other => panic!("Expected Exec, got {:?}", other),
        }
    }

    #[test]
    fn test_args_exec_requires_words() {
        assert!(Args::try_parse_from(["fvc-actor", "exec"]).is_err());
    }

    #[test]
    fn test_args_config_show_subcommand() {
        let args = Args::parse_from(["fvc-actor", "config", "show"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn test_args_config_init_subcommand() {
        let args = Args::parse_from(["fvc-actor", "config", "init"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Init
            })
        ));
    }
}
