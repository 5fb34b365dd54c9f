//! Subcommand handlers for serve, exec and config actions.

use std::path::Path;
use std::sync::Arc;

use super::args::ConfigAction;
use crate::camera::SimulatedCamera;
use crate::command::{Command, CommandDispatcher, Reply, Request};
use crate::config::{self, default_path as get_config_path, Config};
use crate::exposure::ExposureController;
use crate::filename::FilenameAllocator;
use crate::server::{self, Actor};

/// Build the dispatcher for the configured camera and data root.
pub fn build_dispatcher(config: &Config) -> Result<CommandDispatcher<SimulatedCamera>, String> {
    let data_root = config.data_root().map_err(|e| format!("Invalid data root: {}", e))?;
    log::info!(
        "Camera device {}, writing images to {}",
        config.camera.device,
        data_root.join(crate::filename::SUBDIR).display()
    );
    let controller = ExposureController::new(SimulatedCamera::new(), config.camera.device);
    Ok(CommandDispatcher::new(controller, FilenameAllocator::new(data_root))
        .with_defaults(config.camera_defaults()))
}

/// Serve commands over TCP until Ctrl-C.
pub fn run_server(config: &Config) -> Result<(), String> {
    let dispatcher = build_dispatcher(config)?;
    let actor = Arc::new(Actor::new(dispatcher));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    rt.block_on(async {
        actor.connect().await;
        server::run(&config.server.listen, actor)
            .await
            .map_err(|e| format!("Server on {} failed: {}", config.server.listen, e))
    })
}

/// Run a single command line and print its replies.
/// Returns whether the command succeeded.
pub fn exec(config: &Config, words: &[String]) -> Result<bool, String> {
    let line = words.join(" ");
    let request = Request::parse(&line);
    let command = request
        .command
        .map_err(|e| format!("Invalid command '{}': {}", line, e))?;

    let mut dispatcher = build_dispatcher(config)?;
    let mut replies: Vec<Reply> = Vec::new();
    let ok = match command {
        // These do not need a connected camera first
        Command::Ping | Command::Reconnect => dispatcher.dispatch(&command, &mut replies),
        _ => match dispatcher.connect() {
            Ok(_) => dispatcher.dispatch(&command, &mut replies),
            Err(e) => {
                replies.push(Reply::fail_with(&e));
                false
            }
        },
    };

    for reply in &replies {
        println!("{}", reply.line(request.id));
    }
    if let Err(e) = dispatcher.close() {
        log::warn!("Closing camera failed: {}", e);
    }
    Ok(ok)
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    config_path: Option<&Path>,
    config: &Config,
) -> Result<(), String> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            println!();
            print!("{}", config.to_toml().map_err(|e| e.to_string())?);
            println!();
            match config.data_root() {
                Ok(root) => println!("Data directory: {}", root.join(crate::filename::SUBDIR).display()),
                Err(e) => println!("Data directory: unresolved ({})", e),
            }

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            config::write_default(&config_path).map_err(|e| match e {
                config::ConfigError::AlreadyExists(_) => format!(
                    "{}\nUse 'fvc-actor config show' to view current settings.",
                    e
                ),
                other => other.to_string(),
            })?;
            println!("Created config file: {}", config_path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(tmp: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.data_root = tmp.path().display().to_string();
        config
    }

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_exec_expose_writes_file() {
        let tmp = TempDir::new().unwrap();
        let ok = exec(&config_for(&tmp), &words("expose test")).unwrap();
        assert!(ok);
        assert!(tmp.path().join("fvc").join("FVC_test_000001.fits").exists());
    }

    #[test]
    fn test_exec_reports_failure() {
        let tmp = TempDir::new().unwrap();
        let ok = exec(&config_for(&tmp), &words("setexptime 5")).unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_exec_invalid_command() {
        let tmp = TempDir::new().unwrap();
        let err = exec(&config_for(&tmp), &words("focus")).unwrap_err();
        assert!(err.contains("unknown command"));
    }

    #[test]
    fn test_build_dispatcher_applies_defaults() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_for(&tmp);
        config.camera.exposure_time_us = Some(1234);
        let mut dispatcher = build_dispatcher(&config).unwrap();
        assert_eq!(dispatcher.connect().unwrap().exposure_time_us, 1234);
    }

    #[test]
    fn test_config_init_and_show() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let config = config_for(&tmp);

        handle_config_action(ConfigAction::Init, Some(&path), &config).unwrap();
        assert!(path.exists());

        let err = handle_config_action(ConfigAction::Init, Some(&path), &config).unwrap_err();
        assert!(err.contains("already exists"));

        handle_config_action(ConfigAction::Show, Some(&path), &config).unwrap();
    }
}
