/// `load_config` module: builds the [`RotateConfig`] used by both subcommands.
///
/// Layering, lowest to highest precedence:
/// 1. built-in defaults ([`RotateConfig::default`]);
/// 2. an optional YAML file, every key optional;
/// 3. secrets from the environment (`JENKINS_USER`, `JENKINS_API_TOKEN`) and
///    `JENKINS_URL`, so credentials never need to live in the YAML file.
///
/// Command-line flags are applied afterwards by the CLI itself.
///
/// # Errors
/// Unreadable or unparsable files surface as `anyhow::Error` with the path
/// and the parser message attached.
use anyhow::Result;
use size_rotate_core::config::RotateConfig;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub const ENV_JENKINS_USER: &str = "JENKINS_USER";
pub const ENV_JENKINS_TOKEN: &str = "JENKINS_API_TOKEN";
pub const ENV_JENKINS_URL: &str = "JENKINS_URL";

pub fn load_config(path: Option<&Path>) -> Result<RotateConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            info!("No config file given, using built-in defaults");
            RotateConfig::default()
        }
    };

    inject_env(&mut config);
    if !config.credentials.is_complete() {
        warn!(
            "Job server credentials incomplete; set {} and {} to trigger jobs",
            ENV_JENKINS_USER, ENV_JENKINS_TOKEN
        );
    }
    config.trace_loaded();
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<RotateConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path,
                e
            ));
        }
    };

    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(RotateConfig::default());
    }

    match serde_yaml::from_str::<RotateConfig>(&content) {
        Ok(config) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(config)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

fn inject_env(config: &mut RotateConfig) {
    if let Ok(user) = env::var(ENV_JENKINS_USER) {
        config.credentials.username = user;
    }
    if let Ok(token) = env::var(ENV_JENKINS_TOKEN) {
        config.credentials.secret = token;
    }
    if let Ok(url) = env::var(ENV_JENKINS_URL) {
        if !url.is_empty() {
            config.remote_base_url = url;
        }
    }
}
