//! Workspace config file source: config/config.toml and config/{env}.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::Path;
use tracing::debug;

/// Name of the active environment file, from `PREFUEL_ENV` (default "development").
pub fn environment_name() -> String {
    std::env::var("PREFUEL_ENV")
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "development".to_string())
}

/// Add workspace config files to builder.
/// Precedence: config/config.toml (base) then config/{PREFUEL_ENV}.toml.
pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_dir = workspace_root.join("config");
    let candidates = [
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", environment_name())),
    ];

    for path in candidates.iter().filter(|path| path.exists()) {
        debug!(config_path = %path.display(), "Loading workspace configuration file");
        builder = builder.add_source(File::from(path.as_path()).required(false));
    }
    Ok(builder)
}
