//! Global config file source: $XDG_CONFIG_HOME/prefuel/config.toml, else the platform
//! config directory (e.g. ~/.config/prefuel/config.toml).

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::PathBuf;
use tracing::debug;

/// Path to the global config file, whether or not it exists.
pub fn global_config_path() -> Option<PathBuf> {
    let xdg = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);
    let config_dir = match xdg {
        Some(dir) => dir.join("prefuel"),
        None => directories::ProjectDirs::from("", "", "prefuel")?
            .config_dir()
            .to_path_buf(),
    };
    Some(config_dir.join("config.toml"))
}

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Some(path) = global_config_path() else {
        return Ok(builder);
    };
    if !path.exists() {
        debug!(config_path = %path.display(), "No global configuration file");
        return Ok(builder);
    }
    debug!(config_path = %path.display(), "Loading global configuration file");
    Ok(builder.add_source(File::from(path.as_path()).required(false)))
}
