//! Configuration System
//!
//! Layered configuration (lowest to highest): built-in defaults, the global file,
//! workspace files under `config/`, then `PREFUEL__SECTION__KEY` environment
//! variables. An explicit `--config` file replaces both file layers.

use crate::error::ApiError;
use crate::logging::{self, LoggingConfig};
use crate::pipeline::{PipelinePlan, Preset};
use config::Environment;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::provider::{ProviderConfig, ProviderType};

mod defaults;
mod sources;

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefuelConfig {
    /// Generation service
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Which plan runs and how
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pipeline section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default)]
    pub preset: Preset,

    /// Sampling temperature forwarded with every call, within [0, 2]
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Generate all candidate pools concurrently (chained plans only)
    #[serde(default)]
    pub parallel_candidates: bool,

    /// Custom plan; takes precedence over `preset`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PipelinePlan>,
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            preset: Preset::default(),
            temperature: default_temperature(),
            parallel_candidates: false,
            plan: None,
        }
    }
}

impl PipelineSettings {
    /// The custom plan if one is configured, else the preset's plan.
    pub fn resolve_plan(&self) -> PipelinePlan {
        self.plan
            .clone()
            .unwrap_or_else(|| PipelinePlan::preset(self.preset))
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            ));
        }
        if let Some(plan) = &self.plan {
            plan.validate().map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    Pipeline(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "provider: {}", msg),
            ValidationError::Pipeline(msg) => write!(f, "pipeline: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PrefuelConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.pipeline.validate() {
            errors.push(ValidationError::Pipeline(e));
        }
        if let Err(e) = logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// [`validate`](Self::validate) folded into a single `ApiError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }

    /// Render as TOML with any inline API key redacted.
    pub fn to_redacted_toml(&self) -> Result<String, ApiError> {
        let mut shown = self.clone();
        if shown.provider.api_key.is_some() {
            shown.provider.api_key = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e)))
    }
}

/// Loads [`PrefuelConfig`] from its layers.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, workspace files, environment.
    pub fn load(workspace_root: &Path) -> Result<PrefuelConfig, ApiError> {
        let builder = defaults::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder.add_source(environment()).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Defaults, the given file (which must exist), environment.
    pub fn load_from_file(path: &Path) -> Result<PrefuelConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = defaults::builder_with_defaults()?
            .add_source(config::File::from(path).required(true))
            .add_source(environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("PREFUEL")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
