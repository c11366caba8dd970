//! CLI route: single route table and run context. Dispatches to the pipeline and presentation.

use crate::cli::parse::{Commands, OutputFormat, RecommendArgs};
use crate::cli::presentation::{
    format_activities, format_config_text, format_recommendation_json,
    format_recommendation_text,
};
use crate::config::{ConfigLoader, PrefuelConfig};
use crate::error::ApiError;
use crate::pipeline::{Orchestrator, PipelineMode, PipelinePlan, Preset};
use crate::provider::{GenerationClient, ProviderFactory};
use crate::recommendation::ActivityContext;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Runtime context for CLI execution: the resolved configuration and where it came from.
pub struct RunContext {
    config: PrefuelConfig,
    config_path: Option<PathBuf>,
}

impl RunContext {
    /// Load and validate configuration. `config_path` replaces the file layers.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.ensure_valid()?;
        debug!(
            workspace = %workspace_root.display(),
            provider = ?config.provider.provider_type,
            model = %config.provider.model,
            "Configuration loaded"
        );
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Context over an already-built configuration.
    pub fn from_config(config: PrefuelConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    pub fn config(&self) -> &PrefuelConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Recommend(args) => {
                let client = self.build_client()?;
                let color = args.format == OutputFormat::Text && std::io::stdout().is_terminal();
                self.recommend_with(client, args, color)
            }
            Commands::Activities => Ok(format_activities()),
            Commands::Config => format_config_text(&self.config, self.config_path.as_deref()),
        }
    }

    /// Run the recommend command against `client`.
    pub fn recommend_with(
        &self,
        client: Arc<dyn GenerationClient>,
        args: &RecommendArgs,
        color: bool,
    ) -> Result<String, ApiError> {
        let context = ActivityContext::new(args.activity.as_str(), args.hours)?;
        let plan = self.resolve_plan(args);
        let temperature = args.temperature.unwrap_or(self.config.pipeline.temperature);
        let parallel = args.parallel || self.config.pipeline.parallel_candidates;

        let orchestrator = Orchestrator::new(client, plan, temperature)?
            .with_parallel_candidates(parallel);

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::Runtime(format!("Failed to create runtime: {}", e)))?;
        let recommendation = rt.block_on(orchestrator.run(&context))?;
        info!(
            activity = %context.activity(),
            fallback = recommendation.is_fallback(),
            "Recommendation ready"
        );

        match args.format {
            OutputFormat::Text => Ok(format_recommendation_text(&recommendation, color)),
            OutputFormat::Json => format_recommendation_json(&recommendation),
        }
    }

    /// `--preset`, else `--mode`'s default plan, else the configured plan.
    fn resolve_plan(&self, args: &RecommendArgs) -> PipelinePlan {
        match (args.preset, args.mode) {
            (Some(preset), _) => PipelinePlan::preset(preset),
            (None, Some(PipelineMode::OneShot)) => PipelinePlan::preset(Preset::OneShot),
            (None, Some(PipelineMode::Chained)) => PipelinePlan::preset(Preset::Chained),
            (None, None) => self.config.pipeline.resolve_plan(),
        }
    }

    fn build_client(&self) -> Result<Arc<dyn GenerationClient>, ApiError> {
        let provider = self.config.provider.to_model_provider()?;
        let client =
            ProviderFactory::create_client(&provider, self.config.provider.request_timeout())?;
        Ok(Arc::from(client))
    }
}
