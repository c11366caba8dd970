//! Pipeline orchestrator: sequences stage calls and assembles the final recommendation.
//!
//! One-shot plans make a single structured call. Chained plans make a macro-ratio
//! call, then for each category generate a candidate pool and filter it, threading
//! each stage's raw text into later prompts, and finally assemble. Any service error
//! aborts the run at the failing stage; no partial recommendation is returned.

use crate::error::{ApiError, GenerationServiceError};
use crate::parser::{self, extract_line_items};
use crate::pipeline::plan::{
    Assembly, CandidateSource, CategoryKind, PipelineMode, PipelinePlan,
};
use crate::prompts::{self, CandidateSubject};
use crate::provider::{GenerationClient, StageMessage};
use crate::recommendation::{
    ActivityContext, AggregateRecommendation, CategorizedLists, GuidanceText,
    RecommendationOrigin, AVOID_TAG, DO_EAT_TAG,
};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a run is. One-shot: Idle, Requesting, Parsing, Done. Chained: Idle,
/// MacroStage, (GeneratingCandidates, FilteringCandidates) per category,
/// Assembling, optionally Parsing, Done. Any failure ends in Failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Requesting,
    Parsing,
    MacroStage,
    GeneratingCandidates(String),
    FilteringCandidates(String),
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Requesting => write!(f, "requesting"),
            PipelineState::Parsing => write!(f, "parsing"),
            PipelineState::MacroStage => write!(f, "macro_stage"),
            PipelineState::GeneratingCandidates(pool) => {
                write!(f, "generating_candidates({})", pool)
            }
            PipelineState::FilteringCandidates(category) => {
                write!(f, "filtering_candidates({})", category)
            }
            PipelineState::Assembling => write!(f, "assembling"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Category(String),
    Shared(String),
}

/// Candidate-generation stage resolved from the plan at construction.
#[derive(Debug, Clone)]
struct CandidateStage {
    key: PoolKey,
    label: String,
    stage_name: String,
    description: String,
    kind: CategoryKind,
    pool_size: usize,
}

impl CandidateStage {
    fn request(&self, context: &ActivityContext, macro_text: &str) -> Vec<StageMessage> {
        let subject = CandidateSubject {
            label: &self.label,
            description: &self.description,
            kind: self.kind,
        };
        prompts::candidates(context, macro_text, subject, self.pool_size)
    }
}

pub struct Orchestrator {
    client: Arc<dyn GenerationClient>,
    plan: PipelinePlan,
    temperature: f32,
    parallel_candidates: bool,
    /// One entry per category, in plan order. Empty for one-shot plans.
    candidate_stages: Vec<CandidateStage>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        plan: PipelinePlan,
        temperature: f32,
    ) -> Result<Self, ApiError> {
        plan.validate()?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ApiError::ConfigError(format!(
                "temperature must be within [0, 2], got {}",
                temperature
            )));
        }
        let candidate_stages = resolve_candidate_stages(&plan)?;
        Ok(Self {
            client,
            plan,
            temperature,
            parallel_candidates: false,
            candidate_stages,
        })
    }

    /// Generate every candidate pool concurrently before any filtering starts.
    pub fn with_parallel_candidates(mut self, enabled: bool) -> Self {
        self.parallel_candidates = enabled;
        self
    }

    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }

    pub async fn run(
        &self,
        context: &ActivityContext,
    ) -> Result<AggregateRecommendation, GenerationServiceError> {
        self.run_traced(context).await.0
    }

    /// Run and also return every state the run passed through.
    pub async fn run_traced(
        &self,
        context: &ActivityContext,
    ) -> (
        Result<AggregateRecommendation, GenerationServiceError>,
        Vec<PipelineState>,
    ) {
        info!(
            mode = ?self.plan.mode,
            activity = %context.activity(),
            time_until_hours = context.time_until_hours(),
            expected_calls = self.plan.expected_calls(),
            provider = self.client.provider_name(),
            model = self.client.model_name(),
            "Starting recommendation pipeline"
        );

        let mut run = Run {
            orchestrator: self,
            context,
            states: vec![PipelineState::Idle],
            calls: 0,
        };
        let result = match self.plan.mode {
            PipelineMode::OneShot => run.one_shot().await,
            PipelineMode::Chained => run.chained().await,
        };

        match &result {
            Ok(recommendation) => {
                run.enter(PipelineState::Done);
                info!(
                    fallback = recommendation.is_fallback(),
                    categories = recommendation.lists.len(),
                    "Recommendation pipeline completed"
                );
            }
            Err(err) => {
                run.enter(PipelineState::Failed);
                warn!(error = %err, "Recommendation pipeline aborted");
            }
        }
        (result, run.states)
    }

    async fn generate(
        &self,
        stage: &str,
        call: usize,
        messages: Vec<StageMessage>,
    ) -> Result<String, GenerationServiceError> {
        debug!(stage, call, messages = messages.len(), "Issuing generation call");
        let reply = self
            .client
            .generate(messages, self.temperature)
            .await
            .map_err(|err| {
                warn!(stage, call, error = %err, "Generation call failed");
                err
            })?;
        debug!(
            stage,
            call,
            reply_len = reply.content.len(),
            finish_reason = reply.finish_reason.as_deref().unwrap_or("unknown"),
            "Generation call completed"
        );
        Ok(reply.content)
    }
}

fn resolve_candidate_stages(plan: &PipelinePlan) -> Result<Vec<CandidateStage>, ApiError> {
    if plan.mode == PipelineMode::OneShot {
        return Ok(Vec::new());
    }
    plan.categories
        .iter()
        .map(|spec| match spec.candidate_source() {
            CandidateSource::Dedicated { pool_size } => Ok(CandidateStage {
                key: PoolKey::Category(spec.name.clone()),
                label: spec.name.clone(),
                stage_name: format!("candidates:{}", spec.name),
                description: spec.description.clone(),
                kind: spec.kind,
                pool_size,
            }),
            CandidateSource::Shared { pool } => {
                let shared = plan.shared_pool(&pool).ok_or_else(|| {
                    ApiError::InvalidPlan(format!("unknown candidate pool '{}'", pool))
                })?;
                Ok(CandidateStage {
                    key: PoolKey::Shared(shared.name.clone()),
                    label: shared.name.clone(),
                    stage_name: format!("candidates:{}", shared.name),
                    description: shared.description.clone(),
                    kind: CategoryKind::Eat,
                    pool_size: shared.size,
                })
            }
        })
        .collect()
}

/// State of a single run.
struct Run<'a> {
    orchestrator: &'a Orchestrator,
    context: &'a ActivityContext,
    states: Vec<PipelineState>,
    calls: usize,
}

impl<'a> Run<'a> {
    fn next_call(&mut self) -> usize {
        self.calls += 1;
        self.calls
    }

    fn enter(&mut self, state: PipelineState) {
        debug!(state = %state, "Pipeline state transition");
        self.states.push(state);
    }

    async fn one_shot(&mut self) -> Result<AggregateRecommendation, GenerationServiceError> {
        let orchestrator = self.orchestrator;
        let plan = &orchestrator.plan;

        self.enter(PipelineState::Requesting);
        let call = self.next_call();
        let reply = orchestrator
            .generate("one_shot", call, prompts::one_shot(self.context, plan))
            .await?;

        self.enter(PipelineState::Parsing);
        Ok(parser::parse(&reply, &plan.output_shape()))
    }

    async fn chained(&mut self) -> Result<AggregateRecommendation, GenerationServiceError> {
        let orchestrator = self.orchestrator;
        let plan = &orchestrator.plan;
        let context = self.context;

        self.enter(PipelineState::MacroStage);
        let call = self.next_call();
        let macro_text = orchestrator
            .generate("macro_ratio", call, prompts::macro_ratio(context))
            .await?;

        let mut pools: HashMap<PoolKey, String> = HashMap::new();
        if orchestrator.parallel_candidates {
            self.generate_pools_concurrently(&macro_text, &mut pools)
                .await?;
        }

        // (category name, filtered raw text), in plan order
        let mut filtered: Vec<(String, String)> = Vec::with_capacity(plan.categories.len());
        for (spec, stage) in plan.categories.iter().zip(&orchestrator.candidate_stages) {
            if !pools.contains_key(&stage.key) {
                self.enter(PipelineState::GeneratingCandidates(stage.label.clone()));
                let call = self.next_call();
                let pool_text = orchestrator
                    .generate(&stage.stage_name, call, stage.request(context, &macro_text))
                    .await?;
                pools.insert(stage.key.clone(), pool_text);
            }
            let pool_text = pools.get(&stage.key).map(String::as_str).unwrap_or_default();

            let dependencies: Vec<(&str, &str)> = spec
                .depends_on
                .iter()
                .filter_map(|dep| {
                    filtered
                        .iter()
                        .find(|(name, _)| name == dep)
                        .map(|(name, text)| (name.as_str(), text.as_str()))
                })
                .collect();

            self.enter(PipelineState::FilteringCandidates(spec.name.clone()));
            let messages = prompts::filter(context, &macro_text, spec, pool_text, &dependencies);
            let call = self.next_call();
            let text = orchestrator
                .generate(&format!("filter:{}", spec.name), call, messages)
                .await?;
            filtered.push((spec.name.clone(), text));
        }

        self.enter(PipelineState::Assembling);
        match plan.assembly {
            Assembly::Local => Ok(assemble_locally(plan, &macro_text, &filtered)),
            Assembly::Aggregate => {
                let artifacts: Vec<(&str, &str)> = filtered
                    .iter()
                    .map(|(name, text)| (name.as_str(), text.as_str()))
                    .collect();
                let call = self.next_call();
                let reply = orchestrator
                    .generate(
                        "aggregate",
                        call,
                        prompts::aggregate(context, &macro_text, &artifacts, plan),
                    )
                    .await?;
                self.enter(PipelineState::Parsing);
                Ok(parser::parse(&reply, &plan.output_shape()))
            }
        }
    }

    /// Issue every distinct candidate-generation call at once. Fails on the first error.
    async fn generate_pools_concurrently(
        &mut self,
        macro_text: &str,
        pools: &mut HashMap<PoolKey, String>,
    ) -> Result<(), GenerationServiceError> {
        let orchestrator = self.orchestrator;
        let context = self.context;

        let mut unique: Vec<&CandidateStage> = Vec::new();
        for stage in &orchestrator.candidate_stages {
            if !unique.iter().any(|seen| seen.key == stage.key) {
                unique.push(stage);
            }
        }
        let mut calls = Vec::with_capacity(unique.len());
        for stage in &unique {
            self.enter(PipelineState::GeneratingCandidates(stage.label.clone()));
            calls.push(self.next_call());
        }

        let texts = try_join_all(unique.iter().copied().zip(calls).map(|(stage, call)| {
            orchestrator.generate(&stage.stage_name, call, stage.request(context, macro_text))
        }))
        .await?;

        for (stage, text) in unique.into_iter().zip(texts) {
            pools.insert(stage.key.clone(), text);
        }
        Ok(())
    }
}

/// Build the recommendation from filtered text without another call.
fn assemble_locally(
    plan: &PipelinePlan,
    macro_text: &str,
    filtered: &[(String, String)],
) -> AggregateRecommendation {
    let mut lists = CategorizedLists::new();
    for (name, text) in filtered {
        lists.insert(name.clone(), extract_line_items(text));
    }

    let guidance = plan.guidance.then(|| GuidanceText {
        do_eat: format!("{} {}", DO_EAT_TAG, macro_text),
        avoid: avoid_summary(plan, &lists),
    });
    let explanation = plan.explanation.then(|| macro_text.to_string());

    AggregateRecommendation {
        lists,
        guidance,
        explanation,
        origin: RecommendationOrigin::Generated,
    }
}

/// Names of the first few avoid-category items, without their macro annotations.
fn avoid_summary(plan: &PipelinePlan, lists: &CategorizedLists) -> String {
    let names: Vec<&str> = plan
        .categories
        .iter()
        .filter(|spec| spec.kind == CategoryKind::Avoid)
        .filter_map(|spec| lists.get(&spec.name))
        .flatten()
        .map(|item| item.as_str().split(" (").next().unwrap_or_default().trim())
        .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("n/a"))
        .take(3)
        .collect();

    if names.is_empty() {
        format!("{} nothing flagged for this activity", AVOID_TAG)
    } else {
        format!("{} {}", AVOID_TAG, names.join(", "))
    }
}
