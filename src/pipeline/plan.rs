//! Pipeline plan: which stages run, over which categories, with which cardinalities.
//!
//! A plan is plain data. Every recommendation variant (one big structured call, or a
//! macro stage followed by candidate generation and filtering per category) is a
//! plan value rather than a separate code path.

use crate::error::ApiError;
use crate::parser::{OutputShape, AVOID_KEY, DO_EAT_KEY, EXPLANATION_KEY};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineMode {
    /// One structured call carrying the whole output contract.
    OneShot,
    /// Macro stage, then generate/filter per category, then assembly.
    Chained,
}

impl FromStr for PipelineMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-shot" | "oneshot" => Ok(PipelineMode::OneShot),
            "chained" => Ok(PipelineMode::Chained),
            other => Err(ApiError::ConfigError(format!(
                "Invalid pipeline mode: {} (must be 'one-shot' or 'chained')",
                other
            ))),
        }
    }
}

/// Whether a category lists things to eat or things to stay away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Eat,
    Avoid,
}

/// Where a chained category draws its candidates from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CandidateSource {
    /// A pool generated for this category alone.
    Dedicated { pool_size: usize },
    /// A named pool generated once and filtered by several categories.
    Shared { pool: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    /// Output key, e.g. `best_foods`
    pub name: String,
    /// What belongs in the category, phrased for the model
    pub description: String,
    pub kind: CategoryKind,
    /// Requested item count. Requested, never enforced.
    pub target: usize,
    /// Chained mode only. Defaults to a dedicated pool of twice the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<CandidateSource>,
    /// Earlier categories whose filtered output this category is filtered against
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl CategorySpec {
    pub fn candidate_source(&self) -> CandidateSource {
        self.candidates
            .clone()
            .unwrap_or(CandidateSource::Dedicated {
                pool_size: self.target * 2,
            })
    }
}

/// Over-generated candidate pool shared between categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedPool {
    pub name: String,
    pub description: String,
    pub size: usize,
}

/// How chained mode turns filtered text into the final recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assembly {
    /// Extract line items locally; no further call.
    #[default]
    Local,
    /// One more call producing the full structured reply.
    Aggregate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePlan {
    pub mode: PipelineMode,
    pub categories: Vec<CategorySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_pools: Vec<SharedPool>,
    #[serde(default)]
    pub assembly: Assembly,
    /// Produce `do_eat` / `avoid` guidance text
    #[serde(default)]
    pub guidance: bool,
    /// Produce a free-text `explanation`
    #[serde(default)]
    pub explanation: bool,
}

/// Named plans covering the known recommendation variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    #[default]
    OneShot,
    OneShotExplained,
    Chained,
    ChainedShared,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::OneShot,
        Preset::OneShotExplained,
        Preset::Chained,
        Preset::ChainedShared,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::OneShot => "one-shot",
            Preset::OneShotExplained => "one-shot-explained",
            Preset::Chained => "chained",
            Preset::ChainedShared => "chained-shared",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Preset::ALL.iter().map(|p| p.as_str()).collect();
                ApiError::ConfigError(format!(
                    "Unknown preset: {} (expected one of {})",
                    s,
                    names.join(", ")
                ))
            })
    }
}

const EAT_DESCRIPTION: &str =
    "sensible snacks, drinks, or supplements that a 17-year-old could realistically find";
const AVOID_DESCRIPTION: &str = "foods or drinks that a 17-year-old should avoid";

fn category(
    name: &str,
    description: &str,
    kind: CategoryKind,
    target: usize,
    candidates: Option<CandidateSource>,
    depends_on: &[&str],
) -> CategorySpec {
    CategorySpec {
        name: name.to_string(),
        description: description.to_string(),
        kind,
        target,
        candidates,
        depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
    }
}

impl PipelinePlan {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::OneShot => Self {
                mode: PipelineMode::OneShot,
                categories: vec![
                    category("foods_to_eat", EAT_DESCRIPTION, CategoryKind::Eat, 15, None, &[]),
                    category(
                        "foods_to_avoid",
                        AVOID_DESCRIPTION,
                        CategoryKind::Avoid,
                        15,
                        None,
                        &[],
                    ),
                ],
                shared_pools: Vec::new(),
                assembly: Assembly::Local,
                guidance: true,
                explanation: false,
            },
            Preset::OneShotExplained => Self {
                guidance: false,
                explanation: true,
                ..Self::preset(Preset::OneShot)
            },
            Preset::Chained => {
                let pool = |size| Some(CandidateSource::Dedicated { pool_size: size });
                Self {
                    mode: PipelineMode::Chained,
                    categories: vec![
                        category(
                            "best_foods",
                            "the best snacks, drinks, or supplements to have before the activity",
                            CategoryKind::Eat,
                            10,
                            pool(20),
                            &[],
                        ),
                        category(
                            "ok_foods",
                            "acceptable options that are fine but not ideal",
                            CategoryKind::Eat,
                            10,
                            pool(20),
                            &["best_foods"],
                        ),
                        category(
                            "foods_to_avoid",
                            AVOID_DESCRIPTION,
                            CategoryKind::Avoid,
                            10,
                            pool(20),
                            &[],
                        ),
                    ],
                    shared_pools: Vec::new(),
                    assembly: Assembly::Local,
                    guidance: true,
                    explanation: false,
                }
            }
            Preset::ChainedShared => {
                let shared = Some(CandidateSource::Shared {
                    pool: "generic".to_string(),
                });
                Self {
                    mode: PipelineMode::Chained,
                    categories: vec![
                        category(
                            "best_foods",
                            "the best snacks, drinks, or supplements to have before the activity",
                            CategoryKind::Eat,
                            10,
                            shared.clone(),
                            &[],
                        ),
                        category(
                            "ok_foods",
                            "acceptable options that are fine but not ideal",
                            CategoryKind::Eat,
                            10,
                            shared,
                            &["best_foods"],
                        ),
                        category(
                            "foods_to_avoid",
                            AVOID_DESCRIPTION,
                            CategoryKind::Avoid,
                            10,
                            Some(CandidateSource::Dedicated { pool_size: 20 }),
                            &[],
                        ),
                    ],
                    shared_pools: vec![SharedPool {
                        name: "generic".to_string(),
                        description: EAT_DESCRIPTION.to_string(),
                        size: 30,
                    }],
                    assembly: Assembly::Aggregate,
                    guidance: true,
                    explanation: false,
                }
            }
        }
    }

    /// Keys the final structured reply must carry.
    pub fn output_shape(&self) -> OutputShape {
        OutputShape {
            categories: self.categories.iter().map(|c| c.name.clone()).collect(),
            guidance: self.guidance,
            explanation: self.explanation,
        }
    }

    pub fn category(&self, name: &str) -> Option<&CategorySpec> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn shared_pool(&self, name: &str) -> Option<&SharedPool> {
        self.shared_pools.iter().find(|p| p.name == name)
    }

    /// Number of generation calls one run issues when every stage succeeds.
    pub fn expected_calls(&self) -> usize {
        match self.mode {
            PipelineMode::OneShot => 1,
            PipelineMode::Chained => {
                let mut shared_used = HashSet::new();
                let mut dedicated = 0;
                for spec in &self.categories {
                    match spec.candidate_source() {
                        CandidateSource::Dedicated { .. } => dedicated += 1,
                        CandidateSource::Shared { pool } => {
                            shared_used.insert(pool);
                        }
                    }
                }
                let aggregate = usize::from(self.assembly == Assembly::Aggregate);
                1 + dedicated + shared_used.len() + self.categories.len() + aggregate
            }
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let invalid = |msg: String| Err(ApiError::InvalidPlan(msg));

        if self.categories.is_empty() {
            return invalid("plan must declare at least one category".to_string());
        }

        let reserved = [DO_EAT_KEY, AVOID_KEY, EXPLANATION_KEY];
        let mut seen: HashSet<&str> = HashSet::new();
        for spec in &self.categories {
            if spec.name.trim().is_empty() {
                return invalid("category name cannot be empty".to_string());
            }
            if reserved.contains(&spec.name.as_str()) {
                return invalid(format!(
                    "category name '{}' collides with a guidance key",
                    spec.name
                ));
            }
            if spec.target == 0 {
                return invalid(format!("category '{}' has a target of zero", spec.name));
            }
            for dep in &spec.depends_on {
                if !seen.contains(dep.as_str()) {
                    return invalid(format!(
                        "category '{}' depends on '{}', which is not declared before it",
                        spec.name, dep
                    ));
                }
            }
            if !seen.insert(spec.name.as_str()) {
                return invalid(format!("duplicate category '{}'", spec.name));
            }
        }

        match self.mode {
            PipelineMode::OneShot => {
                if self.categories.iter().any(|c| !c.depends_on.is_empty()) {
                    return invalid("one-shot plans cannot declare category dependencies".to_string());
                }
                if !self.shared_pools.is_empty() {
                    return invalid("one-shot plans cannot declare candidate pools".to_string());
                }
            }
            PipelineMode::Chained => self.validate_candidates()?,
        }
        Ok(())
    }

    fn validate_candidates(&self) -> Result<(), ApiError> {
        let mut pool_names = HashSet::new();
        for pool in &self.shared_pools {
            if !pool_names.insert(pool.name.as_str()) {
                return Err(ApiError::InvalidPlan(format!(
                    "duplicate candidate pool '{}'",
                    pool.name
                )));
            }
        }

        for spec in &self.categories {
            match spec.candidate_source() {
                CandidateSource::Dedicated { pool_size } => {
                    if pool_size <= spec.target {
                        return Err(ApiError::InvalidPlan(format!(
                            "category '{}' needs a candidate pool larger than its target ({} <= {})",
                            spec.name, pool_size, spec.target
                        )));
                    }
                }
                CandidateSource::Shared { pool } => {
                    // Shared pools are generated as eat pools
                    if spec.kind == CategoryKind::Avoid {
                        return Err(ApiError::InvalidPlan(format!(
                            "avoid category '{}' cannot draw from shared pool '{}'; give it a dedicated pool",
                            spec.name, pool
                        )));
                    }
                    let shared = self.shared_pool(&pool).ok_or_else(|| {
                        ApiError::InvalidPlan(format!(
                            "category '{}' uses unknown candidate pool '{}'",
                            spec.name, pool
                        ))
                    })?;
                    if shared.size <= spec.target {
                        return Err(ApiError::InvalidPlan(format!(
                            "pool '{}' is not larger than the target of '{}' ({} <= {})",
                            shared.name, spec.name, shared.size, spec.target
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_is_valid() {
        for preset in Preset::ALL {
            let plan = PipelinePlan::preset(preset);
            assert!(plan.validate().is_ok(), "preset {} should validate", preset);
        }
    }

    #[test]
    fn expected_calls_per_preset() {
        assert_eq!(PipelinePlan::preset(Preset::OneShot).expected_calls(), 1);
        // macro + 3 x (generate + filter)
        assert_eq!(PipelinePlan::preset(Preset::Chained).expected_calls(), 7);
        // macro + shared pool + avoid pool + 3 filters + aggregate
        assert_eq!(PipelinePlan::preset(Preset::ChainedShared).expected_calls(), 7);
    }

    #[test]
    fn shared_pool_needs_fewer_calls_than_dedicated_pools() {
        let mut plan = PipelinePlan::preset(Preset::ChainedShared);
        plan.assembly = Assembly::Local;
        assert_eq!(plan.expected_calls(), 6);
        assert!(plan.expected_calls() < 1 + 2 * plan.categories.len());
    }

    #[test]
    fn one_shot_shape_matches_original_keys() {
        let shape = PipelinePlan::preset(Preset::OneShot).output_shape();
        assert_eq!(shape.categories, vec!["foods_to_eat", "foods_to_avoid"]);
        assert!(shape.guidance);
        assert!(!shape.explanation);
    }

    #[test]
    fn dependency_must_be_declared_earlier() {
        let mut plan = PipelinePlan::preset(Preset::Chained);
        plan.categories.swap(0, 1);
        assert!(matches!(plan.validate(), Err(ApiError::InvalidPlan(_))));
    }

    #[test]
    fn candidate_pool_must_exceed_target() {
        let mut plan = PipelinePlan::preset(Preset::Chained);
        plan.categories[0].candidates = Some(CandidateSource::Dedicated { pool_size: 10 });
        assert!(plan.validate().is_err());

        let mut plan = PipelinePlan::preset(Preset::ChainedShared);
        plan.shared_pools[0].size = 5;
        assert!(plan.validate().is_err());
    }

    #[test]
    fn unknown_shared_pool_is_rejected() {
        let mut plan = PipelinePlan::preset(Preset::ChainedShared);
        plan.shared_pools.clear();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn avoid_category_cannot_use_shared_pool() {
        let mut plan = PipelinePlan::preset(Preset::ChainedShared);
        plan.categories[2].candidates = Some(CandidateSource::Shared {
            pool: "generic".to_string(),
        });
        match plan.validate() {
            Err(ApiError::InvalidPlan(message)) => {
                assert!(message.contains("foods_to_avoid"));
                assert!(message.contains("generic"));
            }
            other => panic!("expected invalid plan, got {:?}", other),
        }
    }

    #[test]
    fn one_shot_rejects_dependencies() {
        let mut plan = PipelinePlan::preset(Preset::OneShot);
        plan.categories[1].depends_on = vec!["foods_to_eat".to_string()];
        assert!(plan.validate().is_err());
    }

    #[test]
    fn reserved_and_duplicate_names_are_rejected() {
        let mut plan = PipelinePlan::preset(Preset::OneShot);
        plan.categories[0].name = "do_eat".to_string();
        assert!(plan.validate().is_err());

        let mut plan = PipelinePlan::preset(Preset::OneShot);
        plan.categories[1].name = "foods_to_eat".to_string();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn default_candidate_pool_is_twice_the_target() {
        let spec = category("x", "d", CategoryKind::Eat, 10, None, &[]);
        assert_eq!(
            spec.candidate_source(),
            CandidateSource::Dedicated { pool_size: 20 }
        );
    }

    #[test]
    fn preset_and_mode_parse_from_cli_names() {
        assert_eq!("chained-shared".parse::<Preset>().unwrap(), Preset::ChainedShared);
        assert!("three-step".parse::<Preset>().is_err());
        assert_eq!("one-shot".parse::<PipelineMode>().unwrap(), PipelineMode::OneShot);
        assert!("parallel".parse::<PipelineMode>().is_err());
    }

    #[test]
    fn plan_reads_from_toml() {
        let plan: PipelinePlan = toml::from_str(
            r#"
mode = "chained"
guidance = true

[[categories]]
name = "fuel"
description = "quick carbs"
kind = "eat"
target = 5
candidates = { source = "dedicated", pool_size = 12 }

[[categories]]
name = "skip"
description = "heavy food"
kind = "avoid"
target = 5
depends_on = ["fuel"]
"#,
        )
        .unwrap();
        assert_eq!(plan.assembly, Assembly::Local);
        assert_eq!(
            plan.categories[0].candidate_source(),
            CandidateSource::Dedicated { pool_size: 12 }
        );
        assert!(plan.validate().is_ok());
        assert_eq!(plan.expected_calls(), 5);
    }
}
