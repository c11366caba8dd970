//! Recommendation pipeline: plan and orchestrator.
//! The plan describes the stages; the orchestrator runs them against a generation client.

pub mod orchestrator;
pub mod plan;

pub use orchestrator::{Orchestrator, PipelineState};
pub use plan::{
    Assembly, CandidateSource, CategoryKind, CategorySpec, PipelineMode, PipelinePlan, Preset,
    SharedPool,
};
