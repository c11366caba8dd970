//! CLI domain: parse, route, output, and presentation only.
//! No pipeline logic; the route table hands requests to the orchestrator.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat, RecommendArgs};
pub use presentation::{
    format_activities, format_config_text, format_recommendation_json,
    format_recommendation_text, PREVIEW_ITEMS,
};
pub use route::RunContext;
