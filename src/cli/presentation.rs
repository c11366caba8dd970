//! CLI presentation: text and json formatters.

use crate::config::PrefuelConfig;
use crate::error::ApiError;
use crate::recommendation::{
    AggregateRecommendation, CategoryList, AVOID_TAG, DO_EAT_TAG, SUGGESTED_ACTIVITIES,
};
use owo_colors::OwoColorize;
use std::path::Path;

/// Items shown per category before the remainder is summarized.
pub const PREVIEW_ITEMS: usize = 5;

pub fn format_recommendation_text(rec: &AggregateRecommendation, color: bool) -> String {
    let mut output = String::new();

    if rec.is_fallback() {
        let notice = "The model reply could not be parsed; showing the fallback result.";
        if color {
            output.push_str(&format!("{}\n\n", notice.yellow()));
        } else {
            output.push_str(&format!("{}\n\n", notice));
        }
    }

    if let Some(guidance) = &rec.guidance {
        output.push_str(&guidance_line(&guidance.do_eat, DO_EAT_TAG, "DO EAT", true, color));
        output.push_str(&guidance_line(&guidance.avoid, AVOID_TAG, "AVOID", false, color));
        output.push('\n');
    }

    if let Some(explanation) = &rec.explanation {
        output.push_str(explanation.trim());
        output.push_str("\n\n");
    }

    for list in rec.lists.iter() {
        output.push_str(&format_category(list, color));
    }

    output.trim_end().to_string()
}

/// One guidance line with its Markdown tag replaced by a colored label.
fn guidance_line(text: &str, tag: &str, label: &str, positive: bool, color: bool) -> String {
    let body = text.strip_prefix(tag).unwrap_or(text).trim();
    let label = if !color {
        label.to_string()
    } else if positive {
        label.green().bold().to_string()
    } else {
        label.red().bold().to_string()
    };
    format!("{}: {}\n", label, body)
}

fn format_category(list: &CategoryList, color: bool) -> String {
    let title = list.name.replace('_', " ");
    let mut output = if color {
        format!("{}\n", title.bold())
    } else {
        format!("{}\n", title)
    };

    if list.items.is_empty() {
        output.push_str("  (none)\n\n");
        return output;
    }
    for item in list.items.iter().take(PREVIEW_ITEMS) {
        output.push_str(&format!("  - {}\n", item));
    }
    if list.items.len() > PREVIEW_ITEMS {
        output.push_str(&format!("  (+{} more)\n", list.items.len() - PREVIEW_ITEMS));
    }
    output.push('\n');
    output
}

pub fn format_recommendation_json(rec: &AggregateRecommendation) -> Result<String, ApiError> {
    serde_json::to_string_pretty(rec)
        .map_err(|e| ApiError::Runtime(format!("Failed to render recommendation: {}", e)))
}

pub fn format_activities() -> String {
    let mut output = String::from("Suggested activities:\n");
    for activity in SUGGESTED_ACTIVITIES {
        output.push_str(&format!("  {}\n", activity));
    }
    output.push_str("\nAny other activity name is accepted as well.");
    output
}

pub fn format_config_text(config: &PrefuelConfig, source: Option<&Path>) -> Result<String, ApiError> {
    let origin = match source {
        Some(path) => format!("# Loaded from {}\n", path.display()),
        None => "# Resolved from defaults, config files and PREFUEL__* variables\n".to_string(),
    };
    Ok(format!("{}{}", origin, config.to_redacted_toml()?))
}
