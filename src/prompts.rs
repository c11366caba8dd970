//! Prompt templates, one per pipeline stage.
//!
//! Pure functions from pipeline inputs (and earlier stages' raw text) to the
//! role-tagged messages of one request. Each template states the exact reply shape
//! it expects: a JSON object with a fixed key set, a short paragraph, or a bulleted
//! list with a fixed number of lines.

use crate::parser::{AVOID_KEY, DO_EAT_KEY, EXPLANATION_KEY};
use crate::pipeline::plan::{CategoryKind, CategorySpec, PipelinePlan};
use crate::provider::StageMessage;
use crate::recommendation::{ActivityContext, AVOID_TAG, DO_EAT_TAG};

const ADVISOR_SYSTEM_PROMPT: &str =
    "You are a helpful nutrition assistant that provides meal guidance.";

const LIST_LINE_FORMAT: &str =
    "Name (approx. C% carbs / F% fat / P% protein), e.g. \"Banana (approx. 90% carbs / 3% fat / 7% protein)\"";

/// What a candidate-generation stage is producing a pool for.
#[derive(Debug, Clone, Copy)]
pub struct CandidateSubject<'a> {
    pub label: &'a str,
    pub description: &'a str,
    pub kind: CategoryKind,
}

impl<'a> From<&'a CategorySpec> for CandidateSubject<'a> {
    fn from(spec: &'a CategorySpec) -> Self {
        Self {
            label: &spec.name,
            description: &spec.description,
            kind: spec.kind,
        }
    }
}

/// Render hours the way a person would read them ("1.0", "0.25", "2.5").
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{:.1}", hours)
    } else {
        format!("{}", hours)
    }
}

fn context_lines(context: &ActivityContext) -> String {
    format!(
        "Activity: {}\nTime until activity: {} hours",
        context.activity(),
        format_hours(context.time_until_hours())
    )
}

fn request(user: String) -> Vec<StageMessage> {
    vec![
        StageMessage::system(ADVISOR_SYSTEM_PROMPT),
        StageMessage::user(user),
    ]
}

/// Numbered key contract shared by the one-shot and aggregation stages.
fn key_contract(plan: &PipelinePlan) -> String {
    let shape = plan.output_shape();
    let quoted: Vec<String> = shape.keys().iter().map(|k| format!("'{}'", k)).collect();
    let mut out = format!(
        "Output a JSON object with exactly {} keys: {}.\n",
        quoted.len(),
        quoted.join(", ")
    );

    let mut n = 0;
    let mut line = |text: String| {
        n += 1;
        out.push_str(&format!("{}) {}\n", n, text));
    };
    for spec in &plan.categories {
        line(format!(
            "'{}': a list of {} {}. Format each entry as {}.",
            spec.name, spec.target, spec.description, LIST_LINE_FORMAT
        ));
    }
    if shape.guidance {
        line(format!(
            "'{}': a short text with recommended macronutrient ratios/percentages, prefixed with '{}'.",
            DO_EAT_KEY, DO_EAT_TAG
        ));
        line(format!(
            "'{}': a short text description of foods to avoid (like 'heavy, greasy, or sugary'), prefixed with '{}'.",
            AVOID_KEY, AVOID_TAG
        ));
    }
    if shape.explanation {
        line(format!(
            "'{}': two or three sentences explaining the reasoning behind the lists.",
            EXPLANATION_KEY
        ));
    }

    let counts: Vec<String> = plan
        .categories
        .iter()
        .map(|spec| format!("'{}' has exactly {} items", spec.name, spec.target))
        .collect();
    out.push_str(&format!(
        "Be sure {}. Return only valid JSON: no extra keys, no extra commentary, no code fences.",
        counts.join(" and ")
    ));
    out
}

/// Single-call prompt embedding the whole output contract.
pub fn one_shot(context: &ActivityContext, plan: &PipelinePlan) -> Vec<StageMessage> {
    request(format!(
        "You are a nutrition advisor. Given the following activity and time until that activity, \
         provide guidance on what to consume.\n{}\n\n{}\n\nRemember to return only valid JSON.",
        key_contract(plan),
        context_lines(context)
    ))
}

/// Macronutrient ratio advice in plain text.
pub fn macro_ratio(context: &ActivityContext) -> Vec<StageMessage> {
    request(format!(
        "Given the activity and the time until it starts, recommend the approximate \
         macronutrient ratio (carbohydrate / fat / protein percentages) to aim for in anything \
         eaten or drunk beforehand. Answer in two or three plain sentences. No lists, no JSON.\n\n{}",
        context_lines(context)
    ))
}

/// Over-generated, unfiltered candidate list of `pool_size` lines.
pub fn candidates(
    context: &ActivityContext,
    macro_text: &str,
    subject: CandidateSubject<'_>,
    pool_size: usize,
) -> Vec<StageMessage> {
    let mut user = format!(
        "Macronutrient recommendation:\n{}\n\n",
        macro_text
    );
    match subject.kind {
        CategoryKind::Eat => {
            user.push_str(&format!("{}\n\n", context_lines(context)));
            user.push_str(&format!(
                "List {} candidate {} that fit the recommendation above.\n",
                pool_size, subject.description
            ));
        }
        CategoryKind::Avoid => {
            user.push_str(&format!(
                "List {} candidate {} because they conflict with the recommendation above \
                 (for example heavy, greasy, or very sugary).\n",
                pool_size, subject.description
            ));
        }
    }
    user.push_str(&format!(
        "Return a bulleted list of exactly {} lines for '{}'. Each line: \"- {}\". \
         No headings, no numbering, no commentary.",
        pool_size, subject.label, LIST_LINE_FORMAT
    ));
    request(user)
}

/// Narrow a candidate pool down to `spec.target` lines.
///
/// `dependencies` pairs an earlier category's name with its filtered text.
pub fn filter(
    context: &ActivityContext,
    macro_text: &str,
    spec: &CategorySpec,
    pool_text: &str,
    dependencies: &[(&str, &str)],
) -> Vec<StageMessage> {
    let (selection, ordering) = match spec.kind {
        CategoryKind::Eat => ("align best with", "most aligned first"),
        CategoryKind::Avoid => ("conflict most with", "strongest conflict first"),
    };
    let mut user = format!(
        "Macronutrient recommendation:\n{}\n\n{}\n\nCandidates:\n{}\n\n",
        macro_text,
        context_lines(context),
        pool_text
    );
    for (name, text) in dependencies {
        user.push_str(&format!(
            "Already listed under '{}':\n{}\n\n",
            name, text
        ));
    }
    user.push_str(&format!(
        "Choose exactly {} candidates for '{}' ({}) that {} the recommendation, {}. ",
        spec.target, spec.name, spec.description, selection, ordering
    ));
    if !dependencies.is_empty() {
        user.push_str(
            "Do not repeat anything already listed above and skip anything that could be \
             confused with those items. ",
        );
    }
    user.push_str(&format!(
        "Copy the chosen lines unchanged and return a bulleted list of exactly {} lines. \
         If fewer candidates qualify, fill the remaining lines with \"- N/A\". No commentary.",
        spec.target
    ));
    request(user)
}

/// Final structured reply built from every earlier free-text artifact.
///
/// `filtered` pairs each category name with its filtered text, in plan order.
pub fn aggregate(
    context: &ActivityContext,
    macro_text: &str,
    filtered: &[(&str, &str)],
    plan: &PipelinePlan,
) -> Vec<StageMessage> {
    let mut user = format!(
        "{}\n\nMacronutrient recommendation:\n{}\n\n",
        context_lines(context),
        macro_text
    );
    for (name, text) in filtered {
        user.push_str(&format!("'{}':\n{}\n\n", name, text));
    }
    user.push_str(
        "Combine the lists above into one result. Copy list entries as given, without the \
         bullet markers.\n",
    );
    user.push_str(&key_contract(plan));
    request(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::plan::Preset;
    use crate::provider::MessageRole;

    fn ctx() -> ActivityContext {
        ActivityContext::new("running", 1.0).unwrap()
    }

    fn user_text(messages: &[StageMessage]) -> &str {
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].role, MessageRole::User);
        &messages[1].content
    }

    #[test]
    fn hours_render_with_a_decimal() {
        assert_eq!(format_hours(1.0), "1.0");
        assert_eq!(format_hours(0.25), "0.25");
        assert_eq!(format_hours(0.0), "0.0");
    }

    #[test]
    fn one_shot_enumerates_every_key_and_cardinality() {
        let plan = PipelinePlan::preset(Preset::OneShot);
        let messages = one_shot(&ctx(), &plan);
        let text = user_text(&messages);

        assert!(text.contains("exactly 4 keys"));
        for key in ["'foods_to_eat'", "'foods_to_avoid'", "'do_eat'", "'avoid'"] {
            assert!(text.contains(key), "missing {}", key);
        }
        assert!(text.contains("a list of 15"));
        assert!(text.contains("**DO EAT**"));
        assert!(text.contains("**AVOID**"));
        assert!(text.contains("no extra keys"));
        assert!(text.contains("Activity: running"));
        assert!(text.contains("Time until activity: 1.0 hours"));
    }

    #[test]
    fn one_shot_explained_asks_for_explanation_not_guidance() {
        let plan = PipelinePlan::preset(Preset::OneShotExplained);
        let text = user_text(&one_shot(&ctx(), &plan)).to_string();
        assert!(text.contains("exactly 3 keys"));
        assert!(text.contains("'explanation'"));
        assert!(!text.contains("'do_eat'"));
    }

    #[test]
    fn macro_ratio_is_plain_text_from_context_alone() {
        let messages = macro_ratio(&ctx());
        let text = user_text(&messages);
        assert!(text.contains("Activity: running"));
        assert!(text.contains("No lists, no JSON"));
    }

    #[test]
    fn candidates_embed_macro_text_verbatim_and_pool_size() {
        let plan = PipelinePlan::preset(Preset::Chained);
        let macro_text = "Aim for 70% carbs, 10% fat, 20% protein.";
        let messages = candidates(&ctx(), macro_text, (&plan.categories[0]).into(), 20);
        let text = user_text(&messages);
        assert!(text.contains(macro_text));
        assert!(text.contains("exactly 20 lines"));
        assert!(text.contains("'best_foods'"));
    }

    #[test]
    fn avoid_candidates_see_only_the_macro_text() {
        let plan = PipelinePlan::preset(Preset::Chained);
        let avoid = plan.category("foods_to_avoid").unwrap();
        let messages = candidates(&ctx(), "M", avoid.into(), 20);
        let text = user_text(&messages);
        assert!(text.contains("Macronutrient recommendation:\nM\n"));
        assert!(!text.contains("Activity:"));
    }

    #[test]
    fn filter_embeds_pool_and_dependency_text() {
        let plan = PipelinePlan::preset(Preset::Chained);
        let ok = plan.category("ok_foods").unwrap();
        let messages = filter(
            &ctx(),
            "M",
            ok,
            "- a\n- b",
            &[("best_foods", "- banana\n- oats")],
        );
        let text = user_text(&messages);
        assert!(text.contains("Candidates:\n- a\n- b"));
        assert!(text.contains("Already listed under 'best_foods':\n- banana\n- oats"));
        assert!(text.contains("Choose exactly 10"));
        assert!(text.contains("N/A"));
        assert!(text.contains("Do not repeat"));
    }

    #[test]
    fn filter_ordering_follows_category_kind() {
        let plan = PipelinePlan::preset(Preset::Chained);
        let best = user_text(&filter(&ctx(), "M", plan.category("best_foods").unwrap(), "- a", &[]))
            .to_string();
        assert!(best.contains("align best with the recommendation, most aligned first"));

        let avoid = user_text(&filter(
            &ctx(),
            "M",
            plan.category("foods_to_avoid").unwrap(),
            "- a",
            &[],
        ))
        .to_string();
        assert!(avoid.contains("conflict most with the recommendation, strongest conflict first"));
        assert!(!avoid.contains("most aligned"));
    }

    #[test]
    fn aggregate_carries_artifacts_and_full_key_set() {
        let plan = PipelinePlan::preset(Preset::ChainedShared);
        let messages = aggregate(
            &ctx(),
            "M",
            &[("best_foods", "- x"), ("ok_foods", "- y"), ("foods_to_avoid", "- z")],
            &plan,
        );
        let text = user_text(&messages);
        assert!(text.contains("'ok_foods':\n- y"));
        assert!(text.contains("exactly 5 keys"));
        assert!(text.contains("Return only valid JSON"));
    }

    #[test]
    fn templates_are_deterministic() {
        let plan = PipelinePlan::preset(Preset::OneShot);
        assert_eq!(one_shot(&ctx(), &plan), one_shot(&ctx(), &plan));
    }
}
