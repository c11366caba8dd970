//! Whole-pipeline runs against the scripted client

use prefuel::error::GenerationServiceError;
use prefuel::pipeline::{Orchestrator, PipelinePlan, PipelineState, Preset};
use prefuel::provider::{GenerationClient, ScriptedClient};
use prefuel::recommendation::ActivityContext;
use serde_json::json;
use std::sync::Arc;

fn bulleted(prefix: &str, n: usize) -> String {
    (1..=n)
        .map(|i| format!("- {} {} (approx. 80% carbs / 10% fat / 10% protein)", prefix, i))
        .collect::<Vec<_>>()
        .join("\n")
}

fn orchestrator(client: &Arc<ScriptedClient>, plan: PipelinePlan) -> Orchestrator {
    let client: Arc<dyn GenerationClient> = client.clone();
    Orchestrator::new(client, plan, 0.7).unwrap()
}

#[tokio::test]
async fn one_shot_running_in_an_hour() {
    let reply = json!({
        "foods_to_eat": (1..=15).map(|i| format!("Snack {}", i)).collect::<Vec<_>>(),
        "foods_to_avoid": (1..=15).map(|i| format!("Heavy {}", i)).collect::<Vec<_>>(),
        "do_eat": "**DO EAT** about 70% carbohydrates, 10% fat, 20% protein",
        "avoid": "**AVOID** heavy, greasy, or sugary foods"
    })
    .to_string();
    let client = Arc::new(ScriptedClient::with_replies([reply]));

    let rec = orchestrator(&client, PipelinePlan::preset(Preset::OneShot))
        .run(&ActivityContext::new("running", 1.0).unwrap())
        .await
        .unwrap();

    assert_eq!(client.call_count(), 1);
    assert_eq!(rec.lists.get("foods_to_eat").unwrap().len(), 15);
    assert_eq!(rec.lists.get("foods_to_avoid").unwrap().len(), 15);
    let guidance = rec.guidance.unwrap();
    assert_eq!(
        guidance.do_eat,
        "**DO EAT** about 70% carbohydrates, 10% fat, 20% protein"
    );
    assert_eq!(guidance.avoid, "**AVOID** heavy, greasy, or sugary foods");

    let request = client.requests()[0].user_text();
    assert!(request.contains("Activity: running"));
    assert!(request.contains("1.0 hours"));
}

#[tokio::test]
async fn chained_preset_runs_seven_stages_with_ten_items_each() {
    let macro_text = "Roughly 65% carbohydrate, 15% fat and 20% protein.";
    let client = Arc::new(ScriptedClient::with_replies(vec![
        macro_text.to_string(),
        bulleted("Best", 20),
        bulleted("Best", 10),
        bulleted("Ok", 20),
        bulleted("Ok", 10),
        bulleted("Avoid", 20),
        bulleted("Avoid", 10),
    ]));

    let (result, states) = orchestrator(&client, PipelinePlan::preset(Preset::Chained))
        .run_traced(&ActivityContext::new("swimming", 2.0).unwrap())
        .await;
    let rec = result.unwrap();

    assert_eq!(client.call_count(), 7);
    for name in ["best_foods", "ok_foods", "foods_to_avoid"] {
        assert_eq!(rec.lists.get(name).unwrap().len(), 10, "{}", name);
    }
    assert_eq!(
        rec.lists.get("best_foods").unwrap()[0].as_str(),
        "Best 1 (approx. 80% carbs / 10% fat / 10% protein)"
    );
    assert!(rec.guidance.unwrap().do_eat.contains(macro_text));
    assert_eq!(states.first(), Some(&PipelineState::Idle));
    assert_eq!(states.last(), Some(&PipelineState::Done));
}

#[tokio::test]
async fn short_filtered_lists_are_not_padded() {
    let client = Arc::new(ScriptedClient::with_replies(vec![
        "M".to_string(),
        bulleted("Best", 20),
        "- Banana\n- N/A".to_string(),
        bulleted("Ok", 20),
        "- Yogurt".to_string(),
        bulleted("Avoid", 20),
        String::new(),
    ]));

    let rec = orchestrator(&client, PipelinePlan::preset(Preset::Chained))
        .run(&ActivityContext::new("yoga", 0.0).unwrap())
        .await
        .unwrap();

    let best: Vec<&str> = rec
        .lists
        .get("best_foods")
        .unwrap()
        .iter()
        .map(|item| item.as_str())
        .collect();
    assert_eq!(best, vec!["Banana", "N/A"]);
    assert_eq!(rec.lists.get("ok_foods").unwrap().len(), 1);
    assert!(rec.lists.get("foods_to_avoid").unwrap().is_empty());
    assert_eq!(
        rec.guidance.unwrap().avoid,
        "**AVOID** nothing flagged for this activity"
    );
}

#[tokio::test]
async fn explained_variant_returns_explanation_without_guidance() {
    let reply = json!({
        "foods_to_eat": ["Toast"],
        "foods_to_avoid": ["Fries"],
        "explanation": "Fast carbohydrates digest quickly."
    })
    .to_string();
    let client = Arc::new(ScriptedClient::with_replies([reply]));

    let rec = orchestrator(&client, PipelinePlan::preset(Preset::OneShotExplained))
        .run(&ActivityContext::new("basketball", 3.0).unwrap())
        .await
        .unwrap();

    assert!(rec.guidance.is_none());
    assert_eq!(
        rec.explanation.as_deref(),
        Some("Fast carbohydrates digest quickly.")
    );
}

#[tokio::test]
async fn custom_plan_from_toml_drives_the_pipeline() {
    let plan: PipelinePlan = toml::from_str(
        r#"
mode = "chained"
explanation = true

[[categories]]
name = "fuel"
description = "fast carbohydrates"
kind = "eat"
target = 3
candidates = { source = "dedicated", pool_size = 6 }
"#,
    )
    .unwrap();
    let client = Arc::new(ScriptedClient::with_replies(vec![
        "Mostly carbohydrates.".to_string(),
        bulleted("Fuel", 6),
        bulleted("Fuel", 3),
    ]));

    let rec = orchestrator(&client, plan)
        .run(&ActivityContext::new("cycling", 0.5).unwrap())
        .await
        .unwrap();

    assert_eq!(client.call_count(), 3);
    assert_eq!(rec.lists.category_names(), vec!["fuel"]);
    assert_eq!(rec.explanation.as_deref(), Some("Mostly carbohydrates."));
    assert!(rec.guidance.is_none());
    assert!(client.requests()[2].user_text().contains("0.5 hours"));
}

#[tokio::test]
async fn failure_mid_pipeline_yields_no_partial_result() {
    let client = Arc::new(ScriptedClient::new(vec![
        Ok("M".to_string()),
        Ok(bulleted("Generic", 30)),
        Ok(bulleted("Best", 10)),
        Err(GenerationServiceError::RateLimited("slow down".to_string())),
    ]));

    let result = orchestrator(&client, PipelinePlan::preset(Preset::ChainedShared))
        .run(&ActivityContext::new("running", 1.0).unwrap())
        .await;

    assert!(matches!(result, Err(GenerationServiceError::RateLimited(_))));
    assert_eq!(client.call_count(), 4);
}
