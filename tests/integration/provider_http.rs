//! HTTP backends against stubbed services

use prefuel::error::GenerationServiceError;
use prefuel::pipeline::{Orchestrator, PipelinePlan, Preset};
use prefuel::provider::{
    AnthropicClient, GenerationClient, OpenAICompatibleClient, StageMessage,
};
use prefuel::recommendation::ActivityContext;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_client(server: &MockServer) -> OpenAICompatibleClient {
    OpenAICompatibleClient::new(
        "openai",
        "gpt-4o-mini".to_string(),
        Some("test-key".to_string()),
        server.uri(),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn chat_reply(content: &str) -> serde_json::Value {
    json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn messages() -> Vec<StageMessage> {
    vec![
        StageMessage::system("You are a helpful nutrition assistant."),
        StageMessage::user("What should I eat?"),
    ]
}

#[tokio::test]
async fn openai_reply_is_trimmed_and_request_carries_auth_and_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.5,
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("\n  Oats and a banana.  \n")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = openai_client(&server)
        .generate(messages(), 0.5)
        .await
        .unwrap();
    assert_eq!(reply.content, "Oats and a banana.");
    assert_eq!(reply.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn openai_status_codes_map_to_error_kinds() {
    let cases: [(u16, fn(&GenerationServiceError) -> bool); 5] = [
        (401, |e| matches!(e, GenerationServiceError::AuthFailed(_))),
        (403, |e| matches!(e, GenerationServiceError::AuthFailed(_))),
        (429, |e| matches!(e, GenerationServiceError::RateLimited(_))),
        (404, |e| matches!(e, GenerationServiceError::ModelNotFound(_))),
        (500, |e| matches!(e, GenerationServiceError::RequestFailed(_))),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = openai_client(&server)
            .generate(messages(), 0.7)
            .await
            .unwrap_err();
        assert!(expected(&err), "status {} mapped to {:?}", status, err);
    }
}

#[tokio::test]
async fn openai_empty_choices_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = openai_client(&server)
        .generate(messages(), 0.7)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationServiceError::Provider(_)));
}

#[tokio::test]
async fn anthropic_lifts_system_prompt_and_caps_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "anthropic-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-haiku-latest",
            "system": "You are a helpful nutrition assistant.",
            "temperature": 1.0,
            "messages": [{"role": "user", "content": "What should I eat?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "claude-3-5-haiku-latest",
            "content": [{"type": "text", "text": "Rice cakes."}],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::new(
        "claude-3-5-haiku-latest".to_string(),
        "anthropic-key".to_string(),
        Some(server.uri()),
        Duration::from_secs(5),
    )
    .unwrap();
    let reply = client.generate(messages(), 1.6).await.unwrap();
    assert_eq!(reply.content, "Rice cakes.");
    assert_eq!(client.provider_name(), "anthropic");
}

#[tokio::test]
async fn anthropic_rate_limit_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let client = AnthropicClient::new(
        "claude".to_string(),
        "key".to_string(),
        Some(server.uri()),
        Duration::from_secs(5),
    )
    .unwrap();
    let err = client.generate(messages(), 0.7).await.unwrap_err();
    assert!(matches!(err, GenerationServiceError::RateLimited(_)));
}

#[tokio::test]
async fn one_shot_pipeline_over_http() {
    let eat: Vec<String> = (1..=15).map(|i| format!("Snack {}", i)).collect();
    let avoid: Vec<String> = (1..=15).map(|i| format!("Heavy {}", i)).collect();
    let content = json!({
        "foods_to_eat": eat,
        "foods_to_avoid": avoid,
        "do_eat": "**DO EAT** mostly carbohydrates",
        "avoid": "**AVOID** greasy food"
    })
    .to_string();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(&format!(
            "```json\n{}\n```",
            content
        ))))
        .expect(1)
        .mount(&server)
        .await;

    let client: Arc<dyn GenerationClient> = Arc::new(openai_client(&server));
    let orchestrator =
        Orchestrator::new(client, PipelinePlan::preset(Preset::OneShot), 0.7).unwrap();
    let rec = orchestrator
        .run(&ActivityContext::new("running", 1.0).unwrap())
        .await
        .unwrap();

    assert!(!rec.is_fallback());
    assert_eq!(rec.lists.get("foods_to_eat").unwrap().len(), 15);
    assert_eq!(rec.lists.get("foods_to_avoid").unwrap().len(), 15);
}
