//! Scripted generation client for tests and offline runs.
//!
//! Replays a fixed list of outcomes in order and records every request it receives.

use super::{GenerationClient, GenerationReply, StageMessage};
use crate::error::GenerationServiceError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A request as seen by the scripted client
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<StageMessage>,
    pub temperature: f32,
}

impl RecordedRequest {
    /// Concatenated content of every message, for substring assertions.
    pub fn text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Content of the user-instruction messages only.
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == super::MessageRole::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct ScriptedClient {
    outcomes: Mutex<VecDeque<Result<String, GenerationServiceError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    model_name: String,
}

impl ScriptedClient {
    pub fn new(outcomes: Vec<Result<String, GenerationServiceError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            model_name: "scripted".to_string(),
        }
    }

    /// Client that answers every call successfully, in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(
        &self,
        messages: Vec<StageMessage>,
        temperature: f32,
    ) -> Result<GenerationReply, GenerationServiceError> {
        self.requests.lock().push(RecordedRequest {
            messages,
            temperature,
        });
        let next = self.outcomes.lock().pop_front();
        match next {
            Some(Ok(text)) => Ok(GenerationReply::new(
                &text,
                self.model_name.clone(),
                Some("stop".to_string()),
            )),
            Some(Err(err)) => Err(err),
            None => Err(GenerationServiceError::Provider(
                "scripted client has no reply left".to_string(),
            )),
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
