//! Structured reply parsing
//!
//! Decodes the final stage's reply into an [`AggregateRecommendation`]. A reply
//! that does not decode into the expected shape never becomes an error: it becomes
//! the fallback recommendation, whose lists are empty and whose text fields say that
//! parsing failed. Item counts are passed through exactly as produced.

use crate::recommendation::{
    AggregateRecommendation, CategorizedLists, FoodItem, GuidanceText, RecommendationOrigin,
    AVOID_TAG, DO_EAT_TAG,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub mod line_items;

pub use line_items::extract_line_items;

pub const DO_EAT_KEY: &str = "do_eat";
pub const AVOID_KEY: &str = "avoid";
pub const EXPLANATION_KEY: &str = "explanation";

/// Exact key set a structured reply is expected to carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputShape {
    /// List-valued keys, in display order
    pub categories: Vec<String>,
    /// `do_eat` and `avoid` text keys
    pub guidance: bool,
    /// `explanation` text key
    pub explanation: bool,
}

impl OutputShape {
    /// Every key the reply must contain, lists first.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.categories.iter().map(String::as_str).collect();
        if self.guidance {
            keys.push(DO_EAT_KEY);
            keys.push(AVOID_KEY);
        }
        if self.explanation {
            keys.push(EXPLANATION_KEY);
        }
        keys
    }

    /// Recommendation used when a reply cannot be decoded.
    pub fn fallback(&self, reason: &str) -> AggregateRecommendation {
        let mut lists = CategorizedLists::new();
        for name in &self.categories {
            lists.insert(name.clone(), Vec::new());
        }
        AggregateRecommendation {
            lists,
            guidance: self.guidance.then(|| GuidanceText {
                do_eat: format!("{} (error parsing output)", DO_EAT_TAG),
                avoid: format!("{} (error parsing output)", AVOID_TAG),
            }),
            explanation: self
                .explanation
                .then(|| format!("Error parsing output: {}", reason)),
            origin: RecommendationOrigin::Fallback,
        }
    }
}

/// Why a reply did not match its shape. Only ever logged and folded into the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShapeError {
    Syntax(String),
    NotAnObject,
    MissingKey(String),
    WrongType { key: String, expected: &'static str },
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeError::Syntax(msg) => write!(f, "reply is not valid JSON ({})", msg),
            ShapeError::NotAnObject => write!(f, "reply is not a JSON object"),
            ShapeError::MissingKey(key) => write!(f, "missing key '{}'", key),
            ShapeError::WrongType { key, expected } => {
                write!(f, "key '{}' is not {}", key, expected)
            }
        }
    }
}

/// Decode `reply` against `shape`, falling back on any mismatch.
pub fn parse(reply: &str, shape: &OutputShape) -> AggregateRecommendation {
    match decode(reply, shape) {
        Ok(recommendation) => recommendation,
        Err(err) => {
            warn!(error = %err, reply_len = reply.len(), "Structured reply did not match expected shape");
            shape.fallback(&err.to_string())
        }
    }
}

fn decode(reply: &str, shape: &OutputShape) -> Result<AggregateRecommendation, ShapeError> {
    let body = strip_code_fence(reply);
    let value: Value =
        serde_json::from_str(body).map_err(|e| ShapeError::Syntax(e.to_string()))?;
    let object = value.as_object().ok_or(ShapeError::NotAnObject)?;

    let mut lists = CategorizedLists::new();
    for name in &shape.categories {
        lists.insert(name.clone(), string_list(object, name)?);
    }

    let guidance = if shape.guidance {
        Some(GuidanceText {
            do_eat: string_field(object, DO_EAT_KEY)?,
            avoid: string_field(object, AVOID_KEY)?,
        })
    } else {
        None
    };

    let explanation = if shape.explanation {
        Some(string_field(object, EXPLANATION_KEY)?)
    } else {
        None
    };

    Ok(AggregateRecommendation {
        lists,
        guidance,
        explanation,
        origin: RecommendationOrigin::Generated,
    })
}

fn string_list(object: &Map<String, Value>, key: &str) -> Result<Vec<FoodItem>, ShapeError> {
    let wrong_type = || ShapeError::WrongType {
        key: key.to_string(),
        expected: "a list of strings",
    };
    let items = object
        .get(key)
        .ok_or_else(|| ShapeError::MissingKey(key.to_string()))?
        .as_array()
        .ok_or_else(wrong_type)?;
    items
        .iter()
        .map(|item| item.as_str().map(FoodItem::new).ok_or_else(wrong_type))
        .collect()
}

fn string_field(object: &Map<String, Value>, key: &str) -> Result<String, ShapeError> {
    object
        .get(key)
        .ok_or_else(|| ShapeError::MissingKey(key.to_string()))?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ShapeError::WrongType {
            key: key.to_string(),
            expected: "a string",
        })
}

/// Remove one surrounding Markdown code fence (```` ```json ... ``` ````), if present.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => {
            let inner = inner.trim();
            inner
                .strip_prefix("json")
                .or_else(|| inner.strip_prefix("JSON"))
                .unwrap_or(inner)
                .trim()
        }
    }
}
