//! Recommendation data model
//!
//! Inputs and outputs of a pipeline run: the activity the user is preparing for,
//! and the categorized food lists plus guidance text assembled from the generation
//! service's replies. Everything here is immutable once built and never persisted.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Activities offered by the input surface. Free text outside this set is accepted.
pub const SUGGESTED_ACTIVITIES: [&str; 6] = [
    "basketball",
    "weightlifting",
    "pilates",
    "running",
    "swimming",
    "yoga",
];

/// Fixed emphasis tag carried at the start of the "what to eat" guidance.
pub const DO_EAT_TAG: &str = "**DO EAT**";

/// Fixed emphasis tag carried at the start of the "what to avoid" guidance.
pub const AVOID_TAG: &str = "**AVOID**";

/// What the user is about to do and how soon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityContext {
    activity: String,
    time_until_hours: f64,
}

impl ActivityContext {
    /// Build a context, rejecting a blank activity or a negative / non-finite time.
    pub fn new(activity: impl Into<String>, time_until_hours: f64) -> Result<Self, ApiError> {
        let activity = activity.into().trim().to_string();
        if activity.is_empty() {
            return Err(ApiError::InvalidContext(
                "activity cannot be empty".to_string(),
            ));
        }
        if !time_until_hours.is_finite() || time_until_hours < 0.0 {
            return Err(ApiError::InvalidContext(format!(
                "time until activity must be a non-negative number of hours, got {}",
                time_until_hours
            )));
        }
        Ok(Self {
            activity,
            time_until_hours,
        })
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    pub fn time_until_hours(&self) -> f64 {
        self.time_until_hours
    }
}

/// A food or drink name, optionally annotated with approximate macronutrient shares.
///
/// Opaque to the pipeline: the embedded percentages are never validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoodItem(String);

impl FoodItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FoodItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FoodItem {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One named category and its items, in the order the service produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryList {
    pub name: String,
    pub items: Vec<FoodItem>,
}

/// Category name to ordered items, keeping the category order of the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorizedLists {
    lists: Vec<CategoryList>,
}

impl CategorizedLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the items of a category. New categories go to the end.
    pub fn insert(&mut self, name: impl Into<String>, items: Vec<FoodItem>) {
        let name = name.into();
        match self.lists.iter_mut().find(|list| list.name == name) {
            Some(existing) => existing.items = items,
            None => self.lists.push(CategoryList { name, items }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[FoodItem]> {
        self.lists
            .iter()
            .find(|list| list.name == name)
            .map(|list| list.items.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryList> {
        self.lists.iter()
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.lists.iter().map(|list| list.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// True when every category holds zero items.
    pub fn all_empty(&self) -> bool {
        self.lists.iter().all(|list| list.items.is_empty())
    }
}

/// Short explanations of what to eat and what to avoid.
///
/// The `**DO EAT**` / `**AVOID**` tags, when present, are part of the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceText {
    pub do_eat: String,
    pub avoid: String,
}

/// Whether a recommendation came from a decoded reply or from the parse fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationOrigin {
    Generated,
    Fallback,
}

/// Final result handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecommendation {
    pub lists: CategorizedLists,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<GuidanceText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub origin: RecommendationOrigin,
}

impl AggregateRecommendation {
    pub fn is_fallback(&self) -> bool {
        self.origin == RecommendationOrigin::Fallback
    }
}
