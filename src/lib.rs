//! Prefuel: pre-activity food recommendations
//!
//! Turns an activity and the hours until it starts into categorized lists of foods
//! to eat and to avoid, plus short guidance text, by running a plan of prompt stages
//! against a text-generation service and parsing what comes back.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod recommendation;
