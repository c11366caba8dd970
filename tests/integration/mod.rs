//! Integration tests for the prefuel recommendation pipeline

mod config_layering;
mod pipeline_end_to_end;
mod provider_http;
