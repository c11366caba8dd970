//! CLI output: error mapping from domain errors to the text printed on stderr.

use crate::error::{ApiError, GenerationServiceError};

/// Map domain/service errors to a string for CLI output, with a hint where one helps.
pub fn map_error(e: &ApiError) -> String {
    let hint = match e {
        ApiError::ProviderNotConfigured(_) => {
            Some("set the API key environment variable or provider.api_key in config")
        }
        ApiError::Generation(GenerationServiceError::AuthFailed(_)) => {
            Some("check that the configured API key is valid")
        }
        ApiError::Generation(GenerationServiceError::ModelNotFound(_)) => {
            Some("check provider.model in config")
        }
        _ => None,
    };
    match hint {
        Some(hint) => format!("Error: {}\nHint: {}", e, hint),
        None => format!("Error: {}", e),
    }
}
