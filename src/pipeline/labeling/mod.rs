pub mod types;
pub mod prompt;
pub mod ollama;
pub mod validation;

pub use types::*;
pub use prompt::*;
pub use ollama::*;
pub use validation::*;

use thiserror::Error;

/// Failures at the model boundary. Fatal to the row being labeled only,
/// except during producer construction where they abort the run.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Ollama is not running at {0}")]
    NotReachable(String),

    #[error("Ollama returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Model '{0}' is not installed in Ollama")]
    ModelNotFound(String),

    #[error("Invalid model name: '{0}'")]
    InvalidModelName(String),

    #[error("Only loopback model endpoints are allowed, got '{0}'")]
    NonLocalEndpoint(String),

    #[error("Invalid model endpoint URL: '{0}'")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Model returned an empty completion")]
    EmptyCompletion,
}

/// Why a completion was rejected as a label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Response is not a JSON object: {0}")]
    MalformedJson(String),

    #[error("Response is missing required keys: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },
}
