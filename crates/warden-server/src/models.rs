//! API request and response models.

use serde::{Deserialize, Serialize};

/// Request body for the prompt endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PromptRequest {
    /// The prompt text. Missing and `null` are treated as empty.
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
