//! Application state for the API server.

use std::sync::Arc;
use std::time::Duration;

use warden_core::Pipeline;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Prompt pipeline, shared read-only between requests.
    pub pipeline: Arc<Pipeline>,
    /// Upper bound for one pipeline run.
    pub request_timeout: Duration,
}

impl AppState {
    /// Creates a new application state around a pipeline.
    pub fn new(pipeline: Pipeline, request_timeout: Duration) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            request_timeout,
        }
    }
}
