//! Remote prompt rewriting.
//!
//! [`Rewriter`] never fails: when the remote service errors, times out or
//! answers with nothing, the input text comes back unchanged and the
//! fallback is visible only through [`Rewrite::fell_back`] and the logs.

mod azure;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use azure::{AzureOpenAi, AzureOpenAiConfig};

use crate::upstream::{with_retry, RetryConfig, UpstreamError};

const CLARIFY_INSTRUCTIONS: &str = "Corrige los errores ortográficos y gramaticales en la \
pregunta del usuario sin cambiar su significado original. No elimines ni reemplaces palabras \
clave, nombres propios ni términos técnicos como 'AI', 'inteligencia artificial', 'machine \
learning', 'EE.UU.', 'CIA', 'datos' o 'seguridad'. Si la pregunta es confusa, corrige la \
gramática y la ortografía pero mantén el significado. Devuelve únicamente la pregunta \
corregida, sin explicaciones ni comentarios adicionales.";

const SANITIZE_INSTRUCTIONS: &str = "Eres un asistente que reformula preguntas para que sean \
éticas y seguras. Conserva la intención legítima del usuario, elimina insultos, lenguaje \
ofensivo y cualquier solicitud de contenido dañino. Devuelve únicamente la pregunta \
reformulada, sin explicaciones ni comentarios adicionales.";

/// What a rewrite is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    /// Grammar and clarity fixes on a non-risky prompt.
    Clarify,
    /// Ethical reformulation of a flagged prompt.
    Sanitize,
}

impl RewriteMode {
    pub fn name(&self) -> &'static str {
        match self {
            RewriteMode::Clarify => "clarify",
            RewriteMode::Sanitize => "sanitize",
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            RewriteMode::Clarify => CLARIFY_INSTRUCTIONS,
            RewriteMode::Sanitize => SANITIZE_INSTRUCTIONS,
        }
    }

    pub fn user_text(&self, text: &str) -> String {
        match self {
            RewriteMode::Clarify => text.to_string(),
            RewriteMode::Sanitize => {
                format!("Reformula esta pregunta para que sea ética y segura: {}", text)
            }
        }
    }

    pub fn params(&self) -> CompletionParams {
        match self {
            RewriteMode::Clarify => CompletionParams {
                temperature: 0.1,
                max_tokens: 120,
            },
            RewriteMode::Sanitize => CompletionParams {
                temperature: 0.2,
                max_tokens: 150,
            },
        }
    }
}

/// Sampling parameters for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A single chat completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_instructions: &'static str,
    pub user_text: String,
    pub params: CompletionParams,
}

impl CompletionRequest {
    pub fn for_mode(mode: RewriteMode, text: &str) -> Self {
        Self {
            system_instructions: mode.instructions(),
            user_text: mode.user_text(text),
            params: mode.params(),
        }
    }
}

/// Remote text-completion capability.
#[async_trait]
pub trait RewriteService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError>;

    fn name(&self) -> &'static str;
}

/// Result of a rewrite attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// True when the input was returned because the service failed.
    pub fell_back: bool,
}

/// Fail-open rewriting client over a [`RewriteService`].
#[derive(Clone)]
pub struct Rewriter {
    service: Arc<dyn RewriteService>,
    retry: RetryConfig,
}

impl Rewriter {
    pub fn new(service: Arc<dyn RewriteService>, retry: RetryConfig) -> Self {
        Self { service, retry }
    }

    pub async fn rewrite(&self, text: &str, mode: RewriteMode) -> Rewrite {
        let service = self.service.as_ref();
        let request = CompletionRequest::for_mode(mode, text);

        match with_retry(&self.retry, service.name(), || service.complete(&request)).await {
            Ok(output) if !output.trim().is_empty() => {
                debug!(mode = mode.name(), "Rewrite complete");
                Rewrite {
                    text: output.trim().to_string(),
                    fell_back: false,
                }
            }
            Ok(_) => {
                warn!(mode = mode.name(), "Rewrite returned empty text, keeping input");
                Self::fallback(text)
            }
            Err(e) => {
                warn!(mode = mode.name(), error = %e, "Rewrite failed, keeping input");
                Self::fallback(text)
            }
        }
    }

    fn fallback(text: &str) -> Rewrite {
        Rewrite {
            text: text.to_string(),
            fell_back: true,
        }
    }
}
