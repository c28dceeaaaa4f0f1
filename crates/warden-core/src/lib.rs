//! Warden Core - Prompt validation, heuristics, moderation and rewriting.
//!
//! This crate provides the prompt-processing pipeline behind the Warden
//! service. A [`Pipeline`] takes a raw prompt and produces a
//! [`PromptRecord`] with issues, suggestions, a risk level and, when the
//! prompt is safe enough, a clarified version of it.
//!
//! Remote dependencies sit behind the [`ContentSafetyService`] and
//! [`RewriteService`] traits so the pipeline can run against fakes.

pub mod config;
pub mod heuristics;
pub mod pipeline;
pub mod record;
pub mod rewrite;
pub mod safety;
pub mod upstream;
pub mod validator;

pub use config::{ConfigError, PipelineConfig, SafetyFailurePolicy, WardenConfig};
pub use heuristics::{HeuristicAnalyzer, LanguageReport};
pub use pipeline::{Pipeline, Stage};
pub use record::{
    ComplexityLevel, ComplexityReport, ContextTag, IntentionTag, IssueCode, PipelineStatus,
    PromptRecord, RiskLevel, Suggestion, SuggestionKind,
};
pub use rewrite::{AzureOpenAi, AzureOpenAiConfig, Rewrite, RewriteMode, RewriteService, Rewriter};
pub use safety::{
    AzureContentSafety, CategorySeverity, ContentSafetyConfig, ContentSafetyService,
    SafetyAssessment, SafetyCategory, SafetyClassifier,
};
pub use upstream::{RetryConfig, UpstreamError};
pub use validator::{RequestValidator, ValidationError};
