//! Local, deterministic prompt heuristics.
//!
//! Everything here is pure: no network, no shared mutable state. An analyzer
//! is built once at startup and shared between requests.

mod complexity;
mod intention;
mod language;
mod suggestions;

use std::collections::BTreeSet;

pub use complexity::{depth_label, ComplexityScorer};
pub use intention::IntentCatalog;
pub use language::{LanguageDetector, LanguageReport};
pub use suggestions::{content_warning, generate_suggestions};

use crate::record::{ComplexityReport, ContextTag, IntentionTag, Suggestion, SuggestionKind};

/// Default minimum word count before a prompt is considered incomplete.
pub const DEFAULT_MIN_PROMPT_WORDS: usize = 3;

/// Groups the heuristic detectors behind one immutable value.
pub struct HeuristicAnalyzer {
    language: LanguageDetector,
    catalog: IntentCatalog,
    complexity: ComplexityScorer,
    min_words: usize,
}

impl HeuristicAnalyzer {
    pub fn new(min_words: usize) -> Self {
        Self {
            language: LanguageDetector::new(),
            catalog: IntentCatalog::new(),
            complexity: ComplexityScorer::new(),
            min_words,
        }
    }

    pub fn detect_inappropriate_language(&self, prompt: &str) -> bool {
        self.language.is_inappropriate(prompt)
    }

    pub fn check_language(&self, prompt: &str) -> LanguageReport {
        self.language.analyze(prompt)
    }

    pub fn detect_intention(&self, prompt: &str) -> BTreeSet<IntentionTag> {
        self.catalog.detect_intention(prompt)
    }

    pub fn detect_context(&self, prompt: &str) -> ContextTag {
        self.catalog.detect_context(prompt)
    }

    pub fn score_complexity(&self, prompt: &str) -> ComplexityReport {
        self.complexity.score(prompt)
    }

    /// True when the prompt has fewer words than the configured minimum.
    pub fn is_incomplete(&self, prompt: &str) -> bool {
        prompt.split_whitespace().count() < self.min_words
    }

    pub fn completeness_suggestion(&self) -> Suggestion {
        Suggestion::new(SuggestionKind::Completeness, suggestions::INCOMPLETE_PROMPT)
    }

    pub fn language_filter_suggestion(&self) -> Suggestion {
        Suggestion::new(SuggestionKind::LanguageFilter, suggestions::LANGUAGE_FILTER)
    }

    pub fn generate_suggestions(
        &self,
        intentions: &BTreeSet<IntentionTag>,
        context: ContextTag,
        complexity: &ComplexityReport,
    ) -> Vec<Suggestion> {
        generate_suggestions(intentions, context, complexity)
    }
}

impl Default for HeuristicAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PROMPT_WORDS)
    }
}
