//! The per-request result record and the tags it is built from.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::safety::SafetyAssessment;

/// Coarse escalation tier for a prompt.
///
/// Ordered `Low < Medium < High < Critical`; a record only ever moves up.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Returns the wire name of this level.
    pub fn name(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Returns true if this level still allows a clarity rewrite.
    pub fn allows_clarify(&self) -> bool {
        *self <= RiskLevel::Medium
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Problems detected while processing a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Prompt missing or blank after trimming.
    EmptyPrompt,
    /// Prompt shorter than the configured minimum length.
    PromptTooShort,
    /// Profanity or insults found by the local lexicon.
    InappropriateLanguage,
    /// Sensitive topic keywords found by the local lexicon.
    SensitiveContent,
    /// The remote classifier reported a severity above the threshold.
    ContentSafetyRisk,
    /// The remote classifier reported low but non-zero severities.
    ModerateContent,
    /// The remote classifier could not be reached or answered garbage.
    SafetyCheckUnavailable,
    /// The prompt has too few words to be actionable.
    IncompletePrompt,
    /// A rewrite fell back to the input text.
    RewriteUnavailable,
}

/// What the user is trying to accomplish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentionTag {
    Learning,
    ProblemSolving,
    Creative,
    Technical,
    General,
}

impl IntentionTag {
    /// Tags that have a pattern catalog, in context priority order.
    pub fn detectable() -> &'static [IntentionTag] {
        &[
            IntentionTag::Learning,
            IntentionTag::ProblemSolving,
            IntentionTag::Creative,
            IntentionTag::Technical,
        ]
    }
}

/// Single best-matching situational category of a prompt.
pub type ContextTag = IntentionTag;

/// Coarse complexity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Basic,
    Intermediate,
    Advanced,
}

/// Lexical complexity metrics for a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub word_count: usize,
    pub unique_words: usize,
    pub technical_term_count: usize,
    pub level: ComplexityLevel,
    pub depth_label: String,
}

/// Kind of a suggestion, serialised as `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Intention,
    ExpandPrompt,
    TechnicalAudience,
    Completeness,
    LanguageFilter,
    ContentWarning,
}

/// A recommendation returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub recommendation: String,
}

impl Suggestion {
    pub fn new(kind: SuggestionKind, recommendation: impl Into<String>) -> Self {
        Self {
            kind,
            recommendation: recommendation.into(),
        }
    }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Ran to the end, clarity rewrite included when allowed.
    Completed,
    /// Short-circuited after a risk escalation.
    Terminated,
}

/// One record per request, owned by the pipeline while it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    original_prompt: String,
    pub sanitized_prompt: String,
    pub processed_prompt: Option<String>,
    issues: Vec<IssueCode>,
    suggestions: Vec<Suggestion>,
    risk_level: RiskLevel,
    pub intention: BTreeSet<IntentionTag>,
    pub context: ContextTag,
    pub complexity: Option<ComplexityReport>,
    pub safety: Option<SafetyAssessment>,
    pub status: PipelineStatus,
    pub latency_ms: u64,
}

impl PromptRecord {
    /// Creates a fresh record for a validated prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        let original_prompt = prompt.into();
        Self {
            sanitized_prompt: original_prompt.clone(),
            original_prompt,
            processed_prompt: None,
            issues: Vec::new(),
            suggestions: Vec::new(),
            risk_level: RiskLevel::Low,
            intention: BTreeSet::from([IntentionTag::General]),
            context: IntentionTag::General,
            complexity: None,
            safety: None,
            status: PipelineStatus::Completed,
            latency_ms: 0,
        }
    }

    pub fn original_prompt(&self) -> &str {
        &self.original_prompt
    }

    pub fn issues(&self) -> &[IssueCode] {
        &self.issues
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn has_issue(&self, issue: IssueCode) -> bool {
        self.issues.contains(&issue)
    }

    /// Adds an issue unless it is already present.
    pub fn add_issue(&mut self, issue: IssueCode) {
        if !self.has_issue(issue) {
            self.issues.push(issue);
        }
    }

    pub fn push_suggestion(&mut self, suggestion: Suggestion) {
        self.suggestions.push(suggestion);
    }

    pub fn extend_suggestions(&mut self, suggestions: impl IntoIterator<Item = Suggestion>) {
        self.suggestions.extend(suggestions);
    }

    /// Raises the risk level; lower levels are ignored.
    pub fn escalate(&mut self, level: RiskLevel) {
        self.risk_level = self.risk_level.max(level);
    }

    /// Text the next rewrite should work on.
    pub fn working_prompt(&self) -> &str {
        &self.sanitized_prompt
    }
}
