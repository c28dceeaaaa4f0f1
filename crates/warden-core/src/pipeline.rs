//! Prompt moderation and normalization pipeline.
//!
//! ## Stages
//!
//! 1. Validate the raw prompt (errors are returned, nothing else runs)
//! 2. Remote safety check; unsafe prompts, or outages under fail-closed,
//!    are sanitized and the run terminates
//! 3. Local heuristics; inappropriate or sensitive language is sanitized
//!    and the run terminates
//! 4. Suggestions from intention, context and complexity are merged
//! 5. Clarity rewrite when the risk level is still low or medium
//!
//! Each run owns its [`PromptRecord`]; the pipeline itself holds only
//! immutable configuration and thread-safe clients.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, SafetyFailurePolicy};
use crate::heuristics::{content_warning, HeuristicAnalyzer};
use crate::record::{IssueCode, PipelineStatus, PromptRecord, RiskLevel};
use crate::rewrite::{RewriteMode, Rewriter};
use crate::safety::SafetyClassifier;
use crate::validator::{RequestValidator, ValidationError};

/// Pipeline state, used for logging transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    SafetyChecking,
    HeuristicAnalysis,
    SuggestionMerge,
    Rewriting,
    Skipped,
    Terminated,
    Completed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::SafetyChecking => "safety_checking",
            Stage::HeuristicAnalysis => "heuristic_analysis",
            Stage::SuggestionMerge => "suggestion_merge",
            Stage::Rewriting => "rewriting",
            Stage::Skipped => "skipped",
            Stage::Terminated => "terminated",
            Stage::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Sequences validation, moderation, heuristics and rewriting.
pub struct Pipeline {
    validator: RequestValidator,
    heuristics: HeuristicAnalyzer,
    safety: SafetyClassifier,
    rewriter: Rewriter,
    failure_policy: SafetyFailurePolicy,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig, safety: SafetyClassifier, rewriter: Rewriter) -> Self {
        Self {
            validator: RequestValidator::new(config.min_prompt_chars),
            heuristics: HeuristicAnalyzer::new(config.min_prompt_words),
            safety: safety.with_thresholds(config.max_severity, config.critical_severity),
            rewriter,
            failure_policy: config.safety_failure_policy,
        }
    }

    /// Runs the full pipeline on a raw prompt field.
    pub async fn run(&self, raw_prompt: Option<&str>) -> Result<PromptRecord, ValidationError> {
        let start = Instant::now();
        let mut record = self.validate(raw_prompt)?;

        let status = self.process(&mut record).await;
        record.status = status;
        record.latency_ms = start.elapsed().as_millis() as u64;

        info!(
            status = ?status,
            risk_level = %record.risk_level(),
            issues = record.issues().len(),
            latency_ms = record.latency_ms,
            "Prompt processed"
        );
        Ok(record)
    }

    /// Validation plus the completeness check; no remote calls.
    pub fn validate_only(&self, raw_prompt: Option<&str>) -> Result<PromptRecord, ValidationError> {
        let mut record = self.validate(raw_prompt)?;
        self.check_completeness(&mut record);
        Ok(record)
    }

    /// Validation plus the language check; no remote calls, no rewrite.
    pub fn language_risks(&self, raw_prompt: Option<&str>) -> Result<PromptRecord, ValidationError> {
        let mut record = self.validate(raw_prompt)?;
        self.check_language(&mut record);
        Ok(record)
    }

    fn validate(&self, raw_prompt: Option<&str>) -> Result<PromptRecord, ValidationError> {
        debug!(stage = %Stage::Validating, "Pipeline stage");
        match self.validator.validate(raw_prompt) {
            Ok(prompt) => Ok(PromptRecord::new(prompt)),
            Err(e) => {
                debug!(error = %e, "Prompt rejected");
                Err(e)
            }
        }
    }

    async fn process(&self, record: &mut PromptRecord) -> PipelineStatus {
        debug!(stage = %Stage::SafetyChecking, "Pipeline stage");
        if self.check_safety(record).await == Flow::Stop {
            return self.terminate(record).await;
        }

        debug!(stage = %Stage::HeuristicAnalysis, "Pipeline stage");
        if self.check_language(record) == Flow::Stop {
            return self.terminate(record).await;
        }

        let prompt = record.original_prompt().to_string();
        let intentions = self.heuristics.detect_intention(&prompt);
        let context = self.heuristics.detect_context(&prompt);
        let complexity = self.heuristics.score_complexity(&prompt);
        self.check_completeness(record);

        debug!(stage = %Stage::SuggestionMerge, "Pipeline stage");
        let suggestions = self
            .heuristics
            .generate_suggestions(&intentions, context, &complexity);
        record.extend_suggestions(suggestions);
        record.intention = intentions;
        record.context = context;
        record.complexity = Some(complexity);

        if record.risk_level().allows_clarify() {
            debug!(stage = %Stage::Rewriting, "Pipeline stage");
            let rewrite = self
                .rewriter
                .rewrite(record.working_prompt(), RewriteMode::Clarify)
                .await;
            if rewrite.fell_back {
                record.add_issue(IssueCode::RewriteUnavailable);
            }
            record.processed_prompt = Some(rewrite.text);
        } else {
            debug!(stage = %Stage::Skipped, "Pipeline stage");
        }

        debug!(stage = %Stage::Completed, "Pipeline stage");
        PipelineStatus::Completed
    }

    async fn check_safety(&self, record: &mut PromptRecord) -> Flow {
        let assessment = match self.safety.classify(record.original_prompt()).await {
            Ok(assessment) => assessment,
            Err(e) => {
                record.add_issue(IssueCode::SafetyCheckUnavailable);
                return match self.failure_policy {
                    SafetyFailurePolicy::FailClosed => {
                        warn!(error = %e, "Safety check unavailable, failing closed");
                        record.escalate(RiskLevel::High);
                        Flow::Stop
                    }
                    SafetyFailurePolicy::FailOpen => {
                        warn!(error = %e, "Safety check unavailable, failing open");
                        Flow::Continue
                    }
                };
            }
        };

        let risk = self.safety.risk_for(&assessment);
        let flow = if !assessment.is_safe {
            let flagged = assessment.flagged(self.safety.max_severity());
            let names: Vec<&str> = flagged.iter().map(|c| c.name()).collect();
            info!(categories = ?names, risk_level = %risk, "Prompt flagged by safety check");

            record.add_issue(IssueCode::ContentSafetyRisk);
            record.escalate(risk);
            record.push_suggestion(content_warning(&names.join(", ")));
            Flow::Stop
        } else if assessment.is_moderate() {
            record.add_issue(IssueCode::ModerateContent);
            record.escalate(risk);
            self.sanitize(record).await;
            Flow::Continue
        } else {
            Flow::Continue
        };

        record.safety = Some(assessment);
        flow
    }

    fn check_language(&self, record: &mut PromptRecord) -> Flow {
        let report = self.heuristics.check_language(record.original_prompt());
        if report.is_clean() {
            return Flow::Continue;
        }

        if !report.inappropriate.is_empty() {
            debug!(terms = report.inappropriate.len(), "Inappropriate language detected");
            record.add_issue(IssueCode::InappropriateLanguage);
            record.escalate(RiskLevel::High);
            record.push_suggestion(self.heuristics.language_filter_suggestion());
        }

        if !report.sensitive.is_empty() {
            debug!(keywords = ?report.sensitive, "Sensitive content detected");
            record.add_issue(IssueCode::SensitiveContent);
            record.escalate(RiskLevel::Critical);
            record.extend_suggestions(report.sensitive.iter().map(|k| content_warning(k)));
        }

        Flow::Stop
    }

    fn check_completeness(&self, record: &mut PromptRecord) {
        if self.heuristics.is_incomplete(record.original_prompt()) {
            record.add_issue(IssueCode::IncompletePrompt);
            record.push_suggestion(self.heuristics.completeness_suggestion());
        }
    }

    async fn sanitize(&self, record: &mut PromptRecord) {
        let rewrite = self
            .rewriter
            .rewrite(record.original_prompt(), RewriteMode::Sanitize)
            .await;
        if rewrite.fell_back {
            record.add_issue(IssueCode::RewriteUnavailable);
        }
        record.sanitized_prompt = rewrite.text;
    }

    async fn terminate(&self, record: &mut PromptRecord) -> PipelineStatus {
        self.sanitize(record).await;
        debug!(stage = %Stage::Terminated, risk_level = %record.risk_level(), "Pipeline stage");
        PipelineStatus::Terminated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}
