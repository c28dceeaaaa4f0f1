//! Remote content-safety classification.
//!
//! The remote service reports free-form category names with integer
//! severities. [`SafetyClassifier`] maps them onto [`SafetyCategory`] and
//! thresholds them into a [`SafetyAssessment`].

mod azure;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use azure::{
    AzureContentSafety, ContentSafetyConfig, DEFAULT_API_VERSION as DEFAULT_CONTENT_SAFETY_API_VERSION,
};

use crate::record::RiskLevel;
use crate::upstream::{with_retry, RetryConfig, UpstreamError};

/// Default highest severity still considered safe.
pub const DEFAULT_MAX_SEVERITY: u8 = 2;

/// Default severity at which an unsafe prompt becomes `critical`.
pub const DEFAULT_CRITICAL_SEVERITY: u8 = 6;

/// Canonical moderation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyCategory {
    Hate,
    SelfHarm,
    Sexual,
    Violence,
}

impl SafetyCategory {
    pub fn all() -> &'static [SafetyCategory] {
        &[
            SafetyCategory::Hate,
            SafetyCategory::SelfHarm,
            SafetyCategory::Sexual,
            SafetyCategory::Violence,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SafetyCategory::Hate => "hate",
            SafetyCategory::SelfHarm => "self_harm",
            SafetyCategory::Sexual => "sexual",
            SafetyCategory::Violence => "violence",
        }
    }

    /// Maps an external category name, ignoring case and separators.
    pub fn from_external(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "hate" | "odio" => Some(SafetyCategory::Hate),
            "selfharm" | "autolesion" | "autolesión" => Some(SafetyCategory::SelfHarm),
            "sexual" => Some(SafetyCategory::Sexual),
            "violence" | "violencia" => Some(SafetyCategory::Violence),
            _ => None,
        }
    }
}

/// One category as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySeverity {
    pub category: String,
    pub severity: u8,
}

impl CategorySeverity {
    pub fn new(category: impl Into<String>, severity: u8) -> Self {
        Self {
            category: category.into(),
            severity,
        }
    }
}

/// Thresholded moderation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub category_severities: BTreeMap<SafetyCategory, u8>,
    pub is_safe: bool,
}

impl SafetyAssessment {
    /// Builds an assessment; unsafe iff any severity exceeds `max_severity`.
    pub fn new(category_severities: BTreeMap<SafetyCategory, u8>, max_severity: u8) -> Self {
        let is_safe = category_severities.values().all(|s| *s <= max_severity);
        Self {
            category_severities,
            is_safe,
        }
    }

    pub fn max_severity(&self) -> u8 {
        self.category_severities.values().copied().max().unwrap_or(0)
    }

    /// Categories above the threshold.
    pub fn flagged(&self, max_severity: u8) -> Vec<SafetyCategory> {
        self.category_severities
            .iter()
            .filter(|(_, s)| **s > max_severity)
            .map(|(c, _)| *c)
            .collect()
    }

    /// True when something was reported but nothing crossed the threshold.
    pub fn is_moderate(&self) -> bool {
        self.is_safe && self.max_severity() > 0
    }
}

/// Remote content-moderation capability.
#[async_trait]
pub trait ContentSafetyService: Send + Sync {
    /// Returns per-category severities for the text.
    async fn analyze(&self, text: &str) -> Result<Vec<CategorySeverity>, UpstreamError>;

    fn name(&self) -> &'static str;
}

/// Thresholding client over a [`ContentSafetyService`].
#[derive(Clone)]
pub struct SafetyClassifier {
    service: Arc<dyn ContentSafetyService>,
    max_severity: u8,
    critical_severity: u8,
    retry: RetryConfig,
}

impl SafetyClassifier {
    pub fn new(service: Arc<dyn ContentSafetyService>, retry: RetryConfig) -> Self {
        Self {
            service,
            max_severity: DEFAULT_MAX_SEVERITY,
            critical_severity: DEFAULT_CRITICAL_SEVERITY,
            retry,
        }
    }

    pub fn with_thresholds(mut self, max_severity: u8, critical_severity: u8) -> Self {
        self.max_severity = max_severity;
        self.critical_severity = critical_severity.max(max_severity.saturating_add(1));
        self
    }

    pub fn max_severity(&self) -> u8 {
        self.max_severity
    }

    /// Classifies text through the remote service.
    pub async fn classify(&self, text: &str) -> Result<SafetyAssessment, UpstreamError> {
        let service = self.service.as_ref();
        let reported = with_retry(&self.retry, service.name(), || service.analyze(text)).await?;

        let mut severities: BTreeMap<SafetyCategory, u8> = SafetyCategory::all()
            .iter()
            .map(|c| (*c, 0))
            .collect();

        for entry in reported {
            match SafetyCategory::from_external(&entry.category) {
                Some(category) => {
                    let slot = severities.entry(category).or_insert(0);
                    *slot = (*slot).max(entry.severity);
                }
                None => warn!(
                    category = %entry.category,
                    severity = entry.severity,
                    "Ignoring unknown safety category"
                ),
            }
        }

        let assessment = SafetyAssessment::new(severities, self.max_severity);
        debug!(
            is_safe = assessment.is_safe,
            max_severity = assessment.max_severity(),
            "Safety classification complete"
        );
        Ok(assessment)
    }

    /// Risk level an unsafe assessment escalates to.
    pub fn risk_for(&self, assessment: &SafetyAssessment) -> RiskLevel {
        if assessment.is_safe {
            if assessment.is_moderate() {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            }
        } else if assessment.max_severity() >= self.critical_severity {
            RiskLevel::Critical
        } else {
            RiskLevel::High
        }
    }
}
