//! Structural preconditions on incoming prompts.

use thiserror::Error;

use crate::record::IssueCode;

/// Default minimum prompt length in characters.
pub const DEFAULT_MIN_PROMPT_CHARS: usize = 5;

/// Validation failures. Always user-facing, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Prompt field missing or blank.
    #[error("prompt is empty")]
    EmptyPrompt,

    /// Prompt shorter than the configured minimum.
    #[error("prompt is too short: {actual} characters, at least {min_chars} required")]
    TooShort { min_chars: usize, actual: usize },
}

impl ValidationError {
    /// Issue code reported alongside the error.
    pub fn issue(&self) -> IssueCode {
        match self {
            ValidationError::EmptyPrompt => IssueCode::EmptyPrompt,
            ValidationError::TooShort { .. } => IssueCode::PromptTooShort,
        }
    }
}

/// Checks a raw prompt field and returns the trimmed prompt.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    min_chars: usize,
}

impl RequestValidator {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    pub fn validate(&self, prompt: Option<&str>) -> Result<String, ValidationError> {
        let trimmed = prompt.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }

        let actual = trimmed.chars().count();
        if actual < self.min_chars {
            return Err(ValidationError::TooShort {
                min_chars: self.min_chars,
                actual,
            });
        }

        Ok(trimmed.to_string())
    }
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PROMPT_CHARS)
    }
}
