//! Startup configuration.
//!
//! Read once from the environment and never mutated afterwards. Missing
//! credentials are a startup error; there is no per-request fallback.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::heuristics::DEFAULT_MIN_PROMPT_WORDS;
use crate::rewrite::AzureOpenAiConfig;
use crate::safety::{
    ContentSafetyConfig, DEFAULT_CONTENT_SAFETY_API_VERSION, DEFAULT_CRITICAL_SEVERITY,
    DEFAULT_MAX_SEVERITY,
};
use crate::upstream::RetryConfig;
use crate::validator::DEFAULT_MIN_PROMPT_CHARS;

pub const ENV_CONTENT_SAFETY_ENDPOINT: &str = "AZURE_CONTENT_SAFETY_ENDPOINT";
pub const ENV_CONTENT_SAFETY_KEY: &str = "AZURE_CONTENT_SAFETY_KEY";
pub const ENV_CONTENT_SAFETY_API_VERSION: &str = "AZURE_CONTENT_SAFETY_API_VERSION";
pub const ENV_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_OPENAI_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT";
pub const ENV_OPENAI_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

pub const ENV_MIN_PROMPT_CHARS: &str = "WARDEN_MIN_PROMPT_CHARS";
pub const ENV_MIN_PROMPT_WORDS: &str = "WARDEN_MIN_PROMPT_WORDS";
pub const ENV_MAX_SEVERITY: &str = "WARDEN_MAX_SEVERITY";
pub const ENV_CRITICAL_SEVERITY: &str = "WARDEN_CRITICAL_SEVERITY";
pub const ENV_SAFETY_FAILURE_POLICY: &str = "WARDEN_SAFETY_FAILURE_POLICY";
pub const ENV_UPSTREAM_TIMEOUT_MS: &str = "WARDEN_UPSTREAM_TIMEOUT_MS";
pub const ENV_UPSTREAM_MAX_ATTEMPTS: &str = "WARDEN_UPSTREAM_MAX_ATTEMPTS";
pub const ENV_RETRY_BACKOFF_MS: &str = "WARDEN_RETRY_BACKOFF_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "WARDEN_REQUEST_TIMEOUT_MS";

/// Highest accepted `WARDEN_UPSTREAM_MAX_ATTEMPTS`.
pub const MAX_UPSTREAM_ATTEMPTS: u32 = 10;

/// Sequential upstream calls one run can make: safety check plus two rewrites.
pub const UPSTREAM_CALLS_PER_RUN: u32 = 3;

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// What to do when the safety classifier cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyFailurePolicy {
    /// Treat the prompt as unsafe: escalate, sanitize, terminate.
    #[default]
    FailClosed,
    /// Record the outage and keep going.
    FailOpen,
}

impl FromStr for SafetyFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_closed" | "closed" => Ok(SafetyFailurePolicy::FailClosed),
            "fail_open" | "open" => Ok(SafetyFailurePolicy::FailOpen),
            other => Err(format!("expected fail_closed or fail_open, got {:?}", other)),
        }
    }
}

/// Pipeline tunables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub min_prompt_chars: usize,
    pub min_prompt_words: usize,
    pub max_severity: u8,
    pub critical_severity: u8,
    pub safety_failure_policy: SafetyFailurePolicy,
    pub retry: RetryConfig,
    /// Upper bound for one whole pipeline run.
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_prompt_chars: DEFAULT_MIN_PROMPT_CHARS,
            min_prompt_words: DEFAULT_MIN_PROMPT_WORDS,
            max_severity: DEFAULT_MAX_SEVERITY,
            critical_severity: DEFAULT_CRITICAL_SEVERITY,
            safety_failure_policy: SafetyFailurePolicy::FailClosed,
            retry: RetryConfig::default(),
            request_timeout: Duration::from_millis(60_000),
        }
    }
}

impl PipelineConfig {
    /// Longest a run can spend in upstream calls when every one of them
    /// exhausts its retries.
    pub fn worst_case_latency(&self) -> Duration {
        self.retry.worst_case().saturating_mul(UPSTREAM_CALLS_PER_RUN)
    }
}

/// Everything the service needs to start.
#[derive(Debug, Clone)]
pub struct WardenConfig {
    pub content_safety: ContentSafetyConfig,
    pub openai: AzureOpenAiConfig,
    pub pipeline: PipelineConfig,
}

impl WardenConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let content_safety = ContentSafetyConfig {
            endpoint: required(ENV_CONTENT_SAFETY_ENDPOINT)?,
            key: required(ENV_CONTENT_SAFETY_KEY)?,
            api_version: lookup(ENV_CONTENT_SAFETY_API_VERSION)
                .unwrap_or_else(|| DEFAULT_CONTENT_SAFETY_API_VERSION.to_string()),
        };

        let openai = AzureOpenAiConfig {
            endpoint: required(ENV_OPENAI_ENDPOINT)?,
            api_key: required(ENV_OPENAI_API_KEY)?,
            deployment: required(ENV_OPENAI_DEPLOYMENT)?,
            api_version: required(ENV_OPENAI_API_VERSION)?,
        };

        let defaults = PipelineConfig::default();
        let retry = RetryConfig {
            max_attempts: parse_or(&lookup, ENV_UPSTREAM_MAX_ATTEMPTS, defaults.retry.max_attempts)?,
            attempt_timeout: Duration::from_millis(parse_or(
                &lookup,
                ENV_UPSTREAM_TIMEOUT_MS,
                defaults.retry.attempt_timeout.as_millis() as u64,
            )?),
            initial_backoff: Duration::from_millis(parse_or(
                &lookup,
                ENV_RETRY_BACKOFF_MS,
                defaults.retry.initial_backoff.as_millis() as u64,
            )?),
            backoff_multiplier: defaults.retry.backoff_multiplier,
        };
        if !(1..=MAX_UPSTREAM_ATTEMPTS).contains(&retry.max_attempts) {
            return Err(ConfigError::Invalid {
                var: ENV_UPSTREAM_MAX_ATTEMPTS,
                reason: format!("must be between 1 and {}", MAX_UPSTREAM_ATTEMPTS),
            });
        }

        let pipeline = PipelineConfig {
            min_prompt_chars: parse_or(&lookup, ENV_MIN_PROMPT_CHARS, defaults.min_prompt_chars)?,
            min_prompt_words: parse_or(&lookup, ENV_MIN_PROMPT_WORDS, defaults.min_prompt_words)?,
            max_severity: parse_or(&lookup, ENV_MAX_SEVERITY, defaults.max_severity)?,
            critical_severity: parse_or(&lookup, ENV_CRITICAL_SEVERITY, defaults.critical_severity)?,
            safety_failure_policy: parse_or(
                &lookup,
                ENV_SAFETY_FAILURE_POLICY,
                defaults.safety_failure_policy,
            )?,
            retry,
            request_timeout: Duration::from_millis(parse_or(
                &lookup,
                ENV_REQUEST_TIMEOUT_MS,
                defaults.request_timeout.as_millis() as u64,
            )?),
        };

        let worst_case = pipeline.worst_case_latency();
        if pipeline.request_timeout < worst_case {
            return Err(ConfigError::Invalid {
                var: ENV_REQUEST_TIMEOUT_MS,
                reason: format!(
                    "{} ms is shorter than the {} ms upstream calls can take",
                    pipeline.request_timeout.as_millis(),
                    worst_case.as_millis()
                ),
            });
        }

        Ok(Self {
            content_safety,
            openai,
            pipeline,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}
