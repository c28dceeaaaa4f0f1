//! Azure AI Content Safety text analysis client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CategorySeverity, ContentSafetyService};
use crate::upstream::UpstreamError;

/// Default API version for text analysis.
pub const DEFAULT_API_VERSION: &str = "2024-09-01";

/// Connection settings for the content-safety endpoint.
#[derive(Debug, Clone)]
pub struct ContentSafetyConfig {
    /// Resource endpoint, e.g. `https://<name>.cognitiveservices.azure.com`.
    pub endpoint: String,
    /// Subscription key.
    pub key: String,
    pub api_version: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeTextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeTextResponse {
    #[serde(rename = "categoriesAnalysis")]
    categories_analysis: Option<Vec<CategoryAnalysis>>,
}

#[derive(Debug, Deserialize)]
struct CategoryAnalysis {
    category: Option<String>,
    severity: Option<u8>,
}

/// HTTP client for `contentsafety/text:analyze`.
pub struct AzureContentSafety {
    client: reqwest::Client,
    url: String,
    key: String,
}

impl AzureContentSafety {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(config: ContentSafetyConfig, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("Warden/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        let url = format!(
            "{}/contentsafety/text:analyze?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.api_version
        );

        Ok(Self {
            client,
            url,
            key: config.key,
        })
    }
}

#[async_trait]
impl ContentSafetyService for AzureContentSafety {
    async fn analyze(&self, text: &str) -> Result<Vec<CategorySeverity>, UpstreamError> {
        let response = self
            .client
            .post(&self.url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(&AnalyzeTextRequest { text })
            .send()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(status.as_u16(), body));
        }

        let body: AnalyzeTextResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        let entries = body
            .categories_analysis
            .ok_or_else(|| UpstreamError::Malformed("missing categoriesAnalysis".to_string()))?;

        let severities = entries
            .into_iter()
            .map(|entry| match (entry.category, entry.severity) {
                (Some(category), Some(severity)) => Ok(CategorySeverity { category, severity }),
                _ => Err(UpstreamError::Malformed(
                    "category entry without category or severity".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(categories = severities.len(), "Content safety analysis received");
        Ok(severities)
    }

    fn name(&self) -> &'static str {
        "azure-content-safety"
    }
}
