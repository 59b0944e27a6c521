use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{ModelBackend, ModelSpec, ProgressSink};
use crate::config::ModelConfig;
use crate::error::{Result, SamvadError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,
}

/// Backend speaking an Ollama-style HTTP API: availability probe via
/// `/api/show`, model pull via `/api/pull`, inference via `/api/generate`
/// with JSON-formatted output.
pub struct HttpModelBackend {
    client: Client,
    config: ModelConfig,
    active: RwLock<Option<String>>,
}

impl HttpModelBackend {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(SamvadError::Http)?;

        Ok(Self {
            client,
            config,
            active: RwLock::new(None),
        })
    }

    async fn model_available(&self, name: &str) -> Result<bool> {
        let url = format!("{}/api/show", self.config.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "name": name }))
            .send()
            .await
            .map_err(|e| SamvadError::Model(format!("Failed to reach model endpoint: {}", e)))?;

        Ok(response.status().is_success())
    }

    async fn pull_model(&self, name: &str) -> Result<()> {
        let url = format!("{}/api/pull", self.config.endpoint);
        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.config.pull_timeout_secs))
            .json(&json!({ "name": name, "stream": false }))
            .send()
            .await
            .map_err(|e| SamvadError::Model(format!("Model pull request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SamvadError::Model(format!(
                "Model pull failed {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    fn build_prompt(&self, text: &str, source_name: &str, target_name: &str) -> String {
        format!(
            "You are a professional translator.\n\
             \n\
             CRITICAL: Translate the text from {} to {} ONLY. Do not translate \
             to any other language.\n\
             \n\
             Return ONLY the translation in JSON format as {{\"text\":\"your {} translation here\"}}.\n\
             Do not include any explanations, alternatives, or text in other languages.\n\
             \n\
             Text to translate: \"{}\"\n",
            source_name, target_name, target_name, text
        )
    }

    /// Extract the translation from a model that ignored the JSON format
    /// instruction: first substantive line, skipping labels and bullets.
    fn clean_response(&self, response: &str) -> String {
        for line in response.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with("Translation:")
                || trimmed.starts_with("Here")
                || trimmed.starts_with("- ")
                || trimmed.starts_with("* ")
                || (trimmed.starts_with("**") && trimmed.ends_with("**"))
            {
                continue;
            }
            return trimmed.to_string();
        }
        response.trim().to_string()
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    async fn prepare(&self, spec: &ModelSpec, progress: &ProgressSink) -> Result<()> {
        progress.report(0);

        if self.model_available(&spec.name).await? {
            *self.active.write().await = Some(spec.name.clone());
            progress.report(100);
            return Ok(());
        }

        info!("Model {} not present, pulling ({:.0} MB)", spec.name, spec.size_mb);
        progress.report(5);
        self.pull_model(&spec.name).await?;
        progress.report(95);

        if !self.model_available(&spec.name).await? {
            return Err(SamvadError::Model(format!(
                "Model {} still unavailable after pull",
                spec.name
            )));
        }

        *self.active.write().await = Some(spec.name.clone());
        progress.report(100);
        Ok(())
    }

    async fn translate(&self, text: &str, source_name: &str, target_name: &str) -> Result<String> {
        let model = self
            .active
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        let request = GenerateRequest {
            model,
            prompt: self.build_prompt(text, source_name, target_name),
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SamvadError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SamvadError::Translation(format!(
                "Model API error {}: {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SamvadError::Translation(format!("Failed to parse response: {}", e)))?;

        let raw = generated.response.trim().to_string();
        debug!("Raw model response: {}", raw);

        if raw.is_empty() {
            return Err(SamvadError::Translation("Empty translation received".to_string()));
        }

        if let Ok(parsed) = serde_json::from_str::<GeneratedText>(&raw) {
            let text = parsed.text.trim().to_string();
            if text.is_empty() {
                return Err(SamvadError::Translation("Empty translation received".to_string()));
            }
            return Ok(text);
        }

        Ok(self.clean_response(&raw))
    }

    async fn release(&self) -> Result<()> {
        *self.active.write().await = None;
        Ok(())
    }
}
