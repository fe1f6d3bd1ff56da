
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::chat::ChatModel;
use crate::config::Config;
use crate::embeddings::TextEmbedder;
use crate::{PdfChatError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Client for the Google Generative Language REST API, covering both the
/// embedding and chat-completion endpoints the pipeline needs.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: Url,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    embedding_dimension: usize,
    batch_size: usize,
    temperature: f32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Serialize)]
struct ChatContent {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<ChatContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Option<Vec<ModelInfo>>,
}

impl GeminiClient {
    /// Build a client from the configuration, resolving the API key from the
    /// environment variable the configuration names. The key is never stored
    /// in the configuration file itself.
    #[inline]
    pub fn from_env(config: &Config) -> Result<Self> {
        let api_key = api_key_from_env(&config.provider.api_key_env)?;
        Self::new(config, api_key)
    }

    #[inline]
    pub fn new(config: &Config, api_key: String) -> Result<Self> {
        let base_url = config
            .provider
            .api_base_url()
            .map_err(|e| PdfChatError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key,
            embedding_model: config.provider.embedding_model.clone(),
            chat_model: config.provider.chat_model.clone(),
            embedding_dimension: config.provider.embedding_dimension as usize,
            batch_size: config.provider.batch_size as usize,
            temperature: config.provider.temperature,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Verify the provider is reachable and both configured models exist.
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        let models = self.list_models()?;

        for wanted in [&self.embedding_model, &self.chat_model] {
            let available = models
                .iter()
                .any(|m| m.name == format!("models/{wanted}") || &m.name == wanted);
            if !available {
                warn!("Model {} not found at provider", wanted);
                return Err(PdfChatError::Provider(format!(
                    "Model '{wanted}' is not available from the provider"
                )));
            }
        }

        debug!("Provider health check passed");
        Ok(())
    }

    /// List the models the provider offers.
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("v1beta/models")
            .context("Failed to build models URL")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .agent
            .get(url.as_str())
            .header("x-goog-api-key", &self.api_key)
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(map_transport_error)?;

        let models: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| PdfChatError::Provider(format!("Failed to parse models response: {e}")))?;

        Ok(models.models.unwrap_or_default())
    }

    fn model_url(&self, model: &str, action: &str) -> Result<Url> {
        self.base_url
            .join(&format!("v1beta/models/{model}:{action}"))
            .with_context(|| format!("Failed to build URL for {model}:{action}"))
            .map_err(PdfChatError::Other)
    }

    fn post_json<B: Serialize>(&self, url: &Url, body: &B) -> Result<String> {
        let payload = serde_json::to_string(body)
            .context("Failed to serialize provider request")
            .map_err(PdfChatError::Other)?;

        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .send(&payload)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(map_transport_error)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: format!("models/{}", self.embedding_model),
                    content: EmbedContent {
                        parts: vec![Part { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let url = self.model_url(&self.embedding_model, "batchEmbedContents")?;
        let response_text = self.post_json(&url, &request)?;

        let response: BatchEmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            PdfChatError::Provider(format!("Failed to parse batch embedding response: {e}"))
        })?;

        if response.embeddings.len() != texts.len() {
            return Err(PdfChatError::Provider(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        let vectors: Vec<Vec<f32>> = response.embeddings.into_iter().map(|e| e.values).collect();
        self.check_dimensions(&vectors)?;
        Ok(vectors)
    }

    fn check_dimensions(&self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            if vector.len() != self.embedding_dimension {
                return Err(PdfChatError::Provider(format!(
                    "Embedding dimension mismatch: expected {}, provider returned {}",
                    self.embedding_dimension,
                    vector.len()
                )));
            }
        }
        Ok(())
    }
}

impl TextEmbedder for GeminiClient {
    #[inline]
    fn model_id(&self) -> &str {
        &self.embedding_model
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            vectors.extend(self.embed_single_batch(batch)?);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for query (length: {})", text.len());

        let request = EmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: EmbedContent {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        };

        let url = self.model_url(&self.embedding_model, "embedContent")?;
        let response_text = self.post_json(&url, &request)?;

        let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            PdfChatError::Provider(format!("Failed to parse embedding response: {e}"))
        })?;

        let vector = response.embedding.values;
        self.check_dimensions(std::slice::from_ref(&vector))?;
        Ok(vector)
    }
}

impl ChatModel for GeminiClient {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.chat_model,
            prompt.len()
        );

        let request = GenerateRequest {
            contents: vec![ChatContent {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let url = self.model_url(&self.chat_model, "generateContent")?;
        let response_text = self.post_json(&url, &request)?;

        let response: GenerateResponse = serde_json::from_str(&response_text).map_err(|e| {
            PdfChatError::Provider(format!("Failed to parse completion response: {e}"))
        })?;

        let answer = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(PdfChatError::Provider(
                "Provider returned no completion candidates".to_string(),
            ));
        }

        Ok(answer)
    }
}

/// Read the provider credential from the named environment variable.
#[inline]
pub fn api_key_from_env(var_name: &str) -> Result<String> {
    std::env::var(var_name).map_err(|_| {
        PdfChatError::Config(format!(
            "Environment variable {var_name} is not set; it must hold the provider API key"
        ))
    })
}

/// Map a transport-level failure onto the provider error surface. Provider
/// failures are surfaced to the caller as-is; nothing is retried.
fn map_transport_error(error: ureq::Error) -> PdfChatError {
    match error {
        ureq::Error::StatusCode(status) => {
            PdfChatError::Provider(format!("Provider returned HTTP {status}"))
        }
        ureq::Error::Timeout(_) => PdfChatError::Provider("Provider request timed out".to_string()),
        other => PdfChatError::Provider(format!("Provider request failed: {other}")),
    }
}
