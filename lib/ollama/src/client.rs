//! Ollama chat client.

use crate::config::OllamaConfig;
use crate::decode::decode_events;
use crate::error::OllamaError;
use crate::wire::{self, ChatOptions, ChatRequest, PrewarmRequest, TagsResponse};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use vitals_conversation::{
    Availability, GenerationError, GenerationRequest, LanguageModel, ModelStream,
    UnavailableReason,
};

const PROVIDER: &str = "ollama";

/// A language model served by Ollama.
#[derive(Debug, Clone)]
pub struct OllamaModel {
    client: Client,
    base_url: Url,
    config: OllamaConfig,
}

impl OllamaModel {
    /// Creates a client for the configured server and model.
    pub fn new(config: OllamaConfig) -> vitals_core::Result<Self, OllamaError> {
        let mut base_url =
            Url::parse(&config.base_url).map_err(|e| OllamaError::InvalidBaseUrl {
                url: config.base_url.clone(),
                details: e.to_string(),
            })?;
        // Endpoints join onto the base path, so it must end in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| OllamaError::ClientBuild {
                details: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GenerationError> {
        self.base_url
            .join(path)
            .map_err(|e| GenerationError::RequestFailed {
                reason: e.to_string(),
            })
    }

    fn unreachable(err: &reqwest::Error) -> GenerationError {
        GenerationError::ProviderUnavailable {
            provider: PROVIDER.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    #[instrument(skip(self), fields(model = %self.config.model))]
    async fn availability(&self) -> Availability {
        let unreachable = |reason: String| {
            Availability::Unavailable(UnavailableReason::ServiceUnreachable { reason })
        };

        let url = match self.endpoint("api/tags") {
            Ok(url) => url,
            Err(e) => return unreachable(e.to_string()),
        };
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return unreachable(e.to_string()),
        };
        if !response.status().is_success() {
            return unreachable(format!("HTTP {}", response.status()));
        }
        let tags: TagsResponse = match response.json().await {
            Ok(tags) => tags,
            Err(e) => return unreachable(e.to_string()),
        };

        if tags.contains(&self.config.model) {
            Availability::Available
        } else {
            debug!(installed = tags.models.len(), "model not installed");
            Availability::Unavailable(UnavailableReason::ModelNotReady {
                model: self.config.model.clone(),
            })
        }
    }

    #[instrument(skip(self), fields(model = %self.config.model))]
    async fn prewarm(&self) -> Result<(), GenerationError> {
        let response = self
            .client
            .post(self.endpoint("api/generate")?)
            .json(&PrewarmRequest {
                model: &self.config.model,
                keep_alive: &self.config.keep_alive,
            })
            .send()
            .await
            .map_err(|e| Self::unreachable(&e))?;
        if !response.status().is_success() {
            return Err(GenerationError::RequestFailed {
                reason: format!("prewarm returned HTTP {}", response.status()),
            });
        }
        debug!("model loaded");
        Ok(())
    }

    #[instrument(skip(self, request), fields(model = %self.config.model, entries = request.transcript.len()))]
    async fn generate(&self, request: GenerationRequest) -> Result<ModelStream, GenerationError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: wire::messages(&request.transcript),
            tools: wire::tools(request.tools),
            stream: true,
            keep_alive: &self.config.keep_alive,
            options: self
                .config
                .temperature
                .map(|temperature| ChatOptions { temperature }),
        };

        let response = self
            .client
            .post(self.endpoint("api/chat")?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::unreachable(&e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(GenerationError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, "chat request rejected");
            return Err(GenerationError::RequestFailed {
                reason: format!("HTTP {status}: {detail}"),
            });
        }

        let events = decode_events(response.bytes_stream());
        Ok(Box::pin(events))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
