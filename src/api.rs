use crate::{
    config::Config,
    constants::{CONNECT_TIMEOUT_SECS, GENERATE_PATH},
    errors::{InferenceError, MelchatError, MelchatResult},
    logging::log_api_call,
    models::{ApiCallLog, InferenceResult},
};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Anything that can turn a prompt into a finished reply.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn infer(&self, prompt: &str) -> Result<InferenceResult, InferenceError>;

    /// Same as `infer`, but gives up with `Cancelled` as soon as `cancel` fires.
    async fn infer_cancellable(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<InferenceResult, InferenceError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(InferenceError::Cancelled),
            result = self.infer(prompt) => result,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Body of a non-streaming `/api/generate` reply. Only `response` is required.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub total_duration: Option<u64>,
    pub eval_count: Option<u64>,
    pub eval_duration: Option<u64>,
}

/// Client for an Ollama-style generation endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    system_prompt: String,
}

impl OllamaClient {
    pub fn new(config: &Config) -> MelchatResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| MelchatError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), GENERATE_PATH),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn record_call(&self, prompt: &str, status: u16, started: Instant) {
        log_api_call(&ApiCallLog {
            timestamp: Utc::now(),
            endpoint: self.endpoint.clone(),
            request_summary: format!("generate {} ({} chars)", self.model, prompt.chars().count()),
            response_status: status,
            response_time_ms: started.elapsed().as_millis(),
        });
    }
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn infer(&self, prompt: &str) -> Result<InferenceResult, InferenceError> {
        let payload = GenerateRequest {
            model: &self.model,
            system: &self.system_prompt,
            prompt,
            stream: false,
        };

        let started = Instant::now();

        let response = match self.client.post(&self.endpoint).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => {
                self.record_call(prompt, 0, started);
                warn!("Request to {} failed: {}", self.endpoint, e);
                return Err(e.into());
            }
        };

        let status = response.status();
        self.record_call(prompt, status.as_u16(), started);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Inference server returned {}: {}", status, body);
            return Err(InferenceError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| InferenceError::BadResponse(format!("Failed to parse response: {}", e)))?;

        let result = normalize_response(parsed, started.elapsed());
        debug!(
            "Generated {} chars in {}s at {} tok/s",
            result.text.len(),
            result.duration,
            result.tokens_per_sec
        );
        Ok(result)
    }
}

/// Turns the server payload into display values. `elapsed` is used only when the
/// server does not report `total_duration`.
pub fn normalize_response(response: GenerateResponse, elapsed: Duration) -> InferenceResult {
    let duration = match response.total_duration {
        Some(nanos) => round_div(nanos as u128, NANOS_PER_SEC as u128),
        None => round_div(elapsed.as_millis(), 1_000),
    }
    .max(1);

    let tokens_per_sec = match (response.eval_count, response.eval_duration) {
        (Some(count), Some(nanos)) if count > 0 && nanos > 0 => {
            round_div(count as u128 * NANOS_PER_SEC as u128, nanos as u128)
        }
        _ => 0,
    };

    InferenceResult {
        text: response.response,
        duration,
        tokens_per_sec,
    }
}

/// Integer division rounding half up.
fn round_div(numerator: u128, denominator: u128) -> u64 {
    ((numerator + denominator / 2) / denominator) as u64
}
