//! Anthropic Messages API adapter.
//!
//! Builds a single-user-message request with text + base64 image content
//! blocks and reduces the response to the canonical [`AnalysisResponse`].

use crate::circuit_breaker::CircuitBreaker;
use crate::history::{CallOutcome, RequestHistory};
use crate::normalizer::{normalize, RawExtraction};
use crate::rate_limiter::RateLimiter;
use crate::traits::{AnalysisRequest, AnalysisResponse, HealthStatus, ImageInput, LlmProvider};
use crate::util::{from_reqwest, resolve_api_key};
use sa_domain::capability::{ImageFormat, LlmCapabilities};
use sa_domain::config::{CircuitBreakerConfig, ModelPricing, ProviderConfig, RateLimiterConfig};
use sa_domain::error::{Error, Result};
use sa_domain::usage::Usage;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_CONTENT_LENGTH: usize = 20_000;

pub struct AnthropicProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    capabilities: LlmCapabilities,
    client: reqwest::Client,
    circuit_breaker: CircuitBreaker,
    rate_limiter: RateLimiter,
    history: RequestHistory,
    pricing: HashMap<String, ModelPricing>,
    timeout_ms: u64,
}

impl AnthropicProvider {
    pub fn from_config(
        cfg: &ProviderConfig,
        cb_cfg: CircuitBreakerConfig,
        rl_cfg: RateLimiterConfig,
        pricing: HashMap<String, ModelPricing>,
        timeout_ms: u64,
    ) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let default_model = cfg
            .default_model
            .clone()
            .unwrap_or_else(|| "claude-sonnet-4-20250514".into());

        let capabilities = LlmCapabilities {
            supports_vision: true,
            supports_streaming: true,
            max_image_bytes: Some(5 * 1024 * 1024),
            allowed_image_formats: vec![
                ImageFormat::Jpeg,
                ImageFormat::Png,
                ImageFormat::Gif,
                ImageFormat::Webp,
            ],
            max_prompt_chars: Some(200_000),
            min_output_tokens: 1,
            max_output_tokens: Some(8_192),
            max_images_per_call: 20,
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            capabilities,
            client,
            circuit_breaker: CircuitBreaker::new(cb_cfg),
            rate_limiter: RateLimiter::new(rl_cfg),
            history: RequestHistory::new(),
            pricing,
            timeout_ms,
        })
    }

    fn validate(&self, req: &AnalysisRequest) -> Result<()> {
        if req.prompt.is_empty() && req.images.is_empty() {
            return Err(Error::ValidationFailure(
                "request must contain a prompt or at least one image".into(),
            ));
        }
        if let Some(max_chars) = self.capabilities.max_prompt_chars {
            if req.prompt.chars().count() > max_chars {
                return Err(Error::ValidationFailure(format!(
                    "prompt exceeds {max_chars} character limit"
                )));
            }
        }
        if req.images.len() as u32 > self.capabilities.max_images_per_call {
            return Err(Error::ValidationFailure(format!(
                "request has {} images, provider '{}' allows at most {}",
                req.images.len(),
                self.id,
                self.capabilities.max_images_per_call
            )));
        }
        for image in &req.images {
            if !self.capabilities.accepts_image_format(image.format) {
                return Err(Error::ValidationFailure(format!(
                    "image format {:?} is not supported by provider '{}'",
                    image.format, self.id
                )));
            }
            if let Some(max_bytes) = self.capabilities.max_image_bytes {
                if image.data.len() as u64 > max_bytes {
                    return Err(Error::ValidationFailure(format!(
                        "image is {} bytes, provider '{}' allows at most {max_bytes}",
                        image.data.len(),
                        self.id
                    )));
                }
            }
        }
        if let Some(max_tokens) = req.max_tokens {
            if !self.capabilities.accepts_output_tokens(max_tokens) {
                return Err(Error::ValidationFailure(format!(
                    "max_tokens {max_tokens} outside provider '{}' accepted range",
                    self.id
                )));
            }
        }
        Ok(())
    }

    fn build_body(&self, req: &AnalysisRequest) -> Value {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut content: Vec<Value> = Vec::new();
        if !req.prompt.is_empty() {
            content.push(serde_json::json!({"type": "text", "text": req.prompt}));
        }
        for image in &req.images {
            content.push(image_block(image));
        }

        let max_tokens = req
            .max_tokens
            .unwrap_or(self.capabilities.max_output_tokens.unwrap_or(4096));

        let mut body = serde_json::json!({
            "model": model,
            "messages": [{"role": "user", "content": content}],
            "max_tokens": max_tokens,
        });
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }

    async fn call_api(&self, req: &AnalysisRequest) -> Result<RawExtraction> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_body(req);

        tracing::debug!(provider = %self.id, url = %url, "anthropic analyze request");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(classify_http_error(&self.id, status.as_u16(), &resp_text));
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        extract_raw(&resp_json, req.prompt.chars().count())
    }
}

fn image_block(image: &ImageInput) -> Value {
    use base64::Engine;
    let data = base64::engine::general_purpose::STANDARD.encode(&image.data);
    serde_json::json!({
        "type": "image",
        "source": {
            "type": "base64",
            "media_type": image.format.mime_type(),
            "data": data,
        }
    })
}

fn classify_http_error(provider: &str, status: u16, body: &str) -> Error {
    match status {
        401 | 403 => Error::Configuration(format!(
            "provider '{provider}' rejected credentials (HTTP {status}): {body}"
        )),
        429 => Error::RateLimit {
            retry_after_secs: parse_retry_after(body).unwrap_or(60),
        },
        400..=499 => Error::Configuration(format!(
            "provider '{provider}' HTTP {status}: {body}"
        )),
        _ => Error::Analysis(format!("provider '{provider}' HTTP {status}: {body}")),
    }
}

fn parse_retry_after(body: &str) -> Option<u64> {
    if body.to_lowercase().contains("rate limit") {
        Some(60)
    } else {
        None
    }
}

fn extract_raw(body: &Value, prompt_chars: usize) -> Result<RawExtraction> {
    let content = body
        .get("content")
        .and_then(|v| v.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(|v| v.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let usage = body.get("usage").and_then(|v| {
        let input = v.get("input_tokens")?.as_u64()? as u32;
        let output = v.get("output_tokens")?.as_u64()? as u32;
        Some(Usage {
            prompt_tokens: input,
            completion_tokens: output,
            total_tokens: input + output,
        })
    });

    let mut metadata = HashMap::new();
    if let Some(stop_reason) = body.get("stop_reason").and_then(|v| v.as_str()) {
        metadata.insert("stop_reason".to_string(), stop_reason.to_string());
    }

    Ok(RawExtraction {
        content,
        usage,
        prompt_chars,
        confidence: None,
        model,
        metadata,
    })
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn analyze(&self, req: AnalysisRequest) -> Result<AnalysisResponse> {
        self.validate(&req)?;
        self.rate_limiter.acquire()?;

        let start = Instant::now();
        let result = self
            .circuit_breaker
            .execute(&self.id, || self.call_api(&req))
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        self.history.record(CallOutcome {
            timestamp: chrono::Utc::now(),
            success: result.is_ok(),
            latency_ms: elapsed_ms,
        });

        let raw = result?;
        let response = normalize(&self.id, raw, elapsed_ms, MAX_CONTENT_LENGTH);
        self.rate_limiter
            .record_usage(response.tokens_used.total_tokens as u64);
        Ok(response)
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        let start = Instant::now();
        let url = format!("{}/v1/models", self.base_url);
        let result = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus {
                healthy: true,
                latency_ms: Some(latency_ms),
                message: None,
            }),
            Ok(resp) => Ok(HealthStatus {
                healthy: false,
                latency_ms: Some(latency_ms),
                message: Some(format!("HTTP {}", resp.status().as_u16())),
            }),
            Err(e) => Ok(HealthStatus {
                healthy: false,
                latency_ms: Some(latency_ms),
                message: Some(e.to_string()),
            }),
        }
    }

    fn get_cost(&self, usage: &Usage) -> f64 {
        let pricing = match self.pricing.get(&self.default_model) {
            Some(p) => p,
            None => return 0.0,
        };
        pricing.estimate_cost(usage.prompt_tokens, usage.completion_tokens)
    }

    fn capabilities(&self) -> &LlmCapabilities {
        &self.capabilities
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_raw_pulls_text_and_usage() {
        let body = serde_json::json!({
            "content": [{"type": "text", "text": "hello world"}],
            "model": "claude-sonnet-4-20250514",
            "usage": {"input_tokens": 10, "output_tokens": 5},
            "stop_reason": "end_turn",
        });
        let raw = extract_raw(&body, 20).unwrap();
        assert_eq!(raw.content, "hello world");
        assert_eq!(raw.usage.unwrap().total_tokens, 15);
        assert_eq!(raw.metadata.get("stop_reason").unwrap(), "end_turn");
    }

    #[test]
    fn classify_auth_error() {
        let err = classify_http_error("claude", 401, "bad key");
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn classify_rate_limit_error() {
        let err = classify_http_error("claude", 429, "rate limit exceeded");
        assert!(matches!(err, Error::RateLimit { retry_after_secs: 60 }));
    }

    #[test]
    fn classify_server_error_as_analysis() {
        let err = classify_http_error("claude", 503, "unavailable");
        assert!(matches!(err, Error::Analysis(_)));
    }

    #[test]
    fn classify_other_4xx_as_configuration() {
        let err = classify_http_error("claude", 404, "not found");
        assert!(matches!(err, Error::Configuration(_)));
    }
}
