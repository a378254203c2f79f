//! The provider-agnostic analyze contract every vendor adapter implements.

use sa_domain::capability::{ImageFormat, LlmCapabilities};
use sa_domain::error::Result;
use sa_domain::usage::Usage;
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One image attached to an analysis request.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

/// A provider-agnostic analysis request: a prompt plus optional images.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub prompt: String,
    pub images: Vec<ImageInput>,
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// The canonical response record every provider-native response is reduced
/// to before leaving the provider layer (see the normalizer).
#[derive(Debug, Clone)]
pub struct AnalysisResponse {
    /// Provider-prefixed unique id, e.g. `"claude-<uuid>"`.
    pub id: String,
    /// Length-capped response text.
    pub content: String,
    /// Normalized to `[0, 1]` and rounded to 3 decimal places.
    pub confidence: f64,
    pub tokens_used: Usage,
    pub response_time_ms: u64,
    pub model: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub metadata: HashMap<String, String>,
}

/// Result of a provider health probe.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: Option<u64>,
    pub message: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every vendor adapter (Anthropic, OpenAI-compatible, ...) implements.
///
/// An implementation wraps one configured provider instance: its own rate
/// limiter, circuit breaker, and HTTP client. Instances are created once and
/// shared; they must be safe for concurrent calls.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run the full validate → rate-limit → timeout → normalize sequence
    /// and return the canonical response.
    async fn analyze(&self, req: AnalysisRequest) -> Result<AnalysisResponse>;

    /// Cheap liveness probe; does not consume rate-limit budget.
    async fn health_check(&self) -> Result<HealthStatus>;

    /// Estimate the dollar cost of a completed call from its token usage,
    /// using this provider's documented input/output pricing split.
    fn get_cost(&self, usage: &Usage) -> f64;

    /// The advertised capabilities of this provider/model combination.
    fn capabilities(&self) -> &LlmCapabilities;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;
}
