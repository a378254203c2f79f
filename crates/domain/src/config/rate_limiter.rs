use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rate limiter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-provider sliding-window rate limit plus an optional daily token
/// budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Admissions allowed in any trailing 60-second window.
    #[serde(default = "d_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Total tokens allowed per UTC day; `None` disables the daily budget.
    #[serde(default)]
    pub daily_limit: Option<u64>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: d_requests_per_minute(),
            daily_limit: None,
        }
    }
}

fn d_requests_per_minute() -> u32 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requests_per_minute() {
        assert_eq!(RateLimiterConfig::default().requests_per_minute, 60);
    }

    #[test]
    fn default_has_no_daily_limit() {
        assert!(RateLimiterConfig::default().daily_limit.is_none());
    }

    #[test]
    fn deserialize_with_daily_limit() {
        let cfg: RateLimiterConfig =
            serde_json::from_str(r#"{"requests_per_minute": 1, "daily_limit": 100000}"#).unwrap();
        assert_eq!(cfg.requests_per_minute, 1);
        assert_eq!(cfg.daily_limit, Some(100_000));
    }
}
