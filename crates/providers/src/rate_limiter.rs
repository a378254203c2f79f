//! Sliding-window rate limiter with a separate daily token budget.
//!
//! Admission decisions never suspend: `acquire()` inspects a ring of recent
//! timestamps, trims anything older than 60s, and either admits or rejects.

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use sa_domain::config::RateLimiterConfig;
use sa_domain::error::{Error, Result};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

struct Inner {
    timestamps: VecDeque<Instant>,
    daily_used: u64,
    daily_date: Option<NaiveDate>,
}

pub struct RateLimiter {
    inner: Mutex<Inner>,
    requests_per_minute: u32,
    daily_limit: Option<u64>,
}

/// Point-in-time rate-limit state, mirroring the external-facing shape.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitState {
    pub requests_per_minute: u32,
    pub requests_remaining: u32,
    pub daily_limit: Option<u64>,
    pub daily_used: u64,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                timestamps: VecDeque::new(),
                daily_used: 0,
                daily_date: None,
            }),
            requests_per_minute: cfg.requests_per_minute,
            daily_limit: cfg.daily_limit,
        }
    }

    fn trim(timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) >= WINDOW {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn roll_day(inner: &mut Inner) {
        let today = Utc::now().date_naive();
        if inner.daily_date != Some(today) {
            inner.daily_date = Some(today);
            inner.daily_used = 0;
        }
    }

    /// Admit or reject a single request. Does not account tokens — call
    /// [`RateLimiter::record_usage`] once the token count is known.
    pub fn acquire(&self) -> Result<()> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        Self::roll_day(&mut inner);

        if let Some(limit) = self.daily_limit {
            if inner.daily_used >= limit {
                return Err(Error::RateLimit {
                    retry_after_secs: seconds_until_midnight_utc(),
                });
            }
        }

        Self::trim(&mut inner.timestamps, now);
        if inner.timestamps.len() as u32 >= self.requests_per_minute {
            let oldest = *inner.timestamps.front().expect("non-empty when at limit");
            let retry_after = WINDOW
                .checked_sub(now.duration_since(oldest))
                .unwrap_or(Duration::ZERO);
            return Err(Error::RateLimit {
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }

        inner.timestamps.push_back(now);
        Ok(())
    }

    /// Record tokens used by an admitted call against the daily budget.
    pub fn record_usage(&self, tokens_used: u64) {
        let mut inner = self.inner.lock();
        Self::roll_day(&mut inner);
        inner.daily_used += tokens_used;
    }

    pub fn state(&self) -> RateLimitState {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        Self::roll_day(&mut inner);
        Self::trim(&mut inner.timestamps, now);
        RateLimitState {
            requests_per_minute: self.requests_per_minute,
            requests_remaining: self
                .requests_per_minute
                .saturating_sub(inner.timestamps.len() as u32),
            daily_limit: self.daily_limit,
            daily_used: inner.daily_used,
        }
    }
}

fn seconds_until_midnight_utc() -> u64 {
    let now = Utc::now();
    let tomorrow = (now.date_naive() + chrono::Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .expect("valid midnight");
    let tomorrow_utc = tomorrow.and_utc();
    (tomorrow_utc - now).num_seconds().max(1) as u64
}
