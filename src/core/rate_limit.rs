//! Per-user request counting over a fixed window

use std::sync::Arc;
use std::time::Duration;

use crate::config::settings::LimitSettings;
use crate::store::KvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Admitted; `count` includes this request
    Allowed { count: u64 },
    /// Refused; the window already holds `count` requests
    Limited { count: u64 },
}

/// Counts requests per uid under `rate:<uid>`.
///
/// Reading and bumping the counter are two separate store calls, so two
/// simultaneous requests can both be admitted at the edge of the limit.
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    limit: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KvStore>, settings: &LimitSettings) -> Self {
        Self {
            store,
            limit: settings.rate_limit,
            window: settings.window(),
        }
    }

    fn key(uid: &str) -> String {
        format!("rate:{}", uid)
    }

    /// Check the counter for `uid` and, when admitted, record the request.
    ///
    /// Store failures never refuse a request.
    pub async fn admit(&self, uid: &str) -> RateDecision {
        let key = Self::key(uid);

        let count = match self.store.get(&key).await {
            Ok(value) => value.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(0),
            Err(e) => {
                tracing::warn!(uid, error = %e, "Failed to read rate counter");
                0
            }
        };

        if count >= self.limit {
            return RateDecision::Limited { count };
        }

        let next = count + 1;
        if let Err(e) = self.store.put(&key, &next.to_string(), self.window).await {
            tracing::warn!(uid, error = %e, "Failed to persist rate counter");
        }

        RateDecision::Allowed { count: next }
    }
}
