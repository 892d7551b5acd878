use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Spaces outgoing store requests at least `1 / rate` seconds apart.
///
/// The lock is held while sleeping so concurrent callers queue up in order.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 && requests_per_second.is_finite() {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            tracing::warn!(
                "Store rate limit is {requests_per_second} req/s, requests will not be spaced"
            );
            Duration::ZERO
        };
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        let previous: Option<Instant> = *last;
        if let Some(remaining) = previous.and_then(|t| self.min_interval.checked_sub(t.elapsed())) {
            tokio::time::sleep(remaining).await;
        }
        *last = Some(Instant::now());
    }
}
