use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::models::security::{RequestMeta, SecurityEvent, SecurityEventKind};
use crate::error::AppError;

pub const TOO_MANY_ATTEMPTS: &str = "Too many attempts. Please try again later.";

/// Counter storage for fixed attempt windows.
pub trait AttemptStore: Send + Sync {
    /// Counts one attempt for `key` and returns the attempts seen in the current
    /// window together with the time left until that window closes.
    fn hit(&self, key: &str, window: Duration, now: Instant) -> (u32, Duration);

    /// Drops windows that closed before `now`. Returns how many were removed.
    fn purge_expired(&self, now: Instant) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct AttemptWindow {
    count: u32,
    resets_at: Instant,
}

#[derive(Default)]
pub struct InMemoryAttemptStore {
    windows: DashMap<String, AttemptWindow>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl AttemptStore for InMemoryAttemptStore {
    fn hit(&self, key: &str, window: Duration, now: Instant) -> (u32, Duration) {
        let mut entry = self.windows.entry(key.to_string()).or_insert(AttemptWindow {
            count: 0,
            resets_at: now + window,
        });

        if now >= entry.resets_at {
            entry.count = 0;
            entry.resets_at = now + window;
        }
        entry.count = entry.count.saturating_add(1);

        (entry.count, entry.resets_at.saturating_duration_since(now))
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| w.resets_at > now);
        before.saturating_sub(self.windows.len())
    }
}

/// Throttles sensitive operations per (client IP, user) pair.
pub struct SensitiveOpLimiter {
    store: Arc<dyn AttemptStore>,
    max_attempts: u32,
    window: Duration,
}

impl SensitiveOpLimiter {
    pub fn new(store: Arc<dyn AttemptStore>, max_attempts: u32, window: Duration) -> Self {
        Self { store, max_attempts, window }
    }

    pub fn store(&self) -> &Arc<dyn AttemptStore> {
        &self.store
    }

    pub fn check(&self, meta: &RequestMeta, user_id: Option<&str>) -> Result<(), AppError> {
        self.check_at(meta, user_id, Instant::now())
    }

    pub fn check_at(&self, meta: &RequestMeta, user_id: Option<&str>, now: Instant) -> Result<(), AppError> {
        let key = format!("{}:{}", meta.ip, user_id.unwrap_or("anonymous"));
        let (count, retry_after) = self.store.hit(&key, self.window, now);

        if count <= self.max_attempts {
            return Ok(());
        }

        let mut event = SecurityEvent::new(SecurityEventKind::RateLimitExceeded, meta)
            .context(json!({ "attempts": count, "max_attempts": self.max_attempts }));
        if let Some(id) = user_id {
            event = event.user(id);
        }
        event.record();

        Err(AppError::RateLimited {
            message: TOO_MANY_ATTEMPTS.to_string(),
            retry_after_secs: retry_after.as_secs().max(1),
        })
    }
}
