//! Correlation ("state") management for the authorization flow.
//!
//! Ties a provider callback to the login redirect that initiated it, so
//! callbacks this process never asked for are rejected.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-flight login attempt (tracks the issued state parameter)
#[derive(Clone, Debug)]
struct AttemptEntry {
    created_at: DateTime<Utc>,
}

/// Registry of in-flight login attempts with automatic expiration.
///
/// Each issued state is single-use: verification consumes it.
#[derive(Clone)]
pub struct AttemptRegistry {
    attempts: Arc<Mutex<HashMap<String, AttemptEntry>>>,
    expiry_duration: Duration,
}

impl AttemptRegistry {
    /// Create a new registry
    ///
    /// # Arguments
    /// * `expiry_seconds` - How long issued states remain valid (default: 600 = 10 minutes)
    pub fn new(expiry_seconds: i64) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(HashMap::new())),
            expiry_duration: Duration::seconds(expiry_seconds),
        }
    }

    /// Issue a new state token and register the attempt
    ///
    /// Returns the state token (UUID v4)
    pub fn issue(&self) -> String {
        let state = Uuid::new_v4().to_string();
        let entry = AttemptEntry {
            created_at: Utc::now(),
        };

        let mut attempts = self.attempts.lock().unwrap();
        attempts.insert(state.clone(), entry);

        state
    }

    /// Verify and consume a state token
    ///
    /// Returns true when the state belongs to a live attempt. The entry is
    /// removed either way (single-use).
    pub fn verify_and_consume(&self, state: &str) -> bool {
        let mut attempts = self.attempts.lock().unwrap();

        let Some(entry) = attempts.remove(state) else {
            return false;
        };

        Utc::now() - entry.created_at <= self.expiry_duration
    }

    /// Drop expired attempts (called periodically)
    pub fn cleanup_expired(&self) {
        let mut attempts = self.attempts.lock().unwrap();
        let now = Utc::now();

        attempts.retain(|_, entry| now - entry.created_at <= self.expiry_duration);
    }

    /// Count of live attempts (for debugging/monitoring)
    pub fn count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

/// Background task to periodically drop expired login attempts
pub async fn run_attempt_cleanup(registry: AttemptRegistry, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        registry.cleanup_expired();
        tracing::debug!(
            "login attempt cleanup complete, {} attempts in flight",
            registry.count()
        );
    }
}

/// How callbacks are correlated with login redirects.
///
/// `PerAttempt` is the default: a random single-use state per login.
/// `SharedSecret` reuses one configured value for every login; it is
/// replay-prone across concurrent logins and exists only as an explicit
/// low-security option.
#[derive(Clone)]
pub enum CorrelationGuard {
    PerAttempt(AttemptRegistry),
    SharedSecret(String),
}

impl CorrelationGuard {
    /// State value for a new login redirect
    pub fn issue(&self) -> String {
        match self {
            CorrelationGuard::PerAttempt(registry) => registry.issue(),
            CorrelationGuard::SharedSecret(secret) => secret.clone(),
        }
    }

    /// Check a callback's echoed state.
    ///
    /// Per-attempt states are consumed by the check; the shared secret is
    /// compared and kept.
    pub fn verify_and_consume(&self, state: &str) -> bool {
        match self {
            CorrelationGuard::PerAttempt(registry) => registry.verify_and_consume(state),
            CorrelationGuard::SharedSecret(secret) => secret == state,
        }
    }
}
