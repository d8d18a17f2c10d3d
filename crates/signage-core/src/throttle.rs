//! Login throttling keyed by (username, client address).
//!
//! Failed attempts are counted inside a fixed window that restarts on the
//! first failure after it lapses (no sliding window). Reaching the threshold
//! arms a lockout and clears the counter. The transition itself is pure
//! ([`ThrottlePolicy::next_record`]); [`LoginThrottle`] applies it against an
//! [`AttemptStore`].

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::CoreResult;

/// Thresholds for counting failures and locking out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Failures inside one window that trigger a lockout.
    pub max_attempts: u32,
    /// Length of the counting window, measured from the first failure.
    pub window_seconds: i64,
    /// How long a lockout lasts.
    pub lockout_seconds: i64,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,
            lockout_seconds: 600,
        }
    }
}

/// Persistent throttle state for one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttemptRecord {
    pub key: String,
    pub username: String,
    pub address: String,
    /// Consecutive failures in the current window.
    pub attempts: u32,
    /// Unix seconds of the first failure in the window, 0 when no window is open.
    pub first_failed_at: i64,
    /// Unix seconds until which logins are refused, 0 when not blocked.
    pub blocked_until: i64,
    pub updated_at: i64,
}

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Blocked { seconds_remaining: i64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// Seconds until a login may be attempted again (0 when allowed).
    pub fn seconds_remaining(&self) -> i64 {
        match self {
            Decision::Allowed => 0,
            Decision::Blocked { seconds_remaining } => *seconds_remaining,
        }
    }
}

/// Deterministic record key: SHA-256 hex of the lowercased, trimmed username
/// and the trimmed address.
pub fn fingerprint(username: &str, address: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(address.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

impl ThrottlePolicy {
    /// Decides whether a login may proceed given the stored record.
    ///
    /// A lockout in the past needs no clearing; it is superseded by the next
    /// failure.
    pub fn decide(&self, record: Option<&LoginAttemptRecord>, now: i64) -> Decision {
        match record {
            Some(r) if r.blocked_until > now => Decision::Blocked {
                seconds_remaining: r.blocked_until - now,
            },
            _ => Decision::Allowed,
        }
    }

    /// Computes the record that follows a failed attempt.
    ///
    /// Returns `None` when the failure is absorbed because a lockout is
    /// still running; the existing record must be left as is.
    pub fn next_record(
        &self,
        previous: Option<&LoginAttemptRecord>,
        username: &str,
        address: &str,
        now: i64,
    ) -> Option<LoginAttemptRecord> {
        if let Some(prev) = previous {
            if prev.blocked_until > now {
                return None;
            }
        }

        let (mut attempts, mut first_failed_at) = match previous {
            Some(prev)
                if prev.first_failed_at > 0
                    && now - prev.first_failed_at <= self.window_seconds =>
            {
                (prev.attempts + 1, prev.first_failed_at)
            }
            _ => (1, now),
        };

        let mut blocked_until = 0;
        if attempts >= self.max_attempts {
            blocked_until = now + self.lockout_seconds;
            attempts = 0;
            first_failed_at = 0;
        }

        Some(LoginAttemptRecord {
            key: fingerprint(username, address),
            username: username.to_string(),
            address: address.to_string(),
            attempts,
            first_failed_at,
            blocked_until,
            updated_at: now,
        })
    }
}

/// Storage seam for throttle records.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn find(&self, key: &str) -> CoreResult<Option<LoginAttemptRecord>>;
    async fn upsert(&self, record: &LoginAttemptRecord) -> CoreResult<()>;
    async fn remove(&self, key: &str) -> CoreResult<()>;
}

/// Applies a [`ThrottlePolicy`] against an [`AttemptStore`].
///
/// Failure registration is a read-modify-write; it runs under an async mutex
/// so concurrent failures in this process never lose an increment.
pub struct LoginThrottle<S> {
    store: S,
    policy: ThrottlePolicy,
    write_lock: Mutex<()>,
}

impl<S: AttemptStore> LoginThrottle<S> {
    pub fn new(store: S, policy: ThrottlePolicy) -> Self {
        Self {
            store,
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn check_allowed(&self, username: &str, address: &str) -> CoreResult<Decision> {
        self.check_allowed_at(username, address, now_unix()).await
    }

    pub async fn check_allowed_at(
        &self,
        username: &str,
        address: &str,
        now: i64,
    ) -> CoreResult<Decision> {
        let record = self.store.find(&fingerprint(username, address)).await?;
        Ok(self.policy.decide(record.as_ref(), now))
    }

    /// Records a failed attempt and returns the decision that now applies.
    pub async fn register_failure(&self, username: &str, address: &str) -> CoreResult<Decision> {
        self.register_failure_at(username, address, now_unix()).await
    }

    pub async fn register_failure_at(
        &self,
        username: &str,
        address: &str,
        now: i64,
    ) -> CoreResult<Decision> {
        let _guard = self.write_lock.lock().await;
        let key = fingerprint(username, address);
        let previous = self.store.find(&key).await?;

        match self.policy.next_record(previous.as_ref(), username, address, now) {
            Some(next) => {
                self.store.upsert(&next).await?;
                if next.blocked_until > 0 {
                    tracing::warn!(
                        username = %username.trim(),
                        address = %address.trim(),
                        lockout_seconds = self.policy.lockout_seconds,
                        "Login locked out after repeated failures"
                    );
                }
                Ok(self.policy.decide(Some(&next), now))
            }
            None => Ok(self.policy.decide(previous.as_ref(), now)),
        }
    }

    /// Forgets all failures for the pair. Called after a successful login.
    pub async fn clear_failures(&self, username: &str, address: &str) -> CoreResult<()> {
        self.store.remove(&fingerprint(username, address)).await
    }
}

/// Current time as unix seconds.
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
