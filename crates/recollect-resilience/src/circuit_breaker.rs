// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Circuit breaker for external provider calls.
//!
//! State machine: Closed -> Open -> HalfOpen
//! - Closed: calls pass; consecutive failures are counted.
//! - Open: calls are rejected until the cooldown elapses.
//! - HalfOpen: exactly one trial call is admitted. Success closes the
//!   breaker, failure reopens it for a fresh cooldown.
//!
//! All state lives behind one mutex. Time comes from `tokio::time` so tests
//! can pause and advance the clock.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use strum::Display;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Current state of a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Thresholds for a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before admitting a trial.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Point-in-time view of breaker bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Number of times the breaker has opened.
    pub trips: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Set while a half-open trial is outstanding.
    trial_started: Option<Instant>,
    trips: u64,
}

/// Closed/Open/HalfOpen breaker guarding one provider.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_started: None,
                trips: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Whether a call may proceed right now.
    ///
    /// An open breaker whose cooldown has elapsed moves to half-open and
    /// admits the caller as its single trial. While that trial is
    /// outstanding every other caller is rejected. A trial that never
    /// reports back is abandoned after one cooldown so the breaker cannot
    /// wedge in half-open.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        let now = Instant::now();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = inner
                    .opened_at
                    .is_none_or(|opened| now.duration_since(opened) >= self.config.cooldown);
                if cooled {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_started = Some(now);
                    debug!(breaker = %self.name, "cooldown elapsed, admitting trial");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                let stale = inner
                    .trial_started
                    .is_none_or(|started| now.duration_since(started) >= self.config.cooldown);
                if stale {
                    inner.trial_started = Some(now);
                    debug!(breaker = %self.name, "previous trial abandoned, admitting another");
                }
                stale
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.trial_started = None;
                info!(breaker = %self.name, "trial succeeded, circuit closed");
            }
            CircuitState::Open => {
                // A call admitted before the trip finished late.
                debug!(breaker = %self.name, "success recorded while open; ignoring");
            }
        }
    }

    /// Record a failed call. Returns `true` when this failure opened the
    /// breaker.
    pub fn record_failure(&self) -> bool {
        let mut inner = self.lock();
        let now = Instant::now();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                    inner.trips += 1;
                    warn!(
                        breaker = %self.name,
                        failures = inner.consecutive_failures,
                        threshold = self.config.failure_threshold,
                        cooldown_secs = self.config.cooldown.as_secs_f64(),
                        "circuit breaker tripped, transitioning to Open"
                    );
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
                inner.trial_started = None;
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                inner.trips += 1;
                warn!(breaker = %self.name, "trial failed, circuit reopened");
                true
            }
            CircuitState::Open => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                false
            }
        }
    }

    /// The stored state. An open breaker reports `Open` until a caller
    /// actually takes the trial slot.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            trips: inner.trips,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        // Every transition leaves the state consistent, so a poisoned lock
        // is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
