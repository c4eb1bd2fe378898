//! Circuit breaker guarding calls to the external scorer

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Breaker state
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation
    Closed,
    /// Rejecting all calls
    Open,
    /// Letting calls through to test recovery
    HalfOpen,
}

/// Snapshot of a breaker
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CircuitBreakerState {
    /// Breaker name
    pub id: String,
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures while closed
    pub failure_count: u32,
    /// Failures that trip the breaker
    pub failure_threshold: u32,
    /// Successes seen while half-open
    pub success_count: u32,
    /// Successes that close the breaker again
    pub recovery_threshold: u32,
    /// Time of the most recent failure
    pub last_failure_time: Option<DateTime<Utc>>,
    /// Seconds to stay open before probing
    pub timeout_duration: i64,
}

/// Circuit breaker
pub struct CircuitBreaker {
    state: Arc<RwLock<CircuitBreakerState>>,
}

impl CircuitBreaker {
    /// Create breaker with explicit thresholds
    pub fn with_config(
        id: impl Into<String>,
        failure_threshold: u32,
        recovery_threshold: u32,
        timeout_seconds: i64,
    ) -> Self {
        CircuitBreaker {
            state: Arc::new(RwLock::new(CircuitBreakerState {
                id: id.into(),
                state: CircuitState::Closed,
                failure_count: 0,
                failure_threshold,
                success_count: 0,
                recovery_threshold,
                last_failure_time: None,
                timeout_duration: timeout_seconds,
            })),
        }
    }

    /// Execute `f` with breaker protection
    pub async fn call<F, T, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        {
            let mut state = self.state.write().await;
            if state.state == CircuitState::Open {
                if Self::should_attempt_reset(&state) {
                    info!("Circuit breaker {} transitioning to HalfOpen", state.id);
                    state.state = CircuitState::HalfOpen;
                    state.success_count = 0;
                } else {
                    warn!("Circuit breaker {} is OPEN, rejecting call", state.id);
                    return Err(Error::CircuitOpen(state.id.clone()));
                }
            }
        }

        match f().await {
            Ok(result) => {
                self.on_success().await;
                Ok(result)
            }
            Err(e) => {
                self.on_failure().await;
                Err(e)
            }
        }
    }

    /// Record a successful call
    pub async fn on_success(&self) {
        let mut state = self.state.write().await;

        match state.state {
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= state.recovery_threshold {
                    info!(
                        "Circuit breaker {} recovered - transitioning to Closed",
                        state.id
                    );
                    state.state = CircuitState::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                }
            }
            CircuitState::Closed => {
                state.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call
    pub async fn on_failure(&self) {
        let mut state = self.state.write().await;
        state.last_failure_time = Some(Utc::now());

        match state.state {
            CircuitState::Closed => {
                state.failure_count += 1;
                if state.failure_count >= state.failure_threshold {
                    warn!(
                        "Circuit breaker {} TRIPPED - transitioning to Open (failures: {})",
                        state.id, state.failure_count
                    );
                    state.state = CircuitState::Open;
                }
            }
            CircuitState::HalfOpen => {
                warn!(
                    "Circuit breaker {} failed in HalfOpen - back to Open",
                    state.id
                );
                state.state = CircuitState::Open;
                state.failure_count = 0;
                state.success_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Manually close the breaker
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        info!("Circuit breaker {} manually reset to Closed", state.id);
        state.state = CircuitState::Closed;
        state.failure_count = 0;
        state.success_count = 0;
        state.last_failure_time = None;
    }

    /// Current snapshot
    pub async fn get_state(&self) -> CircuitBreakerState {
        self.state.read().await.clone()
    }

    fn should_attempt_reset(state: &CircuitBreakerState) -> bool {
        match state.last_failure_time {
            Some(last_failure) => {
                (Utc::now() - last_failure).num_seconds() >= state.timeout_duration
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_failures() {
        let cb = CircuitBreaker::with_config("test", 3, 2, 60);

        for _ in 0..3 {
            let result: Result<()> = cb
                .call(|| async { Err(Error::SignalUnavailable("down".to_string())) })
                .await;
            assert!(result.is_err());
        }

        assert_eq!(cb.get_state().await.state, CircuitState::Open);

        // Open breaker rejects without running the call
        let result: Result<u32> = cb.call(|| async { Ok(1) }).await;
        assert!(matches!(result, Err(Error::CircuitOpen(_))));
    }

    #[tokio::test]
    async fn test_circuit_breaker_recovers() {
        let cb = CircuitBreaker::with_config("test", 3, 2, 0);

        for _ in 0..3 {
            cb.on_failure().await;
        }

        let result: Result<()> = cb.call(|| async { Ok(()) }).await;
        assert!(result.is_ok());
        assert_eq!(cb.get_state().await.state, CircuitState::HalfOpen);

        let result: Result<()> = cb.call(|| async { Ok(()) }).await;
        assert!(result.is_ok());
        assert_eq!(cb.get_state().await.state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_circuit_breaker_reset() {
        let cb = CircuitBreaker::with_config("test", 1, 1, 3600);
        cb.on_failure().await;
        assert_eq!(cb.get_state().await.state, CircuitState::Open);

        cb.reset().await;
        let state = cb.get_state().await;
        assert_eq!(state.state, CircuitState::Closed);
        assert!(state.last_failure_time.is_none());
    }
}
