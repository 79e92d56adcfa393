//! Retry State Machine
//!
//! Transitions are pure; the fetcher owns the side effects (calling the
//! provider, sleeping, writing the cache).
//!
//! ```text
//! Attempting(n) --ok-------------------------> Succeeded
//! Attempting(n) --retryable, n <= max_retries-> Backoff(n+1) --> Attempting(n+1)
//! Attempting(n) --retryable, n >  max_retries-> Exhausted
//! Attempting(n) --not retryable--------------> Rejected
//! ```

use std::time::Duration;

use super::RetryPolicy;

/// Position of a single request in its retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt number `attempt` (1-based) is in flight
    Attempting { attempt: u32 },
    /// Waiting `delay` before attempt `next_attempt`
    Backoff { next_attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    /// Retryable failures used up the attempt budget
    Exhausted { attempts: u32 },
    /// A non-retryable failure ended the loop early
    Rejected { attempts: u32 },
}

impl RetryState {
    pub fn start() -> Self {
        RetryState::Attempting { attempt: 1 }
    }

    pub fn on_success(self) -> Self {
        match self {
            RetryState::Attempting { attempt } => RetryState::Succeeded { attempts: attempt },
            other => other,
        }
    }

    /// Transition after a failed attempt.
    ///
    /// The backoff delay is the un-jittered schedule value; jitter is
    /// applied by whoever performs the wait.
    pub fn on_failure(self, retryable: bool, policy: &RetryPolicy) -> Self {
        match self {
            RetryState::Attempting { attempt } if !retryable => {
                RetryState::Rejected { attempts: attempt }
            }
            RetryState::Attempting { attempt } if attempt > policy.max_retries => {
                RetryState::Exhausted { attempts: attempt }
            }
            RetryState::Attempting { attempt } => RetryState::Backoff {
                next_attempt: attempt + 1,
                delay: policy.delay_for_retry(attempt),
            },
            other => other,
        }
    }

    pub fn after_backoff(self) -> Self {
        match self {
            RetryState::Backoff { next_attempt, .. } => RetryState::Attempting {
                attempt: next_attempt,
            },
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded { .. }
                | RetryState::Exhausted { .. }
                | RetryState::Rejected { .. }
        )
    }
}
