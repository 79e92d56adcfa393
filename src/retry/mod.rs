//! Retry Module
//!
//! Exponential-backoff retry around upstream calls, fronted by the response
//! cache.
//!
//! # Components
//! - `RetryPolicy`: attempt budget and delay schedule
//! - `RetryState`: the attempt/backoff state machine
//! - `RetryingFetcher`: cache check, retry loop and cache fill

mod fetcher;
mod policy;
mod state;

pub use fetcher::RetryingFetcher;
pub use policy::RetryPolicy;
pub use state::RetryState;
