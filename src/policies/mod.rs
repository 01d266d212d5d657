//! Retry pacing for requests that timed out.
//!
//! - [`BackoffPolicy`] how the pause between two sends of the same request evolves
//! - [`JitterPolicy`]  randomization so that many students do not retry in lockstep
//!
//! ```text
//! send ──► Timeout ──► retry window open? ──► sleep(backoff.next(attempt)) ──► send
//!                              └─ closed ──► give up, report the timeout
//! ```
//!
//! `BackoffPolicy::default()` is a constant 100 ms without jitter.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
