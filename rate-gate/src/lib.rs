//! # rate-gate
//!
//! `rate-gate` provides a rolling window admission gate: at most `limit`
//! operations are admitted within any trailing window of length `window`.
//!
//! ## Core Philosophy
//!
//! Excess callers are never dropped. They queue behind the gate and are
//! admitted, one per freed slot and in arrival order, as soon as the oldest
//! admission in the window ages out.
//!
//! ## Key Concepts
//!
//! * **Sliding Log**: The gate remembers the instant of each admission still
//!   inside the window, so the limit holds for every window position, not
//!   just on fixed bucket boundaries.
//! * **Turnstile**: Waiters form a FIFO queue. Only the head of the queue
//!   competes for a freed slot, which rules out starvation.
//! * **Cancellation**: Waiting can be bounded by a deadline or aborted with a
//!   [`CancellationToken`]; an aborted wait records nothing.
//! * **Non-waiting check**: [`RateGate::try_acquire`] admits immediately or reports
//!   how long to wait, as a `ControlFlow<Reason>`.
//!
//! ## Example
//!
//! ```rust
//! use rate_gate::RateGate;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), rate_gate::GateError> {
//! let gate = Arc::new(RateGate::new(Duration::from_secs(60), 5)?);
//!
//! // Waits (without dropping the request) once 5 admissions fall inside the last minute.
//! gate.acquire().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

mod error;
mod gate;
mod sliding_log;

pub use error::GateError;
pub use gate::RateGate;
pub use sliding_log::SlidingLog;
pub use tokio_util::sync::CancellationToken;

/// Reasons why a request might not be admitted straight away.
#[derive(Debug, PartialEq)]
pub enum Reason {
    Overloaded { retry_after: Duration },
}
