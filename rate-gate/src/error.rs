/// Errors produced by a [`RateGate`](crate::RateGate).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The gate was constructed with a zero limit or a zero window.
    #[error("invalid gate configuration: {0}")]
    InvalidConfiguration(String),

    /// The caller's cancellation token fired before a slot was granted.
    ///
    /// No admission is recorded.
    #[error("cancelled while waiting for admission")]
    Cancelled,

    /// The caller's deadline passed before a slot was granted.
    ///
    /// No admission is recorded.
    #[error("deadline elapsed while waiting for admission")]
    DeadlineElapsed,
}

impl GateError {
    /// True for the errors raised by aborting a wait, as opposed to a bad gate.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineElapsed)
    }
}
