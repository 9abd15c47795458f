use rate_gate::GateError;

/// Errors produced while submitting a document.
///
/// Each error is scoped to a single submission; none of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The submitter or its gate was configured with unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The document could not be encoded as JSON.
    ///
    /// No admission is consumed.
    #[error("failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The request could not be delivered or its response could not be read.
    ///
    /// Covers refused connections, timeouts and interrupted transfers. The
    /// admission was already recorded when this happens.
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// The caller gave up while waiting for admission.
    ///
    /// Wraps either `GateError::Cancelled` or `GateError::DeadlineElapsed`.
    /// No admission is recorded and nothing was sent.
    #[error("admission abandoned: {0}")]
    Cancelled(#[source] GateError),
}

impl From<GateError> for SubmitError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::InvalidConfiguration(msg) => Self::InvalidConfiguration(msg),
            other => Self::Cancelled(other),
        }
    }
}

impl From<url::ParseError> for SubmitError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidConfiguration(format!("invalid registry url: {err}"))
    }
}
