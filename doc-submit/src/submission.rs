use std::fmt;

use reqwest::StatusCode;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// An encoded document on its way through the gated stack.
#[derive(Debug, Clone)]
pub struct Submission {
    /// JSON request body.
    pub body: String,
    /// Forwarded verbatim in the `Signature` header.
    pub signature: String,
    /// Abandons the admission wait when cancelled.
    pub cancel: Option<CancellationToken>,
    /// Abandons the admission wait at this instant.
    pub deadline: Option<Instant>,
}

impl Submission {
    pub fn new(body: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            signature: signature.into(),
            cancel: None,
            deadline: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// What the registry answered. Any status is returned as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub status: StatusCode,
    pub body: String,
}

impl fmt::Display for SubmissionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.status.as_u16(), self.body)
    }
}
