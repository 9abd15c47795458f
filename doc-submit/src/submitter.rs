use std::sync::Arc;

use rate_gate::RateGate;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::Layer;
use tower::Service;
use tower::ServiceExt;
use tracing::debug;
use tracing::info;

use crate::Document;
use crate::GateLayer;
use crate::GateService;
use crate::HttpTransport;
use crate::Submission;
use crate::SubmissionResult;
use crate::SubmitError;
use crate::SubmitterConfig;

/// Submits documents through a shared [`RateGate`].
///
/// Clones share the gate, so any number of tasks may submit concurrently and
/// the combined request rate still never exceeds the gate's limit.
#[derive(Clone, Debug)]
pub struct DocumentSubmitter<T = HttpTransport> {
    service: GateService<T>,
}

impl DocumentSubmitter<HttpTransport> {
    /// Builds the gate and HTTP transport described by `config`.
    pub fn from_config(config: &SubmitterConfig) -> Result<Self, SubmitError> {
        config.validate()?;
        let gate = Arc::new(RateGate::new(config.window(), config.limit())?);
        let mut layer = GateLayer::new(gate);
        if let Some(max_wait) = config.max_wait() {
            layer = layer.with_max_wait(max_wait);
        }
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::with_layer(&layer, transport))
    }
}

impl<T> DocumentSubmitter<T>
where
    T: Service<Submission, Response = SubmissionResult, Error = SubmitError>
        + Clone
        + Send
        + 'static,
    T::Future: Send + 'static,
{
    pub fn new(gate: Arc<RateGate>, transport: T) -> Self {
        Self::with_layer(&GateLayer::new(gate), transport)
    }

    pub fn with_layer(layer: &GateLayer, transport: T) -> Self {
        Self {
            service: layer.layer(transport),
        }
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        self.service.gate()
    }

    /// Sends `document`, waiting for admission as long as it takes.
    ///
    /// Any HTTP status comes back as a [`SubmissionResult`]. Only failures to
    /// encode, to be admitted or to deliver are errors.
    pub async fn submit(
        &self,
        document: &Document,
        signature: &str,
    ) -> Result<SubmissionResult, SubmitError> {
        let submission = Submission::new(document.to_wire()?, signature);
        self.dispatch(submission).await
    }

    /// Like [`submit`](Self::submit), but gives up waiting for admission when
    /// `token` is cancelled. Once admitted the request is sent regardless.
    pub async fn submit_cancellable(
        &self,
        document: &Document,
        signature: &str,
        token: &CancellationToken,
    ) -> Result<SubmissionResult, SubmitError> {
        let submission =
            Submission::new(document.to_wire()?, signature).with_cancellation(token.clone());
        self.dispatch(submission).await
    }

    /// Like [`submit`](Self::submit), but gives up if not admitted by
    /// `deadline`.
    pub async fn submit_with_deadline(
        &self,
        document: &Document,
        signature: &str,
        deadline: Instant,
    ) -> Result<SubmissionResult, SubmitError> {
        let submission = Submission::new(document.to_wire()?, signature).with_deadline(deadline);
        self.dispatch(submission).await
    }

    async fn dispatch(&self, submission: Submission) -> Result<SubmissionResult, SubmitError> {
        let outcome = self.service.clone().oneshot(submission).await;
        match &outcome {
            Ok(result) => info!(status = result.status.as_u16(), "document submitted"),
            Err(SubmitError::Cancelled(reason)) => debug!(%reason, "submission abandoned"),
            Err(_) => {}
        }
        outcome
    }
}
