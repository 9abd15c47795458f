use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tower::Service;
use tracing::warn;
use url::Url;

use crate::Submission;
use crate::SubmissionResult;
use crate::SubmitError;
use crate::SubmitterConfig;
use crate::config::as_base;

/// Path of the document creation endpoint, relative to the registry host.
pub const CREATE_DOCUMENT_PATH: &str = "api/v3/lk/documents/create";

/// Header carrying the caller supplied signature.
pub const SIGNATURE_HEADER: &str = "Signature";

/// POSTs submissions to the registry's document creation endpoint.
///
/// Every response is handed back unchanged, whatever its status.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(client: Client, host: &Url) -> Result<Self, SubmitError> {
        let endpoint = as_base(host.clone()).join(CREATE_DOCUMENT_PATH)?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &SubmitterConfig) -> Result<Self, SubmitError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(SubmitError::Transport)?;
        Self::new(client, config.host())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Service<Submission> for HttpTransport {
    type Response = SubmissionResult;
    type Error = SubmitError;
    type Future = Pin<Box<dyn Future<Output = Result<SubmissionResult, SubmitError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Submission) -> Self::Future {
        let request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, req.signature)
            .body(req.body);
        let endpoint = self.endpoint.clone();

        Box::pin(async move {
            let response = request.send().await.map_err(|err| {
                warn!(%endpoint, error = %err, "submission not delivered");
                SubmitError::Transport(err)
            })?;
            let status = response.status();
            let body = response.text().await.map_err(|err| {
                warn!(%endpoint, %status, error = %err, "response body interrupted");
                SubmitError::Transport(err)
            })?;
            Ok(SubmissionResult { status, body })
        })
    }
}
