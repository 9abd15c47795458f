use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use opentelemetry::metrics::Histogram;
use rate_gate::GateError;
use rate_gate::RateGate;
use tokio::time::Instant;
use tower::Service;
use tracing::debug;

use crate::Submission;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

#[derive(Clone, Debug)]
struct GateServiceMetrics {
    admitted: Counter<u64>,
    abandoned: Counter<u64>,
    wait: Histogram<f64>,
}

impl GateServiceMetrics {
    fn new() -> Self {
        let meter = global::meter("doc_submit");
        Self {
            admitted: meter.u64_counter("gate_admitted").build(),
            abandoned: meter.u64_counter("gate_abandoned").build(),
            wait: meter
                .f64_histogram("gate_wait")
                .with_unit("s")
                .with_description("Time spent waiting for admission")
                .build(),
        }
    }

    fn record(&self, outcome: &Result<(), GateError>, waited: Duration) {
        match outcome {
            Ok(()) => {
                self.admitted.add(1, &[]);
                self.wait.record(waited.as_secs_f64(), &[]);
            }
            Err(err) => {
                let reason = match err {
                    GateError::Cancelled => "cancelled",
                    GateError::DeadlineElapsed => "deadline",
                    GateError::InvalidConfiguration(_) => "configuration",
                };
                self.abandoned.add(1, &[KeyValue::new("reason", reason)]);
            }
        }
    }
}

/// Waits on a shared [`RateGate`] before handing each submission to the inner
/// service.
///
/// The admission is taken inside `call`, where the submission's own deadline
/// and cancellation token are known. Readiness is delegated to the inner
/// service.
#[derive(Clone, Debug)]
pub struct GateService<S> {
    inner: S,
    gate: Arc<RateGate>,
    max_wait: Option<Duration>,
    instruments: GateServiceMetrics,
}

impl<S> GateService<S> {
    pub fn new(inner: S, gate: Arc<RateGate>) -> Self {
        Self {
            inner,
            gate,
            max_wait: None,
            instruments: GateServiceMetrics::new(),
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }
}

impl<S> Service<Submission> for GateService<S>
where
    S: Service<Submission> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: From<GateError> + Send + 'static,
    S::Response: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Submission) -> Self::Future {
        // The instance driven to readiness is the one that must serve this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = Arc::clone(&self.gate);
        let instruments = self.instruments.clone();
        let deadline = earliest(
            req.deadline,
            // A wait too long to express as an instant is no bound at all.
            self.max_wait
                .and_then(|max_wait| Instant::now().checked_add(max_wait)),
        );

        Box::pin(async move {
            let start = Instant::now();
            let outcome = admit(&gate, &req, deadline).await;
            instruments.record(&outcome, start.elapsed());
            outcome?;

            debug!(waited = ?start.elapsed(), "submission admitted");
            inner.call(req).await
        })
    }
}

async fn admit(
    gate: &RateGate,
    req: &Submission,
    deadline: Option<Instant>,
) -> Result<(), GateError> {
    let wait = async {
        match deadline {
            Some(deadline) => gate.acquire_until(deadline).await,
            None => {
                gate.acquire().await;
                Ok(())
            }
        }
    };

    match &req.cancel {
        Some(token) => {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(GateError::Cancelled),
                outcome = wait => outcome,
            }
        }
        None => wait.await,
    }
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
