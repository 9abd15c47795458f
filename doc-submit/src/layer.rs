use std::sync::Arc;
use std::time::Duration;

use rate_gate::RateGate;
use tower::Layer;

use crate::service::GateService;

/// Applies rolling window admission to submissions.
#[derive(Clone, Debug)]
pub struct GateLayer {
    gate: Arc<RateGate>,
    max_wait: Option<Duration>,
}

impl GateLayer {
    /// Create a GateLayer. All services it produces share `gate`.
    pub fn new(gate: Arc<RateGate>) -> Self {
        GateLayer {
            gate,
            max_wait: None,
        }
    }

    /// Bound how long any single submission may wait for admission.
    ///
    /// A submission that is not admitted in time fails with
    /// `GateError::DeadlineElapsed` and is never sent. A tighter per-submission
    /// deadline still wins.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = GateService<S>;

    fn layer(&self, service: S) -> Self::Service {
        let mut svc = GateService::new(service, Arc::clone(&self.gate));
        if let Some(max_wait) = self.max_wait {
            svc = svc.with_max_wait(max_wait);
        }
        svc
    }
}
