use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use tokio::time::Instant;
use tokio::time::sleep;
use tokio::time::timeout_at;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use super::GateError;
use super::Reason;
use super::SlidingLog;

/// A rolling window admission gate.
///
/// Admits at most `limit` operations within any trailing `window`. Callers that
/// find the window saturated wait for the oldest admission to age out instead
/// of being rejected.
///
/// Waiters pass through a FIFO turnstile: only the head of the queue competes
/// for a freed slot, so exactly one caller is admitted per freed slot and every
/// waiter is eventually admitted. The admission log itself sits behind a short
/// lived lock that is never held while sleeping.
///
/// Share one gate per global limit with `Arc<RateGate>`.
#[derive(Debug)]
pub struct RateGate {
    limit: NonZeroUsize,
    window: Duration,
    log: Mutex<SlidingLog>,
    turnstile: tokio::sync::Mutex<()>,
}

impl RateGate {
    /// Creates a gate admitting `limit` operations per rolling `window`.
    ///
    /// # Errors
    ///
    /// Returns `GateError::InvalidConfiguration` if `limit` or `window` is zero.
    pub fn new(window: Duration, limit: usize) -> Result<Self, GateError> {
        let limit = NonZeroUsize::new(limit).ok_or_else(|| {
            GateError::InvalidConfiguration("request limit must be positive".to_string())
        })?;
        if window.is_zero() {
            return Err(GateError::InvalidConfiguration(
                "window duration must be positive".to_string(),
            ));
        }

        Ok(Self {
            limit,
            window,
            log: Mutex::new(SlidingLog::new(limit, window)),
            turnstile: tokio::sync::Mutex::new(()),
        })
    }

    pub fn limit(&self) -> NonZeroUsize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of slots free right now. Does not admit anything.
    pub fn available(&self) -> usize {
        self.log().available(Instant::now())
    }

    /// Waits until admission is safe, then records it.
    ///
    /// Dropping the returned future before it completes records nothing.
    pub async fn acquire(&self) {
        let _turn = self.turnstile.lock().await;

        loop {
            match self.admit() {
                ControlFlow::Continue(()) => return,
                ControlFlow::Break(Reason::Overloaded { retry_after }) => {
                    debug!(?retry_after, limit = self.limit.get(), "window saturated");
                    sleep(retry_after).await;
                }
            }
        }
    }

    /// Like [`acquire`](Self::acquire), giving up at `deadline`.
    ///
    /// # Errors
    ///
    /// Returns `GateError::DeadlineElapsed` if no slot was granted in time.
    pub async fn acquire_until(&self, deadline: Instant) -> Result<(), GateError> {
        timeout_at(deadline, self.acquire()).await.map_err(|_| {
            debug!("admission deadline elapsed");
            GateError::DeadlineElapsed
        })
    }

    /// Like [`acquire`](Self::acquire), giving up after `timeout`.
    ///
    /// A timeout too large to express as an instant never elapses.
    ///
    /// # Errors
    ///
    /// Returns `GateError::DeadlineElapsed` if no slot was granted in time.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<(), GateError> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.acquire_until(deadline).await,
            None => {
                self.acquire().await;
                Ok(())
            }
        }
    }

    /// Like [`acquire`](Self::acquire), giving up when `token` is cancelled.
    ///
    /// An already cancelled token fails even if a slot is free.
    ///
    /// # Errors
    ///
    /// Returns `GateError::Cancelled` if the token fired first.
    pub async fn acquire_cancellable(&self, token: &CancellationToken) -> Result<(), GateError> {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!("admission wait cancelled");
                Err(GateError::Cancelled)
            }
            () = self.acquire() => Ok(()),
        }
    }

    /// Blocking counterpart of [`acquire`](Self::acquire) for plain threads.
    ///
    /// Joins the same FIFO queue as async callers.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn acquire_blocking(&self) {
        let _turn = self.turnstile.blocking_lock();

        loop {
            match self.admit() {
                ControlFlow::Continue(()) => return,
                ControlFlow::Break(Reason::Overloaded { retry_after }) => {
                    debug!(?retry_after, limit = self.limit.get(), "window saturated");
                    std::thread::sleep(retry_after);
                }
            }
        }
    }

    /// Admits immediately if a slot is free and nobody is queued ahead.
    ///
    /// Never waits.
    ///
    /// # Errors
    ///
    /// Returns `Reason::Overloaded` with a hint of how long to wait otherwise.
    /// The hint is zero when a slot is free but another caller holds the
    /// turnstile: the slot is theirs, and how long they keep it is unknown.
    pub fn try_acquire(&self) -> ControlFlow<Reason> {
        match self.turnstile.try_lock() {
            Ok(_turn) => self.admit(),
            Err(_) => ControlFlow::Break(Reason::Overloaded {
                retry_after: self.log().retry_after(Instant::now()),
            }),
        }
    }

    // The clock is read under the lock so that admissions enter the log in order.
    fn admit(&self) -> ControlFlow<Reason> {
        let mut log = self.log();
        let now = Instant::now();
        let outcome = log.try_admit(now);
        if outcome.is_continue() {
            trace!(at = ?now, "admitted");
        }
        outcome
    }

    fn log(&self) -> MutexGuard<'_, SlidingLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use more_asserts::assert_ge;
    use more_asserts::assert_le;
    use tokio::task::JoinSet;
    use tokio::time::advance;

    use super::*;

    fn gate(window: Duration, limit: usize) -> Arc<RateGate> {
        Arc::new(RateGate::new(window, limit).unwrap())
    }

    fn recorded(gate: &RateGate) -> Vec<Instant> {
        gate.log().admissions().collect()
    }

    async fn admit_all(gate: &Arc<RateGate>, callers: usize) -> Vec<Instant> {
        let mut tasks = JoinSet::new();
        for _ in 0..callers {
            let gate = Arc::clone(gate);
            tasks.spawn(async move {
                gate.acquire().await;
                Instant::now()
            });
        }
        let mut admitted = tasks.join_all().await;
        admitted.sort();
        admitted
    }

    #[test]
    fn it_rejects_invalid_configuration() {
        assert!(matches!(
            RateGate::new(Duration::from_secs(1), 0),
            Err(GateError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            RateGate::new(Duration::ZERO, 5),
            Err(GateError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn it_admits_a_full_burst_without_waiting() {
        let gate = gate(Duration::from_secs(60), 5);
        let start = Instant::now();

        let admitted = admit_all(&gate, 5).await;

        assert!(admitted.iter().all(|at| *at == start));
        assert_eq!(gate.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn the_extra_caller_waits_one_window() {
        let window = Duration::from_millis(100);
        let gate = gate(window, 5);
        let start = Instant::now();

        let admitted = admit_all(&gate, 6).await;

        let last = admitted[5] - admitted[0];
        assert_ge!(last, window);
        assert_le!(last, window + Duration::from_millis(1));
        assert_eq!(admitted[0], start);
    }

    #[tokio::test(start_paused = true)]
    async fn it_paces_a_thousand_callers_through_the_window() {
        let window = Duration::from_millis(100);
        let limit = 10;
        let gate = gate(window, limit);
        let callers = 1000;

        let admitted = admit_all(&gate, callers).await;

        // No lost or duplicated admissions.
        assert_eq!(admitted.len(), callers);
        // Rolling property over every window position.
        for span in admitted.windows(limit + 1) {
            assert_ge!(span[limit] - span[0], window);
        }
        // And the gate still runs at full rate.
        let elapsed = admitted[callers - 1] - admitted[0];
        assert_eq!(elapsed, window * (callers / limit - 1) as u32);
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_are_admitted_in_arrival_order() {
        let gate = gate(Duration::from_millis(10), 1);
        let order = Arc::new(Mutex::new(vec![]));

        let mut tasks = JoinSet::new();
        for id in 0..5 {
            let gate = Arc::clone(&gate);
            let order = Arc::clone(&order);
            tasks.spawn(async move {
                gate.acquire().await;
                order.lock().unwrap().push(id);
            });
        }
        tasks.join_all().await;

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn it_follows_the_five_per_minute_schedule() {
        let minute = Duration::from_secs(60);
        let gate = gate(minute, 5);
        let start = Instant::now();

        gate.acquire().await;
        advance(Duration::from_secs(10)).await;
        for _ in 0..4 {
            gate.acquire().await;
        }
        assert_eq!(Instant::now() - start, Duration::from_secs(10));

        // The sixth waits for the first admission to age out, the seventh for the second.
        gate.acquire().await;
        assert_eq!(Instant::now() - start, minute);
        gate.acquire().await;
        assert_eq!(Instant::now() - start, minute + Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_records_nothing() {
        let gate = gate(Duration::from_secs(1), 1);
        gate.acquire().await;
        let before = recorded(&gate);

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        assert_eq!(
            gate.acquire_cancellable(&token).await,
            Err(GateError::Cancelled)
        );
        assert_eq!(recorded(&gate), before);

        // The queue is not wedged by the abandoned waiter.
        advance(Duration::from_secs(1)).await;
        assert!(gate.try_acquire().is_continue());
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_token_fails_fast() {
        let gate = gate(Duration::from_secs(1), 1);
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(
            gate.acquire_cancellable(&token).await,
            Err(GateError::Cancelled)
        );
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_the_wait() {
        let gate = gate(Duration::from_secs(1), 1);
        gate.acquire().await;

        let start = Instant::now();
        let outcome = gate.acquire_timeout(Duration::from_millis(250)).await;

        assert_eq!(outcome, Err(GateError::DeadlineElapsed));
        assert_eq!(Instant::now() - start, Duration::from_millis(250));
        assert_eq!(recorded(&gate).len(), 1);

        // A deadline beyond the window is met.
        assert_eq!(gate.acquire_timeout(Duration::from_secs(1)).await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn try_acquire_reports_remaining_wait() {
        let gate = gate(Duration::from_millis(100), 2);

        assert!(gate.try_acquire().is_continue());
        advance(Duration::from_millis(40)).await;
        assert!(gate.try_acquire().is_continue());

        assert_eq!(
            gate.try_acquire(),
            ControlFlow::Break(Reason::Overloaded {
                retry_after: Duration::from_millis(60)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn try_acquire_does_not_jump_the_queue() {
        let gate = gate(Duration::from_millis(100), 1);
        gate.acquire().await;

        let mut queued = Box::pin(gate.acquire());
        assert!(futures::poll!(queued.as_mut()).is_pending());

        advance(Duration::from_millis(100)).await;
        // The slot has freed, but it belongs to the queued caller.
        assert_eq!(
            gate.try_acquire(),
            ControlFlow::Break(Reason::Overloaded {
                retry_after: Duration::ZERO
            })
        );
        queued.await;
        assert_eq!(gate.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_timeout_means_no_deadline() {
        let window = Duration::from_millis(100);
        let gate = gate(window, 1);

        assert_eq!(gate.acquire_timeout(Duration::MAX).await, Ok(()));

        let start = Instant::now();
        assert_eq!(gate.acquire_timeout(Duration::MAX).await, Ok(()));
        assert_eq!(Instant::now() - start, window);
        assert_eq!(recorded(&gate).len(), 1);
    }

    #[test]
    fn blocking_callers_share_the_limit() {
        let gate = gate(Duration::from_secs(3600), 1024);
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    for _ in 0..16 {
                        gate.acquire_blocking();
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1024);
        assert_eq!(recorded(&gate).len(), 1024);
        assert_eq!(gate.available(), 0);
    }

    #[test]
    fn blocking_caller_waits_for_the_window() {
        let window = Duration::from_millis(50);
        let gate = gate(window, 3);

        gate.acquire_blocking();
        let first = recorded(&gate)[0];
        for _ in 0..3 {
            gate.acquire_blocking();
        }

        let fourth = *recorded(&gate).last().unwrap();
        assert_ge!(fourth - first, window);
        assert!(!recorded(&gate).contains(&first));
    }
}
