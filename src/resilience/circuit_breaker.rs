//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls get the fallback immediately
//! - Half-Open: a single probe call tests whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure ratio >= threshold over the rolling sample
//! Open → Half-Open: after reset timeout (reset timer task)
//! Half-Open → Closed: probe call succeeds
//! Half-Open → Open: probe call fails, times out or is abandoned
//! Any → Open: manual trip
//! ```
//!
//! Every transition is published as a [`BreakerEvent`] to subscribers.
//! Outcomes of calls admitted before a transition are discarded.

use serde::Serialize;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::CircuitBreakerConfig;
use crate::downstream::{Dependency, DownstreamError};
use crate::observability::metrics;
use crate::resilience::fallback::{FallbackReason, Outcome};

const EVENT_CAPACITY: usize = 64;

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "halfOpen",
        }
    }
}

/// What caused the circuit to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenCause {
    FailureRatio { failures: usize, calls: usize },
    ProbeFailed,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened(OpenCause),
    HalfOpened,
    Closed,
}

impl Transition {
    pub fn state(&self) -> CircuitState {
        match self {
            Transition::Opened(_) => CircuitState::Open,
            Transition::HalfOpened => CircuitState::HalfOpen,
            Transition::Closed => CircuitState::Closed,
        }
    }
}

/// Published on every state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerEvent {
    pub dependency: Dependency,
    pub transition: Transition,
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStatus {
    #[serde(skip)]
    pub name: &'static str,
    pub state: CircuitState,
    pub is_open: bool,
    pub is_half_open: bool,
    pub is_closed: bool,
    pub failure_count: usize,
    pub request_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    finished_at: Instant,
    failed: bool,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    opened_at: Option<Instant>,
    sample: VecDeque<Sample>,
    probe_in_flight: bool,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallResult {
    Success,
    Failure,
    /// The call never reached the dependency.
    Released,
    /// The caller dropped the call before it completed.
    Abandoned,
}

/// State shared with the reset timer tasks.
struct Shared {
    dependency: Dependency,
    inner: Mutex<BreakerInner>,
    events: broadcast::Sender<BreakerEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the new state and publish it.
    fn commit(&self, inner: &mut BreakerInner, transition: Transition, now: Instant) {
        let state = transition.state();
        inner.state = state;
        inner.opened_at = (state == CircuitState::Open).then_some(now);
        inner.sample.clear();
        inner.probe_in_flight = false;
        inner.generation += 1;

        // No subscribers is fine.
        let _ = self.events.send(BreakerEvent {
            dependency: self.dependency,
            transition,
        });
    }
}

/// One breaker per dependency.
pub struct CircuitBreaker {
    dependency: Dependency,
    config: CircuitBreakerConfig,
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    pub fn new(dependency: Dependency, config: CircuitBreakerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            dependency,
            config,
            shared: Arc::new(Shared {
                dependency,
                inner: Mutex::new(BreakerInner {
                    state: CircuitState::Closed,
                    opened_at: None,
                    sample: VecDeque::new(),
                    probe_in_flight: false,
                    generation: 0,
                }),
                events,
            }),
        }
    }

    pub fn dependency(&self) -> Dependency {
        self.dependency
    }

    pub fn name(&self) -> &'static str {
        self.dependency.as_str()
    }

    /// Register for transition events.
    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.shared.events.subscribe()
    }

    /// Run `call` through the breaker.
    ///
    /// Returns the dependency response, or the fallback when the circuit
    /// denies passthrough or the call fails or times out. Only errors that
    /// do not reflect dependency health are returned as `Err`.
    pub async fn fire<F, Fut>(&self, call: F) -> Result<Outcome, DownstreamError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, DownstreamError>>,
    {
        let permit = match self.acquire() {
            Ok(permit) => permit,
            Err(reason) => return Ok(self.fallback(reason)),
        };

        let started = Instant::now();
        let result = time::timeout(self.config.timeout(), call()).await;
        let elapsed = started.elapsed();

        match result {
            Ok(Ok(text)) => {
                metrics::record_dependency_call(self.name(), "success", elapsed);
                permit.settle(CallResult::Success);
                Ok(Outcome::Response(text))
            }
            Ok(Err(e)) if !e.is_dependency_failure() => {
                tracing::error!(dependency = %self.dependency, error = %e, "Dependency call could not be issued");
                metrics::record_dependency_call(self.name(), "error", elapsed);
                permit.settle(CallResult::Released);
                Err(e)
            }
            Ok(Err(e)) => {
                tracing::warn!(dependency = %self.dependency, error = %e, "Dependency call failed");
                metrics::record_dependency_call(self.name(), "failure", elapsed);
                permit.settle(CallResult::Failure);
                Ok(self.fallback(FallbackReason::Failure))
            }
            Err(_) => {
                let err = DownstreamError::Timeout(self.dependency, self.config.timeout_ms);
                tracing::warn!(dependency = %self.dependency, error = %err, "Dependency call timed out");
                metrics::record_dependency_call(self.name(), "timeout", elapsed);
                permit.settle(CallResult::Failure);
                Ok(self.fallback(FallbackReason::Timeout))
            }
        }
    }

    /// Force the circuit open regardless of the failure ratio.
    pub fn open(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, Transition::Opened(OpenCause::Manual), Instant::now());
    }

    /// Current state without side effects.
    ///
    /// An open circuit whose reset timeout has elapsed reports half-open even
    /// if its reset timer has not run yet.
    pub fn status(&self) -> BreakerStatus {
        let inner = self.lock();
        let now = Instant::now();

        let state = if inner.state == CircuitState::Open && self.reset_elapsed(&inner, now) {
            CircuitState::HalfOpen
        } else {
            inner.state
        };

        let live = inner
            .sample
            .iter()
            .filter(|s| now.duration_since(s.finished_at) <= self.config.rolling_window());
        let (mut failure_count, mut request_count) = (0, 0);
        for s in live {
            request_count += 1;
            if s.failed {
                failure_count += 1;
            }
        }

        BreakerStatus {
            name: self.name(),
            state,
            is_open: state == CircuitState::Open,
            is_half_open: state == CircuitState::HalfOpen,
            is_closed: state == CircuitState::Closed,
            failure_count,
            request_count,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.shared.lock()
    }

    fn reset_elapsed(&self, inner: &BreakerInner, now: Instant) -> bool {
        inner
            .opened_at
            .is_some_and(|at| now.duration_since(at) >= self.config.reset_timeout())
    }

    fn fallback(&self, reason: FallbackReason) -> Outcome {
        tracing::debug!(dependency = %self.dependency, reason = reason.as_str(), "Using fallback");
        metrics::record_fallback(self.name(), reason.as_str());
        Outcome::fallback(self.dependency, reason)
    }

    fn acquire(&self) -> Result<CallPermit<'_>, FallbackReason> {
        let mut inner = self.lock();
        let now = Instant::now();

        if inner.state == CircuitState::Open && self.reset_elapsed(&inner, now) {
            self.transition(&mut inner, Transition::HalfOpened, now);
        }

        let probe = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => return Err(FallbackReason::CircuitOpen),
            CircuitState::HalfOpen if inner.probe_in_flight => {
                return Err(FallbackReason::ProbeInFlight)
            }
            CircuitState::HalfOpen => {
                inner.probe_in_flight = true;
                true
            }
        };

        Ok(CallPermit {
            breaker: self,
            generation: inner.generation,
            probe,
            settled: false,
        })
    }

    fn settle(&self, generation: u64, probe: bool, result: CallResult) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        let now = Instant::now();

        if probe {
            inner.probe_in_flight = false;
            match result {
                CallResult::Success => self.transition(&mut inner, Transition::Closed, now),
                CallResult::Failure | CallResult::Abandoned => {
                    self.transition(&mut inner, Transition::Opened(OpenCause::ProbeFailed), now)
                }
                CallResult::Released => {}
            }
            return;
        }

        let failed = match result {
            CallResult::Success => false,
            CallResult::Failure => true,
            CallResult::Released | CallResult::Abandoned => return,
        };

        inner.sample.push_back(Sample { finished_at: now, failed });
        let window = self.config.rolling_window();
        while inner
            .sample
            .front()
            .is_some_and(|s| now.duration_since(s.finished_at) > window)
        {
            inner.sample.pop_front();
        }
        while inner.sample.len() > self.config.sample_size {
            inner.sample.pop_front();
        }

        let calls = inner.sample.len();
        if calls < self.config.minimum_calls {
            return;
        }
        let failures = inner.sample.iter().filter(|s| s.failed).count();
        if failures * 100 >= usize::from(self.config.error_threshold_percentage) * calls {
            self.transition(
                &mut inner,
                Transition::Opened(OpenCause::FailureRatio { failures, calls }),
                now,
            );
        }
    }

    fn transition(&self, inner: &mut BreakerInner, transition: Transition, now: Instant) {
        self.shared.commit(inner, transition, now);
        if inner.state == CircuitState::Open {
            self.schedule_half_open(inner.generation, now);
        }
    }

    /// Move to half-open once the reset timeout elapses, unless another
    /// transition happened first. Without a runtime the move is left to
    /// the next `fire`.
    fn schedule_half_open(&self, generation: u64, opened_at: Instant) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let Some(deadline) = opened_at.checked_add(self.config.reset_timeout()) else {
            return;
        };
        let shared = Arc::downgrade(&self.shared);

        runtime.spawn(async move {
            time::sleep_until(deadline).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let mut inner = shared.lock();
            if inner.generation == generation && inner.state == CircuitState::Open {
                shared.commit(&mut inner, Transition::HalfOpened, Instant::now());
            }
        });
    }
}

/// Admission ticket for one call; settles as abandoned if dropped early.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    probe: bool,
    settled: bool,
}

impl CallPermit<'_> {
    fn settle(mut self, result: CallResult) {
        self.settled = true;
        self.breaker.settle(self.generation, self.probe, result);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.settle(self.generation, self.probe, CallResult::Abandoned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::fallback::PAYMENT_FALLBACK;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(Dependency::Payment, CircuitBreakerConfig::default())
    }

    async fn succeed(cb: &CircuitBreaker) -> Outcome {
        cb.fire(|| async { Ok("Payment processed".to_string()) }).await.unwrap()
    }

    async fn fail(cb: &CircuitBreaker) -> Outcome {
        cb.fire(|| async { Err(DownstreamError::Status(Dependency::Payment, 500)) })
            .await
            .unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<BreakerEvent>) -> Vec<Transition> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.transition);
        }
        seen
    }

    fn probe_in_flight(cb: &CircuitBreaker) -> bool {
        cb.lock().probe_in_flight
    }

    /// Let the reset timer task run, then require the stored state.
    async fn wait_for_stored_state(cb: &CircuitBreaker, state: CircuitState) {
        for _ in 0..10 {
            if cb.lock().state == state {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("breaker never stored {:?}", state);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_closed() {
        let status = breaker().status();
        assert_eq!(status.state, CircuitState::Closed);
        assert!(status.is_closed && !status.is_open && !status.is_half_open);
        assert_eq!(status.request_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_when_failure_ratio_reached() {
        let cb = breaker();
        let mut events = cb.subscribe();

        assert_eq!(fail(&cb).await.text(), PAYMENT_FALLBACK);
        assert!(cb.status().is_closed, "one call is below the minimum sample");

        fail(&cb).await;
        assert!(cb.status().is_open);
        assert_eq!(
            drain(&mut events),
            vec![Transition::Opened(OpenCause::FailureRatio { failures: 2, calls: 2 })]
        );

        let calls = AtomicUsize::new(0);
        let outcome = cb
            .fire(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("unreachable".to_string())
            })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Fallback { reason: FallbackReason::CircuitOpen, message: PAYMENT_FALLBACK }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0, "open circuit must not call the dependency");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_closed_below_threshold() {
        let cb = breaker();
        succeed(&cb).await;
        succeed(&cb).await;
        fail(&cb).await;

        let status = cb.status();
        assert!(status.is_closed);
        assert_eq!(status.failure_count, 1);
        assert_eq!(status.request_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let cb = breaker();
        let slow = || async {
            time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        };

        let outcome = cb.fire(slow).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Fallback { reason: FallbackReason::Timeout, message: PAYMENT_FALLBACK }
        );
        cb.fire(slow).await.unwrap();
        assert!(cb.status().is_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_only_after_reset_timeout() {
        let cb = breaker();
        cb.open();

        time::advance(Duration::from_millis(9_999)).await;
        assert!(cb.status().is_open);
        let outcome = succeed(&cb).await;
        assert_eq!(
            outcome,
            Outcome::Fallback { reason: FallbackReason::CircuitOpen, message: PAYMENT_FALLBACK }
        );

        time::advance(Duration::from_millis(1)).await;
        assert!(cb.status().is_half_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_published_without_traffic() {
        let cb = breaker();
        let mut events = cb.subscribe();
        cb.open();

        time::advance(Duration::from_secs(10)).await;
        wait_for_stored_state(&cb, CircuitState::HalfOpen).await;
        assert!(cb.status().is_half_open);
        assert_eq!(
            drain(&mut events),
            vec![Transition::Opened(OpenCause::Manual), Transition::HalfOpened]
        );

        cb.open();
        assert_eq!(drain(&mut events), vec![Transition::Opened(OpenCause::Manual)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_timer_restarts_on_new_trip() {
        let cb = breaker();
        let mut events = cb.subscribe();
        cb.open();
        time::advance(Duration::from_secs(5)).await;
        cb.open();

        // The first trip's timer is due now but belongs to an older state.
        time::advance(Duration::from_secs(5)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(cb.status().is_open);
        assert_eq!(
            drain(&mut events),
            vec![Transition::Opened(OpenCause::Manual), Transition::Opened(OpenCause::Manual)]
        );

        time::advance(Duration::from_secs(5)).await;
        wait_for_stored_state(&cb, CircuitState::HalfOpen).await;
        assert_eq!(drain(&mut events), vec![Transition::HalfOpened]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_probe_closes() {
        let cb = breaker();
        let mut events = cb.subscribe();
        cb.open();
        time::advance(Duration::from_secs(10)).await;

        assert_eq!(succeed(&cb).await, Outcome::Response("Payment processed".into()));
        assert!(cb.status().is_closed);
        assert_eq!(
            drain(&mut events),
            vec![
                Transition::Opened(OpenCause::Manual),
                Transition::HalfOpened,
                Transition::Closed,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_reopens() {
        let cb = breaker();
        let mut events = cb.subscribe();
        cb.open();
        time::advance(Duration::from_secs(10)).await;

        assert!(fail(&cb).await.is_fallback());
        assert!(cb.status().is_open);
        assert_eq!(
            drain(&mut events),
            vec![
                Transition::Opened(OpenCause::Manual),
                Transition::HalfOpened,
                Transition::Opened(OpenCause::ProbeFailed),
            ]
        );

        // The reset timer restarts from the failed probe.
        time::advance(Duration::from_secs(5)).await;
        assert!(cb.status().is_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_probe_in_half_open() {
        let cb = Arc::new(breaker());
        cb.open();
        time::advance(Duration::from_secs(10)).await;

        let (release, gate) = oneshot::channel::<()>();
        let probe = {
            let cb = cb.clone();
            tokio::spawn(async move {
                cb.fire(|| async move {
                    let _ = gate.await;
                    Ok("recovered".to_string())
                })
                .await
            })
        };
        while !probe_in_flight(&cb) {
            tokio::task::yield_now().await;
        }

        let concurrent = succeed(&cb).await;
        assert_eq!(
            concurrent,
            Outcome::Fallback { reason: FallbackReason::ProbeInFlight, message: PAYMENT_FALLBACK }
        );

        release.send(()).unwrap();
        let outcome = probe.await.unwrap().unwrap();
        assert_eq!(outcome, Outcome::Response("recovered".into()));
        assert!(cb.status().is_closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_probe_reopens() {
        let cb = Arc::new(breaker());
        cb.open();
        time::advance(Duration::from_secs(10)).await;

        let probe = {
            let cb = cb.clone();
            tokio::spawn(async move {
                cb.fire(|| std::future::pending::<Result<String, DownstreamError>>()).await
            })
        };
        while !probe_in_flight(&cb) {
            tokio::task::yield_now().await;
        }

        probe.abort();
        assert!(probe.await.unwrap_err().is_cancelled());
        assert!(cb.status().is_open);
        assert!(!probe_in_flight(&cb));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_trip_from_any_state() {
        let cb = breaker();
        cb.open();
        assert!(cb.status().is_open);

        time::advance(Duration::from_secs(10)).await;
        assert!(cb.status().is_half_open);
        cb.open();
        assert!(cb.status().is_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_after_manual_trip_is_ignored() {
        let cb = Arc::new(breaker());
        let mut events = cb.subscribe();
        let (started_tx, started) = oneshot::channel::<()>();
        let (release, gate) = oneshot::channel::<()>();

        let in_flight = {
            let cb = cb.clone();
            tokio::spawn(async move {
                cb.fire(|| async move {
                    let _ = started_tx.send(());
                    let _ = gate.await;
                    Err(DownstreamError::Status(Dependency::Payment, 502))
                })
                .await
            })
        };
        started.await.unwrap();

        cb.open();
        release.send(()).unwrap();
        assert!(in_flight.await.unwrap().unwrap().is_fallback());

        assert_eq!(drain(&mut events), vec![Transition::Opened(OpenCause::Manual)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_propagates_uncounted() {
        let cb = breaker();
        let err = cb
            .fire(|| async { Err(DownstreamError::InvalidRequest(Dependency::Payment, "bad uri".into())) })
            .await
            .unwrap_err();

        assert!(matches!(err, DownstreamError::InvalidRequest(..)));
        assert_eq!(cb.status().request_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_outcomes_leave_rolling_sample() {
        let cb = breaker();
        fail(&cb).await;
        time::advance(Duration::from_secs(11)).await;
        assert_eq!(cb.status().request_count, 0);

        succeed(&cb).await;
        assert!(cb.status().is_closed, "expired failure must not count toward the ratio");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_is_bounded() {
        let config = CircuitBreakerConfig {
            sample_size: 4,
            ..CircuitBreakerConfig::default()
        };
        let cb = CircuitBreaker::new(Dependency::Payment, config);
        for _ in 0..6 {
            succeed(&cb).await;
        }
        assert_eq!(cb.status().request_count, 4);
    }
}
