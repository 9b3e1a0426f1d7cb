//! Per-route circuit breaker.
//!
//! # States
//! - Closed: normal operation, calls pass through to the invoker
//! - Open: route assumed down, calls fail fast without touching the invoker
//! - Half-Open: testing recovery with a single trial call
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures reach failure_threshold
//! Open → Half-Open: a call arrives after recovery_timeout elapsed
//! Half-Open → Closed: the trial call succeeds
//! Half-Open → Open: the trial call fails
//! ```
//!
//! # Design Decisions
//! - Explicit tagged-state enum behind one mutex per breaker; the lock is
//!   held only for synchronous bookkeeping, never across an await
//! - Open → Half-Open is evaluated on call arrival, not by a timer
//! - Exactly one trial call in Half-Open; concurrent callers are rejected
//!   as if the circuit were open
//! - A call dropped mid-flight still counts as a failure (permit guard)

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Request, Response};
use serde::Serialize;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::error::Error;
use crate::invoker::Invoker;
use crate::observability::MetricsSink;
use crate::routing::{Route, RouteId};

/// Externally visible circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
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
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Read-only view of a breaker for health checks and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed {
        consecutive_failures: u32,
    },
    Open {
        consecutive_failures: u32,
        last_failure: Instant,
    },
    HalfOpen {
        consecutive_failures: u32,
        trial_in_flight: bool,
    },
}

impl State {
    fn kind(&self) -> CircuitState {
        match self {
            State::Closed { .. } => CircuitState::Closed,
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    fn consecutive_failures(&self) -> u32 {
        match self {
            State::Closed {
                consecutive_failures,
            }
            | State::Open {
                consecutive_failures,
                ..
            }
            | State::HalfOpen {
                consecutive_failures,
                ..
            } => *consecutive_failures,
        }
    }
}

/// How a call was admitted: normally, or as the half-open trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Normal,
    Trial,
}

/// Failure-triggered circuit for a single route.
pub struct CircuitBreaker {
    route: RouteId,
    route_name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    call_timeout: Duration,
    state: Mutex<State>,
    sink: Arc<dyn MetricsSink>,
}

impl CircuitBreaker {
    pub fn new(
        route: &Route,
        config: &BreakerConfig,
        sink: Arc<dyn MetricsSink>,
    ) -> Result<Self, Error> {
        if config.failure_threshold == 0 {
            return Err(Error::Configuration(
                "breaker failure_threshold must be positive".to_string(),
            ));
        }
        if config.recovery_timeout_ms == 0 {
            return Err(Error::Configuration(
                "breaker recovery_timeout_ms must be positive".to_string(),
            ));
        }
        if config.call_timeout_ms == 0 {
            return Err(Error::Configuration(
                "breaker call_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(Self {
            route: route.id.clone(),
            route_name: route.name.clone(),
            failure_threshold: config.failure_threshold,
            recovery_timeout: Duration::from_millis(config.recovery_timeout_ms),
            call_timeout: Duration::from_millis(config.call_timeout_ms),
            state: Mutex::new(State::Closed {
                consecutive_failures: 0,
            }),
            sink,
        })
    }

    /// Execute a backend call through the breaker, racing it against the
    /// per-call deadline.
    pub async fn execute(
        &self,
        invoker: &dyn Invoker,
        route: &Route,
        request: Request<Bytes>,
    ) -> Result<Response<Body>, Error> {
        let kind = self.admit(Instant::now())?;
        let permit = CallPermit {
            breaker: self,
            kind,
            settled: false,
        };

        match tokio::time::timeout(self.call_timeout, invoker.invoke(route, request)).await {
            Ok(Ok(response)) => {
                permit.success();
                Ok(response)
            }
            Ok(Err(source)) => {
                permit.failure();
                Err(Error::Upstream {
                    route: self.route.clone(),
                    source,
                })
            }
            Err(_) => {
                permit.failure();
                Err(Error::Timeout {
                    route: self.route.clone(),
                    deadline: self.call_timeout,
                })
            }
        }
    }

    /// True if a call arriving now would be admitted. Used to cut retry
    /// sequences short once the circuit opens.
    pub fn admits(&self) -> bool {
        let state = self.state.lock().expect("circuit breaker mutex poisoned");
        match *state {
            State::Closed { .. } => true,
            State::Open { last_failure, .. } => {
                Instant::now().duration_since(last_failure) >= self.recovery_timeout
            }
            State::HalfOpen {
                trial_in_flight, ..
            } => !trial_in_flight,
        }
    }

    /// Read-only snapshot. Never evaluates transitions: an Open breaker
    /// past its recovery timeout still reports Open until a call arrives.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state.lock().expect("circuit breaker mutex poisoned");
        BreakerSnapshot {
            state: state.kind(),
            consecutive_failures: state.consecutive_failures(),
        }
    }

    fn admit(&self, now: Instant) -> Result<CallKind, Error> {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        match *state {
            State::Closed { .. } => Ok(CallKind::Normal),
            State::Open {
                consecutive_failures,
                last_failure,
            } => {
                if now.duration_since(last_failure) >= self.recovery_timeout {
                    self.transition(
                        &mut state,
                        State::HalfOpen {
                            consecutive_failures,
                            trial_in_flight: true,
                        },
                    );
                    Ok(CallKind::Trial)
                } else {
                    Err(Error::CircuitOpen {
                        route: self.route.clone(),
                    })
                }
            }
            State::HalfOpen {
                trial_in_flight: true,
                ..
            } => Err(Error::CircuitOpen {
                route: self.route.clone(),
            }),
            State::HalfOpen {
                consecutive_failures,
                trial_in_flight: false,
            } => {
                *state = State::HalfOpen {
                    consecutive_failures,
                    trial_in_flight: true,
                };
                Ok(CallKind::Trial)
            }
        }
    }

    fn record_success(&self, kind: CallKind) {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        match (kind, *state) {
            (CallKind::Trial, _) => {
                self.transition(
                    &mut state,
                    State::Closed {
                        consecutive_failures: 0,
                    },
                );
            }
            (CallKind::Normal, State::Closed { .. }) => {
                *state = State::Closed {
                    consecutive_failures: 0,
                };
            }
            // Stale outcome from a call admitted before the circuit moved on.
            (CallKind::Normal, _) => {}
        }
    }

    fn record_failure(&self, kind: CallKind, now: Instant) {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        match (kind, *state) {
            (
                CallKind::Trial,
                State::HalfOpen {
                    consecutive_failures,
                    ..
                },
            ) => {
                self.transition(
                    &mut state,
                    State::Open {
                        consecutive_failures,
                        last_failure: now,
                    },
                );
            }
            (CallKind::Trial, _) => {}
            (
                CallKind::Normal,
                State::Closed {
                    consecutive_failures,
                },
            ) => {
                let failures = consecutive_failures + 1;
                if failures >= self.failure_threshold {
                    self.transition(
                        &mut state,
                        State::Open {
                            consecutive_failures: failures,
                            last_failure: now,
                        },
                    );
                } else {
                    *state = State::Closed {
                        consecutive_failures: failures,
                    };
                }
            }
            // Stale outcome from a call admitted before the circuit moved on.
            (CallKind::Normal, _) => {}
        }
    }

    fn transition(&self, state: &mut State, next: State) {
        let from = state.kind();
        let to = next.kind();
        *state = next;
        if from != to {
            self.sink.record(
                "breaker_transition",
                &[
                    ("route", self.route_name.clone()),
                    ("from", from.as_str().to_string()),
                    ("to", to.as_str().to_string()),
                ],
            );
        }
    }
}

/// Guard tying a call's outcome back to the breaker. Dropping it without
/// an explicit outcome records a failure, so cancelled calls (client
/// disconnects, outer deadlines) are accounted for.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    kind: CallKind,
    settled: bool,
}

impl CallPermit<'_> {
    fn success(mut self) {
        self.settled = true;
        self.breaker.record_success(self.kind);
    }

    fn failure(mut self) {
        self.settled = true;
        self.breaker.record_failure(self.kind, Instant::now());
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.record_failure(self.kind, Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteConfig, TargetConfig};
    use crate::error::BoxError;
    use crate::observability::{NoopSink, RecordingSink};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct ScriptedInvoker {
        calls: AtomicU32,
        fail: AtomicBool,
        delay: Option<Duration>,
    }

    impl ScriptedInvoker {
        fn failing() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail: AtomicBool::new(true),
                delay: None,
            }
        }

        fn succeeding() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail: AtomicBool::new(false),
                delay: None,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail: AtomicBool::new(false),
                delay: Some(delay),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Invoker for ScriptedInvoker {
        async fn invoke(
            &self,
            _route: &Route,
            _request: Request<Bytes>,
        ) -> Result<Response<Body>, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                Err("backend down".into())
            } else {
                Ok(Response::new(Body::empty()))
            }
        }
    }

    fn make_route() -> Route {
        Route::from_config(&RouteConfig {
            name: "users".into(),
            method: "GET".into(),
            path_prefix: "/users".into(),
            target: TargetConfig {
                scheme: "http".into(),
                host: "127.0.0.1".into(),
                port: 3001,
                endpoint: String::new(),
            },
            weight: 1,
            enabled: true,
        })
        .unwrap()
    }

    fn make_breaker(route: &Route, sink: Arc<dyn MetricsSink>) -> CircuitBreaker {
        CircuitBreaker::new(
            route,
            &BreakerConfig {
                failure_threshold: 3,
                recovery_timeout_ms: 5_000,
                call_timeout_ms: 1_000,
            },
            sink,
        )
        .unwrap()
    }

    fn request() -> Request<Bytes> {
        Request::builder()
            .uri("http://gateway/users")
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn test_zero_threshold_is_configuration_error() {
        let route = make_route();
        let result = CircuitBreaker::new(
            &route,
            &BreakerConfig {
                failure_threshold: 0,
                recovery_timeout_ms: 5_000,
                call_timeout_ms: 1_000,
            },
            Arc::new(NoopSink),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold_and_fails_fast() {
        let route = make_route();
        let breaker = make_breaker(&route, Arc::new(NoopSink));
        let invoker = ScriptedInvoker::failing();

        for _ in 0..3 {
            let err = breaker.execute(&invoker, &route, request()).await.unwrap_err();
            assert!(matches!(err, Error::Upstream { .. }));
        }
        let snap = breaker.snapshot();
        assert_eq!(snap.state, CircuitState::Open);
        assert_eq!(snap.consecutive_failures, 3);

        // Fast fail: the invoker is not called again.
        let err = breaker.execute(&invoker, &route, request()).await.unwrap_err();
        assert!(matches!(err, Error::CircuitOpen { .. }));
        assert_eq!(invoker.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let route = make_route();
        let breaker = make_breaker(&route, Arc::new(NoopSink));
        let failing = ScriptedInvoker::failing();
        let succeeding = ScriptedInvoker::succeeding();

        breaker.execute(&failing, &route, request()).await.unwrap_err();
        breaker.execute(&failing, &route, request()).await.unwrap_err();
        assert_eq!(breaker.snapshot().consecutive_failures, 2);

        breaker.execute(&succeeding, &route, request()).await.unwrap();
        assert_eq!(breaker.snapshot().consecutive_failures, 0);
        assert_eq!(breaker.snapshot().state, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_trial_before_recovery_timeout() {
        let route = make_route();
        let breaker = make_breaker(&route, Arc::new(NoopSink));
        let invoker = ScriptedInvoker::failing();

        for _ in 0..3 {
            breaker.execute(&invoker, &route, request()).await.unwrap_err();
        }
        assert_eq!(breaker.snapshot().state, CircuitState::Open);

        tokio::time::advance(Duration::from_millis(4_999)).await;
        let err = breaker.execute(&invoker, &route, request()).await.unwrap_err();
        assert!(matches!(err, Error::CircuitOpen { .. }));
        assert_eq!(invoker.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_success_closes_circuit() {
        let route = make_route();
        let breaker = make_breaker(&route, Arc::new(NoopSink));
        let invoker = ScriptedInvoker::failing();

        for _ in 0..3 {
            breaker.execute(&invoker, &route, request()).await.unwrap_err();
        }

        tokio::time::advance(Duration::from_millis(5_000)).await;
        invoker.fail.store(false, Ordering::SeqCst);
        breaker.execute(&invoker, &route, request()).await.unwrap();

        let snap = breaker.snapshot();
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(invoker.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_failure_reopens_circuit() {
        let route = make_route();
        let breaker = make_breaker(&route, Arc::new(NoopSink));
        let invoker = ScriptedInvoker::failing();

        for _ in 0..3 {
            breaker.execute(&invoker, &route, request()).await.unwrap_err();
        }

        tokio::time::advance(Duration::from_millis(5_000)).await;
        breaker.execute(&invoker, &route, request()).await.unwrap_err();
        assert_eq!(breaker.snapshot().state, CircuitState::Open);
        assert_eq!(invoker.call_count(), 4);

        // The fresh failure restarts the recovery clock.
        tokio::time::advance(Duration::from_millis(4_999)).await;
        let err = breaker.execute(&invoker, &route, request()).await.unwrap_err();
        assert!(matches!(err, Error::CircuitOpen { .. }));
        assert_eq!(invoker.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trial_in_flight() {
        let route = Arc::new(make_route());
        let breaker = Arc::new(make_breaker(&route, Arc::new(NoopSink)));
        let failing = ScriptedInvoker::failing();

        for _ in 0..3 {
            breaker.execute(&failing, &route, request()).await.unwrap_err();
        }
        tokio::time::advance(Duration::from_millis(5_000)).await;

        // First caller becomes the trial and parks inside the invoker.
        let slow = Arc::new(ScriptedInvoker::slow(Duration::from_millis(500)));
        let trial_breaker = breaker.clone();
        let trial_route = route.clone();
        let trial_invoker = slow.clone();
        let trial = tokio::spawn(async move {
            trial_breaker
                .execute(trial_invoker.as_ref(), &trial_route, request())
                .await
        });
        tokio::task::yield_now().await;
        assert_eq!(slow.call_count(), 1);

        // Second caller is rejected while the trial is in flight.
        let err = breaker.execute(&failing, &route, request()).await.unwrap_err();
        assert!(matches!(err, Error::CircuitOpen { .. }));

        // Trial completes successfully and closes the circuit.
        trial.await.unwrap().unwrap();
        assert_eq!(breaker.snapshot().state, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let route = make_route();
        let breaker = CircuitBreaker::new(
            &route,
            &BreakerConfig {
                failure_threshold: 1,
                recovery_timeout_ms: 5_000,
                call_timeout_ms: 100,
            },
            Arc::new(NoopSink),
        )
        .unwrap();
        let invoker = ScriptedInvoker::slow(Duration::from_millis(200));

        let err = breaker.execute(&invoker, &route, request()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(breaker.snapshot().state, CircuitState::Open);
    }

    #[test]
    fn test_dropped_call_counts_as_failure() {
        let route = make_route();
        let breaker = CircuitBreaker::new(
            &route,
            &BreakerConfig {
                failure_threshold: 1,
                recovery_timeout_ms: 5_000,
                call_timeout_ms: 1_000,
            },
            Arc::new(NoopSink),
        )
        .unwrap();

        let kind = breaker.admit(Instant::now()).unwrap();
        drop(CallPermit {
            breaker: &breaker,
            kind,
            settled: false,
        });

        assert_eq!(breaker.snapshot().state, CircuitState::Open);
        assert_eq!(breaker.snapshot().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_never_mutates() {
        let route = make_route();
        let breaker = make_breaker(&route, Arc::new(NoopSink));
        let invoker = ScriptedInvoker::failing();

        for _ in 0..3 {
            breaker.execute(&invoker, &route, request()).await.unwrap_err();
        }
        tokio::time::advance(Duration::from_millis(10_000)).await;

        // Recovery has elapsed, but snapshots keep reporting Open.
        assert_eq!(breaker.snapshot().state, CircuitState::Open);
        assert_eq!(breaker.snapshot().state, CircuitState::Open);

        // Only an actual call performs the Open → Half-Open transition.
        invoker.fail.store(false, Ordering::SeqCst);
        breaker.execute(&invoker, &route, request()).await.unwrap();
        assert_eq!(breaker.snapshot().state, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_events_emitted() {
        let route = make_route();
        let sink = Arc::new(RecordingSink::new());
        let breaker = make_breaker(&route, sink.clone());
        let invoker = ScriptedInvoker::failing();

        for _ in 0..3 {
            breaker.execute(&invoker, &route, request()).await.unwrap_err();
        }
        tokio::time::advance(Duration::from_millis(5_000)).await;
        invoker.fail.store(false, Ordering::SeqCst);
        breaker.execute(&invoker, &route, request()).await.unwrap();

        let transitions: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|(name, _)| name == "breaker_transition")
            .map(|(_, labels)| {
                let get = |key: &str| {
                    labels
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v.clone())
                        .unwrap()
                };
                (get("from"), get("to"))
            })
            .collect();

        assert_eq!(
            transitions,
            vec![
                ("closed".to_string(), "open".to_string()),
                ("open".to_string(), "half_open".to_string()),
                ("half_open".to_string(), "closed".to_string()),
            ]
        );
    }
}
