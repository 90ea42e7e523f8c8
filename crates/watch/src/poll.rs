#![forbid(unsafe_code)]

//! Independent per-source polling with retry and last-good caching.
//!
//! Each source runs on its own timer. A poll takes a ticket from the shared
//! [`LatestWins`] board before the request goes out; a response resolving
//! behind a newer one is dropped.

use crate::client::{Fetch, FetchError, fetch_as};
use st_core::LatestWins;
use st_core::model::{ActivityEvent, EcosystemSnapshot, HealthResponse};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    Activity,
    Ecosystem,
    Health,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Activity, Source::Ecosystem, Source::Health];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Activity => "activity",
            Source::Ecosystem => "ecosystem",
            Source::Health => "health",
        }
    }

    pub fn path(self, activity_limit: u16) -> String {
        match self {
            Source::Activity => format!("/api/v1/activity?limit={activity_limit}"),
            Source::Ecosystem => "/api/v1/ecosystem".to_string(),
            Source::Health => "/api/v1/health".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base: Duration,
    pub factor: u32,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const STANDARD: RetryPolicy = RetryPolicy {
        base: Duration::from_millis(500),
        factor: 2,
        cap: Duration::from_secs(30),
        max_attempts: 3,
    };

    /// Delay before retry number `retry` (1-based): base * factor^(retry-1),
    /// never above the cap.
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let multiplier = self.factor.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base
            .checked_mul(multiplier)
            .map_or(self.cap, |delay| delay.min(self.cap))
    }
}

/// GETs `path` up to `policy.max_attempts` times. Non-retryable errors return
/// immediately. `sleep` is injected so tests do not wait.
pub fn fetch_with_retry(
    fetch: &dyn Fetch,
    path: &str,
    policy: &RetryPolicy,
    mut sleep: impl FnMut(Duration),
) -> Result<serde_json::Value, FetchError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match fetch.get_json(path) {
            Ok(value) => return Ok(value),
            Err(err) if err.retryable() && attempt < attempts => {
                let delay = policy.delay(attempt);
                debug!(
                    path,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying"
                );
                sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Decoded body of one successful poll.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Activity(Vec<ActivityEvent>),
    Ecosystem(EcosystemSnapshot),
    Health(HealthResponse),
}

impl Payload {
    fn decode(source: Source, value: serde_json::Value, path: &str) -> Result<Self, FetchError> {
        Ok(match source {
            Source::Activity => Payload::Activity(fetch_as(value, path)?),
            Source::Ecosystem => Payload::Ecosystem(fetch_as(value, path)?),
            Source::Health => Payload::Health(fetch_as(value, path)?),
        })
    }
}

/// What the renderer knows about one source.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchState<T> {
    /// No poll has resolved yet.
    Pending,
    Fresh(T),
    /// The latest poll failed; `last_good` is still shown.
    Stale { last_good: T, error: FetchError },
    /// Polls have failed and nothing has ever succeeded.
    Failed(FetchError),
}

impl<T> FetchState<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FetchState::Fresh(value) | FetchState::Stale { last_good: value, .. } => Some(value),
            FetchState::Pending | FetchState::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchState::Stale { error, .. } | FetchState::Failed(error) => Some(error),
            FetchState::Pending | FetchState::Fresh(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchState::Failed(_))
    }

    fn narrow<U>(self, pick: impl Fn(T) -> Option<U>) -> FetchState<U> {
        match self {
            FetchState::Pending => FetchState::Pending,
            FetchState::Fresh(value) => pick(value).map_or(FetchState::Pending, FetchState::Fresh),
            FetchState::Stale { last_good, error } => match pick(last_good) {
                Some(last_good) => FetchState::Stale { last_good, error },
                None => FetchState::Failed(error),
            },
            FetchState::Failed(error) => FetchState::Failed(error),
        }
    }
}

/// Latest applied outcome for one source, plus the newest success seen so far
/// when that outcome is a failure.
#[derive(Clone, Debug)]
struct Polled {
    outcome: Result<Payload, FetchError>,
    last_good: Option<Payload>,
}

/// Shared state between the pollers and the renderer.
#[derive(Default)]
pub struct Board {
    latest: LatestWins<Source, Polled>,
    generation: AtomicU64,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped every time an outcome is applied; lets the renderer skip
    /// redraws when nothing changed.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn issue(&self, source: Source) -> st_core::Ticket<Source> {
        self.latest.issue(source)
    }

    /// Returns `false` when a newer poll of the same source already resolved.
    /// The last-good value is carried forward under the same lock as the
    /// outcome, so it always belongs to the newest applied success.
    pub fn resolve(
        &self,
        ticket: &st_core::Ticket<Source>,
        outcome: Result<Payload, FetchError>,
    ) -> bool {
        let applied = self.latest.resolve_with(ticket, |previous| {
            let last_good = match outcome {
                Ok(_) => None,
                Err(_) => previous.and_then(|prev| match prev.outcome {
                    Ok(payload) => Some(payload),
                    Err(_) => prev.last_good,
                }),
            };
            Polled { outcome, last_good }
        });
        if !applied {
            debug!(
                source = ticket.key().as_str(),
                seq = ticket.seq(),
                "superseded response dropped"
            );
            return false;
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        true
    }

    pub fn state(&self, source: Source) -> FetchState<Payload> {
        match self.latest.latest(&source) {
            None => FetchState::Pending,
            Some(Polled {
                outcome: Ok(payload),
                ..
            }) => FetchState::Fresh(payload),
            Some(Polled {
                outcome: Err(error),
                last_good: Some(last_good),
            }) => FetchState::Stale { last_good, error },
            Some(Polled {
                outcome: Err(error),
                last_good: None,
            }) => FetchState::Failed(error),
        }
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            ecosystem: self.state(Source::Ecosystem).narrow(|payload| match payload {
                Payload::Ecosystem(snapshot) => Some(snapshot),
                _ => None,
            }),
            health: self.state(Source::Health).narrow(|payload| match payload {
                Payload::Health(health) => Some(health),
                _ => None,
            }),
            activity: self.state(Source::Activity).narrow(|payload| match payload {
                Payload::Activity(events) => Some(events),
                _ => None,
            }),
        }
    }
}

/// A consistent read of all three sources for one render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardView {
    pub ecosystem: FetchState<EcosystemSnapshot>,
    pub health: FetchState<HealthResponse>,
    pub activity: FetchState<Vec<ActivityEvent>>,
}

impl DashboardView {
    pub fn any_failed(&self) -> bool {
        self.ecosystem.is_failed() || self.health.is_failed() || self.activity.is_failed()
    }
}

/// One ticketed poll: issue, fetch with retry, decode, resolve.
pub fn poll_source(
    fetch: &dyn Fetch,
    board: &Board,
    source: Source,
    activity_limit: u16,
    policy: &RetryPolicy,
    sleep: impl FnMut(Duration),
) -> bool {
    let ticket = board.issue(source);
    let path = source.path(activity_limit);
    let outcome = fetch_with_retry(fetch, &path, policy, sleep)
        .and_then(|value| Payload::decode(source, value, &path));
    if let Err(err) = &outcome {
        warn!(source = source.as_str(), error = %err, "poll failed");
    }
    board.resolve(&ticket, outcome)
}

/// Polls every source once, in order. Used by `--once`.
pub fn poll_once(fetch: &dyn Fetch, board: &Board, activity_limit: u16, policy: &RetryPolicy) {
    for source in Source::ALL {
        poll_source(fetch, board, source, activity_limit, policy, std::thread::sleep);
    }
}

#[derive(Clone, Debug)]
pub struct Schedule {
    pub activity: Duration,
    pub ecosystem: Duration,
    pub health: Duration,
    pub activity_limit: u16,
    pub policy: RetryPolicy,
}

impl Schedule {
    fn interval(&self, source: Source) -> Duration {
        match source {
            Source::Activity => self.activity,
            Source::Ecosystem => self.ecosystem,
            Source::Health => self.health,
        }
    }
}

const SHUTDOWN_CHECK: Duration = Duration::from_millis(100);

/// Sleeps in short slices; returns `false` once shutdown is requested.
fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let step = remaining.min(SHUTDOWN_CHECK);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
    !shutdown.load(Ordering::Relaxed)
}

/// Starts one polling thread per source. Threads exit once `shutdown` is set.
pub fn spawn_pollers(
    fetch: Arc<dyn Fetch>,
    board: Arc<Board>,
    schedule: Schedule,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<Vec<JoinHandle<()>>> {
    let mut handles = Vec::with_capacity(Source::ALL.len());
    for source in Source::ALL {
        let fetch = Arc::clone(&fetch);
        let board = Arc::clone(&board);
        let schedule = schedule.clone();
        let shutdown = Arc::clone(&shutdown);
        let handle = std::thread::Builder::new()
            .name(format!("poll-{}", source.as_str()))
            .spawn(move || {
                let interval = schedule.interval(source);
                info!(
                    source = source.as_str(),
                    interval_s = interval.as_secs(),
                    "poller started"
                );
                loop {
                    poll_source(
                        fetch.as_ref(),
                        &board,
                        source,
                        schedule.activity_limit,
                        &schedule.policy,
                        |delay| {
                            sleep_unless_shutdown(delay, &shutdown);
                        },
                    );
                    if !sleep_unless_shutdown(interval, &shutdown) {
                        break;
                    }
                }
                debug!(source = source.as_str(), "poller stopped");
            })?;
        handles.push(handle);
    }
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<VecDeque<Result<Value, FetchError>>>,
        calls: AtomicU64,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Value, FetchError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU64::new(0),
            }
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetch for Scripted {
        fn get_json(&self, path: &str) -> Result<Value, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(FetchError::Transport {
                        path: path.to_string(),
                        message: "script exhausted".to_string(),
                    })
                })
        }
    }

    fn refused() -> FetchError {
        FetchError::Transport {
            path: "/api/v1/health".to_string(),
            message: "connection refused".to_string(),
        }
    }

    fn health_body(status: &str) -> Value {
        json!({
            "status": status,
            "timestamp": "2024-05-01T09:00:00Z",
            "sources": {"contract_store": "ok"}
        })
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::STANDARD;
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(1000));
        assert_eq!(policy.delay(3), Duration::from_millis(2000));
        assert_eq!(policy.delay(7), Duration::from_secs(30));
        assert_eq!(policy.delay(40), Duration::from_secs(30));
    }

    #[test]
    fn transient_failures_are_retried_until_success() {
        let fetch = Scripted::new(vec![Err(refused()), Err(refused()), Ok(health_body("ok"))]);
        let mut slept = Vec::new();
        let value = fetch_with_retry(&fetch, "/api/v1/health", &RetryPolicy::STANDARD, |d| {
            slept.push(d)
        })
        .unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(fetch.calls(), 3);
        assert_eq!(
            slept,
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[test]
    fn retries_stop_at_max_attempts() {
        let fetch = Scripted::new(vec![Err(refused()), Err(refused()), Err(refused()), Ok(health_body("ok"))]);
        let err = fetch_with_retry(&fetch, "/api/v1/health", &RetryPolicy::STANDARD, |_| {})
            .unwrap_err();
        assert!(err.retryable());
        assert_eq!(fetch.calls(), 3);
    }

    #[test]
    fn client_errors_are_not_retried() {
        let fetch = Scripted::new(vec![Err(FetchError::Http {
            path: "/api/v1/activity?limit=0".to_string(),
            status: 400,
            code: Some("INVALID_LIMIT".to_string()),
        })]);
        let mut slept = 0;
        let err = fetch_with_retry(&fetch, "/api/v1/activity?limit=0", &RetryPolicy::STANDARD, |_| {
            slept += 1
        })
        .unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 400, .. }));
        assert_eq!(fetch.calls(), 1);
        assert_eq!(slept, 0);
    }

    #[test]
    fn failure_after_success_keeps_last_good() {
        let board = Board::new();
        let fetch = Scripted::new(vec![Ok(health_body("ok"))]);
        assert!(matches!(board.state(Source::Health), FetchState::Pending));

        poll_source(&fetch, &board, Source::Health, 50, &RetryPolicy::STANDARD, |_| {});
        assert_eq!(board.view().health.value().map(|h| h.status.as_str()), Some("ok"));

        // Script exhausted: every further attempt is a transport error.
        poll_source(&fetch, &board, Source::Health, 50, &RetryPolicy::STANDARD, |_| {});
        let view = board.view();
        match &view.health {
            FetchState::Stale { last_good, error } => {
                assert_eq!(last_good.status, "ok");
                assert!(error.retryable());
            }
            other => panic!("expected stale, got {other:?}"),
        }
        assert!(!view.any_failed());
    }

    #[test]
    fn failure_without_history_is_hard_failure() {
        let board = Board::new();
        let fetch = Scripted::new(vec![]);
        poll_source(&fetch, &board, Source::Ecosystem, 50, &RetryPolicy::STANDARD, |_| {});
        let view = board.view();
        assert!(view.ecosystem.is_failed());
        assert!(view.any_failed());
        assert!(matches!(view.activity, FetchState::Pending));
    }

    #[test]
    fn undecodable_body_is_reported_without_retry() {
        let board = Board::new();
        let fetch = Scripted::new(vec![Ok(json!({"unexpected": true}))]);
        poll_source(&fetch, &board, Source::Activity, 50, &RetryPolicy::STANDARD, |_| {});
        assert_eq!(fetch.calls(), 1);
        assert!(matches!(
            board.view().activity,
            FetchState::Failed(FetchError::Decode { .. })
        ));
    }

    #[test]
    fn late_response_does_not_overwrite_newer_one() {
        let board = Board::new();
        let older = board.issue(Source::Health);
        let newer = board.issue(Source::Health);
        let fresh = Payload::Health(serde_json::from_value(health_body("ok")).unwrap());
        let late = Payload::Health(serde_json::from_value(health_body("degraded")).unwrap());

        assert!(board.resolve(&newer, Ok(fresh)));
        let generation = board.generation();
        assert!(!board.resolve(&older, Ok(late)));
        assert_eq!(board.generation(), generation);
        assert_eq!(board.view().health.value().map(|h| h.status.as_str()), Some("ok"));
    }

    #[test]
    fn last_good_follows_the_newest_applied_success() {
        let board = Board::new();
        let health =
            |status: &str| Payload::Health(serde_json::from_value(health_body(status)).unwrap());

        let older = board.issue(Source::Health);
        let newer = board.issue(Source::Health);
        assert!(board.resolve(&newer, Ok(health("ok"))));
        assert!(!board.resolve(&older, Ok(health("degraded"))));

        for _ in 0..2 {
            let failing = board.issue(Source::Health);
            assert!(board.resolve(&failing, Err(refused())));
        }
        match board.state(Source::Health) {
            FetchState::Stale { last_good: Payload::Health(h), .. } => assert_eq!(h.status, "ok"),
            other => panic!("expected stale, got {other:?}"),
        }

        let recovered = board.issue(Source::Health);
        assert!(board.resolve(&recovered, Ok(health("degraded"))));
        let failing = board.issue(Source::Health);
        assert!(board.resolve(&failing, Err(refused())));
        match board.state(Source::Health) {
            FetchState::Stale { last_good: Payload::Health(h), .. } => {
                assert_eq!(h.status, "degraded")
            }
            other => panic!("expected stale, got {other:?}"),
        }
    }

    #[test]
    fn activity_path_carries_limit() {
        assert_eq!(Source::Activity.path(20), "/api/v1/activity?limit=20");
        assert_eq!(Source::Ecosystem.path(20), "/api/v1/ecosystem");
    }

    #[test]
    fn pollers_stop_on_shutdown() {
        let fetch: Arc<dyn Fetch> = Arc::new(Scripted::new(vec![Ok(health_body("ok"))]));
        let board = Arc::new(Board::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let schedule = Schedule {
            activity: Duration::from_secs(60),
            ecosystem: Duration::from_secs(60),
            health: Duration::from_secs(60),
            activity_limit: 10,
            policy: RetryPolicy {
                base: Duration::from_millis(1),
                factor: 2,
                cap: Duration::from_millis(5),
                max_attempts: 1,
            },
        };
        let handles = spawn_pollers(fetch, Arc::clone(&board), schedule, Arc::clone(&shutdown)).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while board.generation() < 3 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        shutdown.store(true, Ordering::Relaxed);
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(board.generation(), 3);
    }
}
