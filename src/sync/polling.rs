//! Cooperative polling scheduler.
//!
//! A [`PollingScheduler`] invokes a caller-supplied resynchronization callback
//! on a fixed period. Ticks are skipped while the previous callback is still
//! pending, while the host reports the view as hidden, while the user is idle
//! (when the idle timer is enabled), and while backing off after a failure.
//!
//! # Example
//!
//! ```ignore
//! let monitor = ActivityMonitor::new();
//! let handle = PollingScheduler::new(SchedulerConfig::from_config(&config), monitor.clone())
//!     .spawn(move || {
//!         let client = client.clone();
//!         async move { client.get_list("list-1").await.map(drop).map_err(Into::into) }.boxed()
//!     });
//! // ...
//! handle.stop().await;
//! ```

use crate::config::Config;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Future produced by one invocation of the polling callback.
pub type TickFuture = BoxFuture<'static, anyhow::Result<()>>;

type SharedCallback = Arc<Mutex<Box<dyn FnMut() -> TickFuture + Send>>>;

// ============================================================================
// Host environment
// ============================================================================

/// What the scheduler needs to know about the host before each tick.
pub trait Environment: Send + Sync + 'static {
    /// False while the document or window is hidden.
    fn is_visible(&self) -> bool;
    /// Time since the last user activity.
    fn idle_for(&self) -> Duration;
}

/// Shared visibility and activity tracker fed by the UI layer.
#[derive(Debug, Clone)]
pub struct ActivityMonitor {
    inner: Arc<ActivityInner>,
}

#[derive(Debug)]
struct ActivityInner {
    hidden: AtomicBool,
    last_activity: Mutex<Instant>,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ActivityInner {
                hidden: AtomicBool::new(false),
                last_activity: Mutex::new(Instant::now()),
            }),
        }
    }

    pub fn record_activity(&self) {
        *self
            .inner
            .last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
    }

    pub fn set_visible(&self, visible: bool) {
        self.inner.hidden.store(!visible, Ordering::Release);
    }
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for ActivityMonitor {
    fn is_visible(&self) -> bool {
        !self.inner.hidden.load(Ordering::Acquire)
    }

    fn idle_for(&self) -> Duration {
        self.inner
            .last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }
}

// ============================================================================
// Configuration and state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// `None` disables polling entirely.
    pub period: Option<Duration>,
    pub idle_timer_enabled: bool,
    pub idle_timeout: Duration,
    pub backoff_base: Duration,
    pub max_backoff: Duration,
}

impl SchedulerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            period: config.poll_interval(),
            idle_timer_enabled: config.idle_timer_enabled,
            idle_timeout: config.idle_timeout(),
            backoff_base: config.backoff_base(),
            max_backoff: config.max_backoff(),
        }
    }

    pub fn every(period: Duration) -> Self {
        Self {
            period: Some(period),
            ..Self::default()
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Per-scheduler guard and backoff counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollingState {
    pub in_flight: bool,
    pub backoff_level: u32,
    pub last_failure_at: Option<Instant>,
}

impl PollingState {
    /// Wait imposed after the current run of failures: zero at level 0,
    /// then `base`, `2 * base`, `4 * base`, ... capped at `max`.
    pub fn backoff_wait(&self, base: Duration, max: Duration) -> Duration {
        if self.backoff_level == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(self.backoff_level - 1);
        base.saturating_mul(factor).min(max)
    }

    fn in_backoff(&self, now: Instant, base: Duration, max: Duration) -> bool {
        match self.last_failure_at {
            Some(failed_at) if self.backoff_level > 0 => {
                now.saturating_duration_since(failed_at) < self.backoff_wait(base, max)
            }
            _ => false,
        }
    }

    fn record_success(&mut self) {
        self.backoff_level = 0;
        self.last_failure_at = None;
    }

    fn record_failure(&mut self, now: Instant) {
        self.backoff_level = self.backoff_level.saturating_add(1);
        self.last_failure_at = Some(now);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerPhase {
    #[default]
    Idle,
    Ticking,
    Backoff,
    Stopped,
}

/// Observable status published after every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollingStatus {
    pub phase: SchedulerPhase,
    pub backoff_level: u32,
}

/// Why a tick did or did not invoke the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Run,
    SkipInFlight,
    SkipHidden,
    SkipIdle,
    SkipBackoff,
}

// ============================================================================
// Scheduler
// ============================================================================

pub struct PollingScheduler<E: Environment> {
    config: SchedulerConfig,
    environment: E,
    state: PollingState,
    /// When the current backoff wait lapses. Cleared once `Idle` is published.
    backoff_deadline: Option<Instant>,
}

impl<E: Environment> PollingScheduler<E> {
    pub fn new(config: SchedulerConfig, environment: E) -> Self {
        Self {
            config,
            environment,
            state: PollingState::default(),
            backoff_deadline: None,
        }
    }

    pub fn state(&self) -> PollingState {
        self.state
    }

    /// Evaluate the gates for a tick at `now`. The overlap guard is checked
    /// first so a pending callback is never reported as some other skip.
    pub fn decide(&self, now: Instant) -> TickDecision {
        if self.state.in_flight {
            return TickDecision::SkipInFlight;
        }
        if !self.environment.is_visible() {
            return TickDecision::SkipHidden;
        }
        if self.config.idle_timer_enabled
            && self.environment.idle_for() >= self.config.idle_timeout
        {
            return TickDecision::SkipIdle;
        }
        if self
            .state
            .in_backoff(now, self.config.backoff_base, self.config.max_backoff)
        {
            return TickDecision::SkipBackoff;
        }
        TickDecision::Run
    }

    /// Start the timer task. With polling disabled no task is started and
    /// the returned handle is inert.
    pub fn spawn<F>(self, callback: F) -> PollingHandle
    where
        F: FnMut() -> TickFuture + Send + 'static,
    {
        let callback: SharedCallback = Arc::new(Mutex::new(Box::new(callback)));
        let (status_tx, status_rx) = watch::channel(PollingStatus::default());
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = match self.config.period {
            Some(period) if !period.is_zero() => {
                tracing::debug!(period_ms = period.as_millis() as u64, "Starting poller");
                Some(tokio::spawn(self.run(
                    period,
                    Arc::clone(&callback),
                    status_tx,
                    stop_rx,
                )))
            }
            _ => {
                tracing::debug!("Polling disabled");
                None
            }
        };

        PollingHandle {
            callback,
            status: status_rx,
            stop: Some(stop_tx),
            task,
        }
    }

    async fn run(
        mut self,
        period: Duration,
        callback: SharedCallback,
        status: watch::Sender<PollingStatus>,
        mut stop: oneshot::Receiver<()>,
    ) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<anyhow::Result<()>>();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                // Explicit stop or handle dropped
                _ = &mut stop => break,

                Some(result) = done_rx.recv() => self.settle(result, &status),

                _ = tokio::time::sleep_until(self.backoff_deadline.unwrap_or_else(Instant::now)),
                    if self.backoff_deadline.is_some() => self.backoff_lapsed(&status),

                _ = ticker.tick() => self.tick(&callback, &done_tx, &status),
            }
        }

        tracing::debug!("Poller stopped");
        status.send_replace(PollingStatus {
            phase: SchedulerPhase::Stopped,
            backoff_level: self.state.backoff_level,
        });
    }

    fn tick(
        &mut self,
        callback: &SharedCallback,
        done_tx: &mpsc::UnboundedSender<anyhow::Result<()>>,
        status: &watch::Sender<PollingStatus>,
    ) {
        let decision = self.decide(Instant::now());
        if decision != TickDecision::Run {
            tracing::trace!(reason = ?decision, "Skipping poll tick");
            return;
        }

        let produced = {
            let mut guard = callback
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let invoke: &mut (dyn FnMut() -> TickFuture + Send) = &mut **guard;
            std::panic::catch_unwind(AssertUnwindSafe(|| invoke()))
        };

        let future = match produced {
            Ok(future) => future,
            Err(panic) => {
                // Guard stays released; synchronous failures do not back off
                tracing::warn!(error = %panic_message(panic.as_ref()), "Poll callback panicked");
                return;
            }
        };

        self.state.in_flight = true;
        self.publish(status, SchedulerPhase::Ticking);

        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let result = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(anyhow::anyhow!(
                    "poll task panicked: {}",
                    panic_message(panic.as_ref())
                )),
            };
            // Receiver is gone once the scheduler stopped; the result is discarded
            let _ = done_tx.send(result);
        });
    }

    fn settle(&mut self, result: anyhow::Result<()>, status: &watch::Sender<PollingStatus>) {
        self.state.in_flight = false;
        match result {
            Ok(()) => {
                if self.state.backoff_level > 0 {
                    tracing::info!(
                        backoff_level = self.state.backoff_level,
                        "Polling recovered"
                    );
                }
                self.state.record_success();
                self.backoff_deadline = None;
                self.publish(status, SchedulerPhase::Idle);
            }
            Err(e) => {
                let now = Instant::now();
                self.state.record_failure(now);
                let wait = self
                    .state
                    .backoff_wait(self.config.backoff_base, self.config.max_backoff);
                self.backoff_deadline = Some(now + wait);
                tracing::warn!(
                    error = %e,
                    backoff_level = self.state.backoff_level,
                    wait_ms = wait.as_millis() as u64,
                    "Poll failed, backing off"
                );
                self.publish(status, SchedulerPhase::Backoff);
            }
        }
    }

    /// The wait is over; the next tick may run again.
    fn backoff_lapsed(&mut self, status: &watch::Sender<PollingStatus>) {
        self.backoff_deadline = None;
        if !self.state.in_flight {
            tracing::debug!(backoff_level = self.state.backoff_level, "Backoff wait lapsed");
            self.publish(status, SchedulerPhase::Idle);
        }
    }

    fn publish(&self, status: &watch::Sender<PollingStatus>, phase: SchedulerPhase) {
        status.send_replace(PollingStatus {
            phase,
            backoff_level: self.state.backoff_level,
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Owner-side handle of a running scheduler.
///
/// Dropping the handle stops the timer just like [`PollingHandle::stop`],
/// without waiting for the task to wind down.
pub struct PollingHandle {
    callback: SharedCallback,
    status: watch::Receiver<PollingStatus>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollingHandle {
    /// Replace the callback. The next tick invokes the new one.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: FnMut() -> TickFuture + Send + 'static,
    {
        *self
            .callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Box::new(callback);
    }

    pub fn status(&self) -> PollingStatus {
        *self.status.borrow()
    }

    /// False when polling is disabled or the scheduler has stopped.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the timer and wait for the scheduler task to exit. Callbacks
    /// already in flight run to completion; their results are dropped.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Poller task ended abnormally");
            }
        }
    }
}
