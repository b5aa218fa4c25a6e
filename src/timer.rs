//! Cancellable gesture timers.
//!
//! Every timeout in the engine (recognition window, completion timeout,
//! repeat-gap, hover dwell) is backed by one cancellable
//! [`GestureTimer`] handle per gesture/ink instance (spec §9's design
//! note: "a disciplined re-implementation keeps one cancellable timer
//! handle per gesture instance and cancels it on any state
//! transition"). [`GestureTimerService`] supports both a frame-polled
//! model (`check_timers`) for hosts driving their own loop and an async
//! model (`run_async` / `run_until_shutdown`) for hosts on a `tokio`
//! runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::ids::TimerId;

/// A cancellable handle to a scheduled timer callback.
#[derive(Clone)]
pub struct GestureTimer {
    id: TimerId,
    cancelled: Arc<AtomicBool>,
}

impl GestureTimer {
    fn new(id: TimerId) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancels this timer. Idempotent; safe to call after it has
    /// already fired.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether this timer has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// This timer's identifier.
    #[must_use]
    pub fn id(&self) -> TimerId {
        self.id
    }
}

impl std::fmt::Debug for GestureTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureTimer")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct TimerEntry {
    id: TimerId,
    deadline: Instant,
    callback: Box<dyn FnOnce() + Send + 'static>,
    cancelled: Arc<AtomicBool>,
}

/// A service that schedules and fires cancellable timers.
#[derive(Clone)]
pub struct GestureTimerService {
    timers: Arc<Mutex<Vec<TimerEntry>>>,
}

impl GestureTimerService {
    /// Creates an empty timer service.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timers: Arc::new(Mutex::new(Vec::with_capacity(8))),
        }
    }

    /// Schedules `callback` to fire after `duration` and returns a
    /// handle that can cancel it before it fires.
    pub fn schedule<F>(&self, duration: Duration, callback: F) -> GestureTimer
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_at(Instant::now() + duration, callback)
    }

    /// Schedules `callback` to fire at the absolute `deadline`.
    pub fn schedule_at<F>(&self, deadline: Instant, callback: F) -> GestureTimer
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TimerId::next();
        let timer = GestureTimer::new(id);
        let entry = TimerEntry {
            id,
            deadline,
            callback: Box::new(callback),
            cancelled: timer.cancelled.clone(),
        };

        let mut timers = self.timers.lock();
        let pos = timers.partition_point(|t| t.deadline <= deadline);
        timers.insert(pos, entry);
        timer
    }

    /// Fires every timer whose deadline has passed and that has not
    /// been cancelled. Returns how many callbacks fired. Callbacks run
    /// outside the internal lock so they may freely schedule new
    /// timers.
    pub fn check_timers(&self) -> usize {
        let now = Instant::now();
        let ready: Vec<TimerEntry> = {
            let mut timers = self.timers.lock();
            timers.retain(|t| !t.cancelled.load(Ordering::Acquire));
            let split_at = timers.partition_point(|t| t.deadline <= now);
            timers.drain(..split_at).collect()
        };

        let mut fired = 0;
        for entry in ready {
            if !entry.cancelled.load(Ordering::Acquire) {
                (entry.callback)();
                fired += 1;
            }
        }
        fired
    }

    /// Time until the next pending timer fires, if any.
    #[must_use]
    pub fn time_until_next(&self) -> Option<Duration> {
        let timers = self.timers.lock();
        timers.first().map(|t| t.deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether any timer is pending.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.timers.lock().is_empty()
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.timers.lock().len()
    }

    /// Cancels every pending timer.
    pub fn cancel_all(&self) {
        let timers = self.timers.lock();
        for t in timers.iter() {
            t.cancelled.store(true, Ordering::Release);
        }
    }

    /// Drives this service on a `tokio` runtime indefinitely, polling
    /// at most every 100ms (or sooner, if a timer is due earlier).
    pub async fn run_async(self) {
        loop {
            self.check_timers();
            let wait = self
                .time_until_next()
                .unwrap_or(Duration::from_millis(100))
                .min(Duration::from_millis(100));
            tokio::time::sleep(wait).await;
        }
    }

    /// Like [`run_async`](Self::run_async), but stops when `shutdown`
    /// resolves.
    pub async fn run_until_shutdown(self, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        loop {
            self.check_timers();
            let wait = self
                .time_until_next()
                .unwrap_or(Duration::from_millis(100))
                .min(Duration::from_millis(100));
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                _ = &mut shutdown => {
                    tracing::trace!("timer service shutting down");
                    return;
                }
            }
        }
    }
}

impl Default for GestureTimerService {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_TIMER_SERVICE: Lazy<GestureTimerService> = Lazy::new(GestureTimerService::new);

/// The process-wide default timer service, used when a [`crate::host::HostRoot`]
/// is not given one explicitly.
pub fn global_timer_service() -> &'static GestureTimerService {
    &GLOBAL_TIMER_SERVICE
}
