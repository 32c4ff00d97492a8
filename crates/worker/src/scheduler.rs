//! Fixed-interval run scheduler with a no-overlap guarantee.
//!
//! A single timer task fires the job every `interval`. If the previous run
//! is still in progress the tick is skipped, never queued. A panicking run
//! is logged and the schedule carries on. Stopping cancels the timer,
//! signals the in-flight run, and waits for it up to a grace period.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::monitor::MonitorService;

/// Default tick interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest accepted tick interval; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default bound on waiting for an in-flight run during shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Work executed once per tick.
#[async_trait]
pub trait MonitorJob: Send + Sync + 'static {
    /// `cancel` fires when the scheduler is stopping.
    async fn run(&self, cancel: CancellationToken);
}

#[async_trait]
impl MonitorJob for MonitorService {
    async fn run(&self, cancel: CancellationToken) {
        self.run_once(&cancel).await;
    }
}

/// Counters shared between the timer task and the handle.
#[derive(Debug, Default)]
struct Counters {
    started: AtomicU64,
    skipped: AtomicU64,
    panicked: AtomicU64,
}

/// Point-in-time copy of the scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub runs_started: u64,
    /// Ticks dropped because a run was still in progress.
    pub runs_skipped: u64,
    pub runs_panicked: u64,
}

/// Result of [`SchedulerHandle::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub stats: SchedulerStats,
    /// The in-flight run outlived the grace period.
    pub timed_out: bool,
}

/// Schedule configuration. Call [`RunScheduler::start`] to begin ticking.
#[derive(Debug, Clone, Copy)]
pub struct RunScheduler {
    interval: Duration,
    grace: Duration,
}

impl Default for RunScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_SHUTDOWN_GRACE)
    }
}

impl RunScheduler {
    /// `interval` is raised to [`MIN_POLL_INTERVAL`] if shorter.
    pub fn new(interval: Duration, grace: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            grace,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the timer task. The first run starts immediately.
    pub fn start<J: MonitorJob>(self, job: Arc<J>) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let counters = Arc::new(Counters::default());

        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            grace_secs = self.grace.as_secs_f64(),
            "Run scheduler started"
        );

        let task = tokio::spawn(tick_loop(
            self.interval,
            job,
            cancel.clone(),
            Arc::clone(&counters),
        ));

        SchedulerHandle {
            cancel,
            counters,
            task,
            grace: self.grace,
        }
    }
}

/// Handle to a running schedule.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    counters: Arc<Counters>,
    task: JoinHandle<Option<JoinHandle<()>>>,
    grace: Duration,
}

impl SchedulerHandle {
    pub fn stats(&self) -> SchedulerStats {
        snapshot(&self.counters)
    }

    /// Stop ticking and wait for the in-flight run, if any.
    ///
    /// Always returns; a run that outlives the grace period is reported in
    /// the [`ShutdownReport`] and left to finish on its own.
    pub async fn stop(self) -> ShutdownReport {
        self.cancel.cancel();

        let in_flight = match self.task.await {
            Ok(in_flight) => in_flight,
            Err(e) => {
                tracing::error!(error = %e, "Scheduler task failed");
                None
            }
        };

        let mut timed_out = false;
        if let Some(run) = in_flight {
            if !run.is_finished() {
                tracing::info!(
                    grace_secs = self.grace.as_secs_f64(),
                    "Waiting for in-flight monitor run"
                );
            }
            if tokio::time::timeout(self.grace, run).await.is_err() {
                tracing::warn!(
                    grace_secs = self.grace.as_secs_f64(),
                    "In-flight monitor run did not finish within the shutdown grace period"
                );
                timed_out = true;
            }
        }

        let stats = snapshot(&self.counters);
        tracing::info!(
            runs_started = stats.runs_started,
            runs_skipped = stats.runs_skipped,
            runs_panicked = stats.runs_panicked,
            timed_out,
            "Run scheduler stopped"
        );
        ShutdownReport { stats, timed_out }
    }
}

fn snapshot(counters: &Counters) -> SchedulerStats {
    SchedulerStats {
        runs_started: counters.started.load(Ordering::Relaxed),
        runs_skipped: counters.skipped.load(Ordering::Relaxed),
        runs_panicked: counters.panicked.load(Ordering::Relaxed),
    }
}

/// Timer loop. Returns the handle of the run still in flight when
/// cancelled, so `stop` can wait on it.
async fn tick_loop<J: MonitorJob>(
    period: Duration,
    job: Arc<J>,
    cancel: CancellationToken,
    counters: Arc<Counters>,
) -> Option<JoinHandle<()>> {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if in_flight.as_ref().is_some_and(|run| !run.is_finished()) {
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Previous monitor run still in progress, skipping tick");
                    continue;
                }

                let run_no = counters.started.fetch_add(1, Ordering::Relaxed) + 1;
                in_flight = Some(spawn_run(
                    run_no,
                    Arc::clone(&job),
                    cancel.child_token(),
                    Arc::clone(&counters),
                ));
            }
        }
    }

    in_flight
}

/// Run the job on its own task so a panic is observed as a `JoinError`
/// instead of unwinding through the timer.
fn spawn_run<J: MonitorJob>(
    run_no: u64,
    job: Arc<J>,
    cancel: CancellationToken,
    counters: Arc<Counters>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(run_no, "Monitor run triggered");
        let inner = tokio::spawn(async move { job.run(cancel).await });
        match inner.await {
            Ok(()) => tracing::debug!(run_no, "Monitor run completed"),
            Err(e) if e.is_panic() => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                tracing::error!(run_no, "Monitor run panicked, schedule continues");
            }
            Err(e) => tracing::warn!(run_no, error = %e, "Monitor run aborted"),
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// Sleeps for a fixed time and tracks how many runs overlap.
    struct SlowJob {
        duration: Duration,
        active: AtomicUsize,
        max_active: AtomicUsize,
        completed: AtomicUsize,
    }

    impl SlowJob {
        fn new(duration: Duration) -> Self {
            Self {
                duration,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MonitorJob for SlowJob {
        async fn run(&self, _cancel: CancellationToken) {
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            tokio::time::sleep(self.duration).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_ticks_are_skipped_not_queued() {
        let job = Arc::new(SlowJob::new(Duration::from_millis(250)));
        let handle = RunScheduler::new(Duration::from_millis(100), Duration::from_secs(1))
            .start(Arc::clone(&job));

        // Ticks at 0, 100, 200, 300, 400. Runs occupy 0..250 and 300..550.
        tokio::time::sleep(Duration::from_millis(450)).await;
        let report = handle.stop().await;

        assert_eq!(report.stats.runs_started, 2);
        assert_eq!(report.stats.runs_skipped, 3);
        assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
        assert!(!report.timed_out);
        assert_eq!(job.completed.load(Ordering::SeqCst), 2);
    }

    struct PanicsOnce {
        panicked: AtomicBool,
        runs: AtomicUsize,
    }

    #[async_trait]
    impl MonitorJob for PanicsOnce {
        async fn run(&self, _cancel: CancellationToken) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("first run blows up");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_run_does_not_stop_the_schedule() {
        let job = Arc::new(PanicsOnce {
            panicked: AtomicBool::new(false),
            runs: AtomicUsize::new(0),
        });
        let handle = RunScheduler::new(Duration::from_millis(100), Duration::from_secs(1))
            .start(Arc::clone(&job));

        tokio::time::sleep(Duration::from_millis(250)).await;
        let report = handle.stop().await;

        assert_eq!(report.stats.runs_started, 3);
        assert_eq!(report.stats.runs_panicked, 1);
        assert_eq!(report.stats.runs_skipped, 0);
        assert_eq!(job.runs.load(Ordering::SeqCst), 3);
    }

    /// Ignores cancellation entirely.
    struct Stubborn;

    #[async_trait]
    impl MonitorJob for Stubborn {
        async fn run(&self, _cancel: CancellationToken) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_gives_up_after_grace_period() {
        let handle = RunScheduler::new(Duration::from_secs(60), Duration::from_secs(2))
            .start(Arc::new(Stubborn));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let started = tokio::time::Instant::now();
        let report = handle.stop().await;

        assert!(report.timed_out);
        assert_eq!(report.stats.runs_started, 1);
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(3600));
    }

    /// Returns as soon as the scheduler stops.
    struct Cooperative;

    #[async_trait]
    impl MonitorJob for Cooperative {
        async fn run(&self, cancel: CancellationToken) {
            cancel.cancelled().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signals_and_awaits_in_flight_run() {
        let handle = RunScheduler::new(Duration::from_secs(60), Duration::from_secs(30))
            .start(Arc::new(Cooperative));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.stats().runs_started, 1);

        let report = handle.stop().await;
        assert!(!report.timed_out);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_clamped() {
        let scheduler = RunScheduler::new(Duration::ZERO, Duration::from_secs(1));
        assert_eq!(scheduler.interval(), MIN_POLL_INTERVAL);

        let handle = scheduler.start(Arc::new(Cooperative));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.stats().runs_started, 1);

        let report = handle.stop().await;
        assert!(!report.timed_out);
    }
}
