use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::ConfigError;

const DEFAULT_TICK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Daily,
    Weekly,
    /// Every 30 days.
    Monthly,
}

impl Cadence {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "daily" => Ok(Cadence::Daily),
            "weekly" => Ok(Cadence::Weekly),
            "monthly" => Ok(Cadence::Monthly),
            other => Err(ConfigError::InvalidCadence(other.to_string())),
        }
    }

    pub fn period(&self) -> TimeDelta {
        match self {
            Cadence::Daily => TimeDelta::days(1),
            Cadence::Weekly => TimeDelta::days(7),
            Cadence::Monthly => TimeDelta::days(30),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
            Cadence::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

/// Work the scheduler can trigger.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self);
}

struct ScheduledJob {
    job: Arc<dyn Job>,
    next_run: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct ScheduleInfo {
    pub cadence: Cadence,
    pub upload_time: NaiveTime,
    pub running: bool,
    pub next_run: Option<NaiveDateTime>,
    pub jobs_count: usize,
}

/// Polls its job list on a fixed tick and runs whatever is due, one job at a time.
pub struct Scheduler {
    cadence: Cadence,
    at: NaiveTime,
    tick: Duration,
    jobs: Arc<Mutex<Vec<ScheduledJob>>>,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(cadence: Cadence, at: NaiveTime) -> Self {
        info!(
            "Scheduler initialized with {} runs at {}",
            cadence,
            at.format("%H:%M")
        );
        Self {
            cadence,
            at,
            tick: DEFAULT_TICK,
            jobs: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            handle: None,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Registers `job` at the configured cadence, first due at the next occurrence of the upload time.
    pub async fn schedule(&self, job: Arc<dyn Job>) -> NaiveDateTime {
        self.schedule_from(job, Local::now().naive_local()).await
    }

    pub async fn schedule_from(&self, job: Arc<dyn Job>, now: NaiveDateTime) -> NaiveDateTime {
        let next_run = next_occurrence(self.at, now);
        info!(
            "Scheduling '{}' {} at {} (next run {})",
            job.name(),
            self.cadence,
            self.at.format("%H:%M"),
            next_run
        );
        self.jobs.lock().await.push(ScheduledJob { job, next_run });
        next_run
    }

    /// Runs every job due at `now` sequentially and reschedules it. Returns how many ran.
    pub async fn run_pending(&self, now: NaiveDateTime) -> usize {
        run_due_jobs(&self.jobs, self.cadence, now).await
    }

    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler is already running");
            return;
        }

        let jobs = Arc::clone(&self.jobs);
        let running = Arc::clone(&self.running);
        let wake = Arc::clone(&self.wake);
        let cadence = self.cadence;
        let tick = self.tick;

        self.handle = Some(tokio::spawn(async move {
            info!("Scheduler loop started");
            let mut interval = tokio::time::interval(tick);
            while running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = wake.notified() => {}
                }
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                run_due_jobs(&jobs, cadence, Local::now().naive_local()).await;
            }
            info!("Scheduler loop exited");
        }));
        info!("Scheduler started");
    }

    /// Clears the running flag and waits for the current loop iteration to finish.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_one();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Scheduler loop ended abnormally: {}", e);
            }
        }
        info!("Scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Earliest scheduled run, or `None` when no job is registered.
    pub async fn next_run(&self) -> Option<NaiveDateTime> {
        self.jobs.lock().await.iter().map(|j| j.next_run).min()
    }

    pub async fn info(&self) -> ScheduleInfo {
        let jobs = self.jobs.lock().await;
        ScheduleInfo {
            cadence: self.cadence,
            upload_time: self.at,
            running: self.is_running(),
            next_run: jobs.iter().map(|j| j.next_run).min(),
            jobs_count: jobs.len(),
        }
    }

    pub async fn clear(&self) {
        self.jobs.lock().await.clear();
        info!("All scheduled jobs cleared");
    }
}

async fn run_due_jobs(jobs: &Mutex<Vec<ScheduledJob>>, cadence: Cadence, now: NaiveDateTime) -> usize {
    let mut jobs = jobs.lock().await;
    let mut ran = 0;
    for scheduled in jobs.iter_mut().filter(|j| j.next_run <= now) {
        info!("Running scheduled job '{}'", scheduled.job.name());
        scheduled.job.run().await;
        scheduled.next_run = advance(scheduled.next_run, cadence, now);
        info!(
            "Job '{}' rescheduled for {}",
            scheduled.job.name(),
            scheduled.next_run
        );
        ran += 1;
    }
    ran
}

/// Next time-of-day `at` strictly after `now`.
pub fn next_occurrence(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + TimeDelta::days(1)
    }
}

/// Steps `previous` forward by whole periods until it lies after `now`.
fn advance(previous: NaiveDateTime, cadence: Cadence, now: NaiveDateTime) -> NaiveDateTime {
    let mut next = previous + cadence.period();
    while next <= now {
        next += cadence.period();
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;

    struct CountingJob {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn dt(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn next_occurrence_is_today_when_time_is_ahead() {
        assert_eq!(next_occurrence(at(9, 0), dt(10, 8, 30)), dt(10, 9, 0));
    }

    #[test]
    fn next_occurrence_rolls_to_tomorrow_once_passed() {
        assert_eq!(next_occurrence(at(9, 0), dt(10, 9, 0)), dt(11, 9, 0));
        assert_eq!(next_occurrence(at(9, 0), dt(10, 17, 45)), dt(11, 9, 0));
    }

    #[test]
    fn advance_skips_missed_periods() {
        assert_eq!(advance(dt(1, 9, 0), Cadence::Daily, dt(3, 12, 0)), dt(4, 9, 0));
        assert_eq!(advance(dt(1, 9, 0), Cadence::Weekly, dt(1, 9, 0)), dt(8, 9, 0));
    }

    #[test]
    fn cadence_parses_case_insensitively() {
        assert_eq!(Cadence::parse("Monthly").unwrap(), Cadence::Monthly);
        assert_eq!(Cadence::Monthly.period(), TimeDelta::days(30));
        assert!(Cadence::parse("yearly").is_err());
    }

    #[tokio::test]
    async fn run_pending_only_runs_due_jobs_and_reschedules() {
        let scheduler = Scheduler::new(Cadence::Daily, at(9, 0));
        let job = Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
        });
        let first = scheduler.schedule_from(job.clone(), dt(10, 8, 0)).await;
        assert_eq!(first, dt(10, 9, 0));

        assert_eq!(scheduler.run_pending(dt(10, 8, 59)).await, 0);
        assert_eq!(scheduler.run_pending(dt(10, 9, 0)).await, 1);
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.next_run().await, Some(dt(11, 9, 0)));

        // Same minute again: already rescheduled, nothing to do.
        assert_eq!(scheduler.run_pending(dt(10, 9, 0)).await, 0);
    }

    #[tokio::test]
    async fn info_reports_jobs_and_state() {
        let scheduler = Scheduler::new(Cadence::Weekly, at(18, 30));
        assert!(scheduler.next_run().await.is_none());

        let job = Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
        });
        scheduler.schedule_from(job, dt(10, 8, 0)).await;

        let info = scheduler.info().await;
        assert_eq!(info.cadence, Cadence::Weekly);
        assert_eq!(info.jobs_count, 1);
        assert!(!info.running);
        assert_eq!(info.next_run, Some(dt(10, 18, 30)));

        scheduler.clear().await;
        assert_eq!(scheduler.info().await.jobs_count, 0);
    }

    #[tokio::test]
    async fn start_and_stop_toggle_running_flag() {
        let mut scheduler =
            Scheduler::new(Cadence::Daily, at(9, 0)).with_tick(Duration::from_millis(10));
        scheduler.start();
        assert!(scheduler.is_running());
        tokio::time::sleep(Duration::from_millis(30)).await;
        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    /// Takes a while, so a stop request lands mid-run.
    struct SlowJob {
        started: AtomicUsize,
        finished: AtomicUsize,
    }

    #[async_trait]
    impl Job for SlowJob {
        fn name(&self) -> &str {
            "slow"
        }

        async fn run(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn loop_runs_overdue_job_and_stop_waits_for_it() {
        let mut scheduler =
            Scheduler::new(Cadence::Daily, at(9, 0)).with_tick(Duration::from_millis(10));
        let job = Arc::new(SlowJob {
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        });
        scheduler.schedule_from(job.clone(), dt(1, 8, 0)).await;

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(job.started.load(Ordering::SeqCst), 1);
        assert_eq!(job.finished.load(Ordering::SeqCst), 0);

        scheduler.stop().await;
        assert_eq!(job.started.load(Ordering::SeqCst), 1);
        assert_eq!(job.finished.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_running());
        assert!(scheduler.next_run().await.unwrap() > Local::now().naive_local());
    }
}
