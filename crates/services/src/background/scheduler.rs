use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

const TICK: Duration = Duration::from_secs(1);

/// How often a registered task becomes due.
#[derive(Debug, Clone, Copy)]
pub enum Cadence {
    /// Due whenever `interval` has elapsed since the last run; due
    /// immediately on the first evaluation after start.
    Every(Duration),
    /// Due once per calendar day, after the given local wall-clock time.
    Daily(NaiveTime),
}

type TaskFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type TaskFn = Box<dyn Fn() -> TaskFuture + Send>;

struct ScheduledTask {
    name: &'static str,
    cadence: Cadence,
    last_run: Option<Instant>,
    last_fired_day: Option<NaiveDate>,
    run: TaskFn,
}

impl ScheduledTask {
    fn is_due(&self, now: Instant, wall_time: NaiveTime, today: NaiveDate) -> bool {
        match self.cadence {
            Cadence::Every(interval) => match self.last_run {
                None => true,
                Some(last) => now.duration_since(last) >= interval,
            },
            Cadence::Daily(fire_at) => {
                wall_time >= fire_at && self.last_fired_day != Some(today)
            }
        }
    }

    fn mark_ran(&mut self, now: Instant, today: NaiveDate) {
        self.last_run = Some(now);
        self.last_fired_day = Some(today);
    }
}

/// Cooperative periodic task runner. One dedicated tokio task polls a
/// 1 s tick; every due task runs sequentially in registration order. A
/// failing task is logged and skipped for that tick; it never stops the
/// loop or its siblings. Constructed and owned explicitly by whoever
/// bootstraps the process, stopped through its handle.
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn register<F, Fut>(&mut self, name: &'static str, cadence: Cadence, task: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.tasks.push(ScheduledTask {
            name,
            cadence,
            last_run: None,
            last_fired_day: None,
            run: Box::new(move || Box::pin(task())),
        });
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Spawn the loop on its own tokio task and hand back a stop handle.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task_count = self.task_count();
        let join = tokio::spawn(self.run(shutdown_rx));
        info!(tasks = task_count, "Scheduler started");
        SchedulerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_due_tasks().await;
                }
                _ = shutdown.changed() => {
                    info!("Scheduler stopping");
                    break;
                }
            }
        }
    }

    async fn run_due_tasks(&mut self) {
        let now = Instant::now();
        let local = Local::now();
        let wall_time = local.time();
        let today = local.date_naive();

        for task in &mut self.tasks {
            if !task.is_due(now, wall_time, today) {
                continue;
            }
            task.mark_ran(now, today);
            debug!(task = task.name, "Running scheduled task");
            if let Err(error) = (task.run)().await {
                error!(task = task.name, %error, "Scheduled task failed");
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

/// Parse a "HH:MM" wall-clock string, falling back to 08:00.
pub fn parse_briefing_time(value: &str) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M")
        .unwrap_or_else(|_| NaiveTime::from_hms_opt(8, 0, 0).expect("valid fallback time"))
}
