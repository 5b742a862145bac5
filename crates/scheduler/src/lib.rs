//! Interval scheduler for the background sweeps. Each registered task
//! runs on its own tokio task at a fixed cadence; a failing invocation is
//! logged and never stops the schedule.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

type TaskFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

struct TaskSpec {
    name: &'static str,
    every: Duration,
    run_on_boot: bool,
    action: TaskFn,
}

/// Builder-style registry of periodic tasks. Call [`Scheduler::start`]
/// once everything is registered.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<TaskSpec>,
}

/// Handle to the running schedule. [`SchedulerHandle::stop`] signals all
/// task loops and waits for them to exit.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a periodic task. With `run_on_boot` the first invocation
    /// happens immediately, otherwise one full interval from start.
    pub fn register<F>(&mut self, name: &'static str, every: Duration, run_on_boot: bool, action: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.tasks.push(TaskSpec {
            name,
            every,
            run_on_boot,
            action: Arc::new(action),
        });
    }

    /// Spawn one loop per registered task.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, _) = watch::channel(false);
        let mut handles = Vec::with_capacity(self.tasks.len());

        for spec in self.tasks {
            let mut shutdown_rx = shutdown.subscribe();
            let name = spec.name;
            let handle = tokio::spawn(async move {
                let first = if spec.run_on_boot {
                    Instant::now()
                } else {
                    Instant::now() + spec.every
                };
                let mut interval = tokio::time::interval_at(first, spec.every);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                info!(task = spec.name, every_secs = spec.every.as_secs(), "Task scheduled");

                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = interval.tick() => {
                            debug!(task = spec.name, "Task tick");
                            if let Err(e) = (spec.action)() {
                                error!(task = spec.name, error = %e, "Task invocation failed");
                            }
                        }
                    }
                }
                info!(task = spec.name, "Task stopped");
            });
            handles.push((name, handle));
        }

        SchedulerHandle {
            shutdown,
            tasks: handles,
        }
    }
}

impl SchedulerHandle {
    /// Number of live task loops.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal shutdown and wait for every task loop to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                error!(task = name, error = %e, "Task panicked");
            }
        }
    }
}
