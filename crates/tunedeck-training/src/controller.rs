//! Job control API and the timers behind it.
//!
//! Each job gets a dispatch task (the `Preparing` delay) and, while it is `Training`, a
//! tick driver. Drivers are cancelled on pause and stop; resume spawns a fresh one that
//! continues from the counters stored on the job.
//!
//! Lock order is `runtimes` then the registry. Drivers never hold `runtimes` while
//! touching the registry.

use crate::config::SimulatorConfig;
use crate::error::TrainingResult;
use crate::job::{JobStatus, TrainingJob, TrainingJobId, TrainingParameters};
use crate::progress::{ProgressEvent, ProgressSink, TracingProgressSink};
use crate::registry::JobRegistry;
use crate::simulator::{self, TickReport};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tunedeck_data::DatasetProvider;

/// Per-job timer state that outlives any single driver.
struct JobRuntime {
    noise: Arc<Mutex<StdRng>>,
    driver: Option<CancellationToken>,
}

struct ControllerInner {
    registry: Arc<JobRegistry>,
    config: SimulatorConfig,
    sink: Arc<dyn ProgressSink>,
    master_noise: Mutex<StdRng>,
    runtimes: Mutex<HashMap<TrainingJobId, JobRuntime>>,
    shutdown: CancellationToken,
    finished: Notify,
}

/// Start, pause, resume and stop simulated training jobs.
#[derive(Clone)]
pub struct TrainingController {
    inner: Arc<ControllerInner>,
}

impl fmt::Debug for TrainingController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingController")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl TrainingController {
    /// Controller that reports progress through `tracing`.
    pub fn new(datasets: Arc<dyn DatasetProvider>, config: SimulatorConfig) -> TrainingResult<Self> {
        Self::with_sink(datasets, config, Arc::new(TracingProgressSink))
    }

    pub fn with_sink(
        datasets: Arc<dyn DatasetProvider>,
        config: SimulatorConfig,
        sink: Arc<dyn ProgressSink>,
    ) -> TrainingResult<Self> {
        config.validate()?;
        let master = config.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let registry = Arc::new(JobRegistry::new(datasets, config.clone()));

        Ok(Self {
            inner: Arc::new(ControllerInner {
                registry,
                config,
                sink,
                master_noise: Mutex::new(master),
                runtimes: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
                finished: Notify::new(),
            }),
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.inner.registry
    }

    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.inner.config
    }

    /// Create a job and schedule its dispatch. Returns immediately with the job in
    /// `Preparing`.
    pub async fn start(&self, params: TrainingParameters) -> TrainingResult<TrainingJob> {
        let job = self.inner.registry.create(params).await?;

        let seed = self.inner.master_noise.lock().await.next_u64();
        self.inner.runtimes.lock().await.insert(
            job.id.clone(),
            JobRuntime { noise: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))), driver: None },
        );

        info!(
            job_id = %job.id,
            model = %job.params.model,
            epochs = job.params.epochs,
            total_steps = job.total_steps,
            "Training job created"
        );
        self.inner.emit(ProgressEvent::Created { job_id: job.id.clone(), total_steps: job.total_steps });
        for line in &job.logs {
            self.inner.emit(ProgressEvent::Log { job_id: job.id.clone(), line: line.clone() });
        }

        let inner = Arc::clone(&self.inner);
        let id = job.id.clone();
        tokio::spawn(async move { inner.dispatch(id).await });

        Ok(job)
    }

    /// Pause a training job. Any other status is left untouched.
    pub async fn pause(&self, id: &TrainingJobId) -> Option<TrainingJob> {
        let mut runtimes = self.inner.runtimes.lock().await;
        let (job, changed) = self
            .inner
            .registry
            .modify(id, |job| {
                let changed = job.status == JobStatus::Training && job.transition(JobStatus::Paused);
                (job.clone(), changed)
            })
            .await?;

        if changed {
            if let Some(token) = runtimes.get_mut(id).and_then(|rt| rt.driver.take()) {
                token.cancel();
            }
            info!(job_id = %id, step = job.current_step, "Training paused");
            self.inner.emit(ProgressEvent::StatusChanged {
                job_id: id.clone(),
                from: JobStatus::Training,
                to: JobStatus::Paused,
            });
        } else {
            debug!(job_id = %id, status = %job.status, "Pause ignored");
        }
        Some(job)
    }

    /// Resume a paused job from its frozen counters. Any other status is left untouched.
    pub async fn resume(&self, id: &TrainingJobId) -> Option<TrainingJob> {
        let mut runtimes = self.inner.runtimes.lock().await;
        let (job, changed) = self
            .inner
            .registry
            .modify(id, |job| {
                let changed = job.status == JobStatus::Paused && job.transition(JobStatus::Training);
                (job.clone(), changed)
            })
            .await?;

        if changed {
            self.inner.spawn_driver(&mut runtimes, id);
            info!(job_id = %id, step = job.current_step, elapsed = job.elapsed_time, "Training resumed");
            self.inner.emit(ProgressEvent::StatusChanged {
                job_id: id.clone(),
                from: JobStatus::Paused,
                to: JobStatus::Training,
            });
        } else {
            debug!(job_id = %id, status = %job.status, "Resume ignored");
        }
        Some(job)
    }

    /// Stop a training or paused job, completing it where it stands.
    pub async fn stop(&self, id: &TrainingJobId) -> Option<TrainingJob> {
        let mut runtimes = self.inner.runtimes.lock().await;
        let (job, from) = self
            .inner
            .registry
            .modify(id, |job| {
                let from = job.status;
                let changed = from.is_active() && simulator::stop(job);
                (job.clone(), changed.then_some(from))
            })
            .await?;

        if let Some(from) = from {
            if let Some(token) = runtimes.remove(id).and_then(|rt| rt.driver) {
                token.cancel();
            }
            drop(runtimes);

            info!(job_id = %id, step = job.current_step, "Training stopped by user");
            self.inner.emit(ProgressEvent::StatusChanged { job_id: id.clone(), from, to: JobStatus::Completed });
            if let Some(line) = job.logs.last() {
                self.inner.emit(ProgressEvent::Log { job_id: id.clone(), line: line.clone() });
            }
            self.inner.emit(ProgressEvent::Finished {
                job_id: id.clone(),
                step: job.current_step,
                progress: job.progress,
            });
            self.inner.finished.notify_waiters();
        } else {
            debug!(job_id = %id, status = %job.status, "Stop ignored");
        }
        Some(job)
    }

    pub async fn get(&self, id: &TrainingJobId) -> Option<TrainingJob> {
        self.inner.registry.get(id).await
    }

    pub async fn list(&self) -> Vec<TrainingJob> {
        self.inner.registry.list().await
    }

    pub async fn latest_active(&self) -> Option<TrainingJob> {
        self.inner.registry.latest_active().await
    }

    /// Wait until the job is completed (or errored). Returns the job as it stands if
    /// the controller shuts down first, and `None` for unknown ids.
    pub async fn wait_for_terminal(&self, id: &TrainingJobId) -> Option<TrainingJob> {
        loop {
            let notified = self.inner.finished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let job = self.inner.registry.get(id).await?;
            if job.status.is_terminal() || self.inner.shutdown.is_cancelled() {
                return Some(job);
            }

            tokio::select! {
                () = &mut notified => {}
                () = self.inner.shutdown.cancelled() => {}
            }
        }
    }

    /// Cancel every dispatch and tick task. Job records keep their last state.
    pub fn shutdown(&self) {
        info!("Training controller shutting down");
        self.inner.shutdown.cancel();
    }
}

impl ControllerInner {
    fn emit(&self, event: ProgressEvent) {
        self.sink.on_event(event);
    }

    async fn dispatch(self: Arc<Self>, id: TrainingJobId) {
        tokio::select! {
            () = self.shutdown.cancelled() => return,
            () = time::sleep(self.config.dispatch_delay()) => {}
        }

        let mut runtimes = self.runtimes.lock().await;
        let moved = self
            .registry
            .modify(&id, |job| job.status == JobStatus::Preparing && job.transition(JobStatus::Training))
            .await
            .unwrap_or(false);
        if !moved {
            warn!(job_id = %id, "Job left Preparing before dispatch");
            return;
        }

        self.spawn_driver(&mut runtimes, &id);
        drop(runtimes);

        debug!(job_id = %id, "Job dispatched");
        self.emit(ProgressEvent::StatusChanged { job_id: id, from: JobStatus::Preparing, to: JobStatus::Training });
    }

    /// Replace any existing driver for `id` with a fresh one.
    fn spawn_driver(self: &Arc<Self>, runtimes: &mut HashMap<TrainingJobId, JobRuntime>, id: &TrainingJobId) {
        let Some(runtime) = runtimes.get_mut(id) else {
            warn!(job_id = %id, "No runtime for job, driver not started");
            return;
        };

        let token = self.shutdown.child_token();
        if let Some(previous) = runtime.driver.replace(token.clone()) {
            previous.cancel();
        }

        let inner = Arc::clone(self);
        let noise = Arc::clone(&runtime.noise);
        let id = id.clone();
        tokio::spawn(async move { inner.drive(id, token, noise).await });
    }

    async fn drive(self: Arc<Self>, id: TrainingJobId, token: CancellationToken, noise: Arc<Mutex<StdRng>>) {
        let period = self.config.tick_interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(job_id = %id, "Tick driver cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let outcome = {
                let mut noise = noise.lock().await;
                self.registry
                    .modify(&id, |job| {
                        // A stale driver must not tick a job that was paused and resumed.
                        if token.is_cancelled() {
                            return None;
                        }
                        let report = simulator::tick(job, &self.config, &mut *noise)?;
                        let events = tick_events(job, &report);
                        Some((report.completed, events))
                    })
                    .await
                    .flatten()
            };

            let Some((completed, events)) = outcome else {
                debug!(job_id = %id, "Job no longer training, driver exiting");
                return;
            };
            for event in events {
                self.emit(event);
            }

            if completed {
                self.runtimes.lock().await.remove(&id);
                info!(job_id = %id, "Training completed successfully");
                self.finished.notify_waiters();
                return;
            }
        }
    }
}

fn tick_events(job: &TrainingJob, report: &TickReport) -> Vec<ProgressEvent> {
    let id = &job.id;
    let mut events = vec![ProgressEvent::Step {
        job_id: id.clone(),
        step: job.current_step,
        total: job.total_steps,
        elapsed: job.elapsed_time,
        remaining: job.estimated_time_remaining,
    }];
    if let Some(metric) = report.metric {
        events.push(ProgressEvent::Metric { job_id: id.clone(), metric });
    }
    events.extend(report.logs.iter().map(|line| ProgressEvent::Log { job_id: id.clone(), line: line.clone() }));
    if report.completed {
        events.push(ProgressEvent::StatusChanged {
            job_id: id.clone(),
            from: JobStatus::Training,
            to: JobStatus::Completed,
        });
        events.push(ProgressEvent::Finished { job_id: id.clone(), step: job.current_step, progress: job.progress });
    }
    events
}
