// crates/server-jobs/src/driver.rs
//! Time-driven progress for a single scan job.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::engine::{EngineError, ScanContext, ScanEngine};
use super::store::JobStore;
use super::types::{ScanId, ScanJob, ScanOptions, ScanResults};

/// Default delay between two progress ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Default progress added per tick, in percentage points.
pub const DEFAULT_PROGRESS_STEP: u8 = 10;

/// Timing knobs shared by all progress drivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub tick_interval: Duration,
    /// Always within `1..=100`.
    pub progress_step: u8,
    /// Jobs still running after this long are failed. `None` disables it.
    pub scan_timeout: Option<Duration>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            progress_step: DEFAULT_PROGRESS_STEP,
            scan_timeout: None,
        }
    }
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Sets the per-tick step, clamped to `1..=100`.
    pub fn with_progress_step(mut self, step: u8) -> Self {
        self.progress_step = step.clamp(1, 100);
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scan_timeout = timeout;
        self
    }
}

/// What one tick did to the job.
#[derive(Debug, PartialEq)]
enum Tick {
    Advanced(u8),
    Completed,
    Failed(String),
    AlreadyTerminal,
}

/// Spawns one background task per job that walks it from 0% to a terminal
/// status through `JobStore::update`.
///
/// The task holds only the job id, target and options; it never keeps a copy
/// of the job itself.
#[derive(Clone)]
pub struct ProgressDriver {
    store: Arc<dyn JobStore>,
    engine: Arc<dyn ScanEngine>,
    config: DriverConfig,
}

impl ProgressDriver {
    pub fn new(store: Arc<dyn JobStore>, engine: Arc<dyn ScanEngine>, config: DriverConfig) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    /// Start driving the job `id` in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(&self, id: ScanId, target: String, options: ScanOptions) -> JoinHandle<()> {
        let driver = self.clone();
        tokio::spawn(async move { driver.run(id, target, options).await })
    }

    async fn run(self, id: ScanId, target: String, options: ScanOptions) {
        let started = Instant::now();
        let step = self.config.progress_step;
        tracing::debug!(scan_id = %id, target = %target, "Scan driver started");

        // Ends once the job is deleted or terminal.
        loop {
            tokio::time::sleep(self.config.tick_interval).await;

            let timed_out = self
                .config
                .scan_timeout
                .filter(|limit| started.elapsed() >= *limit);

            let Some(current) = self.store.get(&id) else {
                tracing::debug!(scan_id = %id, "Scan deleted while running, driver stopping");
                return;
            };

            let mut outcome = if timed_out.is_none() && reaches_completion(&current, step) {
                let finished_at = Utc::now();
                let elapsed = (finished_at - current.created_at)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                let results = self.run_engine(&id, &target, &options, elapsed).await;
                Some((results, finished_at))
            } else {
                None
            };

            let mut tick = Tick::AlreadyTerminal;
            let present = self.store.update(&id, &mut |job| {
                tick = apply_tick(job, step, timed_out, outcome.take());
            });

            if !present {
                tracing::debug!(scan_id = %id, "Scan deleted while running, driver stopping");
                return;
            }

            match tick {
                Tick::Advanced(progress) => {
                    tracing::trace!(scan_id = %id, progress, "Scan progress");
                }
                Tick::Completed => {
                    tracing::info!(
                        scan_id = %id,
                        target = %target,
                        duration_secs = started.elapsed().as_secs_f64(),
                        "Scan completed"
                    );
                    return;
                }
                Tick::Failed(error) => {
                    tracing::warn!(scan_id = %id, target = %target, error = %error, "Scan failed");
                    return;
                }
                Tick::AlreadyTerminal => {
                    tracing::debug!(scan_id = %id, "Scan already terminal, driver stopping");
                    return;
                }
            }
        }
    }

    /// Runs the engine on the blocking pool, away from the store lock.
    ///
    /// A panicking engine fails this job only.
    async fn run_engine(
        &self,
        id: &str,
        target: &str,
        options: &ScanOptions,
        elapsed: Duration,
    ) -> Result<ScanResults, EngineError> {
        let engine = Arc::clone(&self.engine);
        let target = target.to_string();
        let options = options.clone();

        tokio::task::spawn_blocking(move || {
            engine.scan(&ScanContext {
                target: &target,
                options: &options,
                elapsed,
            })
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!(scan_id = %id, error = %e, "Scan engine panicked");
            Err(EngineError("engine panicked".to_string()))
        })
    }
}

fn reaches_completion(job: &ScanJob, step: u8) -> bool {
    !job.is_terminal() && job.progress.saturating_add(step) >= 100
}

/// One atomic step of the job's lifecycle, run under the store lock.
///
/// `finished` carries the engine outcome and completion time when the driver
/// ran the engine for this tick. Results, status and `completed_at` land in
/// the same update. If the job changed since the engine ran and this tick
/// would now finish it without an outcome, it is left as is for the next tick.
fn apply_tick(
    job: &mut ScanJob,
    step: u8,
    timed_out: Option<Duration>,
    finished: Option<(Result<ScanResults, EngineError>, DateTime<Utc>)>,
) -> Tick {
    if job.is_terminal() {
        return Tick::AlreadyTerminal;
    }

    if let Some(limit) = timed_out {
        let error = format!("scan timed out after {}ms", limit.as_millis());
        job.fail(error.clone());
        return Tick::Failed(error);
    }

    if job.progress.saturating_add(step) < 100 {
        return Tick::Advanced(job.advance(step));
    }

    match finished {
        Some((Ok(results), at)) => {
            job.complete(results, at);
            Tick::Completed
        }
        Some((Err(e), _)) => {
            let error = e.to_string();
            job.fail(error.clone());
            Tick::Failed(error)
        }
        None => Tick::Advanced(job.progress),
    }
}
