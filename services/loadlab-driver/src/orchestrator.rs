//! Staged run orchestration.

use crate::client::TargetClient;
use crate::config::DriverConfig;
use crate::error::DriverResult;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::tasks::TaskSet;
use crate::user::{UserContext, UserHandle};
use loadlab_core::metrics::ACTIVE_USERS;
use loadlab_core::{load_schedule, resolve_stages_path, tick, LoadTimeline, ScheduleSource};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

const REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Population change for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlan {
    /// Users to start (positive) or stop (negative).
    pub delta: i64,
    /// Fractional spawn budget carried into the next tick.
    pub carry: f64,
}

/// Move `current` toward `target` by at most `spawn_rate * dt` users.
///
/// Fractional budget left over is carried forward while the target is still
/// out of reach, and dropped once it is met.
pub fn plan_step(
    current: usize,
    target: u32,
    spawn_rate: f64,
    dt: Duration,
    carry: f64,
) -> StepPlan {
    let gap = i64::from(target) - current as i64;
    if gap == 0 {
        return StepPlan {
            delta: 0,
            carry: 0.0,
        };
    }

    let budget = spawn_rate.max(0.0) * dt.as_secs_f64() + carry;
    let allowed = budget.floor();

    if allowed >= gap.unsigned_abs() as f64 {
        StepPlan {
            delta: gap,
            carry: 0.0,
        }
    } else {
        StepPlan {
            delta: gap.signum() * allowed as i64,
            carry: budget - allowed,
        }
    }
}

/// Drop handles of users that already finished draining; returns how many.
pub fn reap_finished(draining: &mut Vec<JoinHandle<()>>) -> usize {
    let before = draining.len();
    draining.retain(|handle| !handle.is_finished());
    before - draining.len()
}

/// What a finished run hands to the reporter.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub target_url: String,
    pub schedule_source: ScheduleSource,
    pub timeline: LoadTimeline,
    pub peak_users: usize,
    pub metrics: MetricsSnapshot,
}

pub struct LoadTestOrchestrator {
    config: Arc<DriverConfig>,
    timeline: LoadTimeline,
    source: ScheduleSource,
    ctx: UserContext,
}

impl LoadTestOrchestrator {
    /// Resolve the schedule from `config.stages_file` relative to `base_dir`.
    pub fn new(config: DriverConfig, base_dir: impl Into<PathBuf>) -> DriverResult<Self> {
        let path = resolve_stages_path(config.stages_file.as_deref(), &base_dir.into());
        info!("stages path resolved to: {}", path.display());
        let schedule = load_schedule(&path);
        Self::with_timeline(config, schedule.timeline, schedule.source)
    }

    pub fn with_timeline(
        config: DriverConfig,
        timeline: LoadTimeline,
        source: ScheduleSource,
    ) -> DriverResult<Self> {
        let client = TargetClient::new(
            config.target_url.clone(),
            config.connect_timeout,
            config.read_timeout,
        )?;
        let tasks = Arc::new(TaskSet::new(&config.tags)?);

        let ctx = UserContext {
            client,
            tasks,
            baselines: config.baselines,
            wait_min: config.wait_min,
            wait_max: config.wait_max,
            collector: Arc::new(MetricsCollector::new()),
        };

        Ok(Self {
            config: Arc::new(config),
            timeline,
            source,
            ctx,
        })
    }

    pub fn timeline(&self) -> &LoadTimeline {
        &self.timeline
    }

    pub fn source(&self) -> &ScheduleSource {
        &self.source
    }

    pub async fn run(&self) -> RunSummary {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run the schedule to completion, or until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        info!(
            "test start | stage source: {} | {}",
            self.source,
            self.config.summary()
        );
        info!(
            url = %self.config.target_url,
            stages = self.timeline.steps().len(),
            duration_secs = self.timeline.total_duration().as_secs(),
            tasks = ?self.ctx.tasks.tasks().iter().map(|t| t.tag()).collect::<Vec<_>>(),
            "starting staged load"
        );

        tokio::pin!(shutdown);

        let mut users: Vec<UserHandle> = Vec::new();
        let mut draining: Vec<JoinHandle<()>> = Vec::new();
        let mut next_id = 0usize;
        let mut carry = 0.0;
        let mut peak_users = 0usize;

        let start = Instant::now();
        let mut last_tick = start;
        let mut last_report = start;
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    warn!("shutdown requested, stopping all users");
                    break;
                }
            }

            let now = Instant::now();
            let dt = now.duration_since(last_tick);
            last_tick = now;

            let Some(target) = tick(now.duration_since(start).as_secs_f64(), &self.timeline)
            else {
                info!("all stages complete");
                break;
            };

            let step = plan_step(users.len(), target.users, target.spawn_rate, dt, carry);
            carry = step.carry;

            if step.delta > 0 {
                for _ in 0..step.delta {
                    users.push(UserHandle::spawn(next_id, self.ctx.clone()));
                    next_id += 1;
                }
            } else if step.delta < 0 {
                let keep = users.len().saturating_sub(step.delta.unsigned_abs() as usize);
                draining.extend(users.drain(keep..).map(UserHandle::stop));
            }
            reap_finished(&mut draining);

            peak_users = peak_users.max(users.len());
            ACTIVE_USERS.set(users.len() as i64);

            if now.duration_since(last_report) >= REPORT_INTERVAL {
                last_report = now;
                self.log_progress(now.duration_since(start), users.len(), target.users);
            }
        }

        draining.extend(users.drain(..).map(UserHandle::stop));
        info!(users = draining.len(), "waiting for in-flight requests to drain");
        for handle in draining {
            if let Err(e) = handle.await {
                warn!("virtual user task failed: {}", e);
            }
        }
        ACTIVE_USERS.set(0);

        let metrics = self.ctx.collector.snapshot();
        let total = &metrics.aggregate;
        info!(
            total = total.total_requests,
            successful = total.successful_requests,
            failed = total.failed_requests,
            error_rate_pct = %format!("{:.2}", total.error_rate() * 100.0),
            p95_ms = %format!("{:.1}", total.p95_latency().as_secs_f64() * 1000.0),
            rps = %format!("{:.1}", total.throughput_rps()),
            "load test complete"
        );

        RunSummary {
            target_url: self.config.target_url.clone(),
            schedule_source: self.source.clone(),
            timeline: self.timeline.clone(),
            peak_users,
            metrics,
        }
    }

    fn log_progress(&self, elapsed: Duration, users: usize, target: u32) {
        let snapshot = self.ctx.collector.snapshot();
        let total = &snapshot.aggregate;
        info!(
            "[{}s] users: {}/{}, requests: {}, p95: {:.1}ms, errors: {:.2}%, rps: {:.1}",
            elapsed.as_secs(),
            users,
            target,
            total.total_requests,
            total.p95_latency().as_secs_f64() * 1000.0,
            total.error_rate() * 100.0,
            total.throughput_rps()
        );
    }
}
