//! A single simulated client.

use crate::client::TargetClient;
use crate::config::Baselines;
use crate::metrics::MetricsCollector;
use crate::tasks::{PlannedRequest, TaskSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Read-only inputs shared by every user in a run.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub client: TargetClient,
    pub tasks: Arc<TaskSet>,
    pub baselines: Baselines,
    pub wait_min: Duration,
    pub wait_max: Duration,
    pub collector: Arc<MetricsCollector>,
}

pub struct VirtualUser {
    id: usize,
    ctx: UserContext,
    stop: watch::Receiver<bool>,
    rng: StdRng,
}

impl VirtualUser {
    pub fn new(id: usize, ctx: UserContext, stop: watch::Receiver<bool>) -> Self {
        Self {
            id,
            ctx,
            stop,
            rng: StdRng::from_entropy(),
        }
    }

    fn stopped(&self) -> bool {
        *self.stop.borrow()
    }

    fn think_time(&mut self) -> Duration {
        if self.ctx.wait_max <= self.ctx.wait_min {
            return self.ctx.wait_min;
        }
        self.rng.gen_range(self.ctx.wait_min..=self.ctx.wait_max)
    }

    /// Warm up once, then loop until stopped.
    ///
    /// The stop flag is checked between requests and interrupts think time,
    /// but a request already on the wire runs to completion.
    pub async fn run(mut self) {
        debug!(user = self.id, "virtual user started");

        let warmup = self.ctx.client.execute(&PlannedRequest::warmup()).await;
        self.ctx.collector.record(&warmup);

        while !self.stopped() {
            let task = self.ctx.tasks.choose(&mut self.rng);
            let request = task.plan(&self.ctx.baselines, &mut self.rng);
            let outcome = self.ctx.client.execute(&request).await;
            self.ctx.collector.record(&outcome);

            if self.stopped() {
                break;
            }

            let pause = self.think_time();
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = self.stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!(user = self.id, "virtual user stopped");
    }
}

/// Orchestrator-side handle to a running user.
pub struct UserHandle {
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl UserHandle {
    pub fn spawn(id: usize, ctx: UserContext) -> Self {
        let (stop, rx) = watch::channel(false);
        let join = tokio::spawn(VirtualUser::new(id, ctx, rx).run());
        Self { stop, join }
    }

    /// Ask the user to finish; returns the task to await for draining.
    pub fn stop(self) -> JoinHandle<()> {
        let _ = self.stop.send(true);
        self.join
    }
}
