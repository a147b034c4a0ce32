//! Staged load driver.
//!
//! Simulated users hit the loadlab target with a weighted, jittered request
//! mix while the orchestrator walks the user population through a timed
//! stage schedule.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod reporter;
pub mod tasks;
pub mod user;

pub use client::{classify, RequestFailure, RequestOutcome, TargetClient};
pub use config::{Baselines, DriverArgs, DriverConfig, ReportTarget};
pub use error::{DriverError, DriverResult};
pub use metrics::{LoadTestMetrics, MetricsCollector, MetricsSnapshot};
pub use orchestrator::{plan_step, LoadTestOrchestrator, RunSummary, StepPlan};
pub use reporter::{ReportFormat, ResultWriter};
pub use tasks::{jitter, PlannedRequest, Task, TaskSet};
