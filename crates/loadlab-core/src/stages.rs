//! Staged load schedule: stage definitions, the cumulative timeline and the
//! tick function that maps elapsed run time to a target population.
//!
//! A schedule file is a JSON array of
//! `{"duration": <sec>, "users": <int>, "spawn_rate": <float>}` objects.
//! Loading is all-or-nothing: any problem with the file yields the built-in
//! default schedule, never a partially applied custom one.

use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default schedule file name, resolved against the driver's own directory.
pub const DEFAULT_STAGES_FILE: &str = "stages.json";

const REQUIRED_KEYS: [&str; 3] = ["duration", "users", "spawn_rate"];

/// One fixed-duration window of the load test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageDefinition {
    pub duration_seconds: u64,
    pub target_users: u32,
    pub spawn_rate: f64,
}

impl StageDefinition {
    pub const fn new(duration_seconds: u64, target_users: u32, spawn_rate: f64) -> Self {
        Self {
            duration_seconds,
            target_users,
            spawn_rate,
        }
    }

    /// Build a stage from one element of the schedule array.
    ///
    /// Durations and user counts are truncated to integers.
    pub fn from_value(index: usize, value: &Value) -> CoreResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| CoreError::invalid_stage(index, "must be an object"))?;

        if let Some(missing) = REQUIRED_KEYS.iter().find(|key| !obj.contains_key(**key)) {
            return Err(CoreError::invalid_stage(
                index,
                format!("missing key: {}", missing),
            ));
        }

        let duration = non_negative(index, obj, "duration")?;
        let users = non_negative(index, obj, "users")?;
        let spawn_rate = non_negative(index, obj, "spawn_rate")?;

        if users > f64::from(u32::MAX) {
            return Err(CoreError::invalid_stage(index, "users out of range"));
        }
        if spawn_rate == 0.0 {
            return Err(CoreError::invalid_stage(index, "spawn_rate must be > 0"));
        }

        Ok(Self {
            duration_seconds: duration.trunc() as u64,
            target_users: users.trunc() as u32,
            spawn_rate,
        })
    }
}

fn non_negative(index: usize, obj: &Map<String, Value>, key: &str) -> CoreResult<f64> {
    obj.get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| {
            CoreError::invalid_stage(index, format!("{} must be a non-negative number", key))
        })
}

/// `(cutoff, users, spawn_rate)` where `cutoff` is the running sum of durations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineStep {
    pub cutoff_secs: u64,
    pub target_users: u32,
    pub spawn_rate: f64,
}

/// Population the orchestrator should converge on right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTarget {
    pub users: u32,
    pub spawn_rate: f64,
}

/// Immutable cumulative timeline derived from a stage sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadTimeline {
    steps: Vec<TimelineStep>,
}

impl LoadTimeline {
    pub fn from_stages(stages: &[StageDefinition]) -> Self {
        let mut total = 0u64;
        let steps = stages
            .iter()
            .map(|stage| {
                total = total.saturating_add(stage.duration_seconds);
                TimelineStep {
                    cutoff_secs: total,
                    target_users: stage.target_users,
                    spawn_rate: stage.spawn_rate,
                }
            })
            .collect();
        Self { steps }
    }

    /// Built-in schedule: 100 users for 60s, 200 for 120s, 400 for 180s.
    pub fn default_schedule() -> Self {
        Self::from_stages(&[
            StageDefinition::new(60, 100, 50.0),
            StageDefinition::new(120, 200, 50.0),
            StageDefinition::new(180, 400, 100.0),
        ])
    }

    pub fn steps(&self) -> &[TimelineStep] {
        &self.steps
    }

    /// Cutoff of the last stage.
    pub fn total_duration(&self) -> Duration {
        Duration::from_secs(self.steps.last().map(|s| s.cutoff_secs).unwrap_or(0))
    }

    pub fn tick(&self, elapsed: Duration) -> Option<StageTarget> {
        tick(elapsed.as_secs_f64(), self)
    }
}

/// Target population for a run that has been going for `elapsed_secs`.
///
/// Returns the first stage whose cutoff has not been passed (the cutoff
/// itself still belongs to that stage); `None` once every stage is over.
pub fn tick(elapsed_secs: f64, timeline: &LoadTimeline) -> Option<StageTarget> {
    timeline
        .steps
        .iter()
        .find(|step| elapsed_secs <= step.cutoff_secs as f64)
        .map(|step| StageTarget {
            users: step.target_users,
            spawn_rate: step.spawn_rate,
        })
}

/// Where the active timeline came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleSource {
    Custom { path: PathBuf },
    Fallback { reason: String },
}

impl ScheduleSource {
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

impl fmt::Display for ScheduleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom { path } => write!(f, "loaded \"{}\"", path.display()),
            Self::Fallback { reason } => write!(f, "{} -> fallback to default stages", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchedule {
    pub timeline: LoadTimeline,
    pub source: ScheduleSource,
}

/// Resolve the user-supplied schedule path.
///
/// `None` means [`DEFAULT_STAGES_FILE`]; a leading `~` expands to the home
/// directory; relative paths are joined onto `base_dir`.
pub fn resolve_stages_path(raw: Option<&Path>, base_dir: &Path) -> PathBuf {
    let raw = raw.unwrap_or_else(|| Path::new(DEFAULT_STAGES_FILE));
    let expanded = match raw.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => raw.to_path_buf(),
        },
        Err(_) => raw.to_path_buf(),
    };

    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

/// Parse and validate a schedule file without any fallback.
pub fn load_stages_json(path: &Path) -> CoreResult<Vec<StageDefinition>> {
    if !path.exists() {
        return Err(CoreError::ScheduleNotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&contents)?;
    let entries = document
        .as_array()
        .ok_or_else(|| CoreError::ScheduleShape("stages json must be a list".to_string()))?;

    if entries.is_empty() {
        return Err(CoreError::ScheduleShape("stages json is empty".to_string()));
    }

    entries
        .iter()
        .enumerate()
        .map(|(index, value)| StageDefinition::from_value(index, value))
        .collect()
}

/// Load a schedule, degrading to [`LoadTimeline::default_schedule`] on any failure.
pub fn load_schedule(path: &Path) -> ResolvedSchedule {
    match load_stages_json(path) {
        Ok(stages) => {
            info!(path = %path.display(), stages = stages.len(), "Loaded stage schedule");
            ResolvedSchedule {
                timeline: LoadTimeline::from_stages(&stages),
                source: ScheduleSource::Custom {
                    path: path.to_path_buf(),
                },
            }
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Using default stage schedule");
            ResolvedSchedule {
                timeline: LoadTimeline::default_schedule(),
                source: ScheduleSource::Fallback {
                    reason: err.to_string(),
                },
            }
        }
    }
}
