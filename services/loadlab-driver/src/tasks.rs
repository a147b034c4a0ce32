//! Weighted task mix issued by every virtual user.

use crate::config::Baselines;
use crate::error::{DriverError, DriverResult};
use loadlab_core::WorkloadKind;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::fmt;

/// One kind of request a virtual user can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Root,
    Workload(WorkloadKind),
}

impl Task {
    pub const ALL: [Task; 6] = [
        Task::Root,
        Task::Workload(WorkloadKind::Cpu),
        Task::Workload(WorkloadKind::Mem),
        Task::Workload(WorkloadKind::Json),
        Task::Workload(WorkloadKind::Io),
        Task::Workload(WorkloadKind::Mix),
    ];

    /// Relative selection weight; root is picked twice as often.
    pub fn weight(&self) -> u32 {
        match self {
            Self::Root => 2,
            Self::Workload(_) => 1,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Workload(kind) => kind.as_str(),
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::Workload(kind) => kind.path(),
        }
    }

    /// Stats key for this task.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Root => "GET /",
            Self::Workload(WorkloadKind::Cpu) => "GET /cpu",
            Self::Workload(WorkloadKind::Mem) => "GET /mem",
            Self::Workload(WorkloadKind::Json) => "GET /json",
            Self::Workload(WorkloadKind::Io) => "GET /io",
            Self::Workload(WorkloadKind::Mix) => "GET /mix",
        }
    }

    /// Kind the response must self-report, if any.
    pub fn expected_kind(&self) -> Option<WorkloadKind> {
        match self {
            Self::Workload(kind) if kind.reports_kind() => Some(*kind),
            _ => None,
        }
    }

    /// Draw fresh jittered parameters for one request.
    pub fn plan<R: Rng + ?Sized>(&self, baselines: &Baselines, rng: &mut R) -> PlannedRequest {
        let query = match self {
            Self::Root => Vec::new(),
            Self::Workload(WorkloadKind::Cpu) => vec![
                ("iters", jitter(rng, baselines.cpu_iters, 10_000)),
                ("rounds", jitter(rng, baselines.cpu_rounds, 1)),
            ],
            Self::Workload(WorkloadKind::Mem) => vec![
                ("mb", jitter(rng, baselines.mem_mb, 1)),
                ("ms", jitter(rng, baselines.mem_ms, 1)),
            ],
            Self::Workload(WorkloadKind::Json) => vec![("kb", jitter(rng, baselines.json_kb, 1))],
            Self::Workload(WorkloadKind::Io) => vec![("kb", jitter(rng, baselines.io_kb, 1))],
            Self::Workload(WorkloadKind::Mix) => vec![
                ("iters", jitter(rng, baselines.mix_iters, 10_000)),
                ("kb", jitter(rng, baselines.mix_kb, 1)),
                ("sleep_ms", jitter(rng, baselines.mix_sleep_ms, 0)),
            ],
        };

        PlannedRequest {
            name: self.name(),
            path: self.path(),
            query,
            expected_kind: self.expected_kind(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `max(floor, trunc(base * U(0.8, 1.2)))`
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, base: u64, floor: u64) -> u64 {
    let factor: f64 = rng.gen_range(0.8..=1.2);
    ((base as f64 * factor) as u64).max(floor)
}

/// A fully parameterized request, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRequest {
    pub name: &'static str,
    pub path: &'static str,
    pub query: Vec<(&'static str, u64)>,
    pub expected_kind: Option<WorkloadKind>,
}

impl PlannedRequest {
    /// The one-off request every user sends before its loop starts.
    pub fn warmup() -> Self {
        Self {
            name: "GET / (warmup)",
            path: "/",
            query: Vec::new(),
            expected_kind: None,
        }
    }
}

/// The tasks enabled for this run and their weighted distribution.
#[derive(Debug, Clone)]
pub struct TaskSet {
    tasks: Vec<Task>,
    weights: WeightedIndex<u32>,
}

impl TaskSet {
    /// Keep tasks carrying one of `tags`; an empty filter keeps everything.
    pub fn new(tags: &[String]) -> DriverResult<Self> {
        for tag in tags {
            if !Task::ALL.iter().any(|task| task.tag() == tag) {
                return Err(DriverError::Config(format!("unknown task tag '{}'", tag)));
            }
        }

        let tasks: Vec<Task> = Task::ALL
            .into_iter()
            .filter(|task| tags.is_empty() || tags.iter().any(|t| t == task.tag()))
            .collect();

        let weights = WeightedIndex::new(tasks.iter().map(Task::weight))
            .map_err(|e| DriverError::Config(format!("no runnable tasks: {}", e)))?;

        Ok(Self { tasks, weights })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Task {
        self.tasks[self.weights.sample(rng)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_jitter_stays_within_band_and_floor() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let value = jitter(&mut rng, 200_000, 10_000);
            assert!((160_000..=240_000).contains(&value));
        }
        for _ in 0..100 {
            assert_eq!(jitter(&mut rng, 1, 1), 1);
            assert!(jitter(&mut rng, 0, 0) == 0);
            assert!(jitter(&mut rng, 5_000, 10_000) == 10_000);
        }
    }

    #[test]
    fn test_plan_uses_endpoint_parameter_names() {
        let mut rng = StdRng::seed_from_u64(1);
        let baselines = Baselines::default();

        let mix = Task::Workload(WorkloadKind::Mix).plan(&baselines, &mut rng);
        assert_eq!(mix.name, "GET /mix");
        assert_eq!(mix.path, "/mix");
        let names: Vec<_> = mix.query.iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["iters", "kb", "sleep_ms"]);
        assert_eq!(mix.expected_kind, Some(WorkloadKind::Mix));

        let json = Task::Workload(WorkloadKind::Json).plan(&baselines, &mut rng);
        assert_eq!(json.expected_kind, None);

        let root = Task::Root.plan(&baselines, &mut rng);
        assert!(root.query.is_empty());
        assert_eq!(root.name, "GET /");
    }

    #[test]
    fn test_root_is_twice_as_likely() {
        let set = TaskSet::new(&[]).unwrap();
        assert_eq!(set.tasks().len(), 6);

        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<Task, usize> = HashMap::new();
        for _ in 0..70_000 {
            *counts.entry(set.choose(&mut rng)).or_default() += 1;
        }

        let root = counts[&Task::Root] as f64;
        let cpu = counts[&Task::Workload(WorkloadKind::Cpu)] as f64;
        let ratio = root / cpu;
        assert!((1.8..2.2).contains(&ratio), "ratio was {}", ratio);
    }

    #[test]
    fn test_tag_filter() {
        let set = TaskSet::new(&["cpu".to_string(), "io".to_string()]).unwrap();
        assert_eq!(
            set.tasks(),
            &[Task::Workload(WorkloadKind::Cpu), Task::Workload(WorkloadKind::Io)]
        );

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert_ne!(set.choose(&mut rng), Task::Root);
        }

        assert!(TaskSet::new(&["disk".to_string()]).is_err());
    }
}
