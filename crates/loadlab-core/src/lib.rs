//! Shared domain types for the loadlab synthetic load target and staged load driver.

pub mod error;
pub mod metrics;
pub mod params;
pub mod stages;
pub mod telemetry;
pub mod workload;

pub use error::{CoreError, CoreResult};
pub use params::{ParamSpec, WorkloadKind, WorkloadRequest};
pub use stages::{
    load_schedule, load_stages_json, resolve_stages_path, tick, LoadTimeline, ResolvedSchedule,
    ScheduleSource, StageDefinition, StageTarget, TimelineStep,
};
pub use telemetry::{init_logging, LoggingConfig};
pub use workload::{
    CpuResult, IoResult, JsonPayload, KindProbe, MemResult, MixResult, SERIALIZE_SECONDS_HEADER,
};
