//! Driver configuration.
//!
//! Every tunable is a command-line flag that can also be set through the
//! environment variable named next to it. Values are parsed once into an
//! immutable [`DriverConfig`] that the rest of the driver shares.

use crate::error::{DriverError, DriverResult};
use crate::reporter::ReportFormat;
use clap::Parser;
use loadlab_core::LoggingConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "loadlab-driver")]
#[command(about = "Staged load driver for the loadlab synthetic target", long_about = None)]
#[command(version)]
pub struct DriverArgs {
    /// Base URL of the target
    #[arg(long, env = "LOADLAB_TARGET_URL", default_value = "http://localhost:8080")]
    pub host: String,

    /// Stage schedule JSON; relative paths resolve against the driver binary's directory
    #[arg(long, env = "LOADLAB_STAGES_FILE")]
    pub stages_file: Option<PathBuf>,

    /// Only run tasks carrying one of these tags (root, cpu, mem, json, io, mix)
    #[arg(long, env = "LOADLAB_TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(long, env = "CPU_ITERS", default_value_t = 200_000)]
    pub cpu_iters: u64,

    #[arg(long, env = "CPU_ROUNDS", default_value_t = 4)]
    pub cpu_rounds: u64,

    #[arg(long, env = "MEM_MB", default_value_t = 64)]
    pub mem_mb: u64,

    #[arg(long, env = "MEM_MS", default_value_t = 500)]
    pub mem_ms: u64,

    #[arg(long, env = "JSON_KB", default_value_t = 256)]
    pub json_kb: u64,

    #[arg(long, env = "IO_KB", default_value_t = 512)]
    pub io_kb: u64,

    #[arg(long, env = "MIX_ITERS", default_value_t = 150_000)]
    pub mix_iters: u64,

    #[arg(long, env = "MIX_KB", default_value_t = 128)]
    pub mix_kb: u64,

    #[arg(long = "mix-sleep-ms", env = "MIX_SLEEPMS", default_value_t = 50)]
    pub mix_sleep_ms: u64,

    /// Lower bound of the think time between requests, in seconds
    #[arg(long, env = "WAIT_MIN_S", default_value_t = 0.05)]
    pub wait_min_s: f64,

    /// Upper bound of the think time between requests, in seconds
    #[arg(long, env = "WAIT_MAX_S", default_value_t = 0.2)]
    pub wait_max_s: f64,

    /// TCP connect timeout, in seconds
    #[arg(long, env = "CONNECT_TIMEOUT", default_value_t = 3.0)]
    pub connect_timeout: f64,

    /// Read timeout, in seconds
    #[arg(long, env = "READ_TIMEOUT", default_value_t = 30.0)]
    pub read_timeout: f64,

    /// How often the stage schedule is polled
    #[arg(long, env = "LOADLAB_TICK_INTERVAL_MS", default_value_t = 1000)]
    pub tick_interval_ms: u64,

    /// Write a final report to this path
    #[arg(long, env = "LOADLAB_REPORT")]
    pub report: Option<PathBuf>,

    #[arg(long, env = "LOADLAB_REPORT_FORMAT", value_enum, default_value_t = ReportFormat::Markdown)]
    pub report_format: ReportFormat,

    #[arg(long, env = "LOADLAB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOADLAB_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Per-endpoint baselines that each request jitters around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baselines {
    pub cpu_iters: u64,
    pub cpu_rounds: u64,
    pub mem_mb: u64,
    pub mem_ms: u64,
    pub json_kb: u64,
    pub io_kb: u64,
    pub mix_iters: u64,
    pub mix_kb: u64,
    pub mix_sleep_ms: u64,
}

impl Default for Baselines {
    fn default() -> Self {
        Self {
            cpu_iters: 200_000,
            cpu_rounds: 4,
            mem_mb: 64,
            mem_ms: 500,
            json_kb: 256,
            io_kb: 512,
            mix_iters: 150_000,
            mix_kb: 128,
            mix_sleep_ms: 50,
        }
    }
}

/// Where and how to write the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTarget {
    pub path: PathBuf,
    pub format: ReportFormat,
}

/// Validated, immutable driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub target_url: String,
    pub stages_file: Option<PathBuf>,
    pub tags: Vec<String>,
    pub baselines: Baselines,
    pub wait_min: Duration,
    pub wait_max: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub tick_interval: Duration,
    pub report: Option<ReportTarget>,
    pub logging: LoggingConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:8080".to_string(),
            stages_file: None,
            tags: Vec::new(),
            baselines: Baselines::default(),
            wait_min: Duration::from_millis(50),
            wait_max: Duration::from_millis(200),
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(30),
            tick_interval: Duration::from_secs(1),
            report: None,
            logging: LoggingConfig::default(),
        }
    }
}

fn seconds(name: &str, value: f64) -> DriverResult<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        DriverError::Config(format!(
            "{} must be a finite, non-negative number of seconds (got {})",
            name, value
        ))
    })
}

impl DriverConfig {
    pub fn from_args(args: DriverArgs) -> DriverResult<Self> {
        let config = Self {
            target_url: args.host.trim_end_matches('/').to_string(),
            stages_file: args.stages_file,
            tags: args
                .tags
                .into_iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            baselines: Baselines {
                cpu_iters: args.cpu_iters,
                cpu_rounds: args.cpu_rounds,
                mem_mb: args.mem_mb,
                mem_ms: args.mem_ms,
                json_kb: args.json_kb,
                io_kb: args.io_kb,
                mix_iters: args.mix_iters,
                mix_kb: args.mix_kb,
                mix_sleep_ms: args.mix_sleep_ms,
            },
            wait_min: seconds("WAIT_MIN_S", args.wait_min_s)?,
            wait_max: seconds("WAIT_MAX_S", args.wait_max_s)?,
            connect_timeout: seconds("CONNECT_TIMEOUT", args.connect_timeout)?,
            read_timeout: seconds("READ_TIMEOUT", args.read_timeout)?,
            tick_interval: Duration::from_millis(args.tick_interval_ms),
            report: args.report.map(|path| ReportTarget {
                path,
                format: args.report_format,
            }),
            logging: LoggingConfig {
                level: args.log_level,
                format: args.log_format,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DriverResult<()> {
        if !self.target_url.starts_with("http://") && !self.target_url.starts_with("https://") {
            return Err(DriverError::Config(format!(
                "target URL must start with http:// or https:// (got '{}')",
                self.target_url
            )));
        }

        if self.wait_min > self.wait_max {
            return Err(DriverError::Config(format!(
                "WAIT_MIN_S ({:?}) must not exceed WAIT_MAX_S ({:?})",
                self.wait_min, self.wait_max
            )));
        }

        if self.connect_timeout.is_zero() {
            return Err(DriverError::Config("CONNECT_TIMEOUT must be > 0".to_string()));
        }

        if self.read_timeout.is_zero() {
            return Err(DriverError::Config("READ_TIMEOUT must be > 0".to_string()));
        }

        if self.tick_interval.is_zero() {
            return Err(DriverError::Config("tick interval must be > 0".to_string()));
        }

        self.logging
            .validate()
            .map_err(|e| DriverError::Config(e.to_string()))?;

        Ok(())
    }

    /// One-line dump of every tunable, logged when a run starts.
    pub fn summary(&self) -> String {
        let b = &self.baselines;
        format!(
            "CPU_ITERS={}, CPU_ROUNDS={}, MEM_MB={}, MEM_MS={}, JSON_KB={}, IO_KB={}, \
             MIX_ITERS={}, MIX_KB={}, MIX_SLEEPMS={}, WAIT=({},{}), TIMEOUT=({},{})",
            b.cpu_iters,
            b.cpu_rounds,
            b.mem_mb,
            b.mem_ms,
            b.json_kb,
            b.io_kb,
            b.mix_iters,
            b.mix_kb,
            b.mix_sleep_ms,
            self.wait_min.as_secs_f64(),
            self.wait_max.as_secs_f64(),
            self.connect_timeout.as_secs_f64(),
            self.read_timeout.as_secs_f64(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> DriverArgs {
        let mut argv = vec!["loadlab-driver"];
        argv.extend_from_slice(extra);
        DriverArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = DriverConfig::from_args(parse(&[])).unwrap();
        assert_eq!(config.baselines, Baselines::default());
        assert_eq!(config.wait_min, Duration::from_millis(50));
        assert_eq!(config.wait_max, Duration::from_millis(200));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!(config.report.is_none());
        assert!(config.tags.is_empty());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = DriverConfig::from_args(parse(&[
            "--host",
            "http://10.0.0.5:8080/",
            "--tags",
            "cpu, MEM",
            "--cpu-iters",
            "50000",
            "--mix-sleep-ms",
            "0",
            "--report",
            "out.json",
            "--report-format",
            "json",
        ]))
        .unwrap();

        assert_eq!(config.target_url, "http://10.0.0.5:8080");
        assert_eq!(config.tags, vec!["cpu".to_string(), "mem".to_string()]);
        assert_eq!(config.baselines.cpu_iters, 50_000);
        assert_eq!(config.baselines.mix_sleep_ms, 0);
        assert_eq!(
            config.report,
            Some(ReportTarget {
                path: PathBuf::from("out.json"),
                format: ReportFormat::Json,
            })
        );
    }

    #[test]
    fn test_inverted_think_time_rejected() {
        let err = DriverConfig::from_args(parse(&["--wait-min-s", "1.0", "--wait-max-s", "0.5"]))
            .unwrap_err();
        assert!(err.to_string().contains("WAIT_MIN_S"));
    }

    #[test]
    fn test_non_positive_timeouts_rejected() {
        assert!(DriverConfig::from_args(parse(&["--read-timeout", "0"])).is_err());
        assert!(DriverConfig::from_args(parse(&["--connect-timeout=-1"])).is_err());
    }

    #[test]
    fn test_summary_lists_every_tunable() {
        let summary = DriverConfig::default().summary();
        assert!(summary.starts_with("CPU_ITERS=200000, CPU_ROUNDS=4"));
        assert!(summary.contains("MIX_SLEEPMS=50"));
        assert!(summary.ends_with("WAIT=(0.05,0.2), TIMEOUT=(3,30)"));
    }
}
