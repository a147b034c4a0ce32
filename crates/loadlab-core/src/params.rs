//! Workload kinds and their query-parameter contracts.
//!
//! Every numeric parameter has a default and an inclusive `[lo, hi]` range.
//! Parsing never fails: unparseable input falls back to the default and
//! out-of-range input is clamped.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

/// A single named integer parameter with its default and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: i64,
    pub lo: i64,
    pub hi: i64,
}

impl ParamSpec {
    pub const fn new(name: &'static str, default: i64, lo: i64, hi: i64) -> Self {
        Self {
            name,
            default,
            lo,
            hi,
        }
    }

    /// Clamp a value into `[lo, hi]`.
    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.lo, self.hi)
    }

    /// Resolve a raw query value: missing or non-integer input yields the default.
    ///
    /// Integers too large for `i64` saturate toward their sign before clamping.
    pub fn parse(&self, raw: Option<&str>) -> i64 {
        let Some(raw) = raw else {
            return self.default;
        };
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(value) => self.clamp(value),
            Err(_) if !is_integer_literal(raw) => self.default,
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => self.hi,
                IntErrorKind::NegOverflow => self.lo,
                _ => self.default,
            },
        }
    }
}

/// Optional sign followed by one or more ASCII digits.
fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

pub const CPU_ITERS: ParamSpec = ParamSpec::new("iters", 200_000, 10_000, 2_000_000);
pub const CPU_ROUNDS: ParamSpec = ParamSpec::new("rounds", 4, 1, 64);
pub const MEM_MB: ParamSpec = ParamSpec::new("mb", 64, 1, 1024);
pub const MEM_MS: ParamSpec = ParamSpec::new("ms", 500, 1, 60_000);
pub const JSON_KB: ParamSpec = ParamSpec::new("kb", 256, 1, 8192);
pub const IO_KB: ParamSpec = ParamSpec::new("kb", 512, 1, 16_384);
pub const MIX_ITERS: ParamSpec = ParamSpec::new("iters", 150_000, 10_000, 2_000_000);
pub const MIX_KB: ParamSpec = ParamSpec::new("kb", 128, 1, 4096);
pub const MIX_SLEEP_MS: ParamSpec = ParamSpec::new("sleep_ms", 50, 0, 5000);

/// Resource dimension exercised by a target endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    Cpu,
    Mem,
    Json,
    Io,
    Mix,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 5] = [
        WorkloadKind::Cpu,
        WorkloadKind::Mem,
        WorkloadKind::Json,
        WorkloadKind::Io,
        WorkloadKind::Mix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Mem => "mem",
            Self::Json => "json",
            Self::Io => "io",
            Self::Mix => "mix",
        }
    }

    /// Route path serving this workload.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Cpu => "/cpu",
            Self::Mem => "/mem",
            Self::Json => "/json",
            Self::Io => "/io",
            Self::Mix => "/mix",
        }
    }

    /// Parameter specs accepted by this workload, in documentation order.
    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            Self::Cpu => &[CPU_ITERS, CPU_ROUNDS],
            Self::Mem => &[MEM_MB, MEM_MS],
            Self::Json => &[JSON_KB],
            Self::Io => &[IO_KB],
            Self::Mix => &[MIX_ITERS, MIX_KB, MIX_SLEEP_MS],
        }
    }

    /// Whether the response body carries a self-reported `kind` field.
    pub fn reports_kind(&self) -> bool {
        !matches!(self, Self::Json)
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "mem" => Ok(Self::Mem),
            "json" => Ok(Self::Json),
            "io" => Ok(Self::Io),
            "mix" => Ok(Self::Mix),
            other => Err(format!("unknown workload kind '{}'", other)),
        }
    }
}

/// A fully resolved workload invocation. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRequest {
    kind: WorkloadKind,
    params: BTreeMap<&'static str, i64>,
}

impl WorkloadRequest {
    /// Resolve every parameter of `kind` from a query-string map.
    pub fn from_query(kind: WorkloadKind, query: &HashMap<String, String>) -> Self {
        let params = kind
            .params()
            .iter()
            .map(|spec| (spec.name, spec.parse(query.get(spec.name).map(String::as_str))))
            .collect();
        Self { kind, params }
    }

    pub fn kind(&self) -> WorkloadKind {
        self.kind
    }

    /// Resolved value of a parameter; unknown names read as zero.
    pub fn get(&self, name: &str) -> i64 {
        self.params.get(name).copied().unwrap_or_default()
    }

    /// Resolved value as `usize`; every spec has a non-negative lower bound.
    pub fn get_usize(&self, name: &str) -> usize {
        usize::try_from(self.get(name)).unwrap_or_default()
    }

    pub fn params(&self) -> impl Iterator<Item = (&'static str, i64)> + '_ {
        self.params.iter().map(|(name, value)| (*name, *value))
    }
}
