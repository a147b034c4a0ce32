//! Report generation for load test results

use crate::error::{DriverError, DriverResult};
use crate::metrics::LoadTestMetrics;
use crate::orchestrator::RunSummary;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Report format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Markdown,
    Json,
}

fn ms(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn latency_json(m: &LoadTestMetrics) -> serde_json::Value {
    serde_json::json!({
        "p50": ms(m.p50_latency()),
        "p90": ms(m.p90_latency()),
        "p95": ms(m.p95_latency()),
        "p99": ms(m.p99_latency()),
        "max": ms(m.max_latency()),
    })
}

/// Renders a finished run as Markdown or JSON.
pub struct ResultWriter {
    summary: RunSummary,
}

impl ResultWriter {
    pub fn new(summary: RunSummary) -> Self {
        Self { summary }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Write report to file
    pub fn write_report(&self, path: impl AsRef<Path>, format: ReportFormat) -> DriverResult<()> {
        let path = path.as_ref();
        let content = self.render(format);

        File::create(path)
            .and_then(|mut file| file.write_all(content.as_bytes()))
            .map_err(|source| DriverError::Report {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Markdown => self.generate_markdown(),
            ReportFormat::Json => self.generate_json(),
        }
    }

    fn generate_markdown(&self) -> String {
        let s = &self.summary;
        let total = &s.metrics.aggregate;
        let mut out = String::new();

        let _ = writeln!(out, "# Load Test Report: {}\n", s.target_url);
        let _ = writeln!(out, "**Stage source**: {}\n", s.schedule_source);
        let _ = writeln!(out, "---\n");

        let _ = writeln!(out, "## Summary\n");
        let _ = writeln!(out, "- **Duration**: {:.1} seconds", total.duration().as_secs_f64());
        let _ = writeln!(out, "- **Peak Users**: {}", s.peak_users);
        let _ = writeln!(out, "- **Total Requests**: {}", total.total_requests);
        let _ = writeln!(out, "- **Successful**: {}", total.successful_requests);
        let _ = writeln!(out, "- **Failed**: {}", total.failed_requests);
        let _ = writeln!(out, "- **Error Rate**: {:.4}%", total.error_rate() * 100.0);
        let _ = writeln!(out, "- **Throughput**: {:.1} req/s\n", total.throughput_rps());
        let _ = writeln!(out, "---\n");

        let _ = writeln!(out, "## Stages\n");
        let _ = writeln!(out, "| Cutoff (s) | Users | Spawn Rate |");
        let _ = writeln!(out, "|------------|-------|------------|");
        for step in s.timeline.steps() {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                step.cutoff_secs, step.target_users, step.spawn_rate
            );
        }
        let _ = writeln!(out, "\n---\n");

        let _ = writeln!(out, "## Requests\n");
        let _ = writeln!(
            out,
            "| Name | Requests | Failures | P50 | P95 | P99 | Max |"
        );
        let _ = writeln!(
            out,
            "|------|----------|----------|-----|-----|-----|-----|"
        );
        for (name, m) in &s.metrics.per_request {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {:.2}ms | {:.2}ms | {:.2}ms | {:.2}ms |",
                name,
                m.total_requests,
                m.failed_requests,
                ms(m.p50_latency()),
                ms(m.p95_latency()),
                ms(m.p99_latency()),
                ms(m.max_latency()),
            );
        }
        let _ = writeln!(
            out,
            "| **Aggregated** | {} | {} | {:.2}ms | {:.2}ms | {:.2}ms | {:.2}ms |",
            total.total_requests,
            total.failed_requests,
            ms(total.p50_latency()),
            ms(total.p95_latency()),
            ms(total.p99_latency()),
            ms(total.max_latency()),
        );
        let _ = writeln!(out, "\n---\n");

        let _ = writeln!(out, "## Failures\n");
        let mut any_failure = false;
        for (name, m) in &s.metrics.per_request {
            for (message, count) in &m.errors {
                if !any_failure {
                    let _ = writeln!(out, "| Name | Occurrences | Error |");
                    let _ = writeln!(out, "|------|-------------|-------|");
                    any_failure = true;
                }
                let _ = writeln!(out, "| {} | {} | {} |", name, count, message);
            }
        }
        if !any_failure {
            let _ = writeln!(out, "No failures recorded");
        }

        let _ = writeln!(
            out,
            "\n---\n\n**Report Generated**: {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        out
    }

    fn generate_json(&self) -> String {
        let s = &self.summary;
        let total = &s.metrics.aggregate;

        let requests: serde_json::Map<String, serde_json::Value> = s
            .metrics
            .per_request
            .iter()
            .map(|(name, m)| {
                (
                    name.to_string(),
                    serde_json::json!({
                        "total_requests": m.total_requests,
                        "successful_requests": m.successful_requests,
                        "failed_requests": m.failed_requests,
                        "error_rate": m.error_rate(),
                        "latency_ms": latency_json(m),
                        "errors": m.errors,
                    }),
                )
            })
            .collect();

        serde_json::json!({
            "target": s.target_url,
            "stage_source": s.schedule_source.to_string(),
            "custom_schedule": s.schedule_source.is_custom(),
            "timeline": s.timeline,
            "peak_users": s.peak_users,
            "duration_seconds": total.duration().as_secs_f64(),
            "total_requests": total.total_requests,
            "successful_requests": total.successful_requests,
            "failed_requests": total.failed_requests,
            "error_rate": total.error_rate(),
            "throughput_rps": total.throughput_rps(),
            "latency_ms": latency_json(total),
            "requests": requests,
            "errors": total.errors,
            "generated_at": chrono::Utc::now().to_rfc3339(),
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsCollector;
    use loadlab_core::{LoadTimeline, ScheduleSource};
    use std::time::Duration;

    fn summary() -> RunSummary {
        let collector = MetricsCollector::new();
        collector.record_success("GET /cpu", Duration::from_millis(12));
        collector.record_failure(
            "GET /cpu",
            Duration::from_millis(40),
            r#"kind mismatch: expected "cpu", got "mem""#.to_string(),
        );
        collector.record_success("GET /", Duration::from_millis(2));

        RunSummary {
            target_url: "http://localhost:8080".to_string(),
            schedule_source: ScheduleSource::Fallback {
                reason: "no stages json found: \"/tmp/stages.json\"".to_string(),
            },
            timeline: LoadTimeline::default_schedule(),
            peak_users: 3,
            metrics: collector.snapshot(),
        }
    }

    #[test]
    fn test_markdown_report_sections() {
        let writer = ResultWriter::new(summary());
        assert_eq!(writer.summary().metrics.aggregate.failed_requests, 1);

        let report = writer.render(ReportFormat::Markdown);
        assert!(report.starts_with("# Load Test Report: http://localhost:8080"));
        assert!(report.contains("fallback to default stages"));
        assert!(report.contains("| 360 | 400 | 100 |"));
        assert!(report.contains("| GET /cpu | 2 | 1 |"));
        assert!(report.contains(r#"got "mem""#));
    }

    #[test]
    fn test_json_report_shape() {
        let report = ResultWriter::new(summary()).render(ReportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();

        assert_eq!(value["total_requests"], 3);
        assert_eq!(value["failed_requests"], 1);
        assert_eq!(value["custom_schedule"], false);
        assert_eq!(value["requests"]["GET /cpu"]["failed_requests"], 1);
        assert_eq!(value["timeline"]["steps"][2]["cutoff_secs"], 360);
        assert!(value["latency_ms"]["p95"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");

        ResultWriter::new(summary())
            .write_report(&path, ReportFormat::Markdown)
            .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("## Requests"));

        let missing = dir.path().join("nope").join("report.md");
        assert!(ResultWriter::new(summary())
            .write_report(&missing, ReportFormat::Json)
            .is_err());
    }
}
