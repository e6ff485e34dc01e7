use std::path::Path;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::grpc::{GrpcRunnerOptions, status_name};
use crate::metrics::{CALL_ERROR, RetCode};
use crate::periodic::{RunResult, StopCondition};

pub(crate) fn selection_lines(options: &GrpcRunnerOptions) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push("Selections:".to_owned());
    lines.push(format!("destination: {}", options.destination));
    lines.push(format!(
        "mode: {}",
        if options.use_ping { "ping" } else { "health" }
    ));
    lines.push(format!("qps: {}", options.run.qps));
    lines.push(format!("connections: {}", options.run.num_threads));
    lines.push(format!("streams: {}", options.streams));
    lines.push(format!("stop: {}", format_stop(options.run.stop)));
    lines.push(format!("resolution_s: {}", options.run.resolution));
    lines.push(format!(
        "service: {}",
        if options.service.is_empty() {
            "<server>"
        } else {
            options.service.as_str()
        }
    ));
    lines.push(format!(
        "cacert: {}",
        format_opt_path(options.ca_cert.as_deref())
    ));
    lines.push(format!("cert: {}", format_opt_path(options.cert.as_deref())));
    lines.push(format!(
        "cert_override: {}",
        options.cert_override.as_deref().unwrap_or("none")
    ));
    if options.use_ping {
        lines.push(format!("delay_ms: {}", options.delay.as_millis()));
        lines.push(format!("payload_bytes: {}", options.payload.len()));
    }
    lines.push(format!(
        "allow_initial_errors: {}",
        options.allow_initial_errors
    ));
    lines.push(format!(
        "connect_timeout_ms: {}",
        options.connect_timeout.as_millis()
    ));
    lines.push(format!(
        "request_timeout_ms: {}",
        options.request_timeout.as_millis()
    ));
    lines.push(format!(
        "profile: {}",
        format_opt_path(options.run.profiler.as_deref())
    ));
    lines
}

/// Human readable result: latency figures first, then one line per outcome.
pub(crate) fn summary_lines(result: &RunResult) -> Vec<String> {
    let summary = result.summary();
    let mut lines = Vec::new();
    if let Some(label) = summary.label.as_deref() {
        lines.push(format!("Run: {}", label));
    }
    lines.push(format!(
        "Ended after {} : {} calls. qps={:.4} (requested {}, {} workers)",
        format_secs(summary.actual_duration_secs),
        summary.count,
        summary.actual_qps,
        summary.requested_qps,
        summary.num_threads
    ));
    lines.push(format!(
        "Latency: avg {} min {} max {}",
        format_secs(summary.avg_secs),
        format_secs(summary.min_secs),
        format_secs(summary.max_secs)
    ));
    for value in &summary.percentiles {
        lines.push(format!(
            "  p{:<5} {}",
            value.percentile,
            format_secs(value.secs)
        ));
    }
    lines.push("Outcomes:".to_owned());
    if summary.ret_codes.is_empty() {
        lines.push("  none".to_owned());
    }
    for (code, count) in &summary.ret_codes {
        lines.push(format!(
            "  {:<16} ({:>2}) : {}",
            outcome_name(*code),
            code,
            count
        ));
    }
    lines
}

/// JSON rendering of [`RunResult::summary`].
pub(crate) fn summary_json(result: &RunResult) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(&result.summary())?)
}

pub(crate) async fn write_summary_json(path: &Path, result: &RunResult) -> AppResult<()> {
    let json = summary_json(result)?;
    tokio::fs::write(path, json).await.map_err(AppError::from)
}

fn outcome_name(code: RetCode) -> &'static str {
    if code == CALL_ERROR {
        return "ERROR";
    }
    status_name(code).unwrap_or("OTHER")
}

fn format_stop(stop: StopCondition) -> String {
    match stop {
        StopCondition::Duration(duration) => {
            format!("duration {}ms", duration.as_millis())
        }
        StopCondition::Count(count) => format!("exactly {} calls", count),
    }
}

fn format_opt_path(path: Option<&Path>) -> String {
    path.map_or_else(|| "none".to_owned(), |path| path.display().to_string())
}

#[expect(
    clippy::float_arithmetic,
    reason = "Sub-second latencies are shown in fractional milliseconds."
)]
fn format_secs(secs: f64) -> String {
    let duration = Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO);
    if duration >= Duration::from_secs(1) {
        format!("{:.3}s", duration.as_secs_f64())
    } else {
        format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;
    use crate::metrics::OutcomeAggregator;

    fn sample_result() -> AppResult<RunResult> {
        let mut aggregator = OutcomeAggregator::new(0.0001)?;
        aggregator.record(Duration::from_millis(2), 1);
        aggregator.record(Duration::from_millis(4), 1);
        aggregator.record(Duration::from_millis(6), CALL_ERROR);
        let (duration_histogram, ret_codes) = aggregator.into_parts();
        Ok(RunResult {
            duration_histogram,
            ret_codes,
            actual_qps: 3.0,
            actual_duration: Duration::from_secs(1),
            requested_qps: 3.0,
            num_threads: 1,
            stop: StopCondition::Count(3),
            label: Some("smoke".to_owned()),
        })
    }

    #[test]
    fn summary_lines_name_outcomes() -> AppResult<()> {
        let lines = summary_lines(&sample_result()?);
        let text = lines.join("\n");
        for expected in ["Run: smoke", "3 calls", "p99.9", "SERVING", "ERROR"] {
            if !text.contains(expected) {
                return Err(AppError::metrics(format!(
                    "Missing {:?} in summary:\n{}",
                    expected, text
                )));
            }
        }
        Ok(())
    }

    #[test]
    fn summary_json_carries_counts() -> AppResult<()> {
        let json = summary_json(&sample_result()?)?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        if value.get("count").and_then(serde_json::Value::as_u64) != Some(3) {
            return Err(AppError::metrics(format!("Unexpected json {}", json)));
        }
        if value.get("exactly").and_then(serde_json::Value::as_u64) != Some(3) {
            return Err(AppError::metrics(format!("Missing exactly in {}", json)));
        }
        let codes = value
            .get("ret_codes")
            .and_then(serde_json::Value::as_object)
            .ok_or(MetricsError::TestExpectation {
                message: "ret_codes must be an object",
            })?;
        if codes.get("-1").and_then(serde_json::Value::as_u64) != Some(1) {
            return Err(AppError::metrics(format!("Unexpected ret codes {:?}", codes)));
        }
        Ok(())
    }

    #[test]
    fn empty_run_reports_no_outcomes() -> AppResult<()> {
        let aggregator = OutcomeAggregator::new(0.001)?;
        let (duration_histogram, ret_codes) = aggregator.into_parts();
        let result = RunResult {
            duration_histogram,
            ret_codes,
            actual_qps: 0.0,
            actual_duration: Duration::ZERO,
            requested_qps: 8.0,
            num_threads: 4,
            stop: StopCondition::Duration(Duration::from_secs(5)),
            label: None,
        };
        let lines = summary_lines(&result);
        if !lines.iter().any(|line| line == "  none") {
            return Err(AppError::metrics(format!("Unexpected lines {:?}", lines)));
        }
        Ok(())
    }

    #[test]
    fn selections_list_transport_choices() -> AppResult<()> {
        let options = GrpcRunnerOptions {
            destination: "localhost:8079".to_owned(),
            use_ping: true,
            delay: Duration::from_millis(20),
            ..GrpcRunnerOptions::default()
        };
        let lines = selection_lines(&options);
        for expected in [
            "destination: localhost:8079",
            "mode: ping",
            "delay_ms: 20",
            "cacert: none",
        ] {
            if !lines.iter().any(|line| line == expected) {
                return Err(AppError::metrics(format!(
                    "Missing {:?} in {:?}",
                    expected, lines
                )));
            }
        }
        Ok(())
    }
}
