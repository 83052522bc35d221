//! Summary report generation.
//!
//! Renders run statistics into the JSON summary consumed by the CI
//! job page, and formats nanosecond totals as `HH:mm:ss.SSS`.

use crate::models::RunSummary;
use serde::Serialize;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Format a nanosecond duration as `HH:mm:ss.SSS`.
///
/// Nanoseconds are truncated to whole milliseconds. Hours are not wrapped
/// into days.
pub fn format_duration(nanos: u64) -> String {
    let millis = nanos / NANOS_PER_MILLI;
    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let seconds = (millis / 1_000) % 60;
    let ms = millis % 1_000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, ms)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCounts {
    pub total_features: u64,
    pub passed_feature: u64,
    pub failed_feature: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioCounts {
    pub total_scenarios: u64,
    pub passed_scenario: u64,
    pub failed_scenario: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCounts {
    pub total_steps: u64,
    pub passed_step: u64,
    pub failed_step: u64,
    pub skipped_step: u64,
    pub pending_step: u64,
    pub undefined_step: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationTotals {
    pub total_duration: String,
    pub passed_duration: String,
    pub failed_duration: String,
    pub skipped_duration: String,
    pub pending_duration: String,
    pub undefined_duration: String,
}

/// The summary report written next to the merged Cucumber report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    pub features: FeatureCounts,
    pub scenarios: ScenarioCounts,
    pub steps: StepCounts,
    pub durations: DurationTotals,
}

impl From<&RunSummary> for SummaryReport {
    fn from(summary: &RunSummary) -> Self {
        let steps = &summary.steps;

        Self {
            features: FeatureCounts {
                total_features: summary.features.total(),
                passed_feature: summary.features.passed,
                failed_feature: summary.features.failed,
            },
            scenarios: ScenarioCounts {
                total_scenarios: summary.scenarios.total(),
                passed_scenario: summary.scenarios.passed,
                failed_scenario: summary.scenarios.failed,
            },
            steps: StepCounts {
                total_steps: steps.total_count(),
                passed_step: steps.passed.count,
                failed_step: steps.failed.count,
                skipped_step: steps.skipped.count,
                pending_step: steps.pending.count,
                undefined_step: steps.undefined.count,
            },
            durations: DurationTotals {
                total_duration: format_duration(steps.total_duration_ns()),
                passed_duration: format_duration(steps.passed.duration_ns),
                failed_duration: format_duration(steps.failed.duration_ns),
                skipped_duration: format_duration(steps.skipped.duration_ns),
                pending_duration: format_duration(steps.pending.duration_ns),
                undefined_duration: format_duration(steps.undefined.duration_ns),
            },
        }
    }
}

/// Render the summary report as JSON.
pub fn generate_summary_json(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&SummaryReport::from(summary))
}

/// Render a console summary of the run.
pub fn generate_summary_text(summary: &RunSummary) -> String {
    let steps = &summary.steps;
    let mut lines = Vec::new();

    lines.push(format!(
        "Features:  {} total, {} passed, {} failed",
        summary.features.total(),
        summary.features.passed,
        summary.features.failed
    ));
    lines.push(format!(
        "Scenarios: {} total, {} passed, {} failed",
        summary.scenarios.total(),
        summary.scenarios.passed,
        summary.scenarios.failed
    ));
    lines.push(format!(
        "Steps:     {} total, {} passed, {} failed, {} skipped, {} pending, {} undefined",
        steps.total_count(),
        steps.passed.count,
        steps.failed.count,
        steps.skipped.count,
        steps.pending.count,
        steps.undefined.count
    ));
    lines.push(format!(
        "Duration:  {}",
        format_duration(steps.total_duration_ns())
    ));

    lines.join("\n")
}
