//! Data models for the report merger.
//!
//! This module contains the Cucumber JSON records read from shard files
//! and the statistics derived from a merged report.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Element type that counts toward scenario statistics.
pub const SCENARIO_TYPE: &str = "scenario";

/// Outcome of a single step.
///
/// The set is open: anything the runner emits beyond the four known
/// values is kept verbatim in `Other` and counted as undefined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
    Pending,
    Undefined,
    Other(String),
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match s.as_str() {
            "passed" => Status::Passed,
            "failed" => Status::Failed,
            "skipped" => Status::Skipped,
            "pending" => Status::Pending,
            "undefined" => Status::Undefined,
            _ => Status::Other(s),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Passed => write!(f, "passed"),
            Status::Failed => write!(f, "failed"),
            Status::Skipped => write!(f, "skipped"),
            Status::Pending => write!(f, "pending"),
            Status::Undefined => write!(f, "undefined"),
            Status::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Result block of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Duration in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StepResult {
    pub fn is_passed(&self) -> bool {
        self.status == Some(Status::Passed)
    }

    pub fn duration_ns(&self) -> u64 {
        self.duration.unwrap_or(0)
    }
}

/// A single step (given/when/then line) of an element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StepResult>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Step {
    /// Status of the step, `None` when the runner recorded no result.
    pub fn status(&self) -> Option<&Status> {
        self.result.as_ref().and_then(|r| r.status.as_ref())
    }

    pub fn duration_ns(&self) -> u64 {
        self.result.as_ref().map(StepResult::duration_ns).unwrap_or(0)
    }

    pub fn is_passed(&self) -> bool {
        self.result.as_ref().is_some_and(StepResult::is_passed)
    }
}

/// A scenario, background or other element of a feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element {
    pub fn is_scenario(&self) -> bool {
        self.element_type.as_deref() == Some(SCENARIO_TYPE)
    }

    /// A scenario passes only when every one of its steps passed.
    pub fn all_steps_passed(&self) -> bool {
        self.steps.iter().all(Step::is_passed)
    }
}

/// A feature file's results. `id` is the merge key across shards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Overall result of the test suite, independent of per-feature counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Failure,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success)
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOutcome::Success => write!(f, "success"),
            BuildOutcome::Failure => write!(f, "failed"),
        }
    }
}

/// Pass/fail counters for features or scenarios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassFail {
    pub passed: u64,
    pub failed: u64,
}

impl PassFail {
    pub fn record(&mut self, passed: bool) {
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.passed + self.failed
    }
}

/// Count and summed duration (ns) of steps sharing a status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bucket {
    pub count: u64,
    pub duration_ns: u64,
}

impl Bucket {
    fn add(&mut self, duration_ns: u64) {
        self.count = self.count.saturating_add(1);
        self.duration_ns = self.duration_ns.saturating_add(duration_ns);
    }
}

/// Step statistics split into the five status buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepBuckets {
    pub passed: Bucket,
    pub failed: Bucket,
    pub skipped: Bucket,
    pub pending: Bucket,
    pub undefined: Bucket,
}

impl StepBuckets {
    /// Adds one step. Missing and unrecognized statuses land in `undefined`.
    pub fn record(&mut self, status: Option<&Status>, duration_ns: u64) {
        let bucket = match status {
            Some(Status::Passed) => &mut self.passed,
            Some(Status::Failed) => &mut self.failed,
            Some(Status::Skipped) => &mut self.skipped,
            Some(Status::Pending) => &mut self.pending,
            Some(Status::Undefined) | Some(Status::Other(_)) | None => &mut self.undefined,
        };
        bucket.add(duration_ns);
    }

    fn all(&self) -> [&Bucket; 5] {
        [
            &self.passed,
            &self.failed,
            &self.skipped,
            &self.pending,
            &self.undefined,
        ]
    }

    pub fn total_count(&self) -> u64 {
        self.all()
            .iter()
            .fold(0, |acc: u64, b| acc.saturating_add(b.count))
    }

    /// Durations clamp at `u64::MAX` instead of overflowing.
    pub fn total_duration_ns(&self) -> u64 {
        self.all()
            .iter()
            .fold(0, |acc: u64, b| acc.saturating_add(b.duration_ns))
    }
}

/// Statistics over a merged report at feature, scenario and step level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub features: PassFail,
    pub scenarios: PassFail,
    pub steps: StepBuckets,
}

impl RunSummary {
    /// Computes the summary of a merged feature list.
    ///
    /// Every element's steps count toward the step buckets. Only elements of
    /// type `scenario` count as scenarios, and a failed scenario fails its
    /// feature.
    pub fn from_features(features: &[Feature]) -> Self {
        let mut summary = Self::default();

        for feature in features {
            let mut feature_passed = true;

            for element in &feature.elements {
                for step in &element.steps {
                    summary.steps.record(step.status(), step.duration_ns());
                }

                if element.is_scenario() {
                    let scenario_passed = element.all_steps_passed();
                    summary.scenarios.record(scenario_passed);
                    if !scenario_passed {
                        feature_passed = false;
                    }
                }
            }

            summary.features.record(feature_passed);
        }

        summary
    }

    /// Outcome implied by the report itself: success when nothing failed.
    pub fn inferred_outcome(&self) -> BuildOutcome {
        if self.features.failed == 0 && self.scenarios.failed == 0 {
            BuildOutcome::Success
        } else {
            BuildOutcome::Failure
        }
    }
}
