//! Slack notification payload.
//!
//! Builds the attachment/blocks message posted to the team channel at the
//! end of a run. `JOB_NAME`, `DEVICE_NAME`, `DEVICE_VERSION` and
//! `BUILD_URL` stay literal in the text; the CI job substitutes them.

use super::generator::format_duration;
use crate::metadata::EnvironmentMetadata;
use crate::models::{BuildOutcome, RunSummary};
use serde::Serialize;

/// Tokens left in the message for the CI environment to fill in.
pub const PLACEHOLDERS: [&str; 4] = ["JOB_NAME", "DEVICE_NAME", "DEVICE_VERSION", "BUILD_URL"];

const SUCCESS_COLOR: &str = "#00FF00";
const FAILURE_COLOR: &str = "#FF0000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextKind {
    #[serde(rename = "plain_text")]
    PlainText,
    #[serde(rename = "mrkdwn")]
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: TextKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Header { text: TextObject },
    Divider,
    Section { text: TextObject },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub color: String,
    pub blocks: Vec<Block>,
}

/// Message body for a Slack incoming webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub attachments: Vec<Attachment>,
}

impl NotificationPayload {
    /// Build the message for a finished run.
    ///
    /// A successful build only shows totals; a failed one shows the full
    /// breakdown at every level.
    pub fn build(
        summary: &RunSummary,
        outcome: BuildOutcome,
        metadata: &EnvironmentMetadata,
    ) -> Self {
        let (color, status) = match outcome {
            BuildOutcome::Success => (SUCCESS_COLOR, "Build success"),
            BuildOutcome::Failure => (FAILURE_COLOR, "Build failed"),
        };

        let blocks = vec![
            Block::Header {
                text: TextObject {
                    kind: TextKind::PlainText,
                    text: status.to_string(),
                },
            },
            Block::Divider,
            Block::Section {
                text: TextObject {
                    kind: TextKind::Markdown,
                    text: message_text(summary, outcome, metadata),
                },
            },
        ];

        Self {
            attachments: vec![Attachment {
                color: color.to_string(),
                blocks,
            }],
        }
    }

    /// Copy of the payload with placeholders replaced where `lookup` has a value.
    pub fn with_placeholders_resolved<F>(&self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let values: Vec<(&str, String)> = PLACEHOLDERS
            .iter()
            .filter_map(|name| lookup(name).map(|v| (*name, v)))
            .collect();

        let mut resolved = self.clone();
        for attachment in &mut resolved.attachments {
            for block in &mut attachment.blocks {
                if let Block::Header { text } | Block::Section { text } = block {
                    for (name, value) in &values {
                        text.text = text.text.replace(name, value);
                    }
                }
            }
        }
        resolved
    }
}

fn message_text(
    summary: &RunSummary,
    outcome: BuildOutcome,
    metadata: &EnvironmentMetadata,
) -> String {
    let steps = &summary.steps;

    let mut text = format!(
        "*Job name:* JOB_NAME\n*Device name:* DEVICE_NAME, *Device version:* DEVICE_VERSION\n*Platform:* {}\n*Total duration:* {}",
        metadata.platform,
        format_duration(steps.total_duration_ns())
    );

    if outcome.is_success() {
        text.push_str(&format!(
            "\n*Feature:* {}, *Scenario:* {}, *Step:* {}",
            summary.features.total(),
            summary.scenarios.total(),
            steps.total_count()
        ));
    } else {
        text.push_str(&format!(
            "\n*Feature:* Total: {}, Passed: {}, Failed: {}",
            summary.features.total(),
            summary.features.passed,
            summary.features.failed
        ));
        text.push_str(&format!(
            "\n*Scenario:* Total: {}, Passed: {}, Failed: {}",
            summary.scenarios.total(),
            summary.scenarios.passed,
            summary.scenarios.failed
        ));
        text.push_str(&format!(
            "\n*Step:* Total: {}, Passed: {}, Failed: {}, Skipped: {}, Pending: {}, Undefined: {}",
            steps.total_count(),
            steps.passed.count,
            steps.failed.count,
            steps.skipped.count,
            steps.pending.count,
            steps.undefined.count
        ));
    }

    text.push_str(&format!("\n*App:* <{}>\n*Detail*: <BUILD_URL>", metadata.app));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bucket, PassFail, StepBuckets};
    use serde_json::{json, Value};

    fn create_test_summary() -> RunSummary {
        RunSummary {
            features: PassFail { passed: 1, failed: 1 },
            scenarios: PassFail { passed: 3, failed: 1 },
            steps: StepBuckets {
                passed: Bucket { count: 9, duration_ns: 61_000_000_000 },
                failed: Bucket { count: 1, duration_ns: 0 },
                skipped: Bucket { count: 2, duration_ns: 0 },
                pending: Bucket::default(),
                undefined: Bucket::default(),
            },
        }
    }

    fn metadata() -> EnvironmentMetadata {
        EnvironmentMetadata {
            app: "https://builds.example.com/app.apk".to_string(),
            platform: "Android".to_string(),
        }
    }

    fn section_text(payload: &NotificationPayload) -> &str {
        match &payload.attachments[0].blocks[2] {
            Block::Section { text } => &text.text,
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload =
            NotificationPayload::build(&create_test_summary(), BuildOutcome::Failure, &metadata());
        let value: Value = serde_json::to_value(&payload).unwrap();

        let attachment = &value["attachments"][0];
        assert_eq!(attachment["color"], "#FF0000");
        assert_eq!(
            attachment["blocks"][0],
            json!({"type": "header", "text": {"type": "plain_text", "text": "Build failed"}})
        );
        assert_eq!(attachment["blocks"][1], json!({"type": "divider"}));
        assert_eq!(attachment["blocks"][2]["type"], "section");
        assert_eq!(attachment["blocks"][2]["text"]["type"], "mrkdwn");
    }

    #[test]
    fn test_failure_text_has_breakdown() {
        let payload =
            NotificationPayload::build(&create_test_summary(), BuildOutcome::Failure, &metadata());
        let text = section_text(&payload);

        assert!(text.starts_with("*Job name:* JOB_NAME\n"));
        assert!(text.contains("*Platform:* Android\n*Total duration:* 00:01:01.000"));
        assert!(text.contains("*Feature:* Total: 2, Passed: 1, Failed: 1"));
        assert!(text.contains("*Scenario:* Total: 4, Passed: 3, Failed: 1"));
        assert!(text.contains(
            "*Step:* Total: 12, Passed: 9, Failed: 1, Skipped: 2, Pending: 0, Undefined: 0"
        ));
        assert!(text.ends_with(
            "*App:* <https://builds.example.com/app.apk>\n*Detail*: <BUILD_URL>"
        ));
    }

    #[test]
    fn test_success_text_has_totals_only() {
        let payload =
            NotificationPayload::build(&create_test_summary(), BuildOutcome::Success, &metadata());
        let text = section_text(&payload);

        assert_eq!(payload.attachments[0].color, "#00FF00");
        assert!(text.contains("*Feature:* 2, *Scenario:* 4, *Step:* 12"));
        assert!(!text.contains("Passed:"));
    }

    #[test]
    fn test_blank_metadata() {
        let payload = NotificationPayload::build(
            &RunSummary::default(),
            BuildOutcome::Success,
            &EnvironmentMetadata::default(),
        );
        let text = section_text(&payload);
        assert!(text.contains("*Platform:* \n"));
        assert!(text.contains("*App:* <>"));
    }

    #[test]
    fn test_placeholder_resolution() {
        let payload =
            NotificationPayload::build(&create_test_summary(), BuildOutcome::Failure, &metadata());
        let resolved = payload.with_placeholders_resolved(|name| match name {
            "JOB_NAME" => Some("nightly-android".to_string()),
            "BUILD_URL" => Some("https://ci.example.com/job/42".to_string()),
            _ => None,
        });
        let text = section_text(&resolved);

        assert!(text.contains("*Job name:* nightly-android"));
        assert!(text.contains("*Detail*: <https://ci.example.com/job/42>"));
        assert!(text.contains("*Device name:* DEVICE_NAME"));
        assert!(section_text(&payload).contains("JOB_NAME"));
    }
}
