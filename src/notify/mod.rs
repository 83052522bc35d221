//! Notification delivery.
//!
//! The aggregator hands the finished payload to a [`NotificationSink`].
//! [`FileSink`] writes it next to the summary report for the CI job to
//! post; [`webhook`] can post it directly.

pub mod webhook;

use crate::errors::AggregateResult;
use crate::report::NotificationPayload;
use std::path::{Path, PathBuf};
use tracing::info;

/// Receives the notification payload at the end of a run.
pub trait NotificationSink {
    fn publish(&self, payload: &NotificationPayload) -> AggregateResult<()>;
}

/// Writes the payload as JSON to a fixed path.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationSink for FileSink {
    fn publish(&self, payload: &NotificationPayload) -> AggregateResult<()> {
        let content = serde_json::to_string_pretty(payload)?;
        crate::analysis::write_file(&self.path, content.as_bytes())?;
        info!("Notification payload written to {}", self.path.display());
        Ok(())
    }
}
