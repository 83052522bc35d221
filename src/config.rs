//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cukemerge.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".cukemerge.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Shard report discovery.
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,

    /// Environment metadata for notifications.
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Notification delivery.
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Where shard reports live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Directory holding the per-shard Cucumber JSON files.
    #[serde(default = "default_reports_dir")]
    pub dir: PathBuf,

    /// Extension of shard files, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Sort shards by file name. The first one receives the merged report.
    #[serde(default)]
    pub sort_by_name: bool,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir: default_reports_dir(),
            extension: default_extension(),
            sort_by_name: false,
        }
    }
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("target/cucumber-reports")
}

fn default_extension() -> String {
    "json".to_string()
}

/// Paths of the derived reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Summary report path.
    #[serde(default = "default_summary")]
    pub summary: PathBuf,

    /// Slack payload path.
    #[serde(default = "default_notification")]
    pub notification: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            summary: default_summary(),
            notification: default_notification(),
        }
    }
}

fn default_summary() -> PathBuf {
    PathBuf::from("target/GitHubReport.json")
}

fn default_notification() -> PathBuf {
    PathBuf::from("target/SlackReport.json")
}

/// Source of the app identifier and platform name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Properties file with `app` and `platformName` keys.
    #[serde(default = "default_properties")]
    pub properties: PathBuf,

    /// Fixed app identifier, overrides the properties file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    /// Fixed platform name, overrides the properties file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            properties: default_properties(),
            app: None,
            platform: None,
        }
    }
}

fn default_properties() -> PathBuf {
    PathBuf::from("target/classifications/Appium_Test.properties")
}

/// Optional direct delivery to Slack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Incoming webhook URL. Nothing is posted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.reports_dir {
            self.reports.dir = dir.clone();
        }
        if let Some(ref extension) = args.extension {
            self.reports.extension = extension.trim_start_matches('.').to_string();
        }
        if args.sort {
            self.reports.sort_by_name = true;
        }

        if let Some(ref summary) = args.summary_output {
            self.output.summary = summary.clone();
        }
        if let Some(ref notification) = args.notification_output {
            self.output.notification = notification.clone();
        }

        if let Some(ref properties) = args.properties {
            self.metadata.properties = properties.clone();
        }
        if args.app.is_some() {
            self.metadata.app = args.app.clone();
        }
        if args.platform.is_some() {
            self.metadata.platform = args.platform.clone();
        }

        if args.webhook_url.is_some() {
            self.notification.webhook_url = args.webhook_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.notification.timeout_seconds = timeout;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
