//! Environment metadata for notifications.
//!
//! The app under test and its platform come from the same `.properties`
//! file the mobile capabilities are built from. A missing file is not an
//! error: the notification is sent with blank values.

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

const APP_KEY: &str = "app";
const PLATFORM_KEY: &str = "platformName";

/// App identifier and platform name shown in the notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMetadata {
    pub app: String,
    pub platform: String,
}

/// Supplies environment metadata to the aggregator.
pub trait MetadataSource {
    fn get(&self) -> EnvironmentMetadata;
}

/// Fixed metadata, e.g. from command-line overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata(pub EnvironmentMetadata);

impl MetadataSource for StaticMetadata {
    fn get(&self) -> EnvironmentMetadata {
        self.0.clone()
    }
}

/// Reads `app` and `platformName` from a Java-style properties file.
#[derive(Debug, Clone)]
pub struct PropertiesMetadata {
    path: PathBuf,
}

impl PropertiesMetadata {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MetadataSource for PropertiesMetadata {
    fn get(&self) -> EnvironmentMetadata {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    "Metadata file {} is not available ({}), using blank app and platform",
                    self.path.display(),
                    e
                );
                return EnvironmentMetadata::default();
            }
        };

        let mut props = parse_properties(&content);
        debug!("Loaded {} properties from {}", props.len(), self.path.display());

        EnvironmentMetadata {
            app: props.remove(APP_KEY).unwrap_or_default(),
            platform: props.remove(PLATFORM_KEY).unwrap_or_default(),
        }
    }
}

/// Overrides individual fields of another source.
pub struct OverrideMetadata<S> {
    inner: S,
    app: Option<String>,
    platform: Option<String>,
}

impl<S: MetadataSource> OverrideMetadata<S> {
    pub fn new(inner: S, app: Option<String>, platform: Option<String>) -> Self {
        Self {
            inner,
            app,
            platform,
        }
    }
}

impl<S: MetadataSource> MetadataSource for OverrideMetadata<S> {
    fn get(&self) -> EnvironmentMetadata {
        let mut metadata = self.inner.get();
        if let Some(ref app) = self.app {
            metadata.app = app.clone();
        }
        if let Some(ref platform) = self.platform {
            metadata.platform = platform.clone();
        }
        metadata
    }
}

/// Parse `key=value` / `key: value` / `key value` lines.
///
/// Lines starting with `#` or `!` are comments. Escapes and line
/// continuations are not interpreted.
pub fn parse_properties(content: &str) -> HashMap<String, String> {
    let mut props = HashMap::new();

    for line in content.lines() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let split_at = line.find(['=', ':', ' ', '\t']);
        let (key, value) = match split_at {
            Some(idx) => {
                let rest = line[idx..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                (&line[..idx], rest.trim_start())
            }
            None => (line, ""),
        };

        props.insert(key.to_string(), value.trim_end().to_string());
    }

    props
}
