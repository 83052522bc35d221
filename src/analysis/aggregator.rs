//! End-of-run report aggregation.
//!
//! Runs once after the last shard finishes: discover shard files, merge
//! them over the primary file, delete the rest, then write the summary
//! report and publish the notification payload.
//!
//! Every shard is loaded and validated before anything is written, so a
//! malformed shard leaves all inputs untouched. Shards are only deleted
//! after the merged report has been written.

use super::merger::{load_shards, merge_features};
use crate::errors::{AggregateError, AggregateResult};
use crate::metadata::MetadataSource;
use crate::models::{BuildOutcome, Feature, RunSummary};
use crate::notify::NotificationSink;
use crate::report::{generate_summary_json, NotificationPayload};
use crate::scanner::ShardScanner;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Write a file, creating missing parent directories.
///
/// The content goes to a temporary file next to `path`, which is then
/// renamed over it. A failed write leaves any existing file untouched.
pub fn write_file(path: &Path, content: &[u8]) -> AggregateResult<()> {
    replace_file(path, |file| file.write_all(content))
}

fn replace_file<F>(path: &Path, fill: F) -> AggregateResult<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let io_err = |source| AggregateError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(io_err)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    fill(temp.as_file_mut()).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;

    if let Ok(existing) = std::fs::metadata(path) {
        temp.as_file()
            .set_permissions(existing.permissions())
            .map_err(io_err)?;
    }

    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Result of an in-memory merge, before anything touches the disk.
#[derive(Debug, Clone)]
pub struct MergePreview {
    pub files: Vec<PathBuf>,
    pub features: Vec<Feature>,
    pub summary: RunSummary,
}

/// What a completed aggregation produced.
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    /// Shard file the merged report was written over.
    pub primary: PathBuf,
    pub deleted: Vec<PathBuf>,
    pub feature_count: usize,
    pub summary: RunSummary,
    pub outcome: BuildOutcome,
    pub payload: NotificationPayload,
}

/// Merges shard reports and produces the derived artifacts.
pub struct ReportAggregator {
    scanner: ShardScanner,
    summary_path: PathBuf,
}

impl ReportAggregator {
    pub fn new(scanner: ShardScanner, summary_path: PathBuf) -> Self {
        Self {
            scanner,
            summary_path,
        }
    }

    /// Discover, load and merge shards without writing or deleting anything.
    ///
    /// Returns `Ok(None)` when there are no shard files.
    pub fn preview(&self) -> AggregateResult<Option<MergePreview>> {
        let files = self.scanner.discover()?;
        if files.is_empty() {
            info!(
                "No shard reports in {}, nothing to merge",
                self.scanner.reports_dir().display()
            );
            return Ok(None);
        }

        let shards = load_shards(&files)?;
        let features = merge_features(shards.into_iter().map(|shard| {
            debug!("Merging {} features from {}", shard.features.len(), shard.path.display());
            shard.features
        }));
        let summary = RunSummary::from_features(&features);

        Ok(Some(MergePreview {
            files,
            features,
            summary,
        }))
    }

    /// Run the full aggregation.
    ///
    /// `outcome` is the suite result; when `None` it is inferred from the
    /// merged report. Returns `Ok(None)` when there are no shard files, in
    /// which case nothing is written.
    pub fn run(
        &self,
        outcome: Option<BuildOutcome>,
        metadata: &dyn MetadataSource,
        sink: &dyn NotificationSink,
    ) -> AggregateResult<Option<AggregationOutcome>> {
        let Some(preview) = self.preview()? else {
            return Ok(None);
        };
        let MergePreview {
            files,
            features,
            summary,
        } = preview;

        let primary = files[0].clone();
        let merged = serde_json::to_vec(&features)?;
        write_file(&primary, &merged)?;
        info!(
            "Merged {} shard reports into {} ({} features)",
            files.len(),
            primary.display(),
            features.len()
        );

        let deleted = delete_shards(&files[1..])?;

        let summary_json = generate_summary_json(&summary)?;
        write_file(&self.summary_path, summary_json.as_bytes())?;
        info!("Summary report written to {}", self.summary_path.display());

        let outcome = outcome.unwrap_or_else(|| summary.inferred_outcome());
        let payload = NotificationPayload::build(&summary, outcome, &metadata.get());
        sink.publish(&payload)?;

        Ok(Some(AggregationOutcome {
            primary,
            deleted,
            feature_count: features.len(),
            summary,
            outcome,
            payload,
        }))
    }
}

fn delete_shards(files: &[PathBuf]) -> AggregateResult<Vec<PathBuf>> {
    let mut deleted = Vec::with_capacity(files.len());

    for path in files {
        std::fs::remove_file(path).map_err(|source| AggregateError::Delete {
            path: path.clone(),
            source,
        })?;
        debug!("Deleted shard report {}", path.display());
        deleted.push(path.clone());
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EnvironmentMetadata, StaticMetadata};
    use crate::scanner::ScanConfig;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemorySink {
        published: RefCell<Vec<NotificationPayload>>,
    }

    impl NotificationSink for MemorySink {
        fn publish(&self, payload: &NotificationPayload) -> AggregateResult<()> {
            self.published.borrow_mut().push(payload.clone());
            Ok(())
        }
    }

    struct Fixture {
        temp_dir: TempDir,
        aggregator: ReportAggregator,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let reports = temp_dir.path().join("cucumber-reports");
            std::fs::create_dir(&reports).unwrap();

            let config = ScanConfig {
                sort_by_name: true,
                ..ScanConfig::default()
            };
            let aggregator = ReportAggregator::new(
                ShardScanner::new(reports, config),
                temp_dir.path().join("target").join("GitHubReport.json"),
            );
            Self {
                temp_dir,
                aggregator,
            }
        }

        fn shard(&self, name: &str, content: &str) -> PathBuf {
            let path = self.reports_dir().join(name);
            std::fs::write(&path, content).unwrap();
            path
        }

        fn reports_dir(&self) -> PathBuf {
            self.temp_dir.path().join("cucumber-reports")
        }

        fn summary_path(&self) -> PathBuf {
            self.temp_dir.path().join("target").join("GitHubReport.json")
        }

        fn remaining(&self) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(self.reports_dir())
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect();
            names.sort();
            names
        }

        fn run(&self, sink: &MemorySink) -> AggregateResult<Option<AggregationOutcome>> {
            let metadata = StaticMetadata(EnvironmentMetadata {
                app: "app.apk".to_string(),
                platform: "Android".to_string(),
            });
            self.aggregator.run(None, &metadata, sink)
        }
    }

    fn shard_json(id: &str, statuses: &[&str]) -> String {
        let steps: Vec<Value> = statuses
            .iter()
            .map(|s| json!({"name": "step", "result": {"status": s, "duration": 1_000_000}}))
            .collect();
        json!([{
            "id": id,
            "name": id,
            "uri": format!("features/{}.feature", id),
            "elements": [{"type": "scenario", "name": "s", "steps": steps}]
        }])
        .to_string()
    }

    #[test]
    fn test_merges_three_shards() {
        let fixture = Fixture::new();
        let primary = fixture.shard("a.json", &shard_json("login", &["passed"]));
        fixture.shard("b.json", &shard_json("login", &["passed", "failed"]));
        fixture.shard("c.json", &shard_json("search", &["passed"]));

        let sink = MemorySink::default();
        let outcome = fixture.run(&sink).unwrap().unwrap();

        assert_eq!(outcome.primary, primary);
        assert_eq!(outcome.deleted.len(), 2);
        assert_eq!(fixture.remaining(), vec!["a.json"]);

        let merged: Value =
            serde_json::from_str(&std::fs::read_to_string(&primary).unwrap()).unwrap();
        let features = merged.as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["id"], "login");
        assert_eq!(features[0]["elements"].as_array().unwrap().len(), 2);
        assert_eq!(features[0]["uri"], "features/login.feature");
        assert_eq!(features[1]["id"], "search");

        assert_eq!(outcome.summary.scenarios.failed, 1);
        assert_eq!(outcome.summary.features.failed, 1);
        assert_eq!(outcome.outcome, BuildOutcome::Failure);
        assert_eq!(sink.published.borrow().len(), 1);
        assert_eq!(sink.published.borrow()[0].attachments[0].color, "#FF0000");

        let summary: Value =
            serde_json::from_str(&std::fs::read_to_string(fixture.summary_path()).unwrap())
                .unwrap();
        assert_eq!(summary["features"]["totalFeatures"], 2);
        assert_eq!(summary["steps"]["totalSteps"], 4);
        assert_eq!(summary["durations"]["totalDuration"], "00:00:00.004");
    }

    #[test]
    fn test_single_shard_is_rewritten_unchanged() {
        let fixture = Fixture::new();
        let original = shard_json("login", &["passed", "skipped"]);
        let primary = fixture.shard("only.json", &original);

        let outcome = fixture.run(&MemorySink::default()).unwrap().unwrap();

        assert!(outcome.deleted.is_empty());
        let before: Value = serde_json::from_str(&original).unwrap();
        let after: Value =
            serde_json::from_str(&std::fs::read_to_string(&primary).unwrap()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_empty_directory_is_noop() {
        let fixture = Fixture::new();
        let sink = MemorySink::default();

        assert!(fixture.run(&sink).unwrap().is_none());
        assert!(!fixture.summary_path().exists());
        assert!(sink.published.borrow().is_empty());
    }

    #[test]
    fn test_malformed_shard_leaves_inputs_untouched() {
        let fixture = Fixture::new();
        let first = shard_json("login", &["passed"]);
        fixture.shard("a.json", &first);
        fixture.shard("b.json", &shard_json("search", &["passed"]));
        fixture.shard("c.json", "[{\"id\": \"broken\"");

        let sink = MemorySink::default();
        let err = fixture.run(&sink).unwrap_err();

        assert!(matches!(err, AggregateError::Parse { ref path, .. } if path.ends_with("c.json")));
        assert_eq!(fixture.remaining(), vec!["a.json", "b.json", "c.json"]);
        assert_eq!(
            std::fs::read_to_string(fixture.reports_dir().join("a.json")).unwrap(),
            first
        );
        assert!(!fixture.summary_path().exists());
        assert!(sink.published.borrow().is_empty());
    }

    #[test]
    fn test_wrong_shape_is_parse_failure() {
        let fixture = Fixture::new();
        fixture.shard("a.json", &shard_json("login", &["passed"]));
        fixture.shard("b.json", r#"[{"name": "no id"}]"#);

        let err = fixture.run(&MemorySink::default()).unwrap_err();
        assert!(matches!(err, AggregateError::Parse { .. }));
        assert_eq!(fixture.remaining().len(), 2);
    }

    #[test]
    fn test_explicit_outcome_wins() {
        let fixture = Fixture::new();
        fixture.shard("a.json", &shard_json("login", &["failed"]));

        let sink = MemorySink::default();
        let outcome = fixture
            .aggregator
            .run(
                Some(BuildOutcome::Success),
                &StaticMetadata::default(),
                &sink,
            )
            .unwrap()
            .unwrap();

        assert_eq!(outcome.outcome, BuildOutcome::Success);
        assert_eq!(sink.published.borrow()[0].attachments[0].color, "#00FF00");
    }

    #[test]
    fn test_preview_writes_nothing() {
        let fixture = Fixture::new();
        let original = shard_json("login", &["passed"]);
        fixture.shard("a.json", &original);
        fixture.shard("b.json", &shard_json("login", &["passed"]));

        let preview = fixture.aggregator.preview().unwrap().unwrap();

        assert_eq!(preview.files.len(), 2);
        assert_eq!(preview.features[0].elements.len(), 2);
        assert_eq!(preview.summary.scenarios.passed, 2);
        assert_eq!(fixture.remaining(), vec!["a.json", "b.json"]);
        assert_eq!(
            std::fs::read_to_string(fixture.reports_dir().join("a.json")).unwrap(),
            original
        );
        assert!(!fixture.summary_path().exists());
    }

    #[test]
    fn test_write_file_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("out.json");
        write_file(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_failed_write_keeps_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.json");
        let original = shard_json("login", &["passed"]);
        std::fs::write(&path, &original).unwrap();

        let err = replace_file(&path, |file| {
            file.write_all(b"[{\"id\": \"login\", \"elem")?;
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        })
        .unwrap_err();

        assert!(matches!(err, AggregateError::Write { ref path, .. } if path.ends_with("a.json")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_file_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        write_file(&path, b"[]").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_shard_is_merged_and_unlinked() {
        let fixture = Fixture::new();
        let primary = fixture.shard("a.json", &shard_json("login", &["passed"]));
        let target = fixture.temp_dir.path().join("shard-b.json");
        std::fs::write(&target, shard_json("search", &["failed"])).unwrap();
        std::os::unix::fs::symlink(&target, fixture.reports_dir().join("b.json")).unwrap();

        let outcome = fixture.run(&MemorySink::default()).unwrap().unwrap();

        assert_eq!(outcome.feature_count, 2);
        assert_eq!(fixture.remaining(), vec!["a.json"]);
        assert!(target.exists());
        let merged: Value =
            serde_json::from_str(&std::fs::read_to_string(&primary).unwrap()).unwrap();
        assert_eq!(merged[1]["id"], "search");
    }
}
