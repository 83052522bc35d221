//! Shard report discovery.
//!
//! Lists the per-shard Cucumber JSON files in the reports directory.
//! The first file returned is the primary one that the merged report
//! is written over.

use crate::errors::{AggregateError, AggregateResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for shard discovery.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Extension of shard files, without the dot.
    pub extension: String,
    /// Sort by file name instead of keeping the listing order.
    pub sort_by_name: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            sort_by_name: false,
        }
    }
}

impl From<&crate::config::ReportsConfig> for ScanConfig {
    fn from(config: &crate::config::ReportsConfig) -> Self {
        Self {
            extension: config.extension.clone(),
            sort_by_name: config.sort_by_name,
        }
    }
}

/// Finds shard report files in one directory (not recursive).
pub struct ShardScanner {
    config: ScanConfig,
    reports_dir: PathBuf,
}

impl ShardScanner {
    pub fn new(reports_dir: PathBuf, config: ScanConfig) -> Self {
        Self {
            config,
            reports_dir,
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Discover shard files.
    ///
    /// A missing directory yields an empty list, like an empty one.
    pub fn discover(&self) -> AggregateResult<Vec<PathBuf>> {
        if !self.reports_dir.is_dir() {
            warn!(
                "Reports directory not found: {}",
                self.reports_dir.display()
            );
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        // Symlinked shards count as files.
        let mut walker = WalkDir::new(&self.reports_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);
        if self.config.sort_by_name {
            walker = walker.sort_by_file_name();
        }

        for entry in walker {
            let entry = entry.map_err(|source| AggregateError::Discovery {
                path: self.reports_dir.clone(),
                source,
            })?;

            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }

        debug!(
            "Discovered {} shard reports in {}",
            files.len(),
            self.reports_dir.display()
        );
        Ok(files)
    }

    /// Check whether a file name ends with the shard extension.
    pub fn matches(&self, path: &Path) -> bool {
        let suffix = format!(".{}", self.config.extension);
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(&suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_filters_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("shard-1.json"), "[]").unwrap();
        std::fs::write(temp_dir.path().join("shard-2.json"), "[]").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(temp_dir.path().join("shard.json.bak"), "[]").unwrap();
        std::fs::create_dir(temp_dir.path().join("nested.json")).unwrap();
        std::fs::write(temp_dir.path().join("nested.json").join("inner.json"), "[]").unwrap();

        let scanner = ShardScanner::new(temp_dir.path().to_path_buf(), ScanConfig::default());
        let mut names: Vec<String> = scanner
            .discover()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();

        assert_eq!(names, vec!["shard-1.json", "shard-2.json"]);
    }

    #[test]
    fn test_discover_sorted() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["c.json", "a.json", "b.json"] {
            std::fs::write(temp_dir.path().join(name), "[]").unwrap();
        }

        let config = ScanConfig {
            sort_by_name: true,
            ..ScanConfig::default()
        };
        let scanner = ShardScanner::new(temp_dir.path().to_path_buf(), config);
        let files = scanner.discover().unwrap();

        assert_eq!(files[0].file_name().unwrap(), "a.json");
        assert_eq!(files[2].file_name().unwrap(), "c.json");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = ShardScanner::new(temp_dir.path().join("absent"), ScanConfig::default());
        assert!(scanner.discover().unwrap().is_empty());
    }

    #[test]
    fn test_custom_extension() {
        let config = ScanConfig {
            extension: "cucumber".to_string(),
            sort_by_name: false,
        };
        let scanner = ShardScanner::new(PathBuf::from("."), config);
        assert!(scanner.matches(Path::new("run.cucumber")));
        assert!(!scanner.matches(Path::new("run.json")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_shard_is_discovered() {
        let temp_dir = TempDir::new().unwrap();
        let reports = temp_dir.path().join("reports");
        std::fs::create_dir(&reports).unwrap();
        std::fs::write(reports.join("a.json"), "[]").unwrap();

        let target = temp_dir.path().join("shard-b-output.json");
        std::fs::write(&target, "[]").unwrap();
        std::os::unix::fs::symlink(&target, reports.join("b.json")).unwrap();

        let config = ScanConfig {
            sort_by_name: true,
            ..ScanConfig::default()
        };
        let files = ShardScanner::new(reports.clone(), config).discover().unwrap();

        assert_eq!(files, vec![reports.join("a.json"), reports.join("b.json")]);
    }
}
