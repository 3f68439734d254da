// 🗄️ Snapshot Store - Precomputed response bodies written by the pre-renderer
//
// Layout under the snapshot root mirrors the API paths:
//   satisfaction-overall.json
//   satisfaction-states.json
//   satisfaction/state/<name>.json
//   state/<name>/entries.json
//   state/<name>/statistics.json
//   entries-all.json
//   states-list.json
//   reviews.json
//
// Region names are URL-encoded in paths. Files are read on every request so a
// fresh pre-render shows up without a restart.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotKey<'a> {
    Overall,
    AllRegions,
    Region(&'a str),
    RegionEntries(&'a str),
    RegionStatistics(&'a str),
    AllEntries,
    RegionList,
    Reviews,
}

impl SnapshotKey<'_> {
    /// Path relative to the snapshot root
    pub fn relative_path(&self) -> PathBuf {
        match self {
            SnapshotKey::Overall => PathBuf::from("satisfaction-overall.json"),
            SnapshotKey::AllRegions => PathBuf::from("satisfaction-states.json"),
            SnapshotKey::Region(name) => Path::new("satisfaction")
                .join("state")
                .join(format!("{}.json", urlencoding::encode(name))),
            SnapshotKey::RegionEntries(name) => Path::new("state")
                .join(urlencoding::encode(name).into_owned())
                .join("entries.json"),
            SnapshotKey::RegionStatistics(name) => Path::new("state")
                .join(urlencoding::encode(name).into_owned())
                .join("statistics.json"),
            SnapshotKey::AllEntries => PathBuf::from("entries-all.json"),
            SnapshotKey::RegionList => PathBuf::from("states-list.json"),
            SnapshotKey::Reviews => PathBuf::from("reviews.json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: Option<PathBuf>,
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        SnapshotStore {
            root: Some(root.into()),
        }
    }

    /// Store that never has a snapshot
    pub fn disabled() -> Self {
        SnapshotStore { root: None }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Parsed snapshot for `key`. Missing or unreadable files yield `None`;
    /// malformed ones are logged and skipped so the live path can answer.
    pub fn fetch(&self, key: &SnapshotKey<'_>) -> Option<Value> {
        let root = self.root.as_ref()?;
        let name = key.relative_path();

        // Encoded names never contain separators, but reject anything that
        // would climb out of the root
        if name.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return None;
        }

        let path = root.join(&name);
        if !path.is_file() {
            return None;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read snapshot");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => {
                debug!(path = %path.display(), "Serving precomputed snapshot");
                Some(value)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed snapshot");
                None
            }
        }
    }
}

// ============================================================================
// LIMIT RE-APPLICATION
// ============================================================================

/// Truncate a paginated entry snapshot to `limit`, keeping its metadata honest
pub fn truncate_entries(snapshot: &mut Value, limit: usize) {
    let Some(entries) = snapshot.get_mut("entries").and_then(Value::as_array_mut) else {
        return;
    };
    entries.truncate(limit);

    if let Some(pagination) = snapshot.get_mut("pagination").and_then(Value::as_object_mut) {
        let total = pagination.get("total").and_then(Value::as_u64).unwrap_or(0);
        pagination.insert("limit".to_string(), Value::from(limit));
        pagination.insert("hasMore".to_string(), Value::from(total > limit as u64));
    }
}

/// Truncate a reviews snapshot when it holds at least `limit` reviews
pub fn truncate_reviews(snapshot: &mut Value, limit: usize) {
    let Some(reviews) = snapshot.get_mut("reviews").and_then(Value::as_array_mut) else {
        return;
    };
    if reviews.len() <= limit {
        return;
    }
    reviews.truncate(limit);
    snapshot["total"] = Value::from(limit);
}

// ============================================================================
// TESTS
// ============================================================================
