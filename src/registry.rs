// 📚 Region Registry - Basic + comprehensive tiers behind one swappable snapshot
//
// Readers load an Arc<RegistrySnapshot> and never observe a half-built state.
// Reload builds a fresh snapshot off to the side and publishes it only on success.

use arc_swap::ArcSwap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::model::{FeedbackEntry, RegionRecord};

// ============================================================================
// LOAD ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No state data files found (looked for {comprehensive:?} and {basic:?})")]
    NotFound {
        comprehensive: PathBuf,
        basic: PathBuf,
    },

    #[error("Malformed data in {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// SOURCE + TIER
// ============================================================================

/// Where the dataset producers write their output
#[derive(Debug, Clone)]
pub struct RegistrySource {
    pub basic_path: PathBuf,
    pub comprehensive_path: PathBuf,
}

impl RegistrySource {
    /// Standard file names inside a data directory
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        RegistrySource {
            basic_path: dir.join("state-data.json"),
            comprehensive_path: dir.join("state-entries-data.json"),
        }
    }

    /// Read the comprehensive file if present, else the basic file
    pub fn load(&self) -> Result<RegistrySnapshot, LoadError> {
        if self.comprehensive_path.exists() {
            let regions = read_regions(&self.comprehensive_path)?;
            return Ok(RegistrySnapshot::from_comprehensive(regions));
        }

        if self.basic_path.exists() {
            let regions = read_regions(&self.basic_path)?;
            return Ok(RegistrySnapshot::from_basic(regions));
        }

        Err(LoadError::NotFound {
            comprehensive: self.comprehensive_path.clone(),
            basic: self.basic_path.clone(),
        })
    }
}

fn read_regions(path: &Path) -> Result<BTreeMap<String, RegionRecord>, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataTier {
    /// Nothing loaded yet
    Empty,
    /// One aggregate record per region
    Basic,
    /// Records carry their individual entries
    Comprehensive,
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Immutable view of both tiers. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    tier: DataTier,
    basic: BTreeMap<String, RegionRecord>,
    comprehensive: BTreeMap<String, RegionRecord>,
}

impl RegistrySnapshot {
    pub fn empty() -> Self {
        RegistrySnapshot {
            tier: DataTier::Empty,
            basic: BTreeMap::new(),
            comprehensive: BTreeMap::new(),
        }
    }

    pub fn from_basic(regions: BTreeMap<String, RegionRecord>) -> Self {
        let basic = prepare(regions);
        RegistrySnapshot {
            tier: if basic.is_empty() { DataTier::Empty } else { DataTier::Basic },
            basic,
            comprehensive: BTreeMap::new(),
        }
    }

    /// The basic view is derived by stripping entry collections
    pub fn from_comprehensive(regions: BTreeMap<String, RegionRecord>) -> Self {
        let comprehensive = prepare(regions);
        let basic = comprehensive
            .iter()
            .map(|(name, record)| (name.clone(), record.to_basic()))
            .collect::<BTreeMap<_, _>>();

        RegistrySnapshot {
            tier: if basic.is_empty() { DataTier::Empty } else { DataTier::Comprehensive },
            basic,
            comprehensive,
        }
    }

    pub fn tier(&self) -> DataTier {
        self.tier
    }

    pub fn is_loaded(&self) -> bool {
        !self.basic.is_empty()
    }

    pub fn has_comprehensive(&self) -> bool {
        !self.comprehensive.is_empty()
    }

    pub fn len(&self) -> usize {
        self.basic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.basic.is_empty()
    }

    /// Exact key lookup in the basic tier
    pub fn get(&self, name: &str) -> Option<&RegionRecord> {
        self.basic.get(name)
    }

    /// Exact key lookup in the comprehensive tier
    pub fn get_comprehensive(&self, name: &str) -> Option<&RegionRecord> {
        self.comprehensive.get(name)
    }

    /// Entries for a region; `None` when the comprehensive tier lacks them
    pub fn entries(&self, name: &str) -> Option<&[FeedbackEntry]> {
        self.comprehensive.get(name).and_then(|r| r.entry_slice())
    }

    /// Sorted region names
    pub fn keys(&self) -> Vec<String> {
        self.basic.keys().cloned().collect()
    }

    pub fn key_refs(&self) -> impl Iterator<Item = &str> {
        self.basic.keys().map(|k| k.as_str())
    }

    pub fn regions(&self) -> impl Iterator<Item = &RegionRecord> {
        self.basic.values()
    }

    pub fn comprehensive_regions(&self) -> impl Iterator<Item = &RegionRecord> {
        self.comprehensive.values()
    }

    pub fn total_entries(&self) -> usize {
        self.comprehensive
            .values()
            .filter_map(|r| r.entries.as_ref())
            .map(|e| e.len())
            .sum()
    }
}

/// Stamp each record with its key and restore score/rating consistency
fn prepare(regions: BTreeMap<String, RegionRecord>) -> BTreeMap<String, RegionRecord> {
    regions
        .into_iter()
        .map(|(name, mut record)| {
            record.name = name.clone();
            record.normalize();
            (name, record)
        })
        .collect()
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistryState {
    Loaded,
    Unloaded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadOutcome {
    pub success: bool,
    pub regions_loaded: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub healthy: bool,
    pub regions_loaded: usize,
    pub last_error: Option<String>,
}

pub struct RegionRegistry {
    source: Option<RegistrySource>,
    current: ArcSwap<RegistrySnapshot>,
    last_error: RwLock<Option<String>>,
    reload_lock: Mutex<()>,
}

impl RegionRegistry {
    /// Load from `source`. A failed initial load leaves the registry
    /// `Unloaded` with the error retained for health reporting.
    pub fn open(source: RegistrySource) -> Self {
        let registry = RegionRegistry {
            source: Some(source),
            current: ArcSwap::from_pointee(RegistrySnapshot::empty()),
            last_error: RwLock::new(None),
            reload_lock: Mutex::new(()),
        };

        let outcome = registry.reload();
        if !outcome.success {
            error!(
                "Initial data load failed: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        registry
    }

    /// Registry over a fixed snapshot with no backing files
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        RegionRegistry {
            source: None,
            current: ArcSwap::from_pointee(snapshot),
            last_error: RwLock::new(None),
            reload_lock: Mutex::new(()),
        }
    }

    /// Re-read the source and swap on success. On failure the previous
    /// snapshot stays active.
    pub fn reload(&self) -> ReloadOutcome {
        let _guard = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());

        let result = match &self.source {
            Some(source) => source.load().map_err(|e| e.to_string()),
            None => Err("Registry has no data source configured".to_string()),
        };

        match result {
            Ok(snapshot) => {
                info!(
                    tier = ?snapshot.tier(),
                    regions = snapshot.len(),
                    entries = snapshot.total_entries(),
                    "Loaded region data"
                );
                let regions_loaded = snapshot.len();
                self.current.store(Arc::new(snapshot));
                self.set_error(None);

                ReloadOutcome {
                    success: true,
                    regions_loaded,
                    error: None,
                }
            }
            Err(message) => {
                let regions_loaded = self.current.load().len();
                warn!(
                    error = %message,
                    kept_regions = regions_loaded,
                    "Data reload failed, keeping previous snapshot"
                );
                self.set_error(Some(message.clone()));

                ReloadOutcome {
                    success: false,
                    regions_loaded,
                    error: Some(message),
                }
            }
        }
    }

    fn set_error(&self, message: Option<String>) {
        let mut slot = self.last_error.write().unwrap_or_else(|e| e.into_inner());
        *slot = message;
    }

    /// Current snapshot. Cheap; holds no lock.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    pub fn get(&self, name: &str) -> Option<RegionRecord> {
        self.current.load().get(name).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.current.load().keys()
    }

    pub fn state(&self) -> RegistryState {
        if self.current.load().is_loaded() {
            RegistryState::Loaded
        } else {
            RegistryState::Unloaded
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Healthy iff at least one region is loaded and no load error is retained
    pub fn health(&self) -> HealthStatus {
        let regions_loaded = self.current.load().len();
        let last_error = self.last_error();

        HealthStatus {
            healthy: regions_loaded > 0 && last_error.is_none(),
            regions_loaded,
            last_error,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
