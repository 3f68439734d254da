// ⚙️ Configuration - Environment variables with logged defaults

use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::registry::RegistrySource;
use crate::snapshots::SnapshotStore;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Directory holding state-data.json / state-entries-data.json
    pub data_dir: PathBuf,
    pub snapshot_dir: PathBuf,
    pub snapshots_enabled: bool,
}

impl Config {
    pub fn load() -> Self {
        let data_dir = load_path("SATISFACTION_DATA_DIR", PathBuf::from("."));

        Self {
            port: try_load("SATISFACTION_PORT", DEFAULT_PORT),
            snapshot_dir: load_path("SATISFACTION_SNAPSHOT_DIR", data_dir.join("api")),
            snapshots_enabled: try_load("SATISFACTION_SNAPSHOTS", true),
            data_dir,
        }
    }

    /// Config rooted at `data_dir` with snapshots under `<data_dir>/api`
    pub fn for_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        let data_dir = data_dir.into();
        Self {
            port: DEFAULT_PORT,
            snapshot_dir: data_dir.join("api"),
            snapshots_enabled: true,
            data_dir,
        }
    }

    pub fn registry_source(&self) -> RegistrySource {
        RegistrySource::in_dir(&self.data_dir)
    }

    pub fn snapshot_store(&self) -> SnapshotStore {
        if self.snapshots_enabled {
            SnapshotStore::new(self.snapshot_dir.clone())
        } else {
            SnapshotStore::disabled()
        }
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

fn load_path(key: &str, default: PathBuf) -> PathBuf {
    match env::var_os(key) {
        Some(raw) if !raw.is_empty() => PathBuf::from(raw),
        _ => {
            info!("{key} not set, using default: {}", default.display());
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_dir_defaults() {
        let config = Config::for_dir("/srv/satisfaction");
        assert_eq!(config.port, 3000);
        assert_eq!(config.snapshot_dir, PathBuf::from("/srv/satisfaction/api"));
        assert_eq!(
            config.registry_source().basic_path,
            PathBuf::from("/srv/satisfaction/state-data.json")
        );
        assert!(config.snapshot_store().root().is_some());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_snapshots_can_be_disabled() {
        let config = Config {
            snapshots_enabled: false,
            ..Config::for_dir(".")
        };
        assert!(config.snapshot_store().root().is_none());
    }

    #[test]
    fn test_try_load_falls_back_on_garbage() {
        env::set_var("SATISFACTION_TEST_PORT_GARBAGE", "not-a-port");
        let port: u16 = try_load("SATISFACTION_TEST_PORT_GARBAGE", 3000);
        assert_eq!(port, 3000);

        env::set_var("SATISFACTION_TEST_PORT_SET", " 8080 ");
        let port: u16 = try_load("SATISFACTION_TEST_PORT_SET", 3000);
        assert_eq!(port, 8080);

        let flag: bool = try_load("SATISFACTION_TEST_UNSET_FLAG", true);
        assert!(flag);

        let dir = load_path("SATISFACTION_TEST_UNSET_DIR", PathBuf::from("/data"));
        assert_eq!(dir, PathBuf::from("/data"));
    }
}
