use std::path::PathBuf;

pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;

const WAL_FILE_NAME: &str = "reservations.wal";

/// Runtime settings, read from `COURTSIDE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the WAL. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// WAL appends before the log is rewritten as a snapshot. 0 disables compaction.
    pub compact_threshold: u64,
    /// Port for the Prometheus exporter, installed by
    /// `observability::init_from_config`. `None` disables it.
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("COURTSIDE_DATA_DIR")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        let compact_threshold = lookup("COURTSIDE_COMPACT_THRESHOLD")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_COMPACT_THRESHOLD);
        let metrics_port = lookup("COURTSIDE_METRICS_PORT").and_then(|s| s.parse().ok());
        Self {
            data_dir,
            compact_threshold,
            metrics_port,
        }
    }

    pub fn wal_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(WAL_FILE_NAME))
    }
}
