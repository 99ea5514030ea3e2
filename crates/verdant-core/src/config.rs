use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// In-memory cap on records awaiting a storage flush. Oldest entries are
/// dropped beyond this so a prolonged outage cannot grow memory unboundedly.
pub const PENDING_CAP: usize = 10_000;

/// Top-level config (verdant.toml + VERDANT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VerdantConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Path to the hot-reloaded jobs file (JSON).
    #[serde(default = "default_jobs_path")]
    pub jobs_path: String,
    /// Tick cadence in seconds.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Test mode: every job runs one second after it is first seen,
    /// ignoring its cron expression.
    #[serde(default)]
    pub disable_cron: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            jobs_path: default_jobs_path(),
            tick_secs: default_tick_secs(),
            disable_cron: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// SQLite database file, created on first open.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    /// Connection URL for the postgres backend.
    pub postgres_url: Option<String>,
    /// Prefix for per-sensor tables: `{prefix}_{sensor_id}`.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// Directory for the plain-text append/latest log files.
    /// `None` disables the text sink.
    pub text_log_dir: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            sqlite_path: default_sqlite_path(),
            postgres_url: None,
            table_prefix: default_table_prefix(),
            text_log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Postgres,
}

impl VerdantConfig {
    /// Load config from a TOML file with VERDANT_* env var overrides.
    ///
    /// Missing files are fine: every section has defaults, so a bare
    /// `VerdantConfig::load(None)` yields a runnable sqlite setup.
    pub fn load(config_path: Option<&str>) -> Result<Self, figment::Error> {
        let path = config_path.unwrap_or("verdant.toml");
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("VERDANT_").split("__"))
            .extract()
    }
}

fn default_jobs_path() -> String {
    "jobs.json".to_string()
}

fn default_tick_secs() -> u64 {
    1
}

fn default_sqlite_path() -> String {
    "data/verdant.db".to_string()
}

fn default_table_prefix() -> String {
    "data".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_runnable() {
        let config = VerdantConfig::default();
        assert_eq!(config.scheduler.jobs_path, "jobs.json");
        assert_eq!(config.scheduler.tick_secs, 1);
        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert_eq!(config.storage.table_prefix, "data");
        assert!(!config.scheduler.disable_cron);
    }
}
