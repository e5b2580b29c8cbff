use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::storage::{JsonFileLedgerStore, LedgerStore, MemoryLedgerStore, SqliteLedgerStore};
use crate::tracker::{ServiceLimits, ASSISTANT_SERVICE, SEARCH_SERVICE, WEATHER_SERVICE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Json,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreKind::Sqlite),
            "json" | "file" => Ok(StoreKind::Json),
            "memory" => Ok(StoreKind::Memory),
            _ => anyhow::bail!("unsupported ledger store {s:?} (expected sqlite, json or memory)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuotaTrackerConfig {
    pub data_dir: PathBuf,
    pub store: StoreKind,
    pub assistant_daily_limit: u64,
    pub weather_daily_limit: u64,
    pub search_daily_limit: u64,
}

impl Default for QuotaTrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/quota"),
            store: StoreKind::Sqlite,
            assistant_daily_limit: 50,
            weather_daily_limit: 20,
            search_daily_limit: 30,
        }
    }
}

impl QuotaTrackerConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(dir) = env::var("QUOTA_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(kind) = env::var("QUOTA_STORE") {
            cfg.store = kind.parse()?;
        }
        if let Ok(limit) = env::var("QUOTA_ASSISTANT_DAILY_LIMIT") {
            cfg.assistant_daily_limit = limit
                .parse()
                .context("QUOTA_ASSISTANT_DAILY_LIMIT must be a non-negative integer")?;
        }
        if let Ok(limit) = env::var("QUOTA_WEATHER_DAILY_LIMIT") {
            cfg.weather_daily_limit = limit
                .parse()
                .context("QUOTA_WEATHER_DAILY_LIMIT must be a non-negative integer")?;
        }
        if let Ok(limit) = env::var("QUOTA_SEARCH_DAILY_LIMIT") {
            cfg.search_daily_limit = limit
                .parse()
                .context("QUOTA_SEARCH_DAILY_LIMIT must be a non-negative integer")?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store != StoreKind::Memory {
            ensure_directory(&self.data_dir)?;
        }
        Ok(())
    }

    pub fn limits(&self) -> ServiceLimits {
        ServiceLimits::new()
            .with_limit(ASSISTANT_SERVICE, self.assistant_daily_limit)
            .with_limit(WEATHER_SERVICE, self.weather_daily_limit)
            .with_limit(SEARCH_SERVICE, self.search_daily_limit)
    }

    pub fn open_store(&self) -> Result<Arc<dyn LedgerStore>> {
        let store: Arc<dyn LedgerStore> = match self.store {
            StoreKind::Sqlite => Arc::new(
                SqliteLedgerStore::new(&self.data_dir)
                    .with_context(|| {
                        format!("unable to open ledger in {}", self.data_dir.display())
                    })?,
            ),
            StoreKind::Json => Arc::new(
                JsonFileLedgerStore::new(&self.data_dir)
                    .with_context(|| {
                        format!("unable to open ledger in {}", self.data_dir.display())
                    })?,
            ),
            StoreKind::Memory => Arc::new(MemoryLedgerStore::new()),
        };
        Ok(store)
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("{} exists but is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("unable to create data directory {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_from_str() {
        assert_eq!("sqlite".parse::<StoreKind>().unwrap(), StoreKind::Sqlite);
        assert_eq!("JSON".parse::<StoreKind>().unwrap(), StoreKind::Json);
        assert_eq!("memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert!("redis".parse::<StoreKind>().is_err());
    }

    #[test]
    fn default_limits_cover_the_three_services() {
        let limits = QuotaTrackerConfig::default().limits();
        assert_eq!(limits.get(ASSISTANT_SERVICE), Some(50));
        assert_eq!(limits.get(WEATHER_SERVICE), Some(20));
        assert_eq!(limits.get(SEARCH_SERVICE), Some(30));
        assert_eq!(limits.len(), 3);
    }

    #[test]
    fn data_dir_that_is_a_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let cfg = QuotaTrackerConfig {
            data_dir: file.path().to_path_buf(),
            ..QuotaTrackerConfig::default()
        };
        assert!(cfg.validate().is_err());

        let in_memory = QuotaTrackerConfig {
            store: StoreKind::Memory,
            ..cfg
        };
        assert!(in_memory.validate().is_ok());
    }
}
