//! Engine Configuration
//!
//! JSON-file configuration with environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::analysis::{ALL_DISPLAY_CAP, DEFAULT_CUSTOM_COUNT};
use crate::cache::CacheTtls;
use crate::client::RetryPolicy;
use crate::error::{EngineError, EngineResult};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8001/api/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub retry: RetryPolicy,
    pub cache_ttl: CacheTtls,
    /// Where session snapshots persist. In-memory only when unset.
    pub session_store_path: Option<PathBuf>,
    /// Seed for 6D to 47D synthesis jitter. Entropy-seeded when unset.
    pub jitter_seed: Option<u64>,
    pub display_cap: usize,
    pub default_custom_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: 30_000,
            retry: RetryPolicy::default(),
            cache_ttl: CacheTtls::default(),
            session_store_path: None,
            jitter_seed: None,
            display_cap: ALL_DISPLAY_CAP,
            default_custom_count: DEFAULT_CUSTOM_COUNT,
        }
    }
}

impl EngineConfig {
    /// Read a config file. A missing file yields the defaults.
    pub async fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Defaults with `VULCA_*` environment overrides applied
    pub fn from_env() -> EngineResult<Self> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> EngineResult<Self> {
        dotenv::dotenv().ok();

        if let Ok(url) = std::env::var("VULCA_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(path) = std::env::var("VULCA_SESSION_PATH") {
            self.session_store_path = Some(PathBuf::from(path));
        }
        if let Ok(seed) = std::env::var("VULCA_JITTER_SEED") {
            let seed = seed
                .trim()
                .parse::<u64>()
                .map_err(|e| EngineError::Config(format!("VULCA_JITTER_SEED '{}': {}", seed, e)))?;
            self.jitter_seed = Some(seed);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(EngineError::Config("api_base_url must not be empty".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(EngineError::Config("request_timeout_ms must be positive".into()));
        }
        if self.display_cap == 0 {
            return Err(EngineError::Config("display_cap must be positive".into()));
        }
        let problems = self.cache_ttl.validate();
        if !problems.is_empty() {
            return Err(EngineError::Config(format!("cache_ttl: {}", problems.join("; "))));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vulca.json");

        let config = EngineConfig::load(&path).await.unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"jitter_seed": 7, "retry": {"max_attempts": 5}}"#).unwrap();

        let config = EngineConfig::load(file.path()).await.unwrap();
        assert_eq!(config.jitter_seed, Some(7));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.cache_ttl.dimension_catalog_secs, 1800);
        assert_eq!(config.display_cap, 25);
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let config = EngineConfig { api_base_url: "https://vulca.example/api".into(), ..Default::default() };
        config.save(file.path()).await.unwrap();
        assert_eq!(EngineConfig::load(file.path()).await.unwrap(), config);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = EngineConfig { request_timeout_ms: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_cache_settings() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"cache_ttl": {"comparisons_secs": 1000000000000000}}"#).unwrap();
        match EngineConfig::load(file.path()).await {
            Err(EngineError::Config(msg)) => assert!(msg.contains("comparisons"), "{}", msg),
            other => panic!("expected config error, got {:?}", other),
        }

        let mut config = EngineConfig::default();
        config.cache_ttl.max_entries = 0;
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));

        config.cache_ttl.max_entries = 1;
        config.cache_ttl.evaluations_secs = crate::cache::MAX_TTL_SECS;
        assert!(config.validate().is_ok());
    }
}
