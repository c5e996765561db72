use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use validation::{CachedBoundsProvider, SanitizerBounds, StaticBounds};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub snapshot_dir: PathBuf,           // snapshots
    pub concurrency: usize,              // 16
    pub bounds_cache_ttl_secs: u64,      // 300 (5 minutes)
    pub bounds: SanitizerBounds,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("snapshots"),
            concurrency: 16,
            bounds_cache_ttl_secs: 300,
            bounds: SanitizerBounds::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            snapshot_dir: env::var("SNAPSHOT_DIR")
                .unwrap_or_else(|_| "snapshots".to_string())
                .into(),
            concurrency: env::var("AUDIT_CONCURRENCY")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .context("AUDIT_CONCURRENCY must be a positive integer")?,
            bounds_cache_ttl_secs: env::var("BOUNDS_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("BOUNDS_CACHE_TTL_SECS must be a number of seconds")?,
            bounds: SanitizerBounds::from_env()?,
        };

        if config.concurrency == 0 {
            anyhow::bail!("AUDIT_CONCURRENCY must be at least 1");
        }

        Ok(config)
    }

    pub fn bounds_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.bounds_cache_ttl_secs)
    }

    /// Configured bounds behind the settings cache
    pub fn bounds_provider(&self) -> CachedBoundsProvider<StaticBounds> {
        CachedBoundsProvider::new(StaticBounds(self.bounds), self.bounds_cache_ttl())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validation::BoundsProvider;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.snapshot_dir, PathBuf::from("snapshots"));
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.bounds_cache_ttl(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_bounds_provider_serves_configured_bounds() {
        let config = OrchestratorConfig {
            bounds: SanitizerBounds {
                growth_max: 20.0,
                ..SanitizerBounds::default()
            },
            ..OrchestratorConfig::default()
        };
        let bounds = config.bounds_provider().bounds().await.unwrap();
        assert_eq!(bounds.growth_max, 20.0);
    }
}
