use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use valuation_core::ValuationError;

/// Ranges the sanitizer clamps assumptions into. Growth values are percentages,
/// the yield bounds are percent too.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SanitizerBounds {
    pub growth_min: f64,
    pub growth_max: f64,
    /// Upper bound for targetPE and targetPCF (lower bound is exclusive 0)
    pub ratio_max: f64,
    pub pbv_min: f64,
    pub pbv_max: f64,
    pub yield_min: f64,
    pub yield_max: f64,
}

impl Default for SanitizerBounds {
    fn default() -> Self {
        Self {
            growth_min: -50.0,
            growth_max: 50.0,
            ratio_max: 100.0,
            pbv_min: 0.5,
            pbv_max: 50.0,
            yield_min: 0.1,
            yield_max: 20.0,
        }
    }
}

fn env_f64(key: &str, default: f64) -> Result<f64> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl SanitizerBounds {
    /// Defaults overridden by the `SANITIZE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let bounds = Self {
            growth_min: env_f64("SANITIZE_GROWTH_MIN", defaults.growth_min)?,
            growth_max: env_f64("SANITIZE_GROWTH_MAX", defaults.growth_max)?,
            ratio_max: env_f64("SANITIZE_RATIO_MAX", defaults.ratio_max)?,
            pbv_min: env_f64("SANITIZE_PBV_MIN", defaults.pbv_min)?,
            pbv_max: env_f64("SANITIZE_PBV_MAX", defaults.pbv_max)?,
            yield_min: env_f64("SANITIZE_YIELD_MIN", defaults.yield_min)?,
            yield_max: env_f64("SANITIZE_YIELD_MAX", defaults.yield_max)?,
        };
        bounds.check()?;
        Ok(bounds)
    }

    pub fn check(&self) -> Result<()> {
        let ranges = [
            ("growth", self.growth_min, self.growth_max),
            ("ratio", 0.0, self.ratio_max),
            ("pbv", self.pbv_min, self.pbv_max),
            ("yield", self.yield_min, self.yield_max),
        ];
        for (name, min, max) in ranges {
            if !min.is_finite() || !max.is_finite() || min >= max {
                bail!("invalid {} bounds: min {} must be below max {}", name, min, max);
            }
        }
        if self.pbv_min <= 0.0 || self.yield_min <= 0.0 {
            bail!("pbv and yield lower bounds must be positive");
        }
        Ok(())
    }
}

/// Source of sanitizer bounds (settings table, env, fixed values)
#[async_trait]
pub trait BoundsProvider: Send + Sync {
    async fn bounds(&self) -> Result<SanitizerBounds, ValuationError>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticBounds(pub SanitizerBounds);

impl StaticBounds {
    pub fn from_env() -> Result<Self> {
        Ok(Self(SanitizerBounds::from_env()?))
    }
}

#[async_trait]
impl BoundsProvider for StaticBounds {
    async fn bounds(&self) -> Result<SanitizerBounds, ValuationError> {
        Ok(self.0)
    }
}

/// Caches another provider's bounds for `ttl`. Failed lookups are not cached.
pub struct CachedBoundsProvider<P> {
    inner: P,
    ttl: Duration,
    cache: RwLock<Option<(Instant, SanitizerBounds)>>,
}

impl<P: BoundsProvider> CachedBoundsProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(None),
        }
    }

    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

#[async_trait]
impl<P: BoundsProvider> BoundsProvider for CachedBoundsProvider<P> {
    async fn bounds(&self) -> Result<SanitizerBounds, ValuationError> {
        if let Some((fetched_at, bounds)) = *self.cache.read().await {
            if fetched_at.elapsed() < self.ttl {
                return Ok(bounds);
            }
        }

        let bounds = self.inner.bounds().await?;
        *self.cache.write().await = Some((Instant::now(), bounds));
        tracing::debug!(?bounds, "refreshed sanitizer bounds");
        Ok(bounds)
    }
}
