use async_trait::async_trait;
use crate::{Snapshot, ValuationError};

/// Persisted snapshot storage (one current snapshot per ticker)
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, ticker: &str) -> Result<Snapshot, ValuationError>;
    async fn save(&self, ticker: &str, snapshot: &Snapshot) -> Result<(), ValuationError>;
    async fn list_tickers(&self) -> Result<Vec<String>, ValuationError>;
}

/// Live market quotes. `Ok(None)` means no quote is available for the ticker.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn current_price(&self, ticker: &str) -> Result<Option<f64>, ValuationError>;
}
