use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use valuation_core::{Snapshot, SnapshotStore, ValuationError};

/// One current snapshot per ticker, stored as `<dir>/<TICKER>.json`
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ticker: &str) -> Result<PathBuf, ValuationError> {
        let ticker = ticker.trim().to_uppercase();
        let safe = !ticker.is_empty()
            && ticker
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            && !ticker.starts_with('.');
        if !safe {
            return Err(ValuationError::Storage(format!("invalid ticker: {:?}", ticker)));
        }
        Ok(self.dir.join(format!("{}.json", ticker)))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self, ticker: &str) -> Result<Snapshot, ValuationError> {
        let path = self.path_for(ticker)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ValuationError::SnapshotNotFound(ticker.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| ValuationError::Parse(format!("{}: {}", path.display(), e)))
    }

    async fn save(&self, ticker: &str, snapshot: &Snapshot) -> Result<(), ValuationError> {
        let path = self.path_for(ticker)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write then rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(ticker, path = %path.display(), "snapshot saved");
        Ok(())
    }

    async fn list_tickers(&self) -> Result<Vec<String>, ValuationError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tickers = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                tickers.push(stem.to_uppercase());
            }
        }
        tickers.sort();
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valuation_core::{Assumptions, CompanyInfo};

    fn snapshot(symbol: &str) -> Snapshot {
        Snapshot {
            annual_data: Vec::new(),
            assumptions: Assumptions {
                current_price: 31.5,
                ..Assumptions::neutral(2024)
            },
            company_info: CompanyInfo {
                symbol: symbol.to_string(),
                name: format!("{} Corp", symbol),
                ..Default::default()
            },
            snapshot_date: "2025-03-01".to_string(),
            is_current: true,
            auto_fetched: true,
        }
    }

    #[tokio::test]
    async fn test_save_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("snaps"));

        assert!(store.list_tickers().await.unwrap().is_empty());

        store.save("ry.to", &snapshot("RY.TO")).await.unwrap();
        store.save("BCE", &snapshot("BCE")).await.unwrap();

        let loaded = store.load("RY.TO").await.unwrap();
        assert_eq!(loaded, snapshot("RY.TO"));
        assert_eq!(store.list_tickers().await.unwrap(), vec!["BCE", "RY.TO"]);
    }

    #[tokio::test]
    async fn test_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        match store.load("NOPE").await {
            Err(ValuationError::SnapshotNotFound(t)) => assert_eq!(t, "NOPE"),
            other => panic!("expected SnapshotNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BAD.json"), b"{not json").unwrap();
        let store = FileSnapshotStore::new(dir.path());
        assert!(matches!(store.load("BAD").await, Err(ValuationError::Parse(_))));
    }

    #[tokio::test]
    async fn test_rejects_path_like_tickers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        assert!(matches!(store.load("../etc").await, Err(ValuationError::Storage(_))));
        assert!(matches!(store.load("  ").await, Err(ValuationError::Storage(_))));
    }
}
