use async_trait::async_trait;
use fundamental_analysis::{Valuation, ValuationEngine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use validation::{
    generate_data_quality_report, sanitize_assumptions_async, validate_profile, validate_real_data,
    BoundsProvider, DataQualityReport, SanitizedAssumptions,
};
use valuation_core::{
    Metric, QuoteProvider, SnapshotStore, ValidationOutcome, ValidationResult, ValuationError,
};

pub mod config;
pub mod file_store;

pub use config::OrchestratorConfig;
pub use file_store::FileSnapshotStore;

/// Quote provider for offline runs: never has a live price
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQuotes;

#[async_trait]
impl QuoteProvider for NoQuotes {
    async fn current_price(&self, _ticker: &str) -> Result<Option<f64>, ValuationError> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Live,
    Stored,
}

/// Full evaluation of one stored profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileReport {
    pub ticker: String,
    pub price_source: PriceSource,
    /// Sanitized assumptions with the detector's exclusion flags applied
    pub sanitized: SanitizedAssumptions,
    pub validation: ValidationResult,
    pub outcome: ValidationOutcome,
    pub quality: DataQualityReport,
    pub valuation: Valuation,
}

impl ProfileReport {
    /// Metrics newly excluded by this evaluation
    pub fn auto_excluded(&self) -> &[Metric] {
        &self.valuation.decision.detected_outliers
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProfileOutcome {
    Evaluated(Box<ProfileReport>),
    Unavailable { ticker: String, reason: String },
}

impl ProfileOutcome {
    pub fn ticker(&self) -> &str {
        match self {
            ProfileOutcome::Evaluated(report) => &report.ticker,
            ProfileOutcome::Unavailable { ticker, .. } => ticker,
        }
    }
}

/// Per-ticker pipeline: load, price, sanitize, validate, value.
pub struct ProfileOrchestrator {
    store: Arc<dyn SnapshotStore>,
    quotes: Arc<dyn QuoteProvider>,
    bounds: Arc<dyn BoundsProvider>,
    engine: ValuationEngine,
}

impl ProfileOrchestrator {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        quotes: Arc<dyn QuoteProvider>,
        bounds: Arc<dyn BoundsProvider>,
    ) -> Self {
        Self {
            store,
            quotes,
            bounds,
            engine: ValuationEngine::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    pub async fn evaluate_ticker(&self, ticker: &str) -> Result<ProfileReport, ValuationError> {
        let snapshot = self.store.load(ticker).await?;
        if snapshot.annual_data.is_empty() {
            return Err(ValuationError::InsufficientData(format!(
                "{} has no annual data",
                ticker
            )));
        }

        let mut raw = snapshot.assumptions.clone();
        let price_source = match self.quotes.current_price(ticker).await {
            Ok(Some(price)) if price.is_finite() && price > 0.0 => {
                raw.current_price = price;
                PriceSource::Live
            }
            Ok(_) => PriceSource::Stored,
            Err(e) => {
                tracing::warn!("Quote unavailable for {}, using stored price: {}", ticker, e);
                PriceSource::Stored
            }
        };

        let mut sanitized =
            sanitize_assumptions_async(&raw, Some(&snapshot.assumptions), self.bounds.as_ref()).await;
        let assumptions = &sanitized.assumptions;

        let mut validation =
            validate_profile(&snapshot.annual_data, &snapshot.company_info, assumptions);
        validation.merge(validate_real_data(&snapshot.annual_data, assumptions.current_price));
        let outcome = validation.outcome();

        let quality =
            generate_data_quality_report(&snapshot.annual_data, &snapshot.company_info, assumptions);
        let valuation = self.engine.evaluate(&snapshot.annual_data, assumptions);
        sanitized.assumptions.apply_decision(&valuation.decision);

        tracing::info!(
            ticker,
            changes = sanitized.changes.len(),
            errors = validation.errors.len(),
            warnings = validation.warnings.len(),
            outliers = valuation.decision.detected_outliers.len(),
            average_target = valuation.blend.average_target,
            "profile evaluated"
        );

        Ok(ProfileReport {
            ticker: ticker.to_string(),
            price_source,
            sanitized,
            validation,
            outcome,
            quality,
            valuation,
        })
    }

    /// Evaluate many tickers with at most `concurrency` in flight. One result per
    /// input ticker, in input order; failures become `Unavailable`.
    pub async fn evaluate_batch(self: &Arc<Self>, tickers: &[String], concurrency: usize) -> Vec<ProfileOutcome> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(tickers.len());

        for ticker in tickers {
            let orchestrator = Arc::clone(self);
            let sem = semaphore.clone();
            let ticker = ticker.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match sem.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return ProfileOutcome::Unavailable {
                            ticker,
                            reason: e.to_string(),
                        }
                    }
                };
                match orchestrator.evaluate_ticker(&ticker).await {
                    Ok(report) => ProfileOutcome::Evaluated(Box::new(report)),
                    Err(e) => {
                        tracing::warn!("Failed to evaluate {}: {}", ticker, e);
                        ProfileOutcome::Unavailable {
                            ticker,
                            reason: e.to_string(),
                        }
                    }
                }
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (handle, ticker) in handles.into_iter().zip(tickers) {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!("Task error for {}: {}", ticker, e);
                    outcomes.push(ProfileOutcome::Unavailable {
                        ticker: ticker.clone(),
                        reason: format!("task failed: {}", e),
                    });
                }
            }
        }

        let evaluated = outcomes
            .iter()
            .filter(|o| matches!(o, ProfileOutcome::Evaluated(_)))
            .count();
        tracing::info!(
            "Batch complete: {}/{} profiles evaluated",
            evaluated,
            outcomes.len()
        );

        outcomes
    }

    /// Write the sanitized assumptions (with exclusion flags) back to the stored snapshot
    pub async fn persist(&self, report: &ProfileReport) -> Result<(), ValuationError> {
        let mut snapshot = self.store.load(&report.ticker).await?;
        snapshot.assumptions = report.sanitized.assumptions.clone();
        self.store.save(&report.ticker, &snapshot).await
    }
}
