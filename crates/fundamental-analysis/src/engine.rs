use serde::{Deserialize, Serialize};
use valuation_core::{Assumptions, HistoricalYear, OutlierDecision, TargetPriceSet};

use crate::blend::{blend_valuation, BlendedValuation};
use crate::historical::{scan_historical_outliers, HistoricalOutlier};
use crate::outlier::{dispersion_for_targets, DispersionReport};
use crate::target_price::compute_target_prices;

/// Everything the reporting layer renders for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub targets: TargetPriceSet,
    pub decision: OutlierDecision,
    pub dispersion: DispersionReport,
    pub blend: BlendedValuation,
    pub historical_outliers: Vec<HistoricalOutlier>,
}

/// Runs target pricing, outlier detection and blending from a single set of
/// computed targets, so every view of a ticker agrees on the same numbers.
pub struct ValuationEngine;

impl ValuationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, history: &[HistoricalYear], assumptions: &Assumptions) -> Valuation {
        let targets = compute_target_prices(history, assumptions);
        let dispersion = dispersion_for_targets(&targets, assumptions);
        let decision = dispersion.decision.clone();
        let blend = blend_valuation(&targets, assumptions, &decision);

        Valuation {
            targets,
            decision,
            dispersion,
            blend,
            historical_outliers: scan_historical_outliers(history),
        }
    }
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outlier::detect_outlier_metrics;
    use valuation_core::Metric;

    fn history() -> Vec<HistoricalYear> {
        (2020..=2024)
            .map(|year| {
                let step = (year - 2020) as f64;
                HistoricalYear {
                    year,
                    price_high: 60.0 + step * 5.0,
                    price_low: 45.0 + step * 4.0,
                    cash_flow_per_share: 4.0 + step * 0.3,
                    dividend_per_share: 1.0 + step * 0.1,
                    book_value_per_share: 25.0 + step,
                    earnings_per_share: 3.0 + step * 0.25,
                    is_estimate: None,
                    auto_fetched: Some(true),
                }
            })
            .collect()
    }

    #[test]
    fn test_engine_matches_free_functions() {
        let history = history();
        let a = Assumptions {
            current_price: 70.0,
            current_dividend: 1.4,
            growth_rate_eps: 7.0,
            growth_rate_cf: 6.0,
            growth_rate_bv: 4.0,
            growth_rate_div: 5.0,
            target_pe: 18.0,
            target_pcf: 12.0,
            target_pbv: 7.0,
            target_yield: 1.0,
            ..Assumptions::neutral(2024)
        };

        let valuation = ValuationEngine::new().evaluate(&history, &a);
        assert_eq!(valuation.targets, compute_target_prices(&history, &a));
        assert_eq!(valuation.decision, detect_outlier_metrics(&history, &a));
        // BV (29 * 1.04^5 * 7 ~= 247) sits far above its peers (~84-179)
        assert!(valuation.decision.exclude_bv);
        assert!(!valuation.blend.included.contains(&Metric::Bv));
        assert!(valuation.blend.average_target > 0.0);
    }
}
