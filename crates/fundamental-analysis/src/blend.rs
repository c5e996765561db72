use serde::{Deserialize, Serialize};
use valuation_core::{Assumptions, Metric, OutlierDecision, TargetPriceSet};

use crate::projection::{project_future_value, PROJECTION_YEARS};

/// The surviving target prices blended into a single recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendedValuation {
    /// Mean of the included targets, 0 when none survive
    pub average_target: f64,
    pub included: Vec<Metric>,
    /// Dividends collected over the projection horizon
    pub cumulative_dividends: f64,
    /// (average_target + dividends - current price) / current price, in percent
    pub total_return_pct: f64,
}

fn cumulative_dividends(assumptions: &Assumptions) -> f64 {
    (1..=PROJECTION_YEARS)
        .map(|year| project_future_value(assumptions.current_dividend, assumptions.growth_rate_div, year))
        .sum()
}

pub fn blend_valuation(
    targets: &TargetPriceSet,
    assumptions: &Assumptions,
    decision: &OutlierDecision,
) -> BlendedValuation {
    let included: Vec<Metric> = targets
        .iter()
        .filter(|(metric, price)| *price > 0.0 && !decision.is_excluded(*metric))
        .map(|(metric, _)| metric)
        .collect();

    let average_target = if included.is_empty() {
        0.0
    } else {
        included.iter().map(|m| targets.get(*m)).sum::<f64>() / included.len() as f64
    };

    let cumulative_dividends = cumulative_dividends(assumptions);
    let current_price = assumptions.current_price;
    let total_return_pct = if current_price > 0.0 && average_target > 0.0 {
        (average_target + cumulative_dividends - current_price) / current_price * 100.0
    } else {
        0.0
    };

    BlendedValuation {
        average_target,
        included,
        cumulative_dividends,
        total_return_pct,
    }
}
