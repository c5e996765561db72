use serde::{Deserialize, Serialize};
use valuation_core::stats::{median, population_std_dev};
use valuation_core::{Assumptions, HistoricalYear, Metric, OutlierDecision, TargetPriceSet};

use crate::projection::PROJECTION_YEARS;
use crate::target_price::compute_target_prices;

/// Below this std-dev / median ratio the targets are treated as mutually consistent
const CONSISTENCY_RATIO: f64 = 0.1;
const SIGMA_MULTIPLIER: f64 = 1.5;
const MEDIAN_BAND: f64 = 0.5;
/// 5-year return bounds beyond which a target is a data/assumption error (+300% / -75%)
const MAX_HORIZON_RETURN: f64 = 3.0;
const MIN_HORIZON_RETURN: f64 = -0.75;

/// Dispersion statistics over the valid (positive, not manually excluded) targets
#[derive(Debug, Clone, Copy)]
struct Dispersion {
    median: f64,
    std_dev: f64,
    threshold: f64,
    consistent: bool,
}

fn valid_targets(targets: &TargetPriceSet, assumptions: &Assumptions) -> Vec<f64> {
    targets
        .iter()
        .filter(|(metric, price)| *price > 0.0 && !assumptions.is_excluded(*metric))
        .map(|(_, price)| price)
        .collect()
}

/// `None` when fewer than two valid targets remain
fn dispersion(targets: &TargetPriceSet, assumptions: &Assumptions) -> Option<Dispersion> {
    let prices = valid_targets(targets, assumptions);
    if prices.len() < 2 {
        return None;
    }
    let median = median(&prices);
    let std_dev = population_std_dev(&prices);
    Some(Dispersion {
        median,
        std_dev,
        threshold: (SIGMA_MULTIPLIER * std_dev).min(median * MEDIAN_BAND),
        consistent: std_dev < median * CONSISTENCY_RATIO,
    })
}

fn implied_return(price: f64, current_price: f64) -> Option<f64> {
    if current_price > 0.0 {
        Some((price - current_price) / current_price)
    } else {
        None
    }
}

/// Implied 5-year return above +300% or below -75%. Never true without a positive current price.
pub fn is_implausible_return(price: f64, current_price: f64) -> bool {
    implied_return(price, current_price)
        .map(|r| r > MAX_HORIZON_RETURN || r < MIN_HORIZON_RETURN)
        .unwrap_or(false)
}

/// Flag metrics whose target price is aberrant.
///
/// Existing exclusion flags are always carried through; a metric is newly excluded
/// when its target deviates from the median by more than
/// `min(1.5 * stddev, 0.5 * median)` or implies an implausible 5-year return.
pub fn detect_outlier_metrics(history: &[HistoricalYear], assumptions: &Assumptions) -> OutlierDecision {
    let targets = compute_target_prices(history, assumptions);
    detect_outliers_in(&targets, assumptions)
}

/// Same as [`detect_outlier_metrics`] for callers that already hold the targets
pub fn detect_outliers_in(targets: &TargetPriceSet, assumptions: &Assumptions) -> OutlierDecision {
    let mut decision = OutlierDecision::unchanged(assumptions);

    let stats = match dispersion(targets, assumptions) {
        Some(stats) if !stats.consistent => stats,
        _ => return decision,
    };

    for (metric, price) in targets.iter() {
        if price <= 0.0 || decision.is_excluded(metric) {
            continue;
        }
        let deviates = (price - stats.median).abs() > stats.threshold;
        if deviates || is_implausible_return(price, assumptions.current_price) {
            decision.set_excluded(metric, true);
            decision.detected_outliers.push(metric);
        }
    }

    decision
}

/// Per-metric detail behind an outlier decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDispersion {
    pub metric: Metric,
    pub target_price: f64,
    pub deviation: f64,
    /// Absolute deviation as a percentage of the median
    pub deviation_pct: f64,
    /// Implied return over the projection horizon, in percent
    pub implied_return_pct: Option<f64>,
    pub manually_excluded: bool,
    pub auto_excluded: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispersionReport {
    pub median: f64,
    pub std_dev: f64,
    pub threshold: f64,
    /// True when the detector had enough dispersion to judge (>= 2 valid targets, not consistent)
    pub evaluated: bool,
    pub metrics: Vec<MetricDispersion>,
    pub decision: OutlierDecision,
}

pub fn analyze_dispersion(history: &[HistoricalYear], assumptions: &Assumptions) -> DispersionReport {
    let targets = compute_target_prices(history, assumptions);
    dispersion_for_targets(&targets, assumptions)
}

/// Dispersion report for already computed targets. Uses the same median and
/// thresholds as the detector, so the report always agrees with the decision.
pub fn dispersion_for_targets(targets: &TargetPriceSet, assumptions: &Assumptions) -> DispersionReport {
    let decision = detect_outliers_in(targets, assumptions);
    let stats = dispersion(targets, assumptions);
    let evaluated = stats.map(|s| !s.consistent).unwrap_or(false);
    let (median, std_dev, threshold) = stats
        .map(|s| (s.median, s.std_dev, s.threshold))
        .unwrap_or((0.0, 0.0, 0.0));

    let metrics = targets
        .iter()
        .filter(|(_, price)| *price > 0.0)
        .map(|(metric, price)| {
            let deviation = (price - median).abs();
            let deviation_pct = if median > 0.0 { deviation / median * 100.0 } else { 0.0 };
            let implied_return_pct =
                implied_return(price, assumptions.current_price).map(|r| r * 100.0);
            let manually_excluded = assumptions.is_excluded(metric);
            let auto_excluded = decision.detected_outliers.contains(&metric);

            let mut reasons = Vec::new();
            if auto_excluded {
                if deviation > threshold {
                    reasons.push(format!(
                        "deviation of {:.1}% from median ({:.2})",
                        deviation_pct, median
                    ));
                }
                if let Some(ret) = implied_return_pct.filter(|_| {
                    is_implausible_return(price, assumptions.current_price)
                }) {
                    reasons.push(format!(
                        "implausible return of {:+.1}% over {} years",
                        ret, PROJECTION_YEARS
                    ));
                }
            } else if manually_excluded {
                reasons.push("excluded manually".to_string());
            }

            MetricDispersion {
                metric,
                target_price: price,
                deviation,
                deviation_pct,
                implied_return_pct,
                manually_excluded,
                auto_excluded,
                reasons,
            }
        })
        .collect();

    DispersionReport {
        median,
        std_dev,
        threshold,
        evaluated,
        metrics,
        decision,
    }
}
