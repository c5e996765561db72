use serde::{Deserialize, Serialize};
use valuation_core::stats::{mean, population_std_dev};
use valuation_core::{HistoricalYear, Metric};

const MIN_OBSERVATIONS: usize = 3;
const SIGMA_BAND: f64 = 2.0;

/// A historical per-share value far from its own series mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalOutlier {
    pub year: i32,
    pub metric: Metric,
    pub value: f64,
    pub average: f64,
    pub deviation: f64,
    pub deviation_pct: f64,
}

/// Scan EPS, CF, BV and DIV per share for values more than 2 sigma from the mean.
/// Only strictly positive values take part; a series needs at least 3 of them.
pub fn scan_historical_outliers(history: &[HistoricalYear]) -> Vec<HistoricalOutlier> {
    let mut outliers = Vec::new();

    for metric in Metric::ALL {
        let values: Vec<f64> = history
            .iter()
            .map(|row| row.value(metric))
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        if values.len() < MIN_OBSERVATIONS {
            continue;
        }

        let average = mean(&values);
        let threshold = SIGMA_BAND * population_std_dev(&values);

        for row in history {
            let value = row.value(metric);
            if !value.is_finite() || value <= 0.0 {
                continue;
            }
            let deviation = (value - average).abs();
            if deviation > threshold {
                outliers.push(HistoricalOutlier {
                    year: row.year,
                    metric,
                    value,
                    average,
                    deviation,
                    deviation_pct: deviation / average * 100.0,
                });
            }
        }
    }

    outliers
}
