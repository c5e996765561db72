use valuation_core::{Assumptions, HistoricalYear, Metric, TargetPriceSet};

use crate::projection::{project_future_value, PROJECTION_YEARS};

const PE_RANGE: (f64, f64) = (1.0, 100.0);
const PCF_RANGE: (f64, f64) = (1.0, 100.0);
const PBV_RANGE: (f64, f64) = (0.5, 50.0);
/// Percent
const YIELD_RANGE: (f64, f64) = (0.1, 20.0);

/// Plausible targets lie within [0.1x, 50x] of the current price
const MIN_PRICE_MULTIPLE: f64 = 0.1;
const MAX_PRICE_MULTIPLE: f64 = 50.0;
const PRICE_FLOOR: f64 = 0.01;

/// Row matching `base_year`, else the most recent row
pub fn select_base_row(history: &[HistoricalYear], base_year: i32) -> Option<&HistoricalYear> {
    history
        .iter()
        .find(|row| row.year == base_year)
        .or_else(|| history.last())
}

/// max(value, 0) that also maps NaN to 0
fn floor_at_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn multiple_target(future_value: f64, multiple: f64) -> f64 {
    if future_value > 0.0 && multiple > 0.0 {
        future_value * multiple
    } else {
        0.0
    }
}

fn yield_target(future_dividend: f64, yield_percent: f64) -> f64 {
    if future_dividend > 0.0 && yield_percent > 0.0 {
        future_dividend / (yield_percent / 100.0)
    } else {
        0.0
    }
}

/// Candidate 5-year target prices for the EPS, cash-flow, book-value and
/// dividend-yield routes.
///
/// Multiples are clamped before use and any candidate outside
/// [0.1 x currentPrice, 50 x currentPrice] (or non-finite) is reset to 0.
pub fn compute_target_prices(history: &[HistoricalYear], assumptions: &Assumptions) -> TargetPriceSet {
    let base_row = select_base_row(history, assumptions.base_year);

    let base_value = |metric: Metric| -> f64 {
        match metric {
            Metric::Div => floor_at_zero(assumptions.current_dividend),
            _ => base_row.map(|row| floor_at_zero(row.value(metric))).unwrap_or(0.0),
        }
    };
    let future = |metric: Metric| -> f64 {
        project_future_value(base_value(metric), assumptions.growth_rate(metric), PROJECTION_YEARS)
    };

    let target_pe = assumptions.target_pe.clamp(PE_RANGE.0, PE_RANGE.1);
    let target_pcf = assumptions.target_pcf.clamp(PCF_RANGE.0, PCF_RANGE.1);
    let target_pbv = assumptions.target_pbv.clamp(PBV_RANGE.0, PBV_RANGE.1);
    let target_yield = assumptions.target_yield.clamp(YIELD_RANGE.0, YIELD_RANGE.1);

    let mut targets = TargetPriceSet {
        eps: multiple_target(future(Metric::Eps), target_pe),
        cf: multiple_target(future(Metric::Cf), target_pcf),
        bv: multiple_target(future(Metric::Bv), target_pbv),
        div: yield_target(future(Metric::Div), target_yield),
    };

    let current_price = assumptions.current_price.max(PRICE_FLOOR);
    let lower = current_price * MIN_PRICE_MULTIPLE;
    let upper = current_price * MAX_PRICE_MULTIPLE;
    for metric in Metric::ALL {
        let price = targets.get(metric);
        if !price.is_finite() || price < lower || price > upper {
            targets.set(metric, 0.0);
        }
    }

    targets
}
