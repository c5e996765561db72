//! Assumption sanitizer.
//!
//! Brings every numeric assumption into its safe range and records one change per
//! corrected field. Running it on its own output changes nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use valuation_core::Assumptions;

use crate::settings::{BoundsProvider, SanitizerBounds};
use crate::strict::{is_valid_price, PLACEHOLDER_PRICE};

/// Assumption fields the sanitizer may rewrite, serialized with their wire names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssumptionField {
    #[serde(rename = "currentPrice")]
    CurrentPrice,
    #[serde(rename = "currentDividend")]
    CurrentDividend,
    #[serde(rename = "growthRateEPS")]
    GrowthRateEps,
    #[serde(rename = "growthRateSales")]
    GrowthRateSales,
    #[serde(rename = "growthRateCF")]
    GrowthRateCf,
    #[serde(rename = "growthRateBV")]
    GrowthRateBv,
    #[serde(rename = "growthRateDiv")]
    GrowthRateDiv,
    #[serde(rename = "targetPE")]
    TargetPe,
    #[serde(rename = "targetPCF")]
    TargetPcf,
    #[serde(rename = "targetPBV")]
    TargetPbv,
    #[serde(rename = "targetYield")]
    TargetYield,
    #[serde(rename = "requiredReturn")]
    RequiredReturn,
    #[serde(rename = "dividendPayoutRatio")]
    DividendPayoutRatio,
}

impl AssumptionField {
    pub fn name(&self) -> &'static str {
        match self {
            AssumptionField::CurrentPrice => "currentPrice",
            AssumptionField::CurrentDividend => "currentDividend",
            AssumptionField::GrowthRateEps => "growthRateEPS",
            AssumptionField::GrowthRateSales => "growthRateSales",
            AssumptionField::GrowthRateCf => "growthRateCF",
            AssumptionField::GrowthRateBv => "growthRateBV",
            AssumptionField::GrowthRateDiv => "growthRateDiv",
            AssumptionField::TargetPe => "targetPE",
            AssumptionField::TargetPcf => "targetPCF",
            AssumptionField::TargetPbv => "targetPBV",
            AssumptionField::TargetYield => "targetYield",
            AssumptionField::RequiredReturn => "requiredReturn",
            AssumptionField::DividendPayoutRatio => "dividendPayoutRatio",
        }
    }
}

impl fmt::Display for AssumptionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    GrowthBelowLowerBound,
    GrowthAboveUpperBound,
    GrowthNonFinite,
    RatioNonPositive,
    RatioBelowLowerBound,
    RatioAboveUpperBound,
    RatioNonFinite,
    PriceNonPositive,
    PriceNonFinite,
    PricePlaceholder,
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ChangeReason::GrowthBelowLowerBound => "growth below lower bound",
            ChangeReason::GrowthAboveUpperBound => "growth above upper bound",
            ChangeReason::GrowthNonFinite => "growth not a finite number",
            ChangeReason::RatioNonPositive => "ratio non-positive",
            ChangeReason::RatioBelowLowerBound => "ratio below lower bound",
            ChangeReason::RatioAboveUpperBound => "ratio above upper bound",
            ChangeReason::RatioNonFinite => "ratio not a finite number",
            ChangeReason::PriceNonPositive => "price non-positive",
            ChangeReason::PriceNonFinite => "price not a finite number",
            ChangeReason::PricePlaceholder => "price placeholder",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizationChange {
    pub field: AssumptionField,
    pub original: f64,
    pub sanitized: f64,
    pub change_reason: ChangeReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedAssumptions {
    pub assumptions: Assumptions,
    pub changes: Vec<SanitizationChange>,
}

impl SanitizedAssumptions {
    pub fn is_modified(&self) -> bool {
        !self.changes.is_empty()
    }
}

const DEFAULT_GROWTH: f64 = 5.0;
const DEFAULT_DIV_GROWTH: f64 = 0.0;
const DEFAULT_PE: f64 = 15.0;
const DEFAULT_PCF: f64 = 10.0;
const DEFAULT_PBV: f64 = 2.0;
const DEFAULT_YIELD: f64 = 2.0;
const DEFAULT_REQUIRED_RETURN: f64 = 10.0;
const DEFAULT_PAYOUT: f64 = 30.0;

struct Recorder {
    changes: Vec<SanitizationChange>,
}

impl Recorder {
    /// Apply a correction and record it if the stored value actually changes
    fn apply(&mut self, field: AssumptionField, slot: &mut f64, fix: Option<(f64, ChangeReason)>) {
        if let Some((sanitized, reason)) = fix {
            let original = *slot;
            // NaN never compares equal, so a non-finite original is always recorded
            if original != sanitized {
                *slot = sanitized;
                self.changes.push(SanitizationChange {
                    field,
                    original,
                    sanitized,
                    change_reason: reason,
                });
            }
        }
    }
}

fn fix_growth(value: f64, default: f64, bounds: &SanitizerBounds) -> Option<(f64, ChangeReason)> {
    if !value.is_finite() {
        Some((default.clamp(bounds.growth_min, bounds.growth_max), ChangeReason::GrowthNonFinite))
    } else if value < bounds.growth_min {
        Some((bounds.growth_min, ChangeReason::GrowthBelowLowerBound))
    } else if value > bounds.growth_max {
        Some((bounds.growth_max, ChangeReason::GrowthAboveUpperBound))
    } else {
        None
    }
}

/// Ratio in (0, max]: non-positive values fall back to the default
fn fix_open_ratio(value: f64, default: f64, max: f64) -> Option<(f64, ChangeReason)> {
    let default = default.min(max);
    if !value.is_finite() {
        Some((default, ChangeReason::RatioNonFinite))
    } else if value <= 0.0 {
        Some((default, ChangeReason::RatioNonPositive))
    } else if value > max {
        Some((max, ChangeReason::RatioAboveUpperBound))
    } else {
        None
    }
}

/// Ratio in [min, max]: out-of-range values move to the nearer bound
fn fix_closed_ratio(value: f64, default: f64, min: f64, max: f64) -> Option<(f64, ChangeReason)> {
    if !value.is_finite() {
        Some((default.clamp(min, max), ChangeReason::RatioNonFinite))
    } else if value <= 0.0 {
        Some((min, ChangeReason::RatioNonPositive))
    } else if value < min {
        Some((min, ChangeReason::RatioBelowLowerBound))
    } else if value > max {
        Some((max, ChangeReason::RatioAboveUpperBound))
    } else {
        None
    }
}

fn fix_price(value: f64, prior: Option<&Assumptions>) -> Option<(f64, ChangeReason)> {
    let prior_price = prior
        .map(|p| p.current_price)
        .filter(|price| is_valid_price(*price));

    if !value.is_finite() {
        Some((prior_price.unwrap_or(0.0), ChangeReason::PriceNonFinite))
    } else if value <= 0.0 {
        Some((prior_price.unwrap_or(0.0), ChangeReason::PriceNonPositive))
    } else if value == PLACEHOLDER_PRICE {
        prior_price.map(|price| (price, ChangeReason::PricePlaceholder))
    } else {
        None
    }
}

/// Zero is a legitimate dividend; only negative or non-finite values are replaced
fn fix_dividend(value: f64, prior: Option<&Assumptions>) -> Option<(f64, ChangeReason)> {
    let fallback = || {
        prior
            .map(|p| p.current_dividend)
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(0.0)
    };

    if !value.is_finite() {
        Some((fallback(), ChangeReason::PriceNonFinite))
    } else if value < 0.0 {
        Some((fallback(), ChangeReason::PriceNonPositive))
    } else {
        None
    }
}

/// Sanitize with the default bounds and no prior snapshot
pub fn sanitize_assumptions(raw: &Assumptions) -> SanitizedAssumptions {
    sanitize_assumptions_with(raw, None, &SanitizerBounds::default())
}

/// Sanitize against `bounds`. A valid price or dividend from `prior` (usually the
/// stored snapshot) replaces a broken current value; baseYear and the exclusion
/// flags pass through untouched.
pub fn sanitize_assumptions_with(
    raw: &Assumptions,
    prior: Option<&Assumptions>,
    bounds: &SanitizerBounds,
) -> SanitizedAssumptions {
    let mut a = raw.clone();
    let mut rec = Recorder { changes: Vec::new() };

    rec.apply(AssumptionField::CurrentPrice, &mut a.current_price, fix_price(raw.current_price, prior));
    rec.apply(
        AssumptionField::CurrentDividend,
        &mut a.current_dividend,
        fix_dividend(raw.current_dividend, prior),
    );

    let growth = [
        (AssumptionField::GrowthRateEps, &mut a.growth_rate_eps, DEFAULT_GROWTH),
        (AssumptionField::GrowthRateSales, &mut a.growth_rate_sales, DEFAULT_GROWTH),
        (AssumptionField::GrowthRateCf, &mut a.growth_rate_cf, DEFAULT_GROWTH),
        (AssumptionField::GrowthRateBv, &mut a.growth_rate_bv, DEFAULT_GROWTH),
        (AssumptionField::GrowthRateDiv, &mut a.growth_rate_div, DEFAULT_DIV_GROWTH),
    ];
    for (field, slot, default) in growth {
        let fix = fix_growth(*slot, default, bounds);
        rec.apply(field, slot, fix);
    }

    let fix = fix_open_ratio(a.target_pe, DEFAULT_PE, bounds.ratio_max);
    rec.apply(AssumptionField::TargetPe, &mut a.target_pe, fix);
    let fix = fix_open_ratio(a.target_pcf, DEFAULT_PCF, bounds.ratio_max);
    rec.apply(AssumptionField::TargetPcf, &mut a.target_pcf, fix);
    let fix = fix_closed_ratio(a.target_pbv, DEFAULT_PBV, bounds.pbv_min, bounds.pbv_max);
    rec.apply(AssumptionField::TargetPbv, &mut a.target_pbv, fix);
    let fix = fix_closed_ratio(a.target_yield, DEFAULT_YIELD, bounds.yield_min, bounds.yield_max);
    rec.apply(AssumptionField::TargetYield, &mut a.target_yield, fix);

    let fix = fix_open_ratio(a.required_return, DEFAULT_REQUIRED_RETURN, bounds.ratio_max);
    rec.apply(AssumptionField::RequiredReturn, &mut a.required_return, fix);
    let fix = fix_open_ratio(a.dividend_payout_ratio, DEFAULT_PAYOUT, bounds.ratio_max);
    rec.apply(AssumptionField::DividendPayoutRatio, &mut a.dividend_payout_ratio, fix);

    if !rec.changes.is_empty() {
        tracing::debug!(
            changes = rec.changes.len(),
            fields = %rec
                .changes
                .iter()
                .map(|c| c.field.name())
                .collect::<Vec<_>>()
                .join(","),
            "assumptions sanitized"
        );
    }

    SanitizedAssumptions {
        assumptions: a,
        changes: rec.changes,
    }
}

/// Same as [`sanitize_assumptions_with`], with bounds fetched from `provider`.
/// A provider failure falls back to the default bounds.
pub async fn sanitize_assumptions_async<P>(
    raw: &Assumptions,
    prior: Option<&Assumptions>,
    provider: &P,
) -> SanitizedAssumptions
where
    P: BoundsProvider + ?Sized,
{
    let bounds = match provider.bounds().await {
        Ok(bounds) => bounds,
        Err(e) => {
            tracing::warn!(error = %e, "sanitizer bounds unavailable, using defaults");
            SanitizerBounds::default()
        }
    };
    sanitize_assumptions_with(raw, prior, &bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::StaticBounds;
    use async_trait::async_trait;
    use valuation_core::ValuationError;

    fn clean() -> Assumptions {
        Assumptions {
            current_price: 42.0,
            current_dividend: 1.1,
            ..Assumptions::neutral(2024)
        }
    }

    fn reason_for(result: &SanitizedAssumptions, field: AssumptionField) -> Option<ChangeReason> {
        result
            .changes
            .iter()
            .find(|c| c.field == field)
            .map(|c| c.change_reason)
    }

    #[test]
    fn test_clean_input_untouched() {
        let result = sanitize_assumptions(&clean());
        assert!(!result.is_modified());
        assert_eq!(result.assumptions, clean());
    }

    #[test]
    fn test_growth_is_clamped() {
        let mut raw = clean();
        raw.growth_rate_eps = 120.0;
        raw.growth_rate_cf = -80.0;
        raw.growth_rate_div = f64::NAN;
        let result = sanitize_assumptions(&raw);
        assert_eq!(result.assumptions.growth_rate_eps, 50.0);
        assert_eq!(result.assumptions.growth_rate_cf, -50.0);
        assert_eq!(result.assumptions.growth_rate_div, 0.0);
        assert_eq!(
            reason_for(&result, AssumptionField::GrowthRateEps),
            Some(ChangeReason::GrowthAboveUpperBound)
        );
        assert_eq!(
            reason_for(&result, AssumptionField::GrowthRateCf),
            Some(ChangeReason::GrowthBelowLowerBound)
        );
        assert_eq!(
            reason_for(&result, AssumptionField::GrowthRateDiv),
            Some(ChangeReason::GrowthNonFinite)
        );
        assert_eq!(result.changes.len(), 3);
    }

    #[test]
    fn test_ratio_corrections() {
        let mut raw = clean();
        raw.target_pe = 0.0;
        raw.target_pcf = 250.0;
        raw.target_pbv = 0.2;
        raw.target_yield = f64::INFINITY;
        let result = sanitize_assumptions(&raw);
        assert_eq!(result.assumptions.target_pe, 15.0);
        assert_eq!(result.assumptions.target_pcf, 100.0);
        assert_eq!(result.assumptions.target_pbv, 0.5);
        assert_eq!(result.assumptions.target_yield, 2.0);
        assert_eq!(reason_for(&result, AssumptionField::TargetPe), Some(ChangeReason::RatioNonPositive));
        assert_eq!(reason_for(&result, AssumptionField::TargetPcf), Some(ChangeReason::RatioAboveUpperBound));
        assert_eq!(reason_for(&result, AssumptionField::TargetPbv), Some(ChangeReason::RatioBelowLowerBound));
        assert_eq!(reason_for(&result, AssumptionField::TargetYield), Some(ChangeReason::RatioNonFinite));
    }

    #[test]
    fn test_price_falls_back_to_prior() {
        let prior = clean();
        let mut raw = clean();
        raw.current_price = -3.0;
        raw.current_dividend = f64::NAN;
        let result = sanitize_assumptions_with(&raw, Some(&prior), &SanitizerBounds::default());
        assert_eq!(result.assumptions.current_price, 42.0);
        assert_eq!(result.assumptions.current_dividend, 1.1);
        assert_eq!(
            reason_for(&result, AssumptionField::CurrentPrice),
            Some(ChangeReason::PriceNonPositive)
        );

        // Without a prior the price becomes 0 ("unknown")
        let result = sanitize_assumptions(&raw);
        assert_eq!(result.assumptions.current_price, 0.0);
        assert_eq!(result.assumptions.current_dividend, 0.0);
    }

    #[test]
    fn test_placeholder_price_replaced_only_with_prior() {
        let mut raw = clean();
        raw.current_price = 100.0;

        let result = sanitize_assumptions(&raw);
        assert_eq!(result.assumptions.current_price, 100.0);
        assert!(!result.is_modified());

        let result = sanitize_assumptions_with(&raw, Some(&clean()), &SanitizerBounds::default());
        assert_eq!(result.assumptions.current_price, 42.0);
        assert_eq!(
            reason_for(&result, AssumptionField::CurrentPrice),
            Some(ChangeReason::PricePlaceholder)
        );

        // A placeholder prior is not a valid fallback
        let mut placeholder_prior = clean();
        placeholder_prior.current_price = 100.0;
        let result = sanitize_assumptions_with(&raw, Some(&placeholder_prior), &SanitizerBounds::default());
        assert_eq!(result.assumptions.current_price, 100.0);
    }

    #[test]
    fn test_zero_dividend_kept() {
        let mut raw = clean();
        raw.current_dividend = 0.0;
        let result = sanitize_assumptions_with(&raw, Some(&clean()), &SanitizerBounds::default());
        assert_eq!(result.assumptions.current_dividend, 0.0);
        assert!(!result.is_modified());
    }

    #[test]
    fn test_base_year_and_flags_preserved() {
        let mut raw = clean();
        raw.base_year = 1999;
        raw.exclude_bv = true;
        raw.growth_rate_bv = 400.0;
        let result = sanitize_assumptions(&raw);
        assert_eq!(result.assumptions.base_year, 1999);
        assert!(result.assumptions.exclude_bv);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let raw: Assumptions = serde_json::from_str(r#"{"currentPrice": 25, "baseYear": 2024}"#).unwrap();
        let result = sanitize_assumptions(&raw);
        let a = &result.assumptions;
        assert_eq!(a.growth_rate_eps, 5.0);
        assert_eq!(a.growth_rate_div, 0.0);
        assert_eq!(a.target_pe, 15.0);
        assert_eq!(a.target_pcf, 10.0);
        assert_eq!(a.target_pbv, 2.0);
        assert_eq!(a.target_yield, 2.0);
        assert_eq!(a.required_return, 10.0);
        assert_eq!(a.dividend_payout_ratio, 30.0);
        assert_eq!(a.current_dividend, 0.0);
        assert!(result.changes.iter().all(|c| c.original.is_nan()));
    }

    #[test]
    fn test_idempotent() {
        let mut raw = clean();
        raw.current_price = f64::NAN;
        raw.growth_rate_eps = 999.0;
        raw.growth_rate_sales = f64::NEG_INFINITY;
        raw.target_pe = -4.0;
        raw.target_pbv = 75.0;
        raw.target_yield = 0.0;
        raw.required_return = f64::NAN;
        raw.dividend_payout_ratio = 400.0;

        let tight = SanitizerBounds {
            growth_min: -10.0,
            growth_max: 3.0,
            ratio_max: 12.0,
            yield_min: 2.5,
            ..SanitizerBounds::default()
        };
        for bounds in [SanitizerBounds::default(), tight] {
            let once = sanitize_assumptions_with(&raw, None, &bounds);
            let twice = sanitize_assumptions_with(&once.assumptions, None, &bounds);
            assert!(once.is_modified());
            assert!(!twice.is_modified(), "second pass changed {:?}", twice.changes);
            assert_eq!(once.assumptions, twice.assumptions);
        }
    }

    #[test]
    fn test_return_and_payout_are_bounded_ratios() {
        let mut raw = clean();
        raw.required_return = 500.0;
        raw.dividend_payout_ratio = -20.0;
        let result = sanitize_assumptions(&raw);
        assert_eq!(result.assumptions.required_return, 100.0);
        assert_eq!(result.assumptions.dividend_payout_ratio, 30.0);
        assert_eq!(
            reason_for(&result, AssumptionField::RequiredReturn),
            Some(ChangeReason::RatioAboveUpperBound)
        );
        assert_eq!(
            reason_for(&result, AssumptionField::DividendPayoutRatio),
            Some(ChangeReason::RatioNonPositive)
        );

        let again = sanitize_assumptions(&result.assumptions);
        assert!(!again.is_modified());

        raw.required_return = 0.0;
        raw.dividend_payout_ratio = 250.0;
        let result = sanitize_assumptions(&raw);
        assert_eq!(result.assumptions.required_return, 10.0);
        assert_eq!(result.assumptions.dividend_payout_ratio, 100.0);
        assert!(!sanitize_assumptions(&result.assumptions).is_modified());
    }

    #[test]
    fn test_change_record_wire_format() {
        let mut raw = clean();
        raw.target_pe = 300.0;
        let result = sanitize_assumptions(&raw);
        let json = serde_json::to_value(&result.changes[0]).unwrap();
        assert_eq!(json["field"], "targetPE");
        assert_eq!(json["changeReason"], "ratio_above_upper_bound");
        assert_eq!(json["sanitized"], 100.0);
        assert_eq!(ChangeReason::RatioAboveUpperBound.to_string(), "ratio above upper bound");
    }

    struct BrokenBounds;

    #[async_trait]
    impl BoundsProvider for BrokenBounds {
        async fn bounds(&self) -> Result<SanitizerBounds, ValuationError> {
            Err(ValuationError::Config("settings table unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_async_uses_provider_bounds() {
        let mut raw = clean();
        raw.growth_rate_eps = 40.0;
        let provider = StaticBounds(SanitizerBounds {
            growth_max: 25.0,
            ..SanitizerBounds::default()
        });
        let result = sanitize_assumptions_async(&raw, None, &provider).await;
        assert_eq!(result.assumptions.growth_rate_eps, 25.0);

        let result = sanitize_assumptions_async(&raw, None, &BrokenBounds).await;
        assert_eq!(result.assumptions.growth_rate_eps, 40.0);
    }
}
