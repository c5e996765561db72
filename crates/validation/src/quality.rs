//! Data-quality report for one stored profile.
//!
//! Runs a fixed battery of checks over the annual history, company info and
//! assumptions, and scores the profile by the share of checks that pass.

use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use valuation_core::stats::{mean, population_std_dev};
use valuation_core::{Assumptions, CompanyInfo, HistoricalYear, Metric};

use crate::placeholder::is_real_provider_data;
use crate::strict::{current_year, is_valid_price, validate_assumptions_for_year, validate_company_info};

const OUTLIER_SIGMA: f64 = 3.0;
const SUSPICIOUS_GROWTH_PCT: f64 = 100.0;
const MAX_MISSING_YEARS: i32 = 2;
const SPLIT_RATIO_LOW: f64 = 0.6;
const SPLIT_RATIO_HIGH: f64 = 1.8;
const STALE_DAYS_WEEKDAY: f64 = 5.0;
const STALE_DAYS_WEEKEND: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityIssues {
    pub critical: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityReport {
    /// 0-100, share of passing checks
    pub overall_score: u32,
    pub issues: QualityIssues,
    pub checks: Vec<QualityCheck>,
}

impl DataQualityReport {
    /// No critical issue was found
    pub fn is_acceptable(&self) -> bool {
        self.issues.critical.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousGrowth {
    pub year: i32,
    pub metric: Metric,
    pub growth_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataGap {
    pub from_year: i32,
    pub to_year: i32,
    pub missing_years: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialSplit {
    pub year: i32,
    pub price_ratio: f64,
}

/// Indices of finite values more than 3 population standard deviations from the mean
pub fn detect_statistical_outliers(values: &[f64]) -> Vec<usize> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 3 {
        return Vec::new();
    }
    let avg = mean(&finite);
    let sd = population_std_dev(&finite);
    if sd == 0.0 {
        return Vec::new();
    }
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite() && ((**v - avg) / sd).abs() > OUTLIER_SIGMA)
        .map(|(i, _)| i)
        .collect()
}

fn sorted_by_year(history: &[HistoricalYear]) -> Vec<&HistoricalYear> {
    let mut rows: Vec<&HistoricalYear> = history.iter().collect();
    rows.sort_by_key(|row| row.year);
    rows
}

/// Year-over-year changes above 100% (either direction) between positive values
pub fn flag_suspicious_growth_rates(history: &[HistoricalYear], metric: Metric) -> Vec<SuspiciousGrowth> {
    sorted_by_year(history)
        .windows(2)
        .filter_map(|pair| {
            let prev = pair[0].value(metric);
            let cur = pair[1].value(metric);
            if prev > 0.0 && cur > 0.0 {
                let growth_pct = (cur - prev) / prev * 100.0;
                (growth_pct.abs() > SUSPICIOUS_GROWTH_PCT).then_some(SuspiciousGrowth {
                    year: pair[1].year,
                    metric,
                    growth_pct,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Runs of more than two missing years
pub fn detect_data_gaps(history: &[HistoricalYear]) -> Vec<DataGap> {
    sorted_by_year(history)
        .windows(2)
        .filter_map(|pair| {
            let missing_years = pair[1].year - pair[0].year - 1;
            (missing_years > MAX_MISSING_YEARS).then_some(DataGap {
                from_year: pair[0].year,
                to_year: pair[1].year,
                missing_years,
            })
        })
        .collect()
}

/// Year-over-year mid-price ratio below 0.6 or above 1.8
pub fn detect_potential_splits(history: &[HistoricalYear]) -> Vec<PotentialSplit> {
    sorted_by_year(history)
        .windows(2)
        .filter_map(|pair| {
            let prev = pair[0].mid_price();
            let cur = pair[1].mid_price();
            if !(prev > 0.0 && cur > 0.0) {
                return None;
            }
            let price_ratio = cur / prev;
            (price_ratio < SPLIT_RATIO_LOW || price_ratio > SPLIT_RATIO_HIGH).then_some(PotentialSplit {
                year: pair[1].year,
                price_ratio,
            })
        })
        .collect()
}

/// Symbols appearing more than once after trimming and upper-casing, sorted
pub fn detect_duplicate_tickers<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for symbol in symbols {
        let symbol = symbol.as_ref().trim().to_uppercase();
        if !symbol.is_empty() {
            *counts.entry(symbol).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(symbol, _)| symbol)
        .collect()
}

/// Stale after 5 days on weekdays, 7 days when `now` falls on a weekend
pub fn is_price_stale(last_update: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let age_days = (now - last_update).num_seconds() as f64 / 86_400.0;
    let limit = match now.weekday() {
        Weekday::Sat | Weekday::Sun => STALE_DAYS_WEEKEND,
        _ => STALE_DAYS_WEEKDAY,
    };
    age_days > limit
}

struct ReportBuilder {
    checks: Vec<QualityCheck>,
    issues: QualityIssues,
}

impl ReportBuilder {
    fn pass(&mut self, name: &str, message: impl Into<String>) {
        self.push(name, CheckStatus::Pass, message.into());
    }

    fn warn(&mut self, name: &str, message: impl Into<String>) {
        let message = message.into();
        self.issues.warnings.push(message.clone());
        self.push(name, CheckStatus::Warning, message);
    }

    fn fail(&mut self, name: &str, message: impl Into<String>) {
        let message = message.into();
        self.issues.critical.push(message.clone());
        self.push(name, CheckStatus::Fail, message);
    }

    fn push(&mut self, name: &str, status: CheckStatus, message: String) {
        self.checks.push(QualityCheck {
            name: name.to_string(),
            status,
            message,
        });
    }

    fn finish(self) -> DataQualityReport {
        let passed = self.checks.iter().filter(|c| c.status == CheckStatus::Pass).count();
        let total = self.checks.len().max(1);
        DataQualityReport {
            overall_score: (passed as f64 / total as f64 * 100.0).round() as u32,
            issues: self.issues,
            checks: self.checks,
        }
    }
}

pub fn generate_data_quality_report(
    history: &[HistoricalYear],
    info: &CompanyInfo,
    assumptions: &Assumptions,
) -> DataQualityReport {
    generate_data_quality_report_for_year(history, info, assumptions, current_year())
}

pub fn generate_data_quality_report_for_year(
    history: &[HistoricalYear],
    info: &CompanyInfo,
    assumptions: &Assumptions,
    current_year: i32,
) -> DataQualityReport {
    let mut report = ReportBuilder {
        checks: Vec::with_capacity(12),
        issues: QualityIssues::default(),
    };

    // 1. quantity
    let years = history.len();
    if years < 3 {
        report.fail("Data quantity", format!("Insufficient data: {} years (minimum 3)", years));
    } else if years < 5 {
        report.warn("Data quantity", format!("Limited data: {} years (5+ recommended)", years));
    } else {
        report.pass("Data quantity", format!("{} years of data", years));
    }

    // 2. prices
    let bad_prices: Vec<i32> = history
        .iter()
        .filter(|row| {
            !(row.price_high.is_finite() && row.price_high > 0.0)
                || !(row.price_low.is_finite() && row.price_low > 0.0)
                || row.price_high < row.price_low
        })
        .map(|row| row.year)
        .collect();
    if bad_prices.is_empty() {
        report.pass("Price validity", "All prices valid");
    } else {
        report.fail(
            "Price validity",
            format!("Invalid prices in {} years: {:?}", bad_prices.len(), bad_prices),
        );
    }

    // 3. EPS outliers
    let eps: Vec<f64> = history.iter().map(|row| row.earnings_per_share).collect();
    let outlier_years: Vec<i32> = detect_statistical_outliers(&eps)
        .into_iter()
        .map(|i| history[i].year)
        .collect();
    if outlier_years.is_empty() {
        report.pass("EPS outliers", "No statistical outliers in EPS");
    } else {
        report.warn("EPS outliers", format!("EPS outliers (>3 sigma) in years {:?}", outlier_years));
    }

    // 4. EPS growth
    let suspicious = flag_suspicious_growth_rates(history, Metric::Eps);
    if suspicious.is_empty() {
        report.pass("EPS growth", "No suspicious EPS growth");
    } else {
        let detail: Vec<String> = suspicious
            .iter()
            .map(|s| format!("{} ({:+.0}%)", s.year, s.growth_pct))
            .collect();
        report.warn("EPS growth", format!("Suspicious EPS growth: {}", detail.join(", ")));
    }

    // 5. gaps
    let gaps = detect_data_gaps(history);
    if gaps.is_empty() {
        report.pass("Data continuity", "No significant gaps");
    } else {
        let detail: Vec<String> = gaps
            .iter()
            .map(|g| format!("{}-{} ({} missing)", g.from_year, g.to_year, g.missing_years))
            .collect();
        report.warn("Data continuity", format!("Gaps in data: {}", detail.join(", ")));
    }

    // 6. splits
    let splits = detect_potential_splits(history);
    if splits.is_empty() {
        report.pass("Stock splits", "No unadjusted splits detected");
    } else {
        let years: Vec<i32> = splits.iter().map(|s| s.year).collect();
        report.warn("Stock splits", format!("Possible unadjusted split in {:?}", years));
    }

    // 7. company info
    let info_result = validate_company_info(info);
    if !info_result.errors.is_empty() {
        report.fail("Company info", info_result.errors.join("; "));
    } else if !info_result.warnings.is_empty() {
        report.warn("Company info", info_result.warnings.join("; "));
    } else {
        report.pass("Company info", "Company info complete");
    }

    // 8. assumptions (the price itself is check 9)
    let assumption_result = validate_assumptions_for_year(assumptions, current_year);
    if assumption_result.warnings.is_empty() {
        report.pass("Assumptions", "Assumptions within normal ranges");
    } else {
        report.warn("Assumptions", assumption_result.warnings.join("; "));
    }

    // 9. current price
    if is_valid_price(assumptions.current_price) {
        report.pass("Current price", format!("Current price {:.2}", assumptions.current_price));
    } else {
        report.fail(
            "Current price",
            format!("Invalid current price: {}", assumptions.current_price),
        );
    }

    // 10. book value
    let negative_bv = history
        .iter()
        .filter(|row| row.book_value_per_share.is_nan() || row.book_value_per_share <= 0.0)
        .count();
    if negative_bv == 0 {
        report.pass("Book value", "Book value positive in all years");
    } else {
        report.warn("Book value", format!("Negative or missing book value in {} years", negative_bv));
    }

    // 11. cash flow
    let negative_cf = history
        .iter()
        .filter(|row| row.cash_flow_per_share.is_nan() || row.cash_flow_per_share <= 0.0)
        .count();
    if negative_cf == 0 {
        report.pass("Cash flow", "Cash flow positive in all years");
    } else {
        report.warn("Cash flow", format!("Negative or missing cash flow in {} years", negative_cf));
    }

    // 12. source
    if is_real_provider_data(history) {
        report.pass("Data source", "Data fetched from provider");
    } else {
        let message = "Data source not verified (manual or incomplete)";
        report.issues.info.push(message.to_string());
        report.push("Data source", CheckStatus::Warning, message.to_string());
    }

    report.finish()
}
