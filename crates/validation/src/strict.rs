//! Strict validators for ingested snapshot data.
//!
//! They reject placeholder or synthetic values outright and never panic: every
//! problem is reported through `ValidationResult::errors` (blocking) or
//! `ValidationResult::warnings` (advisory).

use chrono::{Datelike, Utc};
use valuation_core::{Assumptions, CompanyInfo, HistoricalYear, ValidationResult};

/// Hard-coded default price that shows up in unfetched profiles
pub const PLACEHOLDER_PRICE: f64 = 100.0;

/// Names shown while a profile is still loading
const LOADING_NAMES: &[&str] = &["Chargement...", "Loading...", "Loading"];

const MIN_YEAR: i32 = 1900;
const MIN_ROWS: usize = 3;
const MAX_YEAR_STEP: i32 = 2;
const MAX_BASE_YEAR_AGE: i32 = 5;
const GROWTH_WARN_LIMIT: f64 = 50.0;
const TARGET_PE_WARN_LIMIT: f64 = 100.0;

pub fn current_year() -> i32 {
    Utc::now().year()
}

/// Finite, positive and not the 100.0 placeholder
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0 && price != PLACEHOLDER_PRICE
}

/// Finite and non-zero. Negative EPS (a loss) is real data; exactly zero is usually a placeholder.
pub fn is_valid_eps(eps: f64) -> bool {
    eps.is_finite() && eps != 0.0
}

pub fn validate_annual_data_row(row: &HistoricalYear) -> ValidationResult {
    validate_annual_data_row_for_year(row, current_year())
}

pub fn validate_annual_data_row_for_year(row: &HistoricalYear, current_year: i32) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if row.year < MIN_YEAR || row.year > current_year + 2 {
        errors.push(format!("Invalid year: {}", row.year));
    }

    if !row.price_high.is_finite() || row.price_high <= 0.0 {
        errors.push(format!("Invalid priceHigh: {}", row.price_high));
    }
    if !row.price_low.is_finite() || row.price_low <= 0.0 {
        errors.push(format!("Invalid priceLow: {}", row.price_low));
    }
    if row.price_high < row.price_low {
        errors.push(format!(
            "priceHigh ({}) < priceLow ({})",
            row.price_high, row.price_low
        ));
    }

    if !row.earnings_per_share.is_finite() {
        errors.push(format!("Invalid EPS: {}", row.earnings_per_share));
    } else if row.earnings_per_share == 0.0 {
        warnings.push(format!("EPS is 0 for {} - may be placeholder", row.year));
    }

    if !row.cash_flow_per_share.is_finite() {
        errors.push(format!("Invalid cashFlowPerShare: {}", row.cash_flow_per_share));
    } else if row.cash_flow_per_share <= 0.0 {
        warnings.push(format!("Negative/zero cash flow for {}", row.year));
    }

    if !row.book_value_per_share.is_finite() {
        errors.push(format!("Invalid bookValuePerShare: {}", row.book_value_per_share));
    } else if row.book_value_per_share <= 0.0 {
        warnings.push(format!("Negative/zero book value for {}", row.year));
    }

    // Zero is fine here: non-dividend payers
    if !row.dividend_per_share.is_finite() {
        errors.push(format!("Invalid dividendPerShare: {}", row.dividend_per_share));
    }

    ValidationResult::from_parts(errors, warnings)
}

pub fn validate_annual_data_array(data: &[HistoricalYear]) -> ValidationResult {
    validate_annual_data_array_for_year(data, current_year())
}

/// Needs at least 3 rows, at least 3 of them individually valid. Year gaps are advisory.
pub fn validate_annual_data_array_for_year(data: &[HistoricalYear], current_year: i32) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if data.len() < MIN_ROWS {
        errors.push(format!(
            "Insufficient data: {} years (minimum {} required)",
            data.len(),
            MIN_ROWS
        ));
    }

    let mut valid_rows = 0usize;
    for (index, row) in data.iter().enumerate() {
        let result = validate_annual_data_row_for_year(row, current_year);
        if result.is_valid {
            valid_rows += 1;
        }
        errors.extend(
            result
                .errors
                .into_iter()
                .map(|e| format!("Row {} ({}): {}", index, row.year, e)),
        );
        warnings.extend(
            result
                .warnings
                .into_iter()
                .map(|w| format!("Row {} ({}): {}", index, row.year, w)),
        );
    }

    if valid_rows < MIN_ROWS {
        errors.push(format!(
            "Only {} valid rows (minimum {} required)",
            valid_rows, MIN_ROWS
        ));
    }

    let mut years: Vec<i32> = data.iter().map(|row| row.year).collect();
    years.sort_unstable();
    for pair in years.windows(2) {
        if pair[1] - pair[0] > MAX_YEAR_STEP {
            warnings.push(format!("Gap in years: {} to {}", pair[0], pair[1]));
        }
    }

    ValidationResult::from_parts(errors, warnings)
}

pub fn validate_company_info(info: &CompanyInfo) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if info.symbol.trim().is_empty() {
        errors.push("Missing symbol".to_string());
    }

    let name = info.name.trim();
    if name.is_empty() || LOADING_NAMES.contains(&name) {
        errors.push("Missing or placeholder company name".to_string());
    }

    if info.sector.trim().is_empty() {
        warnings.push("Missing sector".to_string());
    }

    let market_cap = info.market_cap.trim();
    if market_cap.is_empty() || market_cap == "N/A" || market_cap == "0" {
        warnings.push("Missing or invalid marketCap".to_string());
    }

    ValidationResult::from_parts(errors, warnings)
}

pub fn validate_assumptions(assumptions: &Assumptions) -> ValidationResult {
    validate_assumptions_for_year(assumptions, current_year())
}

pub fn validate_assumptions_for_year(assumptions: &Assumptions, current_year: i32) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !is_valid_price(assumptions.current_price) {
        errors.push(format!("Invalid currentPrice: {}", assumptions.current_price));
    }

    let base_year = assumptions.base_year;
    if base_year < current_year - MAX_BASE_YEAR_AGE || base_year > current_year + 1 {
        warnings.push(format!("baseYear {} may be outdated", base_year));
    }

    let growth_rates = [
        ("growthRateEPS", assumptions.growth_rate_eps),
        ("growthRateSales", assumptions.growth_rate_sales),
        ("growthRateCF", assumptions.growth_rate_cf),
        ("growthRateBV", assumptions.growth_rate_bv),
        ("growthRateDiv", assumptions.growth_rate_div),
    ];
    for (field, value) in growth_rates {
        if !value.is_finite() {
            warnings.push(format!("{} is not a number", field));
        } else if value < -GROWTH_WARN_LIMIT || value > GROWTH_WARN_LIMIT {
            warnings.push(format!("{} ({}%) seems extreme", field, value));
        }
    }

    let target_pe = assumptions.target_pe;
    if !(target_pe > 0.0 && target_pe <= TARGET_PE_WARN_LIMIT) {
        warnings.push(format!("targetPE {} seems extreme", target_pe));
    }

    ValidationResult::from_parts(errors, warnings)
}

/// Union of the array, company-info and assumptions validators
pub fn validate_profile(
    data: &[HistoricalYear],
    info: &CompanyInfo,
    assumptions: &Assumptions,
) -> ValidationResult {
    validate_profile_for_year(data, info, assumptions, current_year())
}

pub fn validate_profile_for_year(
    data: &[HistoricalYear],
    info: &CompanyInfo,
    assumptions: &Assumptions,
    current_year: i32,
) -> ValidationResult {
    let mut result = validate_annual_data_array_for_year(data, current_year);
    result.merge(validate_company_info(info));
    result.merge(validate_assumptions_for_year(assumptions, current_year));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: i32 = 2025;

    fn row(year: i32) -> HistoricalYear {
        HistoricalYear {
            year,
            price_high: 120.0,
            price_low: 80.0,
            cash_flow_per_share: 6.0,
            dividend_per_share: 1.5,
            book_value_per_share: 30.0,
            earnings_per_share: 4.0,
            is_estimate: None,
            auto_fetched: Some(true),
        }
    }

    fn info() -> CompanyInfo {
        CompanyInfo {
            symbol: "ACME".to_string(),
            name: "Acme Industries".to_string(),
            sector: "Industrials".to_string(),
            market_cap: "12.4B".to_string(),
            ..Default::default()
        }
    }

    fn assumptions() -> Assumptions {
        Assumptions {
            current_price: 97.5,
            current_dividend: 1.5,
            ..Assumptions::neutral(2024)
        }
    }

    #[test]
    fn test_price_validity() {
        assert!(is_valid_price(42.0));
        assert!(!is_valid_price(100.0));
        assert!(!is_valid_price(0.0));
        assert!(!is_valid_price(-5.0));
        assert!(!is_valid_price(f64::NAN));
        assert!(!is_valid_price(f64::INFINITY));
    }

    #[test]
    fn test_eps_validity() {
        assert!(is_valid_eps(-1.2));
        assert!(is_valid_eps(3.0));
        assert!(!is_valid_eps(0.0));
        assert!(!is_valid_eps(f64::NAN));
    }

    #[test]
    fn test_valid_row() {
        let result = validate_annual_data_row_for_year(&row(2024), YEAR);
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_row_errors() {
        let mut bad = row(1850);
        bad.price_high = 50.0;
        bad.price_low = 60.0;
        bad.dividend_per_share = f64::NAN;
        let result = validate_annual_data_row_for_year(&bad, YEAR);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e == "Invalid year: 1850"));
        assert!(result.errors.iter().any(|e| e.starts_with("priceHigh (50) < priceLow (60)")));
        assert!(result.errors.iter().any(|e| e.starts_with("Invalid dividendPerShare")));

        let far_future = validate_annual_data_row_for_year(&row(YEAR + 3), YEAR);
        assert!(!far_future.is_valid);
        assert!(validate_annual_data_row_for_year(&row(YEAR + 2), YEAR).is_valid);
    }

    #[test]
    fn test_row_warnings_do_not_block() {
        let mut loss = row(2023);
        loss.earnings_per_share = 0.0;
        loss.cash_flow_per_share = -1.0;
        loss.book_value_per_share = 0.0;
        loss.dividend_per_share = 0.0;
        let result = validate_annual_data_row_for_year(&loss, YEAR);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 3);

        let mut negative_eps = row(2023);
        negative_eps.earnings_per_share = -2.5;
        let result = validate_annual_data_row_for_year(&negative_eps, YEAR);
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_array_too_short() {
        let result = validate_annual_data_array_for_year(&[row(2023), row(2024)], YEAR);
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("Insufficient data: 2 years"));
        assert!(result.errors.iter().any(|e| e.starts_with("Only 2 valid rows")));
    }

    #[test]
    fn test_array_needs_three_valid_rows() {
        let mut broken = row(2022);
        broken.price_low = 0.0;
        let data = vec![row(2021), broken, row(2023)];
        let result = validate_annual_data_array_for_year(&data, YEAR);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.starts_with("Row 1 (2022): Invalid priceLow")));
        assert!(result.errors.iter().any(|e| e.starts_with("Only 2 valid rows")));
    }

    #[test]
    fn test_array_year_gap_warning() {
        let data = vec![row(2024), row(2016), row(2019), row(2020)];
        let result = validate_annual_data_array_for_year(&data, YEAR);
        assert!(result.is_valid);
        assert_eq!(result.warnings, vec!["Gap in years: 2016 to 2019", "Gap in years: 2020 to 2024"]);
    }

    #[test]
    fn test_company_info() {
        assert!(validate_company_info(&info()).is_valid);

        let mut loading = info();
        loading.name = "Chargement...".to_string();
        loading.symbol = "  ".to_string();
        let result = validate_company_info(&loading);
        assert_eq!(result.errors.len(), 2);

        let mut sparse = info();
        sparse.sector.clear();
        sparse.market_cap = "N/A".to_string();
        let result = validate_company_info(&sparse);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_placeholder_price_is_an_error() {
        let mut a = assumptions();
        a.current_price = 100.0;
        let result = validate_assumptions_for_year(&a, YEAR);
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["Invalid currentPrice: 100"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_assumption_warnings() {
        let mut a = assumptions();
        a.base_year = 2015;
        a.growth_rate_sales = 75.0;
        a.growth_rate_div = f64::NAN;
        a.target_pe = 0.0;
        let result = validate_assumptions_for_year(&a, YEAR);
        assert!(result.is_valid);
        assert!(result.warnings.contains(&"baseYear 2015 may be outdated".to_string()));
        assert!(result.warnings.contains(&"growthRateSales (75%) seems extreme".to_string()));
        assert!(result.warnings.contains(&"growthRateDiv is not a number".to_string()));
        assert!(result.warnings.contains(&"targetPE 0 seems extreme".to_string()));

        let mut future = assumptions();
        future.base_year = YEAR + 2;
        assert_eq!(validate_assumptions_for_year(&future, YEAR).warnings.len(), 1);
    }

    #[test]
    fn test_profile_is_union() {
        let data = vec![row(2022), row(2023)];
        let mut bad_info = info();
        bad_info.sector.clear();
        let mut a = assumptions();
        a.current_price = 0.0;
        let result = validate_profile_for_year(&data, &bad_info, &a, YEAR);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.starts_with("Insufficient data")));
        assert!(result.errors.iter().any(|e| e.starts_with("Invalid currentPrice")));
        assert!(result.warnings.contains(&"Missing sector".to_string()));

        let full = vec![row(2022), row(2023), row(2024)];
        assert!(validate_profile_for_year(&full, &info(), &assumptions(), YEAR).is_valid);
    }
}
