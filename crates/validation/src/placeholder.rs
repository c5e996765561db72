use valuation_core::{HistoricalYear, ValidationResult};

use crate::strict::PLACEHOLDER_PRICE;

const MIN_PROVIDER_ROWS: usize = 5;

/// Reason the data looks like a placeholder, or `None` if it looks real
pub fn reject_placeholder_data(data: &[HistoricalYear], current_price: f64) -> Option<String> {
    if data.is_empty() {
        return Some("No annual data".to_string());
    }

    if data.len() == 1 {
        let row = &data[0];
        if row.earnings_per_share == 0.0 && row.cash_flow_per_share == 0.0 {
            return Some("Data appears to be placeholder (single row with zero values)".to_string());
        }
    }

    if current_price == PLACEHOLDER_PRICE || current_price == 0.0 {
        return Some(format!(
            "Current price appears to be placeholder ({})",
            current_price
        ));
    }

    if data.iter().all(|row| row.earnings_per_share == 0.0) {
        return Some("All EPS values are zero - likely placeholder data".to_string());
    }

    if data.len() > 1 && data.iter().all(|row| row.price_high == data[0].price_high) {
        return Some("All prices are identical - likely placeholder data".to_string());
    }

    None
}

/// At least one row was fetched from the data provider and at least five rows
/// carry real (finite, positive) prices
pub fn is_real_provider_data(data: &[HistoricalYear]) -> bool {
    let fetched = data.iter().any(|row| row.auto_fetched == Some(true));
    let priced = data
        .iter()
        .filter(|row| {
            row.price_high.is_finite()
                && row.price_high > 0.0
                && row.price_low.is_finite()
                && row.price_low > 0.0
        })
        .count();
    fetched && priced >= MIN_PROVIDER_ROWS
}

/// Placeholder data is an error; data not verified as provider-fetched is a warning
pub fn validate_real_data(data: &[HistoricalYear], current_price: f64) -> ValidationResult {
    let mut result = ValidationResult::default();
    if let Some(reason) = reject_placeholder_data(data, current_price) {
        result.merge(ValidationResult::error(reason));
    }
    if !is_real_provider_data(data) {
        result.merge(ValidationResult::from_parts(
            Vec::new(),
            vec!["Data is not verified as provider-fetched".to_string()],
        ));
    }
    result
}
