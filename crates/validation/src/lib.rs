//! Input hygiene for stored valuation profiles: strict validators, placeholder
//! detection, the assumption sanitizer and the data-quality report.

pub mod placeholder;
pub mod quality;
pub mod sanitizer;
pub mod settings;
pub mod strict;

pub use placeholder::{is_real_provider_data, reject_placeholder_data, validate_real_data};
pub use quality::{
    detect_data_gaps, detect_duplicate_tickers, detect_potential_splits, detect_statistical_outliers,
    flag_suspicious_growth_rates, generate_data_quality_report, generate_data_quality_report_for_year,
    is_price_stale, CheckStatus, DataGap, DataQualityReport, PotentialSplit, QualityCheck, QualityIssues,
    SuspiciousGrowth,
};
pub use sanitizer::{
    sanitize_assumptions, sanitize_assumptions_async, sanitize_assumptions_with, AssumptionField,
    ChangeReason, SanitizationChange, SanitizedAssumptions,
};
pub use settings::{BoundsProvider, CachedBoundsProvider, SanitizerBounds, StaticBounds};
pub use strict::{
    is_valid_eps, is_valid_price, validate_annual_data_array, validate_annual_data_array_for_year,
    validate_annual_data_row, validate_annual_data_row_for_year, validate_assumptions,
    validate_assumptions_for_year, validate_company_info, validate_profile, validate_profile_for_year,
    PLACEHOLDER_PRICE,
};
