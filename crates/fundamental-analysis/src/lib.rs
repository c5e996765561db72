pub mod blend;
pub mod engine;
pub mod historical;
pub mod outlier;
pub mod projection;
pub mod target_price;

pub use blend::{blend_valuation, BlendedValuation};
pub use engine::{Valuation, ValuationEngine};
pub use historical::{scan_historical_outliers, HistoricalOutlier};
pub use outlier::{
    analyze_dispersion, detect_outlier_metrics, detect_outliers_in, dispersion_for_targets,
    is_implausible_return, DispersionReport, MetricDispersion,
};
pub use projection::{project_future_value, PROJECTION_YEARS};
pub use target_price::{compute_target_prices, select_base_row};
