use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

fn nan() -> f64 {
    f64::NAN
}

/// Stored snapshots sometimes carry `null` where a number belongs. Read it as NaN
/// so the validators and the sanitizer treat it as a non-finite input.
fn nullable_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// One fiscal year of per-share fundamentals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalYear {
    #[serde(default)]
    pub year: i32,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub price_high: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub price_low: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub cash_flow_per_share: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub dividend_per_share: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub book_value_per_share: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub earnings_per_share: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_estimate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_fetched: Option<bool>,
}

impl HistoricalYear {
    /// Per-share value of the fundamental behind `metric`
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Eps => self.earnings_per_share,
            Metric::Cf => self.cash_flow_per_share,
            Metric::Bv => self.book_value_per_share,
            Metric::Div => self.dividend_per_share,
        }
    }

    pub fn mid_price(&self) -> f64 {
        (self.price_high + self.price_low) / 2.0
    }
}

/// Forward-looking valuation assumptions for one ticker.
///
/// Nothing is enforced on construction; `validation::sanitize_assumptions` is what
/// brings every field into its safe range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumptions {
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub current_price: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub current_dividend: f64,
    #[serde(rename = "growthRateEPS", default = "nan", deserialize_with = "nullable_f64")]
    pub growth_rate_eps: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub growth_rate_sales: f64,
    #[serde(rename = "growthRateCF", default = "nan", deserialize_with = "nullable_f64")]
    pub growth_rate_cf: f64,
    #[serde(rename = "growthRateBV", default = "nan", deserialize_with = "nullable_f64")]
    pub growth_rate_bv: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub growth_rate_div: f64,
    #[serde(rename = "targetPE", default = "nan", deserialize_with = "nullable_f64")]
    pub target_pe: f64,
    #[serde(rename = "targetPCF", default = "nan", deserialize_with = "nullable_f64")]
    pub target_pcf: f64,
    #[serde(rename = "targetPBV", default = "nan", deserialize_with = "nullable_f64")]
    pub target_pbv: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub target_yield: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub required_return: f64,
    #[serde(default = "nan", deserialize_with = "nullable_f64")]
    pub dividend_payout_ratio: f64,
    #[serde(default)]
    pub base_year: i32,
    #[serde(rename = "excludeEPS", default)]
    pub exclude_eps: bool,
    #[serde(rename = "excludeCF", default)]
    pub exclude_cf: bool,
    #[serde(rename = "excludeBV", default)]
    pub exclude_bv: bool,
    #[serde(rename = "excludeDIV", default)]
    pub exclude_div: bool,
}

impl Assumptions {
    /// Neutral assumptions anchored on `base_year`. Current price is 0 ("unknown").
    pub fn neutral(base_year: i32) -> Self {
        Self {
            current_price: 0.0,
            current_dividend: 0.0,
            growth_rate_eps: 5.0,
            growth_rate_sales: 5.0,
            growth_rate_cf: 5.0,
            growth_rate_bv: 5.0,
            growth_rate_div: 0.0,
            target_pe: 15.0,
            target_pcf: 10.0,
            target_pbv: 2.0,
            target_yield: 2.0,
            required_return: 10.0,
            dividend_payout_ratio: 30.0,
            base_year,
            exclude_eps: false,
            exclude_cf: false,
            exclude_bv: false,
            exclude_div: false,
        }
    }

    /// Growth-rate assumption (percent) used to project `metric`
    pub fn growth_rate(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Eps => self.growth_rate_eps,
            Metric::Cf => self.growth_rate_cf,
            Metric::Bv => self.growth_rate_bv,
            Metric::Div => self.growth_rate_div,
        }
    }

    pub fn is_excluded(&self, metric: Metric) -> bool {
        match metric {
            Metric::Eps => self.exclude_eps,
            Metric::Cf => self.exclude_cf,
            Metric::Bv => self.exclude_bv,
            Metric::Div => self.exclude_div,
        }
    }

    pub fn set_excluded(&mut self, metric: Metric, excluded: bool) {
        match metric {
            Metric::Eps => self.exclude_eps = excluded,
            Metric::Cf => self.exclude_cf = excluded,
            Metric::Bv => self.exclude_bv = excluded,
            Metric::Div => self.exclude_div = excluded,
        }
    }

    /// Copy the exclusion flags of an outlier decision into these assumptions
    pub fn apply_decision(&mut self, decision: &OutlierDecision) {
        for metric in Metric::ALL {
            self.set_excluded(metric, decision.is_excluded(metric));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sector: String,
    /// Stored as display text ("2.8T", "N/A", ...)
    #[serde(default)]
    pub market_cap: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_symbol: Option<String>,
}

/// Persisted bundle for one ticker at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub annual_data: Vec<HistoricalYear>,
    pub assumptions: Assumptions,
    #[serde(default)]
    pub company_info: CompanyInfo,
    #[serde(default)]
    pub snapshot_date: String,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub auto_fetched: bool,
}

/// The four valuation routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "EPS")]
    Eps,
    #[serde(rename = "CF")]
    Cf,
    #[serde(rename = "BV")]
    Bv,
    #[serde(rename = "DIV")]
    Div,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Eps, Metric::Cf, Metric::Bv, Metric::Div];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Eps => "EPS",
            Metric::Cf => "CF",
            Metric::Bv => "BV",
            Metric::Div => "DIV",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Candidate 5-year target prices. Exactly 0 means "not computable / rejected".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetPriceSet {
    pub eps: f64,
    pub cf: f64,
    pub bv: f64,
    pub div: f64,
}

impl TargetPriceSet {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Eps => self.eps,
            Metric::Cf => self.cf,
            Metric::Bv => self.bv,
            Metric::Div => self.div,
        }
    }

    pub fn set(&mut self, metric: Metric, price: f64) {
        match metric {
            Metric::Eps => self.eps = price,
            Metric::Cf => self.cf = price,
            Metric::Bv => self.bv = price,
            Metric::Div => self.div = price,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL.into_iter().map(move |m| (m, self.get(m)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierDecision {
    #[serde(rename = "excludeEPS")]
    pub exclude_eps: bool,
    #[serde(rename = "excludeCF")]
    pub exclude_cf: bool,
    #[serde(rename = "excludeBV")]
    pub exclude_bv: bool,
    #[serde(rename = "excludeDIV")]
    pub exclude_div: bool,
    /// Metrics newly excluded by this run
    #[serde(rename = "detectedOutliers")]
    pub detected_outliers: Vec<Metric>,
}

impl OutlierDecision {
    /// Decision that carries the caller's existing flags and flags nothing new
    pub fn unchanged(assumptions: &Assumptions) -> Self {
        Self {
            exclude_eps: assumptions.exclude_eps,
            exclude_cf: assumptions.exclude_cf,
            exclude_bv: assumptions.exclude_bv,
            exclude_div: assumptions.exclude_div,
            detected_outliers: Vec::new(),
        }
    }

    pub fn is_excluded(&self, metric: Metric) -> bool {
        match metric {
            Metric::Eps => self.exclude_eps,
            Metric::Cf => self.exclude_cf,
            Metric::Bv => self.exclude_bv,
            Metric::Div => self.exclude_div,
        }
    }

    pub fn set_excluded(&mut self, metric: Metric, excluded: bool) {
        match metric {
            Metric::Eps => self.exclude_eps = excluded,
            Metric::Cf => self.exclude_cf = excluded,
            Metric::Bv => self.exclude_bv = excluded,
            Metric::Div => self.exclude_div = excluded,
        }
    }
}

/// Validation result: errors block acceptance, warnings are advisory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::from_parts(vec![message.into()], Vec::new())
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.is_valid = self.errors.is_empty();
    }

    pub fn outcome(&self) -> ValidationOutcome {
        if !self.errors.is_empty() {
            ValidationOutcome::Error
        } else if !self.warnings.is_empty() {
            ValidationOutcome::Warn
        } else {
            ValidationOutcome::Ok
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationOutcome {
    Ok,
    Warn,
    Error,
}
