//! Shared statistics used by the target-price detector and the data-quality checks.
//! Stateless functions over plain slices.
use statrs::statistics::Statistics;

/// True median: mean of the two central values for even-length input.
/// Returns 0.0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Population standard deviation (divides by n), 0.0 for an empty slice
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_std_dev()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_odd_and_even() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        // Even count averages the central pair instead of taking the upper one
        assert_relative_eq!(median(&[10.0, 40.0, 20.0, 30.0]), 25.0);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_population_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_std_dev(&values), 2.0, epsilon = 1e-12);
        assert_relative_eq!(population_std_dev(&[5.0]), 0.0);
        assert_eq!(population_std_dev(&[]), 0.0);
    }

    #[test]
    fn test_mean() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(mean(&[]), 0.0);
    }
}
