//! Statistical primitives shared by the analyzers.
//!
//! Everything here is a pure function over `&[f64]`. Inputs are never
//! mutated and no state is shared, so the functions are safe to call from
//! concurrent request branches.
//!
//! Degenerate inputs (empty slices, zero variance) produce defined zero
//! results instead of NaN or errors.

use serde::Serialize;

/// Critical value used for every confidence interval.
///
/// This is the two-sided 95% z value. It is applied regardless of the
/// requested level or sample size.
pub const Z_CRITICAL: f64 = 1.96;

/// Confidence level reported by [`welch_t_test`].
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Below this many degrees of freedom the p-value falls back to a threshold heuristic.
const NORMAL_APPROX_MIN_DF: f64 = 30.0;

/// |t| above which the small-sample heuristic reports p = 0.01.
const SMALL_SAMPLE_T_THRESHOLD: f64 = 2.0;

/// Round half away from zero at 0.01 resolution.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by n); 0 for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn standard_deviation(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Lower and upper bounds around a mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Copy with both bounds rounded to 2 decimals.
    pub fn rounded(&self) -> Self {
        Self {
            lower: round2(self.lower),
            upper: round2(self.upper),
        }
    }
}

/// Confidence interval of the mean.
///
/// Always uses [`Z_CRITICAL`]; `level` is accepted for API compatibility
/// but does not change the critical value.
pub fn confidence_interval(values: &[f64], level: f64) -> ConfidenceInterval {
    if values.is_empty() {
        return ConfidenceInterval::default();
    }
    if (level - DEFAULT_CONFIDENCE_LEVEL).abs() > f64::EPSILON {
        tracing::debug!(level, "Confidence level ignored; using fixed z = 1.96");
    }

    let m = mean(values);
    let margin = Z_CRITICAL * standard_deviation(values) / (values.len() as f64).sqrt();
    ConfidenceInterval {
        lower: m - margin,
        upper: m + margin,
    }
}

/// Pearson product-moment correlation.
///
/// Returns 0 when the slices differ in length, are empty, or either side has
/// zero variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut numerator = 0.0;
    let mut sum_sq_x = 0.0;
    let mut sum_sq_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        numerator += dx * dy;
        sum_sq_x += dx * dx;
        sum_sq_y += dy * dy;
    }

    let denominator = (sum_sq_x * sum_sq_y).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Percentile with linear interpolation between bracketing ranks.
///
/// `p` is on a 0-100 scale and is clamped into range. Empty input yields 0.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }

    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Which test produced a [`TTestResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    WelchTTest,
    InsufficientData,
}

/// Outcome of a two-sample comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TTestResult {
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    /// Cohen's d
    pub effect_size: f64,
    pub is_significant: bool,
    pub test_type: TestType,
    pub confidence_level: f64,
}

impl TTestResult {
    fn insufficient_data() -> Self {
        Self {
            t_statistic: 0.0,
            degrees_of_freedom: 0.0,
            p_value: 1.0,
            effect_size: 0.0,
            is_significant: false,
            test_type: TestType::InsufficientData,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        }
    }
}

/// Welch's unequal-variance t-test.
///
/// The p-value is approximate: a two-tailed normal approximation once the
/// Welch-Satterthwaite degrees of freedom reach 30, and a coarse threshold
/// (0.01 when |t| > 2, else 0.1) below that.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> TTestResult {
    if a.is_empty() || b.is_empty() {
        return TTestResult::insufficient_data();
    }

    let n_a = a.len() as f64;
    let n_b = b.len() as f64;
    let mean_a = mean(a);
    let mean_b = mean(b);
    let var_a = variance(a);
    let var_b = variance(b);

    let se_a = var_a / n_a;
    let se_b = var_b / n_b;
    let standard_error = (se_a + se_b).sqrt();

    let t_statistic = if standard_error > 0.0 {
        (mean_a - mean_b) / standard_error
    } else {
        0.0
    };

    let df_denominator = if n_a > 1.0 && n_b > 1.0 {
        se_a.powi(2) / (n_a - 1.0) + se_b.powi(2) / (n_b - 1.0)
    } else {
        0.0
    };
    let degrees_of_freedom = if df_denominator > 0.0 {
        (se_a + se_b).powi(2) / df_denominator
    } else {
        (n_a + n_b - 2.0).max(0.0)
    };

    let p_value = if degrees_of_freedom >= NORMAL_APPROX_MIN_DF {
        (2.0 * (1.0 - normal_cdf(t_statistic.abs()))).clamp(0.0, 1.0)
    } else if t_statistic.abs() > SMALL_SAMPLE_T_THRESHOLD {
        0.01
    } else {
        0.1
    };

    let pooled_sd = ((var_a + var_b) / 2.0).sqrt();
    let effect_size = if pooled_sd > 0.0 {
        (mean_a - mean_b) / pooled_sd
    } else {
        0.0
    };

    TTestResult {
        t_statistic,
        degrees_of_freedom,
        p_value,
        effect_size,
        is_significant: p_value < 1.0 - DEFAULT_CONFIDENCE_LEVEL,
        test_type: TestType::WelchTTest,
        confidence_level: DEFAULT_CONFIDENCE_LEVEL,
    }
}

/// Normal CDF approximation using Abramowitz and Stegun formula 7.1.26.
///
/// Accuracy: |error| < 7.5e-8
fn normal_cdf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs() / std::f64::consts::SQRT_2;

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    0.5 * (1.0 + sign * y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [f64; 6] = [2.0, 4.0, 4.0, 5.0, 7.0, 9.0];

    #[test]
    fn test_mean_and_variance() {
        assert!((mean(&SAMPLE) - 5.1667).abs() < 0.001);
        assert!((variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 4.0).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(variance(&[3.0]), 0.0);
    }

    #[test]
    fn test_standard_deviation_is_sqrt_of_variance() {
        let samples: [&[f64]; 3] = [&SAMPLE, &[1.0, 1.0, 1.0], &[-3.5, 0.0, 12.25]];
        for values in samples {
            let var = variance(values);
            assert!(var >= 0.0);
            assert!((standard_deviation(values) - var.sqrt()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_confidence_interval_brackets_mean() {
        let ci = confidence_interval(&SAMPLE, 0.95);
        let m = mean(&SAMPLE);
        assert!(ci.lower <= m && m <= ci.upper);

        let margin = 1.96 * standard_deviation(&SAMPLE) / (SAMPLE.len() as f64).sqrt();
        assert!((ci.upper - m - margin).abs() < 1e-12);

        // Level does not change the critical value
        assert_eq!(confidence_interval(&SAMPLE, 0.99), ci);

        let constant = confidence_interval(&[7.0, 7.0], 0.95);
        assert_eq!(constant.lower, 7.0);
        assert_eq!(constant.upper, 7.0);
    }

    #[test]
    fn test_confidence_interval_empty() {
        assert_eq!(
            confidence_interval(&[], 0.95),
            ConfidenceInterval {
                lower: 0.0,
                upper: 0.0
            }
        );
    }

    #[test]
    fn test_pearson_correlation() {
        assert!((pearson_correlation(&SAMPLE, &SAMPLE) - 1.0).abs() < 1e-9);

        let inverse: Vec<f64> = SAMPLE.iter().map(|v| -v).collect();
        assert!((pearson_correlation(&SAMPLE, &inverse) + 1.0).abs() < 1e-9);

        assert_eq!(pearson_correlation(&[], &[]), 0.0);
        assert_eq!(pearson_correlation(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(pearson_correlation(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [10.0, 1.0, 4.0, 7.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 10.0);
        // rank 1.5 between 4 and 7
        assert!((percentile(&values, 50.0) - 5.5).abs() < 1e-12);
        assert_eq!(percentile(&values, 150.0), 10.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
        // Input order untouched
        assert_eq!(values, [10.0, 1.0, 4.0, 7.0]);
    }

    #[test]
    fn test_welch_identical_samples() {
        let result = welch_t_test(&SAMPLE, &SAMPLE);
        assert_eq!(result.effect_size, 0.0);
        assert!(!result.is_significant);
        assert!(result.p_value > 0.05);
        assert_eq!(result.test_type, TestType::WelchTTest);

        let large: Vec<f64> = (0..100).map(|i| (i % 10) as f64).collect();
        let result = welch_t_test(&large, &large);
        assert_eq!(result.effect_size, 0.0);
        assert!(result.degrees_of_freedom >= 30.0);
        assert!(result.p_value > 0.05);
    }

    #[test]
    fn test_welch_empty_inputs() {
        let result = welch_t_test(&[], &[]);
        assert!(!result.is_significant);
        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.effect_size, 0.0);
        assert_eq!(result.test_type, TestType::InsufficientData);
        assert_eq!(result.confidence_level, 0.95);

        assert_eq!(
            welch_t_test(&SAMPLE, &[]).test_type,
            TestType::InsufficientData
        );
    }

    #[test]
    fn test_welch_detects_large_difference() {
        let a: Vec<f64> = (0..40).map(|i| 8.0 + (i % 3) as f64 * 0.1).collect();
        let b: Vec<f64> = (0..40).map(|i| 6.0 + (i % 3) as f64 * 0.1).collect();
        let result = welch_t_test(&a, &b);
        assert!(result.t_statistic > 0.0);
        assert!(result.is_significant);
        assert!(result.p_value < 0.05);
        assert!(result.effect_size > 0.8);
    }

    #[test]
    fn test_welch_small_sample_heuristic() {
        let result = welch_t_test(&[9.0, 9.5, 9.2], &[5.0, 5.5, 5.1]);
        assert!(result.degrees_of_freedom < 30.0);
        assert_eq!(result.p_value, 0.01);

        let result = welch_t_test(&[5.0, 6.0, 7.0], &[5.5, 6.5, 7.5]);
        assert_eq!(result.p_value, 0.1);
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) + normal_cdf(1.96) - 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(8.754), 8.75);
        assert_eq!(round2(8.755000001), 8.76);
        assert_eq!(round2(-1.005000001), -1.01);
        assert_eq!(round2(0.0), 0.0);
    }
}
