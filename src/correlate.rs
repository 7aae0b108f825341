use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    error::{EngineError, Result},
    frame::DataFrame,
    numeric,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
    Kendall,
}

impl std::fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::Spearman => "spearman",
            CorrelationMethod::Kendall => "kendall",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for CorrelationMethod {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            "kendall" => Ok(CorrelationMethod::Kendall),
            other => Err(EngineError::UnsupportedMethod {
                operation: "correlation",
                method: other.to_string(),
            }),
        }
    }
}

/// Pairwise correlation between two named columns. Rows where either side
/// is missing are excluded; a constant column yields NaN, as the
/// conventional statistics stacks do.
pub fn correlation(
    frame: &DataFrame,
    feature_a: &str,
    feature_b: &str,
    method: CorrelationMethod,
) -> Result<f64> {
    let (xs, ys) = complete_pairs(frame, feature_a, feature_b)?;
    if xs.len() < 2 {
        return Err(EngineError::invalid_input(
            "correlation",
            format!(
                "need at least two complete rows for '{feature_a}' and '{feature_b}', got {}",
                xs.len()
            ),
        ));
    }
    let value = match method {
        CorrelationMethod::Pearson => numeric::pearson(&xs, &ys),
        CorrelationMethod::Spearman => {
            numeric::pearson(&numeric::ranks(&xs), &numeric::ranks(&ys))
        }
        CorrelationMethod::Kendall => kendall_tau_b(&xs, &ys),
    };
    Ok(value.unwrap_or(f64::NAN))
}

/// Rows where both columns carry a numeric value.
fn complete_pairs(frame: &DataFrame, a: &str, b: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut missing = Vec::new();
    if !frame.has_feature(a) {
        missing.push(a);
    }
    if !frame.has_feature(b) {
        missing.push(b);
    }
    if !missing.is_empty() {
        return Err(EngineError::missing_columns(&missing));
    }
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (row, record) in frame.records.iter().enumerate() {
        let left = record.get(a).unwrap_or(&Value::Null);
        let right = record.get(b).unwrap_or(&Value::Null);
        if left.is_null() || right.is_null() {
            continue;
        }
        let left = left.as_f64().ok_or_else(|| {
            EngineError::invalid_input(
                "correlation",
                format!("column '{a}' is not numeric at row {}", row + 1),
            )
        })?;
        let right = right.as_f64().ok_or_else(|| {
            EngineError::invalid_input(
                "correlation",
                format!("column '{b}' is not numeric at row {}", row + 1),
            )
        })?;
        xs.push(left);
        ys.push(right);
    }
    Ok((xs, ys))
}

/// Kendall rank correlation with tie correction (tau-b).
fn kendall_tau_b(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    let mut ties_x = 0i64;
    let mut ties_y = 0i64;
    for i in 0..n {
        for j in i + 1..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            if dx == 0.0 && dy == 0.0 {
                ties_x += 1;
                ties_y += 1;
            } else if dx == 0.0 {
                ties_x += 1;
            } else if dy == 0.0 {
                ties_y += 1;
            } else if (dx > 0.0) == (dy > 0.0) {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }
    let total = (n * (n - 1) / 2) as i64;
    let denominator = (((total - ties_x) as f64) * ((total - ties_y) as f64)).sqrt();
    if denominator == 0.0 {
        return None;
    }
    Some((concordant - discordant) as f64 / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::from_numeric_columns(&[
            ("feature1", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            ("feature2", &[2.0, 4.0, 6.0, 8.0, 10.0]),
            ("feature3", &[5.0, 3.0, 1.0, 3.0, 5.0]),
        ])
    }

    #[test]
    fn pearson_on_linear_transform_is_one() {
        let r = correlation(&sample(), "feature1", "feature2", CorrelationMethod::Pearson)
            .unwrap();
        assert!((r - 1.0).abs() < 1e-10);
    }

    #[test]
    fn self_correlation_is_one_for_every_method() {
        for method in [
            CorrelationMethod::Pearson,
            CorrelationMethod::Spearman,
            CorrelationMethod::Kendall,
        ] {
            let r = correlation(&sample(), "feature1", "feature1", method).unwrap();
            assert!((r - 1.0).abs() < 1e-10, "{method} self-correlation {r}");
        }
    }

    #[test]
    fn spearman_tracks_monotonic_nonlinear_data() {
        let frame = DataFrame::from_numeric_columns(&[
            ("x", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            ("y", &[1.0, 8.0, 27.0, 64.0, 125.0]),
        ]);
        let r = correlation(&frame, "x", "y", CorrelationMethod::Spearman).unwrap();
        assert!((r - 1.0).abs() < 1e-10);
    }

    #[test]
    fn kendall_handles_discordant_pairs() {
        let frame = DataFrame::from_numeric_columns(&[
            ("x", &[1.0, 2.0, 3.0]),
            ("y", &[3.0, 1.0, 2.0]),
        ]);
        let r = correlation(&frame, "x", "y", CorrelationMethod::Kendall).unwrap();
        assert!((r + 1.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn missing_columns_are_reported_together() {
        let err = correlation(&sample(), "ghost1", "ghost2", CorrelationMethod::Pearson)
            .unwrap_err();
        assert!(err.to_string().contains("ghost1"));
        assert!(err.to_string().contains("ghost2"));
    }

    #[test]
    fn unsupported_method_string_is_rejected() {
        let err = "covariance".parse::<CorrelationMethod>().unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedMethod { .. }));
    }
}
