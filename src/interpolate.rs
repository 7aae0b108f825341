//! Interpolation over a named (x, y) column pair: evenly spaced resampling
//! across a value range, with linear extension outside the observed span.
//!
//! Rows missing a y value are dropped before fitting, with x filtered in
//! lockstep. Linear interpolation never fails on numerically undefined
//! output; such samples are zero-filled and a warning is logged.

use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    curvefit::coerce_degree,
    error::{EngineError, Result},
    frame::DataFrame,
    numeric,
};

pub const DEFAULT_NUM_POINTS: usize = 100;
pub const DEFAULT_DEGREE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationKind {
    Linear,
    Polynomial,
    Spline,
    Exponential,
}

impl std::fmt::Display for InterpolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            InterpolationKind::Linear => "linear",
            InterpolationKind::Polynomial => "polynomial",
            InterpolationKind::Spline => "spline",
            InterpolationKind::Exponential => "exponential",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone)]
pub struct InterpolateOptions {
    pub num_points: usize,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub degree: f64,
}

impl Default for InterpolateOptions {
    fn default() -> Self {
        Self {
            num_points: DEFAULT_NUM_POINTS,
            min_value: None,
            max_value: None,
            degree: DEFAULT_DEGREE,
        }
    }
}

pub fn interpolate(
    frame: &DataFrame,
    x_feature: &str,
    y_feature: &str,
    kind: InterpolationKind,
    options: &InterpolateOptions,
) -> Result<DataFrame> {
    let (xs, ys) = frame.numeric_pair_dropping_null_y(x_feature, y_feature)?;
    if xs.is_empty() {
        return Err(EngineError::invalid_input(
            "interpolation",
            "no usable rows after dropping missing y values",
        ));
    }

    let observed_min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let observed_max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_value = options.min_value.unwrap_or(observed_min);
    let max_value = options.max_value.unwrap_or(observed_max);
    let grid = numeric::linspace(min_value, max_value, options.num_points);

    let fitted = match kind {
        InterpolationKind::Linear => {
            let points = sorted_points(&xs, &ys);
            let mut undefined = 0usize;
            let fitted = grid
                .iter()
                .map(|&t| {
                    let value = piecewise_linear(&points, t);
                    if value.is_finite() {
                        value
                    } else {
                        undefined += 1;
                        0.0
                    }
                })
                .collect::<Vec<_>>();
            if undefined > 0 {
                warn!(
                    "Linear interpolation produced {undefined} undefined sample(s); zero-filled"
                );
            }
            fitted
        }
        InterpolationKind::Polynomial => {
            let degree = coerce_degree(options.degree)?;
            let coefficients = numeric::polyfit(&xs, &ys, degree).ok_or_else(|| {
                EngineError::CurveFitFailed(format!(
                    "polynomial interpolation of degree {degree} is singular"
                ))
            })?;
            grid.iter()
                .map(|&t| numeric::polyval(&coefficients, t))
                .collect()
        }
        InterpolationKind::Spline => {
            let degree = coerce_degree(options.degree)?;
            let order = degree.min(xs.len().saturating_sub(1));
            if order <= 1 {
                let points = sorted_points(&xs, &ys);
                grid.iter().map(|&t| piecewise_linear(&points, t)).collect()
            } else {
                let spline = NaturalCubicSpline::fit(&xs, &ys)?;
                grid.iter().map(|&t| spline.evaluate(t)).collect()
            }
        }
        InterpolationKind::Exponential => {
            let (scale, rate) = log_linear_fit(&xs, &ys, "exponential interpolation")?;
            grid.iter().map(|&t| scale * (rate * t).exp()).collect()
        }
    };

    Ok(DataFrame::from_numeric_columns(&[
        (x_feature, &grid),
        (y_feature, &fitted),
    ]))
}

/// Fits `log(y)` linearly against x and returns `(e^intercept, slope)` so
/// predictions read `scale · e^(rate·x)`. Shared with extrapolation.
pub(crate) fn log_linear_fit(
    xs: &[f64],
    ys: &[f64],
    operation: &'static str,
) -> Result<(f64, f64)> {
    if ys.iter().any(|&y| y <= 0.0) {
        return Err(EngineError::NonPositiveY { operation });
    }
    let log_y = ys.iter().map(|y| y.ln()).collect::<Vec<_>>();
    let (slope, intercept) = numeric::ols_line(xs, &log_y).ok_or_else(|| {
        EngineError::CurveFitFailed(format!(
            "{operation} needs at least two distinct x values"
        ))
    })?;
    Ok((intercept.exp(), slope))
}

pub(crate) fn sorted_points(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    let mut points = xs.iter().cloned().zip(ys.iter().cloned()).collect::<Vec<_>>();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points
}

/// Piecewise-linear evaluation with the end segments extended beyond the
/// sample range. Degenerate segments surface as non-finite values, which
/// callers decide how to treat.
pub(crate) fn piecewise_linear(points: &[(f64, f64)], t: f64) -> f64 {
    match points.len() {
        0 => f64::NAN,
        1 => points[0].1,
        _ => {
            let last = points.len() - 2;
            let mut segment = 0;
            while segment < last && points[segment + 1].0 < t {
                segment += 1;
            }
            let (x0, y0) = points[segment];
            let (x1, y1) = points[segment + 1];
            y0 + (y1 - y0) / (x1 - x0) * (t - x0)
        }
    }
}

/// Natural cubic interpolating spline over strictly increasing x. Outside
/// the knot range the end segments are evaluated as-is, extending the fit.
pub(crate) struct NaturalCubicSpline {
    knots: Vec<(f64, f64)>,
    second_derivatives: Vec<f64>,
}

impl NaturalCubicSpline {
    pub(crate) fn fit(xs: &[f64], ys: &[f64]) -> Result<Self> {
        let knots = sorted_points(xs, ys);
        let n = knots.len();
        if n < 3 {
            return Err(EngineError::invalid_input(
                "spline",
                format!("need at least three points, got {n}"),
            ));
        }
        if knots.windows(2).any(|pair| pair[1].0 <= pair[0].0) {
            return Err(EngineError::invalid_input(
                "spline",
                "x values must be strictly increasing",
            ));
        }

        // Thomas algorithm on the tridiagonal system for the interior
        // second derivatives; natural boundary keeps the ends at zero.
        let mut diagonal = vec![0.0; n];
        let mut off_diagonal = vec![0.0; n];
        let mut rhs = vec![0.0; n];
        for i in 1..n - 1 {
            let h_prev = knots[i].0 - knots[i - 1].0;
            let h_next = knots[i + 1].0 - knots[i].0;
            diagonal[i] = 2.0 * (h_prev + h_next);
            off_diagonal[i] = h_next;
            rhs[i] = 6.0
                * ((knots[i + 1].1 - knots[i].1) / h_next
                    - (knots[i].1 - knots[i - 1].1) / h_prev);
        }
        let mut second = vec![0.0; n];
        for i in 2..n - 1 {
            let h_prev = knots[i].0 - knots[i - 1].0;
            let factor = h_prev / diagonal[i - 1];
            diagonal[i] -= factor * off_diagonal[i - 1];
            rhs[i] -= factor * rhs[i - 1];
        }
        for i in (1..n - 1).rev() {
            let ahead = if i + 1 < n - 1 { second[i + 1] } else { 0.0 };
            second[i] = (rhs[i] - off_diagonal[i] * ahead) / diagonal[i];
        }

        Ok(Self {
            knots,
            second_derivatives: second,
        })
    }

    pub(crate) fn evaluate(&self, t: f64) -> f64 {
        let n = self.knots.len();
        let mut segment = 0;
        while segment < n - 2 && self.knots[segment + 1].0 < t {
            segment += 1;
        }
        let (x0, y0) = self.knots[segment];
        let (x1, y1) = self.knots[segment + 1];
        let m0 = self.second_derivatives[segment];
        let m1 = self.second_derivatives[segment + 1];
        let h = x1 - x0;
        let a = (x1 - t) / h;
        let b = (t - x0) / h;
        a * y0 + b * y1
            + ((a * a * a - a) * m0 + (b * b * b - b) * m1) * h * h / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::from_numeric_columns(&[
            ("feature1", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            ("feature2", &[2.0, 4.0, 6.0, 8.0, 10.0]),
        ])
    }

    #[test]
    fn linear_interpolation_spans_range_with_exact_count() {
        let result = interpolate(
            &sample(),
            "feature1",
            "feature2",
            InterpolationKind::Linear,
            &InterpolateOptions {
                num_points: 10,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(result.row_count(), 10);
        let xs = result.numeric_column("feature1").unwrap();
        assert!((xs[0] - 1.0).abs() < 1e-10);
        assert!((xs[9] - 5.0).abs() < 1e-10);
        let ys = result.numeric_column("feature2").unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert!((y - 2.0 * x).abs() < 1e-9);
        }
    }

    #[test]
    fn linear_interpolation_extends_past_range_without_clamping() {
        let result = interpolate(
            &sample(),
            "feature1",
            "feature2",
            InterpolationKind::Linear,
            &InterpolateOptions {
                num_points: 3,
                min_value: Some(0.0),
                max_value: Some(6.0),
                ..Default::default()
            },
        )
        .unwrap();
        let ys = result.numeric_column("feature2").unwrap();
        assert!((ys[0] - 0.0).abs() < 1e-9);
        assert!((ys[2] - 12.0).abs() < 1e-9);
    }

    #[test]
    fn rows_with_missing_y_are_dropped() {
        let mut frame = sample();
        frame.records[2].insert("feature2".to_string(), crate::data::Value::Null);
        let result = interpolate(
            &frame,
            "feature1",
            "feature2",
            InterpolationKind::Linear,
            &InterpolateOptions {
                num_points: 5,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(result.row_count(), 5);
    }

    #[test]
    fn polynomial_interpolation_matches_quadratic() {
        let xs = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = xs.iter().map(|x| x * x).collect::<Vec<_>>();
        let frame = DataFrame::from_numeric_columns(&[("x", &xs), ("y", &ys)]);
        let result = interpolate(
            &frame,
            "x",
            "y",
            InterpolationKind::Polynomial,
            &InterpolateOptions {
                num_points: 9,
                degree: 2.0,
                ..Default::default()
            },
        )
        .unwrap();
        let grid = result.numeric_column("x").unwrap();
        let fitted = result.numeric_column("y").unwrap();
        for (x, y) in grid.iter().zip(&fitted) {
            assert!((y - x * x).abs() < 1e-6);
        }
    }

    #[test]
    fn spline_passes_through_knots() {
        let xs = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = vec![0.0, 1.0, 0.0, 1.0, 0.0];
        let frame = DataFrame::from_numeric_columns(&[("x", &xs), ("y", &ys)]);
        let spline = NaturalCubicSpline::fit(&xs, &ys).unwrap();
        for (&x, &y) in xs.iter().zip(&ys) {
            assert!((spline.evaluate(x) - y).abs() < 1e-9, "knot at {x}");
        }
        let result = interpolate(
            &frame,
            "x",
            "y",
            InterpolationKind::Spline,
            &InterpolateOptions::default(),
        )
        .unwrap();
        assert_eq!(result.row_count(), DEFAULT_NUM_POINTS);
    }

    #[test]
    fn spline_order_one_degrades_to_linear() {
        let result = interpolate(
            &sample(),
            "feature1",
            "feature2",
            InterpolationKind::Spline,
            &InterpolateOptions {
                degree: 1.0,
                num_points: 7,
                ..Default::default()
            },
        )
        .unwrap();
        let xs = result.numeric_column("feature1").unwrap();
        let ys = result.numeric_column("feature2").unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert!((y - 2.0 * x).abs() < 1e-9);
        }
    }

    #[test]
    fn exponential_interpolation_requires_positive_y() {
        let frame = DataFrame::from_numeric_columns(&[
            ("x", &[1.0, 2.0, 3.0]),
            ("y", &[1.0, 0.0, 4.0]),
        ]);
        let err = interpolate(
            &frame,
            "x",
            "y",
            InterpolationKind::Exponential,
            &InterpolateOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NonPositiveY { .. }));
    }

    #[test]
    fn exponential_interpolation_recovers_growth_curve() {
        let xs: Vec<f64> = vec![0.0, 1.0, 2.0, 3.0];
        let ys = xs.iter().map(|x| 2.0 * (0.5 * x).exp()).collect::<Vec<_>>();
        let frame = DataFrame::from_numeric_columns(&[("x", &xs), ("y", &ys)]);
        let result = interpolate(
            &frame,
            "x",
            "y",
            InterpolationKind::Exponential,
            &InterpolateOptions {
                num_points: 4,
                ..Default::default()
            },
        )
        .unwrap();
        let fitted = result.numeric_column("y").unwrap();
        for (x, y) in result.numeric_column("x").unwrap().iter().zip(&fitted) {
            assert!((y - 2.0 * (0.5 * x).exp()).abs() < 1e-6);
        }
    }
}
