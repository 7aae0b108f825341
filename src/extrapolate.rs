//! Extrapolation: predictions at explicit target x values. Linear here is
//! an ordinary least-squares regression rather than piecewise evaluation;
//! the spline variant is fixed to cubic with end-segment extension.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    curvefit::coerce_degree,
    error::{EngineError, Result},
    frame::DataFrame,
    interpolate::{NaturalCubicSpline, log_linear_fit},
    numeric,
};

pub const DEFAULT_DEGREE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtrapolationMethod {
    Linear,
    Polynomial,
    Exponential,
    Spline,
}

impl std::fmt::Display for ExtrapolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExtrapolationMethod::Linear => "linear",
            ExtrapolationMethod::Polynomial => "polynomial",
            ExtrapolationMethod::Exponential => "exponential",
            ExtrapolationMethod::Spline => "spline",
        };
        write!(f, "{label}")
    }
}

pub fn extrapolate(
    frame: &DataFrame,
    x_feature: &str,
    y_feature: &str,
    target_x: &[f64],
    method: ExtrapolationMethod,
    degree: f64,
) -> Result<DataFrame> {
    if target_x.is_empty() {
        return Err(EngineError::invalid_input(
            "extrapolation",
            "no target x values given",
        ));
    }
    let (xs, ys) = frame.numeric_pair_dropping_null_y(x_feature, y_feature)?;
    if xs.len() < 2 {
        return Err(EngineError::invalid_input(
            "extrapolation",
            format!("need at least two usable rows, got {}", xs.len()),
        ));
    }

    let predicted = match method {
        ExtrapolationMethod::Linear => {
            let (slope, intercept) = numeric::ols_line(&xs, &ys).ok_or_else(|| {
                EngineError::CurveFitFailed(
                    "linear extrapolation needs at least two distinct x values".into(),
                )
            })?;
            target_x.iter().map(|&t| slope * t + intercept).collect()
        }
        ExtrapolationMethod::Polynomial => {
            let degree = coerce_degree(degree)?;
            let coefficients = numeric::polyfit(&xs, &ys, degree).ok_or_else(|| {
                EngineError::CurveFitFailed(format!(
                    "polynomial extrapolation of degree {degree} is singular"
                ))
            })?;
            target_x
                .iter()
                .map(|&t| numeric::polyval(&coefficients, t))
                .collect()
        }
        ExtrapolationMethod::Exponential => {
            let (scale, rate) = log_linear_fit(&xs, &ys, "exponential extrapolation")?;
            target_x.iter().map(|&t| scale * (rate * t).exp()).collect()
        }
        ExtrapolationMethod::Spline => {
            let spline = NaturalCubicSpline::fit(&xs, &ys)?;
            target_x.iter().map(|&t| spline.evaluate(t)).collect::<Vec<_>>()
        }
    };

    Ok(DataFrame::from_numeric_columns(&[
        (x_feature, target_x),
        (y_feature, &predicted),
    ]))
}
