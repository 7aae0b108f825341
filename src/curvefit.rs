//! Curve fitting over a named (x, y) column pair: linear, polynomial, and
//! bounded exponential fits, each returning fitted parameters, a covariance
//! estimate where one exists, and a 100-point sampled curve spanning the
//! observed x range.

use clap::ValueEnum;
use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{
    error::{EngineError, Result},
    frame::DataFrame,
    numeric,
};

pub const CURVE_SAMPLES: usize = 100;

const MAX_LM_ITERATIONS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveFitMethod {
    Linear,
    Polynomial,
    Exponential,
}

impl std::fmt::Display for CurveFitMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CurveFitMethod::Linear => "linear",
            CurveFitMethod::Polynomial => "polynomial",
            CurveFitMethod::Exponential => "exponential",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurveFit {
    pub params: Vec<f64>,
    pub covariance: Option<Vec<Vec<f64>>>,
    pub curve: DataFrame,
}

/// Coerces a degree argument to an integer; fractional values are rejected.
pub fn coerce_degree(degree: f64) -> Result<usize> {
    if !degree.is_finite() || degree.fract() != 0.0 || degree < 0.0 {
        return Err(EngineError::InvalidDegree(degree));
    }
    Ok(degree as usize)
}

pub fn fit_curve(
    frame: &DataFrame,
    x_feature: &str,
    y_feature: &str,
    method: CurveFitMethod,
    degree: f64,
) -> Result<CurveFit> {
    let (xs, ys) = frame.numeric_pair(x_feature, y_feature)?;
    if xs.is_empty() {
        return Err(EngineError::invalid_input(
            "curve fitting",
            "dataset has no rows",
        ));
    }
    if xs.iter().chain(&ys).any(|v| !v.is_finite()) {
        return Err(EngineError::invalid_input(
            "curve fitting",
            "input contains non-finite values",
        ));
    }

    let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let grid = numeric::linspace(min, max, CURVE_SAMPLES);

    let (params, covariance, fitted): (Vec<f64>, Option<Vec<Vec<f64>>>, Vec<f64>) = match method {
        CurveFitMethod::Linear => {
            let (slope, intercept) = numeric::ols_line(&xs, &ys).ok_or_else(|| {
                EngineError::CurveFitFailed("linear fit needs at least two distinct x values".into())
            })?;
            let covariance = linear_covariance(&xs, &ys, slope, intercept);
            let fitted = grid.iter().map(|&x| slope * x + intercept).collect();
            (vec![slope, intercept], covariance, fitted)
        }
        CurveFitMethod::Polynomial => {
            let degree = coerce_degree(degree)?;
            let coefficients = numeric::polyfit(&xs, &ys, degree).ok_or_else(|| {
                EngineError::CurveFitFailed(format!(
                    "polynomial fit of degree {degree} is singular for the given data"
                ))
            })?;
            let fitted = grid
                .iter()
                .map(|&x| numeric::polyval(&coefficients, x))
                .collect();
            // no covariance estimate for the polynomial branch
            (coefficients, None, fitted)
        }
        CurveFitMethod::Exponential => {
            let (params, covariance) = fit_exponential(&xs, &ys)?;
            let fitted = grid
                .iter()
                .map(|&x| exponential(&params, x))
                .collect();
            (params.to_vec(), covariance, fitted)
        }
    };

    Ok(CurveFit {
        params,
        covariance,
        curve: DataFrame::from_numeric_columns(&[(x_feature, &grid), (y_feature, &fitted)]),
    })
}

/// Parameter covariance for the linear fit: `s² · (XᵀX)⁻¹` with the
/// residual variance estimated at `n − 2` degrees of freedom.
fn linear_covariance(
    xs: &[f64],
    ys: &[f64],
    slope: f64,
    intercept: f64,
) -> Option<Vec<Vec<f64>>> {
    let n = xs.len();
    if n <= 2 {
        return None;
    }
    let rss: f64 = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = y - (slope * x + intercept);
            r * r
        })
        .sum();
    let s2 = rss / (n - 2) as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();
    let det = n as f64 * sum_xx - sum_x * sum_x;
    if det == 0.0 {
        return None;
    }
    // inverse of [[sum_xx, sum_x], [sum_x, n]] scaled by s2
    Some(vec![
        vec![s2 * n as f64 / det, s2 * (-sum_x) / det],
        vec![s2 * (-sum_x) / det, s2 * sum_xx / det],
    ])
}

fn exponential(params: &[f64; 3], x: f64) -> f64 {
    params[0] * (params[1] * x).exp() + params[2]
}

/// Clamp to the fit bounds: `a ≥ 0`, `b ∈ [-1, 1]`, `c` free.
fn project(params: [f64; 3]) -> [f64; 3] {
    [params[0].max(0.0), params[1].clamp(-1.0, 1.0), params[2]]
}

fn residual_sum(params: &[f64; 3], xs: &[f64], ys: &[f64]) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = exponential(params, x) - y;
            r * r
        })
        .sum()
}

/// Bounded `y = a·e^(b·x) + c` fit via Levenberg–Marquardt with an analytic
/// Jacobian. Any non-finite intermediate is fatal, as is exhausting the
/// iteration budget without convergence.
fn fit_exponential(xs: &[f64], ys: &[f64]) -> Result<([f64; 3], Option<Vec<Vec<f64>>>)> {
    let y_max = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let y_min = ys.iter().cloned().fold(f64::INFINITY, f64::min);
    let mut params = project([y_max, 0.01, y_min]);
    let mut rss = residual_sum(&params, xs, ys);
    if !rss.is_finite() {
        return Err(EngineError::CurveFitFailed(
            "initial residual is not finite".into(),
        ));
    }

    let mut lambda = 1e-3;
    let mut converged = false;
    for iteration in 0..MAX_LM_ITERATIONS {
        let mut jtj = Array2::<f64>::zeros((3, 3));
        let mut jtr = Array1::<f64>::zeros(3);
        for (&x, &y) in xs.iter().zip(ys) {
            let ebx = (params[1] * x).exp();
            let jacobian = [ebx, params[0] * x * ebx, 1.0];
            let residual = exponential(&params, x) - y;
            for i in 0..3 {
                jtr[i] += jacobian[i] * residual;
                for j in 0..3 {
                    jtj[[i, j]] += jacobian[i] * jacobian[j];
                }
            }
        }
        if jtj.iter().any(|v| !v.is_finite()) || jtr.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::CurveFitFailed(
                "exponential fit produced non-finite values".into(),
            ));
        }

        let mut damped = jtj.clone();
        for i in 0..3 {
            damped[[i, i]] += lambda * jtj[[i, i]].max(1e-12);
        }
        let Some(step) = numeric::solve_linear(damped, jtr.mapv(|v| -v)) else {
            lambda *= 10.0;
            continue;
        };
        let candidate = project([
            params[0] + step[0],
            params[1] + step[1],
            params[2] + step[2],
        ]);
        let candidate_rss = residual_sum(&candidate, xs, ys);
        if !candidate_rss.is_finite() {
            return Err(EngineError::CurveFitFailed(
                "exponential fit diverged to non-finite residuals".into(),
            ));
        }

        if candidate_rss <= rss {
            let improvement = rss - candidate_rss;
            params = candidate;
            rss = candidate_rss;
            lambda = (lambda * 0.5).max(1e-12);
            if improvement <= 1e-12 * rss.max(1e-12)
                || step.iter().all(|s| s.abs() < 1e-12)
            {
                debug!("Exponential fit converged after {} iteration(s)", iteration + 1);
                converged = true;
                break;
            }
        } else {
            lambda *= 4.0;
            if lambda > 1e12 {
                // the surface is flat at the bound; accept the current point
                converged = true;
                break;
            }
        }
    }
    if !converged {
        return Err(EngineError::CurveFitFailed(format!(
            "exponential fit did not converge within {MAX_LM_ITERATIONS} iterations"
        )));
    }

    let covariance = exponential_covariance(&params, xs, rss);
    Ok((params, covariance))
}

/// `s² · (JᵀJ)⁻¹` at the solution, columnwise via the shared solver.
fn exponential_covariance(params: &[f64; 3], xs: &[f64], rss: f64) -> Option<Vec<Vec<f64>>> {
    let n = xs.len();
    if n <= 3 {
        return None;
    }
    let mut jtj = Array2::<f64>::zeros((3, 3));
    for &x in xs {
        let ebx = (params[1] * x).exp();
        let jacobian = [ebx, params[0] * x * ebx, 1.0];
        for i in 0..3 {
            for j in 0..3 {
                jtj[[i, j]] += jacobian[i] * jacobian[j];
            }
        }
    }
    let s2 = rss / (n - 3) as f64;
    let mut inverse = vec![vec![0.0; 3]; 3];
    for col in 0..3 {
        let mut unit = Array1::<f64>::zeros(3);
        unit[col] = 1.0;
        let solved = numeric::solve_linear(jtj.clone(), unit)?;
        for row in 0..3 {
            inverse[row][col] = solved[row] * s2;
        }
    }
    Some(inverse)
}
