//! Shared numerical kernels: grids, least squares, ranking.

use ndarray::{Array1, Array2};

/// `num` evenly spaced samples over `[start, stop]`, endpoints included.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num).map(|i| start + step * i as f64).collect()
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with the given delta degrees of freedom (0 = population).
pub fn variance(values: &[f64], ddof: usize) -> f64 {
    if values.len() <= ddof {
        return 0.0;
    }
    let center = mean(values);
    let sum_squares = values
        .iter()
        .map(|v| {
            let d = v - center;
            d * d
        })
        .sum::<f64>();
    sum_squares / (values.len() - ddof) as f64
}

/// Solves `a · x = b` by Gaussian elimination with partial pivoting.
/// Returns `None` for a (numerically) singular system.
pub fn solve_linear(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    debug_assert_eq!(a.ncols(), n);
    debug_assert_eq!(b.len(), n);
    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if a[[row, col]].abs() > a[[pivot, col]].abs() {
                pivot = row;
            }
        }
        if a[[pivot, col]].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                let held = a[[col, k]];
                a[[col, k]] = a[[pivot, k]];
                a[[pivot, k]] = held;
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let mut accumulated = b[row];
        for k in row + 1..n {
            accumulated -= a[[row, k]] * x[k];
        }
        x[row] = accumulated / a[[row, row]];
    }
    Some(x)
}

/// Least-squares polynomial fit via the normal equations. Coefficients are
/// ordered from the highest power down, so `polyval` pairs with it.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Option<Vec<f64>> {
    let terms = degree + 1;
    if x.len() != y.len() || x.is_empty() {
        return None;
    }
    let mut design = Array2::zeros((x.len(), terms));
    for (row, &value) in x.iter().enumerate() {
        for col in 0..terms {
            design[[row, col]] = value.powi((degree - col) as i32);
        }
    }
    let gram = design.t().dot(&design);
    let moment = design.t().dot(&Array1::from_vec(y.to_vec()));
    let solution = solve_linear(gram, moment)?;
    Some(solution.to_vec())
}

/// Evaluates coefficients from `polyfit` (highest power first) at `x`.
pub fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Ordinary least-squares line `y = slope · x + intercept`.
pub fn ols_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let x_mean = mean(x);
    let y_mean = mean(y);
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        sxx += (xi - x_mean) * (xi - x_mean);
        sxy += (xi - x_mean) * (yi - y_mean);
    }
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, y_mean - slope * x_mean))
}

/// Pearson product-moment correlation; `None` when either side is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let x_mean = mean(x);
    let y_mean = mean(y);
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        sxx += (xi - x_mean) * (xi - x_mean);
        syy += (yi - y_mean) * (yi - y_mean);
        sxy += (xi - x_mean) * (yi - y_mean);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Fractional ranks (1-based) with ties assigned their average rank.
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranked = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        let average = (start + end) as f64 / 2.0 + 1.0;
        for &index in &order[start..=end] {
            ranked[index] = average;
        }
        start = end + 1;
    }
    ranked
}
