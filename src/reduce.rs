//! Dimensionality reduction over the numeric features of a dataset.
//!
//! All three methods share one contract: rows in equals rows out, and the
//! output carries exactly `n_components` columns named `dim1..dimK`. PCA is
//! deterministic; the stochastic embeddings (t-SNE, UMAP) are seeded so a
//! given input reproduces itself run to run.

use clap::ValueEnum;
use log::{debug, info};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    error::{EngineError, Result},
    frame::DataFrame,
};

pub const DEFAULT_COMPONENTS: usize = 2;
pub const DEFAULT_PERPLEXITY: f64 = 30.0;
pub const DEFAULT_NEIGHBORS: usize = 15;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionMethod {
    Pca,
    Tsne,
    Umap,
}

impl std::fmt::Display for ReductionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReductionMethod::Pca => "pca",
            ReductionMethod::Tsne => "tsne",
            ReductionMethod::Umap => "umap",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for ReductionMethod {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pca" => Ok(ReductionMethod::Pca),
            "tsne" => Ok(ReductionMethod::Tsne),
            "umap" => Ok(ReductionMethod::Umap),
            other => Err(EngineError::UnsupportedMethod {
                operation: "dimensionality reduction",
                method: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReduceOptions {
    pub n_components: usize,
    pub perplexity: f64,
    pub n_neighbors: usize,
    pub seed: u64,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            n_components: DEFAULT_COMPONENTS,
            perplexity: DEFAULT_PERPLEXITY,
            n_neighbors: DEFAULT_NEIGHBORS,
            seed: DEFAULT_SEED,
        }
    }
}

pub fn reduce(
    frame: &DataFrame,
    method: ReductionMethod,
    options: &ReduceOptions,
) -> Result<DataFrame> {
    let (names, matrix) = frame.to_numeric_matrix()?;
    if matrix.nrows() == 0 {
        return Err(EngineError::invalid_input(
            "dimensionality reduction",
            "dataset has no rows",
        ));
    }
    let k = options.n_components;
    if k == 0 {
        return Err(EngineError::invalid_input(
            "dimensionality reduction",
            "n_components must be at least 1",
        ));
    }
    info!(
        "Reducing {} row(s) x {} numeric feature(s) to {k} component(s) via {method}",
        matrix.nrows(),
        names.len()
    );

    let embedded = match method {
        ReductionMethod::Pca => pca(&matrix, k)?,
        ReductionMethod::Tsne => tsne(&matrix, k, options.perplexity, options.seed)?,
        ReductionMethod::Umap => umap(&matrix, k, options.n_neighbors, options.seed)?,
    };

    let dim_names = (1..=k).map(|i| format!("dim{i}")).collect::<Vec<_>>();
    let columns = dim_names
        .iter()
        .enumerate()
        .map(|(col, name)| (name.as_str(), embedded.column(col).to_vec()))
        .collect::<Vec<_>>();
    let borrowed = columns
        .iter()
        .map(|(name, values)| (*name, values.as_slice()))
        .collect::<Vec<_>>();
    Ok(DataFrame::from_numeric_columns(&borrowed))
}

/// Principal component projection: centred covariance, symmetric
/// eigendecomposition, components sorted by descending eigenvalue with the
/// dominant coefficient forced positive for reproducibility.
fn pca(data: &Array2<f64>, k: usize) -> Result<Array2<f64>> {
    let p = data.ncols();
    if k > p {
        return Err(EngineError::invalid_input(
            "dimensionality reduction",
            format!("n_components {k} exceeds the {p} numeric feature(s)"),
        ));
    }
    let n = data.nrows();
    let mut centered = data.to_owned();
    for col in 0..p {
        let mean = data.column(col).mean().unwrap_or(0.0);
        centered.column_mut(col).mapv_inplace(|v| v - mean);
    }
    let denominator = if n > 1 { (n - 1) as f64 } else { 1.0 };
    let covariance = centered.t().dot(&centered) / denominator;
    let (eigenvalues, eigenvectors) = jacobi_eigh(&covariance);

    let mut order: Vec<usize> = (0..p).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

    let mut components = Array2::zeros((p, k));
    for (out_col, &source) in order.iter().take(k).enumerate() {
        let mut axis = eigenvectors.column(source).to_owned();
        let mut dominant = 0;
        for i in 0..p {
            if axis[i].abs() > axis[dominant].abs() {
                dominant = i;
            }
        }
        if axis[dominant] < 0.0 {
            axis.mapv_inplace(|v| -v);
        }
        components.column_mut(out_col).assign(&axis);
    }
    Ok(centered.dot(&components))
}

/// Cyclic Jacobi eigendecomposition of a symmetric matrix. Returns the
/// eigenvalues and the matrix of column eigenvectors.
fn jacobi_eigh(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.to_owned();
    let mut vectors = Array2::eye(n);
    for _sweep in 0..100 {
        let mut off_diagonal = 0.0;
        for i in 0..n {
            for j in i + 1..n {
                off_diagonal += a[[i, j]] * a[[i, j]];
            }
        }
        if off_diagonal.sqrt() < 1e-12 {
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                if a[[p, q]].abs() < 1e-300 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = vectors[[k, p]];
                    let vkq = vectors[[k, q]];
                    vectors[[k, p]] = c * vkp - s * vkq;
                    vectors[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }
    let eigenvalues = Array1::from_vec((0..n).map(|i| a[[i, i]]).collect());
    (eigenvalues, vectors)
}

fn pairwise_squared_distances(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let mut distances = Array2::zeros((n, n));
    for i in 0..n {
        for j in i + 1..n {
            let mut sum = 0.0;
            for c in 0..data.ncols() {
                let diff = data[[i, c]] - data[[j, c]];
                sum += diff * diff;
            }
            distances[[i, j]] = sum;
            distances[[j, i]] = sum;
        }
    }
    distances
}

fn gaussian(rng: &mut StdRng) -> f64 {
    // Box-Muller transform
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Exact symmetric-SNE embedding with early exaggeration and momentum.
fn tsne(data: &Array2<f64>, k: usize, perplexity: f64, seed: u64) -> Result<Array2<f64>> {
    let n = data.nrows();
    if n < 2 {
        return Err(EngineError::invalid_input(
            "dimensionality reduction",
            "t-SNE needs at least two rows",
        ));
    }
    let distances = pairwise_squared_distances(data);
    let effective = perplexity.clamp(1.0, ((n - 1) as f64 / 3.0).max(1.0));
    debug!("t-SNE effective perplexity {effective:.2}");
    let target_entropy = effective.ln();

    // per-point bandwidth by binary search on the conditional entropy
    let mut conditional = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let mut beta = 1.0;
        let mut beta_low = f64::NEG_INFINITY;
        let mut beta_high = f64::INFINITY;
        for _ in 0..50 {
            let mut sum = 0.0;
            for j in 0..n {
                if j != i {
                    conditional[[i, j]] = (-distances[[i, j]] * beta).exp();
                    sum += conditional[[i, j]];
                }
            }
            let sum = sum.max(f64::MIN_POSITIVE);
            let mut entropy = 0.0;
            for j in 0..n {
                if j != i {
                    let p = conditional[[i, j]] / sum;
                    if p > 1e-12 {
                        entropy -= p * p.ln();
                    }
                }
            }
            let gap = entropy - target_entropy;
            if gap.abs() < 1e-5 {
                break;
            }
            if gap > 0.0 {
                beta_low = beta;
                beta = if beta_high.is_finite() {
                    (beta + beta_high) / 2.0
                } else {
                    beta * 2.0
                };
            } else {
                beta_high = beta;
                beta = if beta_low.is_finite() {
                    (beta + beta_low) / 2.0
                } else {
                    beta / 2.0
                };
            }
        }
        let mut sum = 0.0;
        for j in 0..n {
            if j != i {
                sum += conditional[[i, j]];
            }
        }
        if sum > 0.0 {
            for j in 0..n {
                if j != i {
                    conditional[[i, j]] /= sum;
                }
            }
        }
    }

    let mut affinities = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let p = (conditional[[i, j]] + conditional[[j, i]]) / (2.0 * n as f64);
                affinities[[i, j]] = p.max(1e-12);
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut embedding = Array2::<f64>::zeros((n, k));
    for value in embedding.iter_mut() {
        *value = gaussian(&mut rng) * 1e-4;
    }
    let mut velocity = Array2::<f64>::zeros((n, k));
    let learning_rate = 200.0;

    for iteration in 0..500 {
        let exaggeration = if iteration < 100 { 12.0 } else { 1.0 };
        let mut kernel = Array2::<f64>::zeros((n, n));
        let mut kernel_sum = 0.0;
        for i in 0..n {
            for j in i + 1..n {
                let mut dist = 0.0;
                for c in 0..k {
                    let diff = embedding[[i, c]] - embedding[[j, c]];
                    dist += diff * diff;
                }
                let value = 1.0 / (1.0 + dist);
                kernel[[i, j]] = value;
                kernel[[j, i]] = value;
                kernel_sum += 2.0 * value;
            }
        }
        let kernel_sum = kernel_sum.max(f64::MIN_POSITIVE);

        let mut gradient = Array2::<f64>::zeros((n, k));
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q = (kernel[[i, j]] / kernel_sum).max(1e-12);
                let force = (exaggeration * affinities[[i, j]] - q) * kernel[[i, j]];
                for c in 0..k {
                    gradient[[i, c]] += 4.0 * force * (embedding[[i, c]] - embedding[[j, c]]);
                }
            }
        }

        let momentum = if iteration < 250 { 0.5 } else { 0.8 };
        for i in 0..n {
            for c in 0..k {
                velocity[[i, c]] =
                    momentum * velocity[[i, c]] - learning_rate * gradient[[i, c]];
                embedding[[i, c]] += velocity[[i, c]];
            }
        }
        for c in 0..k {
            let mean = embedding.column(c).mean().unwrap_or(0.0);
            embedding.column_mut(c).mapv_inplace(|v| v - mean);
        }
    }
    Ok(embedding)
}

/// Fuzzy k-NN graph embedding in the UMAP family: per-point bandwidths
/// calibrated to `log2(k)`, symmetrised weights, then seeded SGD with
/// negative sampling.
fn umap(data: &Array2<f64>, k: usize, n_neighbors: usize, seed: u64) -> Result<Array2<f64>> {
    let n = data.nrows();
    if n < 2 {
        return Err(EngineError::invalid_input(
            "dimensionality reduction",
            "UMAP needs at least two rows",
        ));
    }
    let neighbors = n_neighbors.min(n - 1).max(1);
    let distances = pairwise_squared_distances(data).mapv(f64::sqrt);

    // brute-force neighbour lists
    let mut neighbor_lists = Vec::with_capacity(n);
    for i in 0..n {
        let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        order.sort_by(|&a, &b| distances[[i, a]].total_cmp(&distances[[i, b]]));
        order.truncate(neighbors);
        neighbor_lists.push(order);
    }

    let target = (neighbors as f64).log2();
    let mut weights = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let rho = distances[[i, neighbor_lists[i][0]]];
        let mut sigma_low = 1e-8;
        let mut sigma_high = 1e8;
        let mut sigma = 1.0;
        for _ in 0..64 {
            let sum: f64 = neighbor_lists[i]
                .iter()
                .map(|&j| (-((distances[[i, j]] - rho).max(0.0)) / sigma).exp())
                .sum();
            if (sum - target).abs() < 1e-5 {
                break;
            }
            if sum > target {
                sigma_high = sigma;
            } else {
                sigma_low = sigma;
            }
            sigma = (sigma_low + sigma_high) / 2.0;
        }
        for &j in &neighbor_lists[i] {
            weights[[i, j]] = (-((distances[[i, j]] - rho).max(0.0)) / sigma).exp();
        }
    }
    // probabilistic union of the directed graphs
    let mut graph = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            let w = weights[[i, j]] + weights[[j, i]] - weights[[i, j]] * weights[[j, i]];
            graph[[i, j]] = w;
        }
    }

    // curve parameters approximating min_dist = 0.1
    let a = 1.577;
    let b = 0.8951;
    let epochs = 200usize;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut embedding = Array2::<f64>::zeros((n, k));
    for value in embedding.iter_mut() {
        *value = gaussian(&mut rng) * 10.0;
    }

    for epoch in 0..epochs {
        let alpha = 1.0 - epoch as f64 / epochs as f64;
        for i in 0..n {
            for neighbor_index in 0..neighbor_lists[i].len() {
                let j = neighbor_lists[i][neighbor_index];
                let weight = graph[[i, j]];
                if weight <= 0.0 {
                    continue;
                }
                let mut dist = 0.0;
                for c in 0..k {
                    let diff = embedding[[i, c]] - embedding[[j, c]];
                    dist += diff * diff;
                }
                let dist = dist.max(1e-9);
                let attract = -2.0 * a * b * dist.powf(b - 1.0) / (1.0 + a * dist.powf(b));
                for c in 0..k {
                    let delta =
                        (alpha * weight * attract * (embedding[[i, c]] - embedding[[j, c]]))
                            .clamp(-4.0, 4.0);
                    embedding[[i, c]] += delta;
                    embedding[[j, c]] -= delta;
                }
                for _ in 0..5 {
                    let l = rng.gen_range(0..n);
                    if l == i {
                        continue;
                    }
                    let mut dist = 0.0;
                    for c in 0..k {
                        let diff = embedding[[i, c]] - embedding[[l, c]];
                        dist += diff * diff;
                    }
                    let dist = dist.max(1e-9);
                    let repulse = 2.0 * b / (dist * (1.0 + a * dist.powf(b)));
                    for c in 0..k {
                        let delta = (alpha * repulse * (embedding[[i, c]] - embedding[[l, c]]))
                            .clamp(-4.0, 4.0);
                        embedding[[i, c]] += delta;
                    }
                }
            }
        }
    }
    Ok(embedding)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub method: ReductionMethod,
    pub n_components: usize,
    pub perplexity: Option<f64>,
    pub n_neighbors: Option<usize>,
}

/// Heuristic method suggestions driven by feature count alone, not a
/// statistical test of the data distribution. Never fails; callers treat
/// any internal problem as "no recommendations".
pub fn recommend(frame: &DataFrame) -> Vec<Recommendation> {
    let features = frame.features.len();
    let mut recommendations = Vec::new();
    if features > 50 {
        recommendations.push(Recommendation {
            method: ReductionMethod::Pca,
            n_components: 10.min(features / 2),
            perplexity: None,
            n_neighbors: None,
        });
    }
    if features > 10 {
        recommendations.push(Recommendation {
            method: ReductionMethod::Tsne,
            n_components: 2,
            perplexity: Some(30.0f64.min((features - 1) as f64)),
            n_neighbors: None,
        });
    }
    if features > 5 {
        recommendations.push(Recommendation {
            method: ReductionMethod::Umap,
            n_components: 2,
            perplexity: None,
            n_neighbors: Some(15.min(features - 1)),
        });
    }
    if recommendations.is_empty() {
        recommendations.push(Recommendation {
            method: ReductionMethod::Pca,
            n_components: 2.min(features),
            perplexity: None,
            n_neighbors: None,
        });
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::from_numeric_columns(&[
            ("feature1", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            ("feature2", &[2.0, 4.0, 6.0, 8.0, 10.0, 12.0]),
            ("feature3", &[5.0, 3.0, 1.0, 3.0, 5.0, 7.0]),
        ])
    }

    #[test]
    fn every_method_preserves_rows_and_requests_columns() {
        for method in [
            ReductionMethod::Pca,
            ReductionMethod::Tsne,
            ReductionMethod::Umap,
        ] {
            let reduced = reduce(&sample(), method, &ReduceOptions::default()).unwrap();
            assert_eq!(reduced.row_count(), 6, "{method} row count");
            assert_eq!(
                reduced.features,
                vec!["dim1".to_string(), "dim2".to_string()],
                "{method} columns"
            );
            let dim1 = reduced.numeric_column("dim1").unwrap();
            assert!(dim1.iter().all(|v| v.is_finite()), "{method} finite");
        }
    }

    #[test]
    fn pca_is_deterministic() {
        let first = reduce(&sample(), ReductionMethod::Pca, &ReduceOptions::default()).unwrap();
        let second = reduce(&sample(), ReductionMethod::Pca, &ReduceOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn pca_first_component_captures_linear_structure() {
        // feature2 = 2 * feature1: one direction explains nearly all spread
        let frame = DataFrame::from_numeric_columns(&[
            ("feature1", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            ("feature2", &[2.0, 4.0, 6.0, 8.0, 10.0]),
        ]);
        let reduced = reduce(
            &frame,
            ReductionMethod::Pca,
            &ReduceOptions {
                n_components: 2,
                ..Default::default()
            },
        )
        .unwrap();
        let dim2 = reduced.numeric_column("dim2").unwrap();
        assert!(dim2.iter().all(|v| v.abs() < 1e-8), "dim2 = {dim2:?}");
    }

    #[test]
    fn component_count_above_feature_count_is_rejected_for_pca() {
        let err = reduce(
            &sample(),
            ReductionMethod::Pca,
            &ReduceOptions {
                n_components: 9,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }

    #[test]
    fn non_numeric_dataset_is_rejected() {
        let frame = DataFrame::new(
            vec!["city".to_string()],
            vec![[("city".to_string(), crate::data::Value::from("oslo"))]
                .into_iter()
                .collect()],
        );
        let err = reduce(&frame, ReductionMethod::Pca, &ReduceOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }

    #[test]
    fn jacobi_recovers_known_eigenvalues() {
        let matrix = ndarray::arr2(&[[2.0, 0.0], [0.0, 5.0]]);
        let (values, _) = jacobi_eigh(&matrix);
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        assert!((sorted[0] - 2.0).abs() < 1e-10);
        assert!((sorted[1] - 5.0).abs() < 1e-10);
    }

    #[test]
    fn recommendations_follow_feature_count_thresholds() {
        let wide = DataFrame::new(
            (0..12).map(|i| format!("f{i}")).collect(),
            Vec::new(),
        );
        let recommendations = recommend(&wide);
        let methods = recommendations
            .iter()
            .map(|r| r.method)
            .collect::<Vec<_>>();
        assert_eq!(methods, vec![ReductionMethod::Tsne, ReductionMethod::Umap]);
        assert_eq!(recommendations[0].perplexity, Some(11.0));
        assert_eq!(recommendations[1].n_neighbors, Some(11));
    }

    #[test]
    fn narrow_dataset_falls_back_to_pca() {
        let narrow = DataFrame::new(vec!["a".to_string()], Vec::new());
        let recommendations = recommend(&narrow);
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].method, ReductionMethod::Pca);
        assert_eq!(recommendations[0].n_components, 1);
    }
}
