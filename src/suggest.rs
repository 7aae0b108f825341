use std::collections::BTreeSet;

use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::{
    error::Result,
    frame::DataFrame,
    numeric,
};

pub const DEFAULT_DROP_CORRELATION: f64 = 0.95;
pub const DEFAULT_DROP_VARIANCE: f64 = 0.01;
pub const DEFAULT_COMBINE_CORRELATION: f64 = 0.9;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CombineSuggestion {
    pub features: [String; 2],
    pub correlation: f64,
}

/// Flags candidate features for removal: columns whose variance falls below
/// `variance_threshold`, plus the later member of every column pair whose
/// absolute correlation exceeds `correlation_threshold` (each unordered pair
/// is tested once).
pub fn suggest_dropping(
    frame: &DataFrame,
    correlation_threshold: f64,
    variance_threshold: f64,
) -> Result<Vec<String>> {
    let features = frame.numeric_features();
    let mut flagged = BTreeSet::new();

    for feature in &features {
        let values = frame.numeric_column(feature)?;
        let spread = numeric::variance(&values, 0);
        if spread < variance_threshold {
            debug!("Feature '{feature}' variance {spread:.6} below threshold");
            flagged.insert(feature.clone());
        }
    }

    for pair in features.iter().combinations(2) {
        let (first, second) = (pair[0], pair[1]);
        let xs = frame.numeric_column(first)?;
        let ys = frame.numeric_column(second)?;
        if let Some(r) = numeric::pearson(&xs, &ys)
            && r.abs() > correlation_threshold
        {
            flagged.insert(second.clone());
        }
    }

    Ok(flagged.into_iter().collect())
}

/// Proposes feature pairs worth combining: every unordered pair whose
/// absolute correlation exceeds the threshold, in canonical pair order.
pub fn suggest_combining(
    frame: &DataFrame,
    correlation_threshold: f64,
) -> Result<Vec<CombineSuggestion>> {
    let features = frame.numeric_features();
    let mut suggestions = Vec::new();
    for pair in features.iter().combinations(2) {
        let (first, second) = (pair[0], pair[1]);
        let xs = frame.numeric_column(first)?;
        let ys = frame.numeric_column(second)?;
        if let Some(r) = numeric::pearson(&xs, &ys)
            && r.abs() > correlation_threshold
        {
            suggestions.push(CombineSuggestion {
                features: [first.clone(), second.clone()],
                correlation: r.abs(),
            });
        }
    }
    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfectly_correlated_pair_is_flagged_for_dropping() {
        let frame = DataFrame::from_numeric_columns(&[
            ("feature1", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            ("feature2", &[2.0, 4.0, 6.0, 8.0, 10.0]),
        ]);
        let drops =
            suggest_dropping(&frame, DEFAULT_DROP_CORRELATION, DEFAULT_DROP_VARIANCE).unwrap();
        assert!(drops.contains(&"feature2".to_string()));
        assert!(!drops.contains(&"feature1".to_string()));
    }

    #[test]
    fn low_variance_column_is_flagged() {
        let frame = DataFrame::from_numeric_columns(&[
            ("flat", &[5.0, 5.0, 5.0, 5.0]),
            ("spread", &[1.0, 9.0, 3.0, 7.0]),
        ]);
        let drops =
            suggest_dropping(&frame, DEFAULT_DROP_CORRELATION, DEFAULT_DROP_VARIANCE).unwrap();
        assert_eq!(drops, vec!["flat".to_string()]);
    }

    #[test]
    fn combine_suggestions_follow_pair_order() {
        let frame = DataFrame::from_numeric_columns(&[
            ("a", &[1.0, 2.0, 3.0, 4.0]),
            ("b", &[2.0, 4.0, 6.0, 8.0]),
            ("c", &[4.0, 1.0, 5.0, 2.0]),
        ]);
        let combos = suggest_combining(&frame, DEFAULT_COMBINE_CORRELATION).unwrap();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].features, ["a".to_string(), "b".to_string()]);
        assert!((combos[0].correlation - 1.0).abs() < 1e-10);
    }

    #[test]
    fn uncorrelated_data_yields_no_suggestions() {
        let frame = DataFrame::from_numeric_columns(&[
            ("a", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            ("b", &[5.0, 3.0, 1.0, 3.0, 5.0]),
        ]);
        let combos = suggest_combining(&frame, DEFAULT_COMBINE_CORRELATION).unwrap();
        assert!(combos.is_empty());
    }
}
