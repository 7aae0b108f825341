//! On-demand summary statistics for a dataset snapshot: shape, missing-value
//! counts, and per-column means. Immutable once computed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::frame::DataFrame;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub missing: Vec<(String, usize)>,
    pub means: Vec<(String, f64)>,
    pub created_at: DateTime<Utc>,
}

pub fn summarize(frame: &DataFrame) -> DatasetSummary {
    let mut missing = Vec::with_capacity(frame.features.len());
    let mut means = Vec::new();
    for feature in &frame.features {
        let mut absent = 0usize;
        let mut numeric = Vec::new();
        let mut non_numeric = false;
        for row in 0..frame.row_count() {
            let value = frame.value(row, feature);
            if value.is_null() {
                absent += 1;
            } else {
                match value.as_f64() {
                    Some(v) => numeric.push(v),
                    None => non_numeric = true,
                }
            }
        }
        missing.push((feature.clone(), absent));
        // mean over present values, for columns that are numeric throughout
        if !non_numeric && !numeric.is_empty() {
            means.push((
                feature.clone(),
                numeric.iter().sum::<f64>() / numeric.len() as f64,
            ));
        }
    }
    DatasetSummary {
        rows: frame.row_count(),
        columns: frame.features.len(),
        missing,
        means,
        created_at: Utc::now(),
    }
}

impl DatasetSummary {
    /// Table rows for console rendering: one line per column.
    pub fn render_rows(&self) -> Vec<Vec<String>> {
        self.missing
            .iter()
            .map(|(feature, absent)| {
                let mean = self
                    .means
                    .iter()
                    .find(|(name, _)| name == feature)
                    .map(|(_, m)| format!("{m:.4}"))
                    .unwrap_or_default();
                vec![feature.clone(), absent.to_string(), mean]
            })
            .collect()
    }
}
