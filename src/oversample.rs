//! Class-balancing oversampling over an (x, label) column pair.
//!
//! Binary datasets aim the minority class at `majority_count x factor`;
//! multi-class datasets grow every class to at least `count + 1`. Classes
//! never shrink: a target at or below the current count is a no-op for that
//! class. Synthetic rows are appended after the originals, per class in
//! first-appearance order.

use std::collections::HashMap;

use clap::ValueEnum;
use log::info;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    error::{EngineError, Result},
    frame::{DataFrame, Record},
};

pub const DEFAULT_FACTOR: f64 = 1.0;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OversampleMethod {
    Smote,
    Random,
}

impl std::fmt::Display for OversampleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OversampleMethod::Smote => "smote",
            OversampleMethod::Random => "random",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for OversampleMethod {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "smote" => Ok(OversampleMethod::Smote),
            "random" => Ok(OversampleMethod::Random),
            other => Err(EngineError::UnsupportedMethod {
                operation: "oversampling",
                method: other.to_string(),
            }),
        }
    }
}

pub fn oversample(
    frame: &DataFrame,
    x_feature: &str,
    y_feature: &str,
    method: OversampleMethod,
    factor: f64,
    seed: u64,
) -> Result<DataFrame> {
    let mut missing = Vec::new();
    if !frame.has_feature(x_feature) {
        missing.push(x_feature);
    }
    if !frame.has_feature(y_feature) {
        missing.push(y_feature);
    }
    if !missing.is_empty() {
        return Err(EngineError::missing_columns(&missing));
    }
    if !factor.is_finite() || factor <= 0.0 {
        return Err(EngineError::invalid_input(
            "oversampling",
            format!("oversample factor must be positive, got {factor}"),
        ));
    }

    let xs = frame.numeric_column(x_feature)?;
    let labels = frame.label_column(y_feature)?;
    if xs.is_empty() {
        return Err(EngineError::invalid_input(
            "oversampling",
            "dataset has no rows",
        ));
    }

    // class membership, keyed by display form, in first-appearance order
    let mut class_order = Vec::new();
    let mut members: HashMap<String, Vec<usize>> = HashMap::new();
    for (row, label) in labels.iter().enumerate() {
        let key = label.as_display();
        let entry = members.entry(key.clone()).or_default();
        if entry.is_empty() {
            class_order.push(key);
        }
        entry.push(row);
    }

    let targets = class_targets(&class_order, &members, factor);
    let smallest = class_order
        .iter()
        .map(|key| members[key].len())
        .min()
        .unwrap_or(1);
    let neighbor_count = (smallest.saturating_sub(1)).clamp(1, 5);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut synthetic: Vec<Record> = Vec::new();
    for key in &class_order {
        let rows = &members[key];
        let target = targets[key];
        if target <= rows.len() {
            continue;
        }
        let label = labels[rows[0]].clone();
        for _ in 0..target - rows.len() {
            let source = rows[rng.gen_range(0..rows.len())];
            let sampled_x = match method {
                OversampleMethod::Random => xs[source],
                OversampleMethod::Smote => {
                    synthesize(&xs, rows, source, neighbor_count, &mut rng)
                }
            };
            let mut record = Record::new();
            record.insert(x_feature.to_string(), Value::Number(sampled_x));
            record.insert(y_feature.to_string(), label.clone());
            synthetic.push(record);
        }
    }

    let mut records = Vec::with_capacity(xs.len() + synthetic.len());
    for (row, label) in labels.iter().enumerate() {
        let mut record = Record::new();
        record.insert(x_feature.to_string(), Value::Number(xs[row]));
        record.insert(y_feature.to_string(), label.clone());
        records.push(record);
    }
    records.extend(synthetic);

    info!(
        "Oversampled {} row(s) to {} via {method} (factor {factor})",
        xs.len(),
        records.len()
    );
    Ok(DataFrame::new(
        vec![x_feature.to_string(), y_feature.to_string()],
        records,
    ))
}

/// Resampling targets per class. Binary: minority aims at
/// `majority x factor`. Multi-class: every class aims at
/// `max(count x factor, count + 1)`.
fn class_targets(
    class_order: &[String],
    members: &HashMap<String, Vec<usize>>,
    factor: f64,
) -> HashMap<String, usize> {
    let mut targets = HashMap::new();
    if class_order.len() == 2 {
        let minority = class_order
            .iter()
            .min_by_key(|key| members[key.as_str()].len())
            .expect("two classes present");
        let majority_count = class_order
            .iter()
            .map(|key| members[key].len())
            .max()
            .expect("two classes present");
        for key in class_order {
            let count = members[key].len();
            let target = if key == minority {
                (majority_count as f64 * factor) as usize
            } else {
                count
            };
            targets.insert(key.clone(), target);
        }
    } else {
        for key in class_order {
            let count = members[key].len();
            let scaled = (count as f64 * factor) as usize;
            targets.insert(key.clone(), scaled.max(count + 1));
        }
    }
    targets
}

/// One synthetic SMOTE sample: interpolate between a class member and one
/// of its nearest in-class neighbours. A singleton class duplicates its
/// lone sample.
fn synthesize(
    xs: &[f64],
    rows: &[usize],
    source: usize,
    neighbor_count: usize,
    rng: &mut StdRng,
) -> f64 {
    if rows.len() < 2 {
        return xs[source];
    }
    let mut neighbors = rows
        .iter()
        .filter(|&&row| row != source)
        .copied()
        .collect::<Vec<_>>();
    neighbors.sort_by(|&a, &b| {
        (xs[a] - xs[source])
            .abs()
            .total_cmp(&(xs[b] - xs[source]).abs())
    });
    neighbors.truncate(neighbor_count.max(1));
    let chosen = neighbors[rng.gen_range(0..neighbors.len())];
    let gap: f64 = rng.gen_range(0.0..1.0);
    xs[source] + gap * (xs[chosen] - xs[source])
}
