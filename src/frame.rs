//! In-memory tabular dataset: an ordered feature list plus row records.
//!
//! Rows are mappings from feature name to scalar [`Value`]. Keys outside the
//! feature list are tolerated on read and ignored by every accessor; a row is
//! not required to carry every feature (absent keys read as null). Numeric
//! operations require their *selected* columns to be present and numeric in
//! every row and fail otherwise.

use std::collections::HashMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    error::{EngineError, Result},
};

pub type Record = HashMap<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataFrame {
    pub features: Vec<String>,
    pub records: Vec<Record>,
}

impl DataFrame {
    pub fn new(features: Vec<String>, records: Vec<Record>) -> Self {
        Self { features, records }
    }

    /// Builds a frame from parallel numeric columns. Every engine output
    /// flows through here, so column lengths are expected to agree.
    pub fn from_numeric_columns(columns: &[(&str, &[f64])]) -> Self {
        let features = columns
            .iter()
            .map(|(name, _)| (*name).to_string())
            .collect::<Vec<_>>();
        let rows = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let mut records = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut record = Record::new();
            for (name, values) in columns {
                if let Some(value) = values.get(row) {
                    record.insert((*name).to_string(), Value::Number(*value));
                }
            }
            records.push(record);
        }
        Self { features, records }
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| f == name)
    }

    /// Cell lookup; absent keys read as null.
    pub fn value(&self, row: usize, feature: &str) -> &Value {
        self.records
            .get(row)
            .and_then(|record| record.get(feature))
            .unwrap_or(&Value::Null)
    }

    fn require_pair(&self, x: &str, y: &str) -> Result<()> {
        let mut missing = Vec::new();
        if !self.has_feature(x) {
            missing.push(x);
        }
        if !self.has_feature(y) {
            missing.push(y);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EngineError::missing_columns(&missing))
        }
    }

    /// Strict numeric projection of one column: every row must carry a
    /// numeric value for `name`.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        if !self.has_feature(name) {
            return Err(EngineError::missing_columns(&[name]));
        }
        let mut values = Vec::with_capacity(self.records.len());
        for (row, record) in self.records.iter().enumerate() {
            let value = record.get(name).unwrap_or(&Value::Null);
            match value.as_f64() {
                Some(v) => values.push(v),
                None => {
                    return Err(EngineError::invalid_input(
                        "column projection",
                        format!("column '{name}' is not numeric at row {}", row + 1),
                    ));
                }
            }
        }
        Ok(values)
    }

    /// Label projection for class-based operations; null labels are rejected.
    pub fn label_column(&self, name: &str) -> Result<Vec<Value>> {
        if !self.has_feature(name) {
            return Err(EngineError::missing_columns(&[name]));
        }
        let mut values = Vec::with_capacity(self.records.len());
        for (row, record) in self.records.iter().enumerate() {
            let value = record.get(name).unwrap_or(&Value::Null);
            if value.is_null() {
                return Err(EngineError::invalid_input(
                    "label projection",
                    format!("column '{name}' has a missing label at row {}", row + 1),
                ));
            }
            values.push(value.clone());
        }
        Ok(values)
    }

    /// Strict numeric projection of an (x, y) pair.
    pub fn numeric_pair(&self, x: &str, y: &str) -> Result<(Vec<f64>, Vec<f64>)> {
        self.require_pair(x, y)?;
        Ok((self.numeric_column(x)?, self.numeric_column(y)?))
    }

    /// Numeric (x, y) pair with rows lacking a y value dropped and x
    /// filtered in lockstep. Remaining cells must still be numeric.
    pub fn numeric_pair_dropping_null_y(&self, x: &str, y: &str) -> Result<(Vec<f64>, Vec<f64>)> {
        self.require_pair(x, y)?;
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for (row, record) in self.records.iter().enumerate() {
            let y_value = record.get(y).unwrap_or(&Value::Null);
            if y_value.is_null() {
                continue;
            }
            let y_numeric = y_value.as_f64().ok_or_else(|| {
                EngineError::invalid_input(
                    "column projection",
                    format!("column '{y}' is not numeric at row {}", row + 1),
                )
            })?;
            let x_numeric = record
                .get(x)
                .unwrap_or(&Value::Null)
                .as_f64()
                .ok_or_else(|| {
                    EngineError::invalid_input(
                        "column projection",
                        format!("column '{x}' is not numeric at row {}", row + 1),
                    )
                })?;
            xs.push(x_numeric);
            ys.push(y_numeric);
        }
        Ok((xs, ys))
    }

    /// Features carrying a numeric value in every row.
    pub fn numeric_features(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|name| {
                !self.records.is_empty()
                    && self.records.iter().all(|record| {
                        record
                            .get(name.as_str())
                            .is_some_and(|value| value.as_f64().is_some())
                    })
            })
            .cloned()
            .collect()
    }

    /// Row-major matrix over the numeric features, for the reduction stack.
    pub fn to_numeric_matrix(&self) -> Result<(Vec<String>, Array2<f64>)> {
        let names = self.numeric_features();
        if names.is_empty() {
            return Err(EngineError::invalid_input(
                "numeric projection",
                "dataset contains no fully numeric columns",
            ));
        }
        let mut matrix = Array2::zeros((self.records.len(), names.len()));
        for (row, record) in self.records.iter().enumerate() {
            for (col, name) in names.iter().enumerate() {
                // numeric_features guarantees the coercion succeeds
                if let Some(value) = record.get(name).and_then(Value::as_f64) {
                    matrix[[row, col]] = value;
                }
            }
        }
        Ok((names, matrix))
    }

    /// New frame with an appended feature; one value per existing row.
    pub fn with_feature(&self, name: &str, values: Vec<Value>) -> Result<DataFrame> {
        if self.has_feature(name) {
            return Err(EngineError::invalid_input(
                "add feature",
                format!("feature '{name}' already exists"),
            ));
        }
        if values.len() != self.records.len() {
            return Err(EngineError::invalid_input(
                "add feature",
                format!(
                    "expected {} values for feature '{name}', got {}",
                    self.records.len(),
                    values.len()
                ),
            ));
        }
        let mut frame = self.clone();
        frame.features.push(name.to_string());
        for (record, value) in frame.records.iter_mut().zip(values) {
            record.insert(name.to_string(), value);
        }
        Ok(frame)
    }

    /// New frame without the named feature.
    pub fn without_feature(&self, name: &str) -> Result<DataFrame> {
        if !self.has_feature(name) {
            return Err(EngineError::missing_columns(&[name]));
        }
        let features = self
            .features
            .iter()
            .filter(|f| f.as_str() != name)
            .cloned()
            .collect::<Vec<_>>();
        let records = self
            .records
            .iter()
            .map(|record| {
                let mut trimmed = record.clone();
                trimmed.remove(name);
                trimmed
            })
            .collect();
        Ok(DataFrame { features, records })
    }

    /// New frame restricted to the given features, in the given order.
    pub fn select(&self, features: &[String]) -> Result<DataFrame> {
        let missing = features
            .iter()
            .filter(|name| !self.has_feature(name))
            .map(String::as_str)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(EngineError::missing_columns(&missing));
        }
        let records = self
            .records
            .iter()
            .map(|record| {
                features
                    .iter()
                    .filter_map(|name| {
                        record
                            .get(name)
                            .map(|value| (name.clone(), value.clone()))
                    })
                    .collect::<Record>()
            })
            .collect();
        Ok(DataFrame {
            features: features.to_vec(),
            records,
        })
    }
}
