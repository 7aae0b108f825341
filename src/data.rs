use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell of a tabular dataset.
///
/// Serialized untagged so persisted records read as plain JSON scalars,
/// matching the row-mapping shape produced by uploads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Value {
    /// Infers a typed value from a raw cell. Empty cells are null; numeric
    /// text prefers integers over floats; everything else stays text.
    pub fn infer(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if let Ok(parsed) = trimmed.parse::<i64>() {
            return Value::Integer(parsed);
        }
        if let Ok(parsed) = trimmed.parse::<f64>() {
            return Value::Number(parsed);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric coercion for engine math. Booleans and text do not coerce.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Number(f) => {
                if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e15 {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_prefers_integer_then_float() {
        assert_eq!(Value::infer("42"), Value::Integer(42));
        assert_eq!(Value::infer("42.5"), Value::Number(42.5));
        assert_eq!(Value::infer("-3"), Value::Integer(-3));
    }

    #[test]
    fn infer_handles_empty_boolean_and_text() {
        assert_eq!(Value::infer(""), Value::Null);
        assert_eq!(Value::infer("   "), Value::Null);
        assert_eq!(Value::infer("True"), Value::Boolean(true));
        assert_eq!(Value::infer("berlin"), Value::Text("berlin".to_string()));
    }

    #[test]
    fn as_f64_coerces_numbers_only() {
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Number(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::Text("3".to_string()).as_f64(), None);
        assert_eq!(Value::Boolean(true).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn display_drops_trailing_zero_fraction() {
        assert_eq!(Value::Number(4.0).as_display(), "4");
        assert_eq!(Value::Number(4.25).as_display(), "4.25");
        assert_eq!(Value::Null.as_display(), "");
    }

    #[test]
    fn json_round_trip_preserves_variants() {
        let values = vec![
            Value::Null,
            Value::Boolean(false),
            Value::Integer(7),
            Value::Number(2.5),
            Value::Text("label".to_string()),
        ];
        let encoded = serde_json::to_string(&values).unwrap();
        let decoded: Vec<Value> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, values);
    }
}
