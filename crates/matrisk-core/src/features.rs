//! Request adapter: raw key/value payloads to typed feature records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RiskError;

/// Field names that are always coerced to floating point on the form path.
pub const NUMERIC_FIELDS: [&str; 6] = [
    "Age",
    "SystolicBP",
    "DiastolicBP",
    "BS",
    "BodyTemp",
    "HeartRate",
];

/// A single measurement or attribute in a feature record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// A parsed numeric measurement.
    Numeric(f64),
    /// Any other value, kept as text.
    Categorical(String),
}

impl FeatureValue {
    /// Returns the numeric value, parsing categorical text if it looks like a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Categorical(s) => s.trim().parse().ok(),
        }
    }

    /// Returns the value as the text a categorical encoder would see.
    pub fn as_label(&self) -> String {
        match self {
            Self::Numeric(v) => format!("{:?}", v),
            Self::Categorical(s) => s.clone(),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{:?}", v),
            Self::Categorical(s) => f.write_str(s),
        }
    }
}

/// Named input measurements for one prediction request.
///
/// Built fresh per request and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.values.insert(name.into(), value);
    }

    /// Builder-style insert of a numeric value.
    pub fn with_numeric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, FeatureValue::Numeric(value));
        self
    }

    /// Builder-style insert of a categorical value.
    pub fn with_categorical(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, FeatureValue::Categorical(value.into()));
        self
    }

    /// Looks up a value by name.
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Adapts form-encoded pairs into a record.
    ///
    /// Keys in [`NUMERIC_FIELDS`] must parse as `f64`; the first one that does
    /// not aborts the whole request. Every other key is kept as text. A
    /// repeated key keeps its first value; later ones are ignored.
    pub fn from_form<I, K, V>(pairs: I) -> Result<Self, RiskError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            let key = key.into();
            if record.values.contains_key(&key) {
                continue;
            }
            let value = value.as_ref();
            if NUMERIC_FIELDS.contains(&key.as_str()) {
                let parsed = value
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| RiskError::InvalidNumber { field: key.clone() })?;
                record.insert(key, FeatureValue::Numeric(parsed));
            } else {
                record.insert(key, FeatureValue::Categorical(value.to_string()));
            }
        }
        Ok(record)
    }

    /// Forwards a JSON object into a record without re-validating types.
    ///
    /// Numbers become numeric values, strings stay text, and anything else is
    /// kept as its JSON text for the model to accept or reject.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let values = object
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::Number(n) => n
                        .as_f64()
                        .map(FeatureValue::Numeric)
                        .unwrap_or_else(|| FeatureValue::Categorical(n.to_string())),
                    serde_json::Value::String(s) => FeatureValue::Categorical(s.clone()),
                    other => FeatureValue::Categorical(other.to_string()),
                };
                (k.clone(), value)
            })
            .collect();
        Self { values }
    }
}
