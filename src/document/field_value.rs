//! Field types and typed field values.
//!
//! A [`FieldValue`] is a tagged variant over the six field types the engine
//! understands. On the wire every value is a `{"type": ..., "value": ...}`
//! object; for compatibility with older writers the decoder also accepts the
//! wrapped form `{"value": {"Value": ...}}` (and `{"Value": [...], "Dim": N}`
//! for vectors).
//!
//! # Examples
//!
//! ```
//! use minnow::document::{FieldType, FieldValue};
//!
//! let value = FieldValue::Text("Rust".to_string());
//! assert_eq!(value.field_type(), FieldType::Text);
//! assert_eq!(value.as_text(), Some("Rust"));
//!
//! let json = serde_json::to_string(&value).unwrap();
//! assert_eq!(json, r#"{"type":"text","value":"Rust"}"#);
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Full-text searchable
    Text,
    /// Exact match, not analyzed
    Keyword,
    /// Integer or float
    Numeric,
    /// Dense vector for similarity search
    Vector,
    /// Boolean value
    Boolean,
    /// Date/time
    Date,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Numeric => "numeric",
            FieldType::Vector => "vector",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        };
        write!(f, "{name}")
    }
}

/// A typed value for a document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "FieldValueRepr", try_from = "FieldValueRepr")]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// Keyword value
    Keyword(String),
    /// Numeric value
    Numeric(f64),
    /// Dense vector value
    Vector {
        /// Dimension of the vector
        dim: usize,
        /// Vector components
        data: Vec<f32>,
    },
    /// Boolean value
    Boolean(bool),
    /// Date value
    Date(DateTime<Utc>),
}

impl FieldValue {
    /// Create a vector value; the dimension is taken from the data length.
    pub fn vector(data: Vec<f32>) -> Self {
        FieldValue::Vector {
            dim: data.len(),
            data,
        }
    }

    /// Get the field type of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Keyword(_) => FieldType::Keyword,
            FieldValue::Numeric(_) => FieldType::Numeric,
            FieldValue::Vector { .. } => FieldType::Vector,
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Date(_) => FieldType::Date,
        }
    }

    /// Convert to text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a keyword if this is a keyword value.
    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            FieldValue::Keyword(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a float if this is a numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert to a boolean if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the vector components if this is a vector value.
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            FieldValue::Vector { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Get the date if this is a date value.
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Wire representation of a field value: `{"type": ..., "value": ...}` with
/// an extra `dim` for vectors.
#[derive(Serialize, Deserialize)]
struct FieldValueRepr {
    #[serde(rename = "type")]
    field_type: FieldType,
    value: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dim: Option<usize>,
}

impl From<FieldValue> for FieldValueRepr {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => FieldValueRepr {
                field_type: FieldType::Text,
                value: JsonValue::String(s),
                dim: None,
            },
            FieldValue::Keyword(s) => FieldValueRepr {
                field_type: FieldType::Keyword,
                value: JsonValue::String(s),
                dim: None,
            },
            FieldValue::Numeric(n) => FieldValueRepr {
                field_type: FieldType::Numeric,
                value: serde_json::json!(n),
                dim: None,
            },
            FieldValue::Vector { dim, data } => FieldValueRepr {
                field_type: FieldType::Vector,
                value: serde_json::json!(data),
                dim: Some(dim),
            },
            FieldValue::Boolean(b) => FieldValueRepr {
                field_type: FieldType::Boolean,
                value: JsonValue::Bool(b),
                dim: None,
            },
            FieldValue::Date(d) => FieldValueRepr {
                field_type: FieldType::Date,
                value: JsonValue::String(d.to_rfc3339()),
                dim: None,
            },
        }
    }
}

impl TryFrom<FieldValueRepr> for FieldValue {
    type Error = String;

    fn try_from(repr: FieldValueRepr) -> Result<Self, Self::Error> {
        let FieldValueRepr {
            field_type,
            value,
            dim,
        } = repr;

        // Older writers wrap the scalar in an object with a "Value" key.
        let (scalar, wrapped_dim) = unwrap_value(value);
        let dim = dim.or(wrapped_dim);

        match field_type {
            FieldType::Text => match scalar {
                JsonValue::String(s) => Ok(FieldValue::Text(s)),
                other => Err(format!("invalid text value: {other}")),
            },
            FieldType::Keyword => match scalar {
                JsonValue::String(s) => Ok(FieldValue::Keyword(s)),
                other => Err(format!("invalid keyword value: {other}")),
            },
            FieldType::Numeric => scalar
                .as_f64()
                .map(FieldValue::Numeric)
                .ok_or_else(|| format!("invalid numeric value: {scalar}")),
            FieldType::Vector => match scalar {
                JsonValue::Array(elements) => {
                    let mut data = Vec::with_capacity(elements.len());
                    for element in &elements {
                        let n = element
                            .as_f64()
                            .ok_or_else(|| format!("invalid vector component: {element}"))?;
                        data.push(n as f32);
                    }
                    Ok(FieldValue::Vector {
                        dim: dim.unwrap_or(data.len()),
                        data,
                    })
                }
                other => Err(format!("invalid vector value: {other}")),
            },
            FieldType::Boolean => match scalar {
                JsonValue::Bool(b) => Ok(FieldValue::Boolean(b)),
                other => Err(format!("invalid boolean value: {other}")),
            },
            FieldType::Date => match scalar {
                JsonValue::String(s) => DateTime::parse_from_rfc3339(&s)
                    .map(|d| FieldValue::Date(d.with_timezone(&Utc)))
                    .map_err(|e| format!("invalid date value {s:?}: {e}")),
                other => Err(format!("invalid date value: {other}")),
            },
        }
    }
}

/// Peel the legacy `{"Value": ..., "Dim": N}` wrapper off a value, if
/// present, returning the inner scalar and any wrapped dimension.
fn unwrap_value(value: JsonValue) -> (JsonValue, Option<usize>) {
    if let JsonValue::Object(mut map) = value {
        if let Some(inner) = map.remove("Value") {
            let dim = map
                .get("Dim")
                .and_then(|d| d.as_u64())
                .map(|d| d as usize);
            return (inner, dim);
        }
        (JsonValue::Object(map), None)
    } else {
        (value, None)
    }
}
