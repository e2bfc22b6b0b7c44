//! Query-related data models.
//!
//! This module defines the query handed to the adapter, the raw output a client
//! returns, and the normalized result set handed back to the caller.

use crate::db::types::{ColumnType, map_column_type};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
    /// Arrays and objects, bound as json
    Json(JsonValue),
}

impl QueryParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
        }
    }
}

impl From<JsonValue> for QueryParam {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(v) => Self::Bool(v),
            JsonValue::Number(n) => match n.as_i64() {
                Some(v) => Self::Int(v),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Json(JsonValue::Number(n))),
            },
            JsonValue::String(v) => Self::String(v),
            other => Self::Json(other),
        }
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// SQL text plus positional arguments (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub sql: String,
    #[serde(default)]
    pub args: Vec<QueryParam>,
}

impl Query {
    /// Create a query without arguments.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Add a positional argument.
    pub fn with_arg(mut self, arg: impl Into<QueryParam>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl From<bool> for QueryParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for QueryParam {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for QueryParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for QueryParam {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Field metadata as reported by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescription {
    pub name: String,
    /// Backend-native type identifier (a Postgres OID).
    #[serde(rename = "dataTypeID")]
    pub data_type_id: u32,
}

impl FieldDescription {
    pub fn new(name: impl Into<String>, data_type_id: u32) -> Self {
        Self {
            name: name.into(),
            data_type_id,
        }
    }
}

/// Raw result of one round trip: field metadata, positional rows and the
/// reported affected-row count (absent for statements such as `BEGIN`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub fields: Vec<FieldDescription>,
    pub rows: Vec<Vec<JsonValue>>,
    pub row_count: Option<u64>,
}

/// Normalized, type-tagged result of `query_raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    pub column_names: Vec<String>,
    pub column_types: Vec<ColumnType>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl ResultSet {
    /// Shape a raw client result. Rows are passed through unchanged.
    pub fn from_output(output: QueryOutput) -> Self {
        let (column_names, column_types) = output
            .fields
            .into_iter()
            .map(|field| (field.name, map_column_type(field.data_type_id)))
            .unzip();

        Self {
            column_names,
            column_types,
            rows: output.rows,
        }
    }

    /// Number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check that names, types and every row have the same width.
    pub fn is_rectangular(&self) -> bool {
        let width = self.column_names.len();
        self.column_types.len() == width && self.rows.iter().all(|row| row.len() == width)
    }
}
