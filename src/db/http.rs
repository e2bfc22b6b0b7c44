//! SQL-over-HTTP client for the stateless strategy.
//!
//! Speaks the Neon serverless protocol: every query is a single `POST` to
//! `https://<host>/sql` carrying the connection string in a header. Values
//! come back in Postgres text format and are converted to JSON by column type
//! so both strategies hand out the same shapes.

use crate::db::client::{HttpQueryOptions, QueryFunction};
use crate::db::types::{ColumnType, map_column_type};
use crate::error::{DbError, DbResult};
use crate::models::{FieldDescription, QueryOutput, QueryParam};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

const CONNECTION_STRING_HEADER: &str = "Neon-Connection-String";
const RAW_TEXT_OUTPUT_HEADER: &str = "Neon-Raw-Text-Output";
const ARRAY_MODE_HEADER: &str = "Neon-Array-Mode";

#[derive(Debug, Clone)]
pub struct NeonHttpClient {
    http: reqwest::Client,
    endpoint: Url,
    connection_string: String,
}

impl NeonHttpClient {
    /// Client for the endpoint served on the connection string's host.
    pub fn new(connection_string: &str) -> DbResult<Self> {
        let url = Url::parse(connection_string)
            .map_err(|e| DbError::invalid_input(format!("Invalid connection string: {}", e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| DbError::invalid_input("Connection string has no host"))?;

        Self::with_endpoint(connection_string, &format!("https://{}/sql", host))
    }

    /// Client for an explicit endpoint URL, e.g. a local proxy.
    pub fn with_endpoint(connection_string: &str, endpoint: &str) -> DbResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| DbError::invalid_input(format!("Invalid HTTP endpoint: {}", e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            connection_string: connection_string.to_string(),
        })
    }

    /// Replace the underlying HTTP client (timeouts, proxies and so on).
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct SqlRequest<'a> {
    query: &'a str,
    params: Vec<Option<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SqlResponse {
    #[serde(default)]
    fields: Vec<FieldDescription>,
    #[serde(default)]
    rows: Vec<JsonValue>,
    #[serde(default)]
    row_count: Option<u64>,
}

#[derive(Deserialize)]
struct SqlErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

#[async_trait]
impl QueryFunction for NeonHttpClient {
    async fn call(
        &self,
        sql: &str,
        args: &[QueryParam],
        options: HttpQueryOptions,
    ) -> DbResult<QueryOutput> {
        if options != HttpQueryOptions::ARRAY_MODE_FULL_RESULTS {
            return Err(DbError::invalid_input(
                "HTTP queries require array mode with full results",
            ));
        }

        let body = SqlRequest {
            query: sql,
            params: args.iter().map(encode_param).collect(),
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONNECTION_STRING_HEADER, &self.connection_string)
            .header(RAW_TEXT_OUTPUT_HEADER, "true")
            .header(ARRAY_MODE_HEADER, "true")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(match serde_json::from_str::<SqlErrorBody>(&text) {
                Ok(err) => DbError::database(err.message, err.code),
                Err(_) => DbError::database(format!("HTTP {}: {}", status, text), None),
            });
        }

        let payload: SqlResponse = response.json().await?;
        let types: Vec<ColumnType> = payload
            .fields
            .iter()
            .map(|field| map_column_type(field.data_type_id))
            .collect();
        let rows: Vec<Vec<JsonValue>> = payload
            .rows
            .into_iter()
            .map(|row| decode_row(row, &payload.fields, &types))
            .collect::<DbResult<_>>()?;

        debug!(
            endpoint = %self.endpoint,
            rows = rows.len(),
            row_count = ?payload.row_count,
            "HTTP query completed"
        );

        Ok(QueryOutput {
            fields: payload.fields,
            rows,
            row_count: payload.row_count,
        })
    }
}

/// Parameters travel as Postgres text literals.
fn encode_param(param: &QueryParam) -> Option<String> {
    match param {
        QueryParam::Null => None,
        QueryParam::Bool(v) => Some(v.to_string()),
        QueryParam::Int(v) => Some(v.to_string()),
        QueryParam::Float(v) => Some(v.to_string()),
        QueryParam::String(v) => Some(v.clone()),
        QueryParam::Bytes(v) => Some(format!("\\x{}", encode_hex(v))),
        QueryParam::Json(v) => Some(v.to_string()),
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

/// Rows arrive positionally in array mode and must have one value per field.
/// Keyed rows are accepted too and laid out in field order.
fn decode_row(
    row: JsonValue,
    fields: &[FieldDescription],
    types: &[ColumnType],
) -> DbResult<Vec<JsonValue>> {
    let values = match row {
        JsonValue::Array(values) if values.len() == fields.len() => values,
        JsonValue::Array(values) => {
            return Err(DbError::database(
                format!(
                    "Malformed HTTP response: row has {} values for {} fields",
                    values.len(),
                    fields.len()
                ),
                None,
            ));
        }
        JsonValue::Object(mut map) => fields
            .iter()
            .map(|field| map.remove(&field.name).unwrap_or(JsonValue::Null))
            .collect(),
        other => {
            return Err(DbError::database(
                format!("Malformed HTTP response: row is not an array: {}", other),
                None,
            ));
        }
    };

    Ok(values
        .into_iter()
        .zip(types)
        .map(|(value, column_type)| decode_text_value(value, *column_type))
        .collect())
}

/// Convert one text-format value. Anything that does not parse stays a string.
fn decode_text_value(value: JsonValue, column_type: ColumnType) -> JsonValue {
    let JsonValue::String(text) = value else {
        return value;
    };

    match column_type {
        ColumnType::Int32 | ColumnType::Int64 => match text.parse::<i64>() {
            Ok(v) => JsonValue::Number(v.into()),
            Err(_) => JsonValue::String(text),
        },
        ColumnType::Float | ColumnType::Double => match text.parse::<f64>() {
            Ok(v) => serde_json::Number::from_f64(v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::String(text)),
            Err(_) => JsonValue::String(text),
        },
        ColumnType::Boolean => match text.as_str() {
            "t" | "true" => JsonValue::Bool(true),
            "f" | "false" => JsonValue::Bool(false),
            _ => JsonValue::String(text),
        },
        ColumnType::Json => serde_json::from_str(&text).unwrap_or(JsonValue::String(text)),
        ColumnType::Bytes => match text.strip_prefix("\\x").and_then(decode_hex) {
            Some(bytes) => JsonValue::String(STANDARD.encode(bytes)),
            None => JsonValue::String(text),
        },
        _ => JsonValue::String(text),
    }
}
