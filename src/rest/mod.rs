// 🌐 REST/RPC access - table select/insert/delete and named procedure calls
// against the hosted project's PostgREST endpoint.

pub mod client;
pub mod error;
pub mod query;

pub use client::RestClient;
pub use error::{explain_pg_code, RestError};
pub use query::{Filter, FilterOp, Query};

use async_trait::async_trait;
use serde_json::Value;

/// Rows plus the exact count when it was requested
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub data: Vec<Value>,
    pub count: Option<i64>,
}

impl ApiResponse {
    pub fn first(&self) -> Option<&Value> {
        self.data.first()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Column names of the first row, in response order
    pub fn columns(&self) -> Vec<String> {
        self.first().map(row_columns).unwrap_or_default()
    }
}

/// Keys of a JSON object row
pub fn row_columns(row: &Value) -> Vec<String> {
    row.as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

/// Field as display text; strings unquoted, null/missing → None
pub fn field_text(row: &Value, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Field as display text, `N/A` when null or missing
pub fn field_or_na(row: &Value, field: &str) -> String {
    field_text(row, field).unwrap_or_else(|| "N/A".to_string())
}

/// Operations the diagnostics need from the REST endpoint
#[async_trait]
pub trait TableApi: Send + Sync {
    async fn select(&self, query: &Query) -> Result<ApiResponse, RestError>;

    /// Insert one row and return its representation
    async fn insert(&self, table: &str, row: &Value) -> Result<ApiResponse, RestError>;

    /// Delete the rows matched by the query's filters
    async fn delete(&self, query: &Query) -> Result<ApiResponse, RestError>;

    async fn rpc(&self, function: &str, args: &Value) -> Result<ApiResponse, RestError>;

    /// Reachability of the REST root; returns the HTTP status
    async fn ping(&self) -> Result<u16, RestError>;
}
