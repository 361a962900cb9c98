use serde::Deserialize;
use thiserror::Error;

/// Errors from the REST/RPC endpoint
#[derive(Debug, Error)]
pub enum RestError {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Error body returned by the API (PostgREST or Postgres error fields)
    #[error("HTTP {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    // `details` is sometimes an object; keep it as raw JSON text
    details: Option<serde_json::Value>,
    hint: Option<String>,
}

impl RestError {
    /// Build from a non-success status and its body
    pub fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => RestError::Api {
                status,
                code: parsed.code,
                message: parsed
                    .message
                    .unwrap_or_else(|| format!("request rejected with status {}", status)),
                details: parsed.details.and_then(|d| match d {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                }),
                hint: parsed.hint,
            },
            Err(_) => RestError::Api {
                status,
                code: None,
                message: if body.trim().is_empty() {
                    format!("request rejected with status {}", status)
                } else {
                    body.trim().to_string()
                },
                details: None,
                hint: None,
            },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Api { status, .. } => Some(*status),
            RestError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            RestError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            RestError::Api { details, .. } => details.as_deref(),
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            RestError::Api { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    /// Column referenced by the request does not exist
    pub fn is_undefined_column(&self) -> bool {
        matches!(self.code(), Some("42703") | Some("PGRST204"))
    }

    /// Table/view referenced by the request does not exist
    pub fn is_undefined_table(&self) -> bool {
        matches!(self.code(), Some("42P01") | Some("PGRST205"))
    }

    /// Short name of the variant, printed as the error "type"
    pub fn kind(&self) -> &'static str {
        match self {
            RestError::Config(_) => "config",
            RestError::Http(_) => "transport",
            RestError::Api { .. } => "api",
            RestError::Decode(_) => "decode",
        }
    }
}

/// One-line explanation for error codes the app runs into
pub fn explain_pg_code(code: &str) -> Option<&'static str> {
    let text = match code {
        "23505" => "unique constraint violated: a row with this key already exists (HTTP 409)",
        "23502" => "NOT NULL constraint violated: a required column was omitted",
        "23503" => "foreign key violated: referenced row does not exist",
        "23514" => "check constraint violated",
        "42501" => "permission denied: row-level security policy rejected the operation",
        "42703" => "column does not exist",
        "42P01" => "table does not exist",
        "42883" => "function does not exist or argument types do not match",
        "PGRST116" => "expected a single row but got zero or many",
        "PGRST202" => "remote procedure not found in the schema cache",
        "PGRST204" => "column not found in the schema cache",
        "PGRST205" => "table not found in the schema cache",
        "PGRST301" => "JWT rejected: check the API key",
        _ => return None,
    };
    Some(text)
}
