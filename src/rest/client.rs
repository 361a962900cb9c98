use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

use super::{ApiResponse, Query, RestError, TableApi};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP client for the project's REST/RPC endpoint
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, RestError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RestError::Config(format!(
                "API URL must be http(s): {}",
                base_url
            )));
        }

        let key = HeaderValue::from_str(api_key)
            .map_err(|_| RestError::Config("API key contains invalid characters".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| RestError::Config("API key contains invalid characters".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(RestClient { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        tracing::debug!(%method, %url, "rest request");
        self.http.request(method, url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<ApiResponse, RestError> {
        let response = request.send().await?;
        read_response(response).await
    }
}

async fn read_response(response: Response) -> Result<ApiResponse, RestError> {
    let status = response.status();
    let count = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range);
    let body = response.text().await?;

    if !status.is_success() {
        tracing::debug!(status = status.as_u16(), %body, "rest error");
        return Err(RestError::from_body(status.as_u16(), &body));
    }

    let data = parse_rows(&body)?;
    Ok(ApiResponse { data, count })
}

/// `0-24/573` → 573, `*/0` → 0, `0-9/*` → None
pub fn parse_content_range(value: &str) -> Option<i64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Arrays pass through, scalars/objects (RPC returns) become one row, empty body → no rows
pub fn parse_rows(body: &str) -> Result<Vec<Value>, RestError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value =
        serde_json::from_str(body).map_err(|e| RestError::Decode(e.to_string()))?;
    Ok(match value {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

#[async_trait]
impl TableApi for RestClient {
    async fn select(&self, query: &Query) -> Result<ApiResponse, RestError> {
        let mut request = self.request(Method::GET, &query.to_path());
        if query.wants_count() {
            request = request.header("Prefer", "count=exact");
        }
        self.send(request).await
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<ApiResponse, RestError> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(row);
        self.send(request).await
    }

    async fn delete(&self, query: &Query) -> Result<ApiResponse, RestError> {
        if query.filters().is_empty() {
            // An unfiltered DELETE would wipe the table
            return Err(RestError::Config(format!(
                "refusing to delete from {} without filters",
                query.table()
            )));
        }
        let request = self
            .request(Method::DELETE, &query.to_filter_path())
            .header("Prefer", "return=representation");
        self.send(request).await
    }

    async fn rpc(&self, function: &str, args: &Value) -> Result<ApiResponse, RestError> {
        let request = self
            .request(Method::POST, &format!("rpc/{}", function))
            .json(args);
        self.send(request).await
    }

    async fn ping(&self) -> Result<u16, RestError> {
        let response = self.request(Method::GET, "").send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(RestError::from_body(status.as_u16(), &body))
        }
    }
}
