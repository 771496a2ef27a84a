//! PostgREST data API: select, update by id, row count.

use super::{BackendError, HTTP_CLIENT};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// `order=` clause for a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

impl Order {
    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            ascending: false,
        }
    }

    fn to_query(self) -> String {
        format!(
            "{}.{}",
            self.column,
            if self.ascending { "asc" } else { "desc" }
        )
    }
}

/// Newest first, the order every list in the dashboard uses.
pub const NEWEST_FIRST: Order = Order::desc("created_at");

#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl RestClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self::with_client(HTTP_CLIENT.clone(), base_url, anon_key)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// `bearer` is the operator's access token, or the anon key for
    /// unauthenticated diagnostics.
    fn request(&self, method: Method, url: &str, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    /// All rows of `table`, every column.
    pub async fn select_all(
        &self,
        table: &str,
        order: Order,
        bearer: &str,
    ) -> Result<Vec<Value>, BackendError> {
        let url = format!(
            "{}?select=*&order={}",
            self.endpoint(table),
            urlencoding::encode(&order.to_query())
        );

        let response = self
            .request(Method::GET, &url, bearer)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: Value = response.json().await?;
        match body {
            Value::Array(rows) => Ok(rows),
            other => Err(BackendError::Decode(format!(
                "expected an array of rows from {}, got {}",
                table,
                json_kind(&other)
            ))),
        }
    }

    /// `PATCH` the row whose `id` equals `id` with `body`.
    pub async fn update_by_id(
        &self,
        table: &str,
        id: &str,
        body: &Value,
        bearer: &str,
    ) -> Result<(), BackendError> {
        let url = format!("{}?id=eq.{}", self.endpoint(table), urlencoding::encode(id));

        let response = self
            .request(Method::PATCH, &url, bearer)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Exact row count of `table` without transferring rows.
    ///
    /// `None` when the server does not report a total.
    pub async fn count(&self, table: &str, bearer: &str) -> Result<Option<u64>, BackendError> {
        let url = format!("{}?select=*", self.endpoint(table));

        let response = self
            .request(Method::HEAD, &url, bearer)
            .header("Prefer", "count=exact")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response
            .headers()
            .get("content-range")
            .and_then(|h| h.to_str().ok())
            .and_then(parse_content_range_total))
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

/// Error body shapes of PostgREST (`message`) and GoTrue (`msg`,
/// `error_description`, `error`).
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    code: Option<Value>,
    error_code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        let base = self
            .message
            .as_ref()
            .or(self.msg.as_ref())
            .or(self.error_description.as_ref())
            .or(self.error.as_ref())?
            .clone();
        Some(match (&self.details, &self.hint) {
            (Some(details), _) if !details.is_empty() => format!("{} ({})", base, details),
            (_, Some(hint)) if !hint.is_empty() => format!("{} ({})", base, hint),
            _ => base,
        })
    }

    fn code(&self) -> Option<String> {
        self.error_code.clone().or_else(|| match &self.code {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}

/// Turn a non-success response into `BackendError::Api`, keeping the
/// server's own message when the body carries one.
pub(crate) async fn api_error(response: Response) -> BackendError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    api_error_from_parts(status.as_u16(), status.canonical_reason(), &text)
}

fn api_error_from_parts(status: u16, reason: Option<&str>, text: &str) -> BackendError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let message = body.message().unwrap_or_else(|| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            reason.unwrap_or("request failed").to_string()
        } else {
            trimmed.chars().take(200).collect()
        }
    });
    tracing::debug!("Backend API error {}: {}", status, message);
    BackendError::Api {
        status,
        message,
        code: body.code(),
    }
}

/// Run `fut` unless `token` fires first; the request future is dropped
/// (and the connection released) on cancellation.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(BackendError::Cancelled),
        result = fut => result,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
