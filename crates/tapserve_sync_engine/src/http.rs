//! HTTP implementation of [`ExpenseApi`].
//!
//! The HTTP client itself sits behind [`HttpClient`] so the JSON mapping
//! can be tested without a network. [`ReqwestClient`] is the production
//! client.

use crate::error::{SyncError, SyncResult};
use crate::transport::ExpenseApi;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tapserve_sync_protocol::{ApiResponse, Expense, ExpenseFilters, ExpensePage, ExpensePatch};

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

/// HTTP client abstraction.
///
/// Implementations return `Err` only when no response arrived; any status
/// code, including 4xx and 5xx, is an `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request with an optional JSON body.
    async fn send(&self, method: Method, url: &str, body: Option<Vec<u8>>)
        -> SyncResult<HttpResponse>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Builds a client with a per-request timeout.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::transport_fatal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::Timeout
    } else {
        SyncError::transport_retryable(err.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> SyncResult<HttpResponse> {
        let mut request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// JSON-over-HTTP expenses API.
pub struct HttpExpenseApi<C: HttpClient> {
    base_url: String,
    client: C,
}

impl HttpExpenseApi<ReqwestClient> {
    /// Creates an API client for `base_url` using `reqwest`.
    pub fn with_reqwest(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        Ok(Self::new(base_url, ReqwestClient::new(timeout)?))
    }
}

impl<C: HttpClient> HttpExpenseApi<C> {
    /// Creates an API client for `base_url`, e.g. `http://localhost:3001/api/v1`.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request<B, T>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> SyncResult<ApiResponse<T>>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| SyncError::Protocol(format!("failed to encode request: {e}")))?;

        tracing::debug!(?method, %url, "sending request");
        let response = self.client.send(method, url, body).await.map_err(|e| {
            tracing::debug!(
                ?method,
                %url,
                error = %e,
                retryable = e.is_retryable(),
                "request failed"
            );
            e
        })?;

        let success_status = (200..300).contains(&response.status);
        match serde_json::from_slice::<ApiResponse<T>>(&response.body) {
            Ok(envelope) if success_status || !envelope.success => Ok(envelope),
            Ok(_) => Ok(ApiResponse::failure(format!("HTTP {}", response.status))),
            Err(_) if response.status >= 500 => Err(SyncError::transport_retryable(format!(
                "HTTP {}",
                response.status
            ))),
            Err(_) if !success_status => {
                Ok(ApiResponse::failure(format!("HTTP {}", response.status)))
            }
            Err(e) => Err(SyncError::Protocol(format!("failed to decode response: {e}"))),
        }
    }
}

#[async_trait]
impl<C: HttpClient> ExpenseApi for HttpExpenseApi<C> {
    async fn get_expenses(&self, filters: &ExpenseFilters) -> SyncResult<ApiResponse<ExpensePage>> {
        let url = reqwest::Url::parse_with_params(&self.url("/expenses"), filters.query_pairs())
            .map_err(|e| SyncError::Protocol(format!("invalid URL: {e}")))?;
        self.request::<(), _>(Method::Get, url.as_str(), None).await
    }

    async fn create_expense(&self, expense: &Expense) -> SyncResult<ApiResponse<ExpensePatch>> {
        self.request(Method::Post, &self.url("/expenses"), Some(expense))
            .await
    }

    async fn update_expense(
        &self,
        id: &str,
        expense: &Expense,
    ) -> SyncResult<ApiResponse<ExpensePatch>> {
        self.request(Method::Put, &self.url(&format!("/expenses/{id}")), Some(expense))
            .await
    }

    async fn delete_expense(&self, id: &str) -> SyncResult<ApiResponse<()>> {
        self.request::<(), _>(Method::Delete, &self.url(&format!("/expenses/{id}")), None)
            .await
    }
}
