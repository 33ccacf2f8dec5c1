//! HTTP access to the text-storage service.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DriverError;
use crate::selection::Operation;

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    data: &'a str,
}

/// Body of `POST /texts`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreatedBody {
    pub id: Option<String>,
}

/// Body of `GET /texts/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextBody {
    pub data: Option<String>,
}

/// Body of `GET /texts/{id}/search`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchBody {
    pub found: Option<bool>,
}

/// Raw status and body of a response, plus the body parsed as `T` when it
/// is valid JSON of that shape.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub body: String,
    pub parsed: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(status: u16, body: impl Into<String>, parsed: Option<T>) -> Self {
        Self {
            status,
            body: body.into(),
            parsed,
        }
    }
}

/// The four endpoints of the text-storage API.
///
/// Implementations report transport failures only; status and payload
/// checks belong to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextStore: Send + Sync {
    async fn create(&self, text: &str) -> Result<ApiResponse<CreatedBody>, DriverError>;
    async fn read(&self, id: &str) -> Result<ApiResponse<TextBody>, DriverError>;
    async fn search(&self, id: &str, term: &str) -> Result<ApiResponse<SearchBody>, DriverError>;
    async fn delete(&self, id: &str) -> Result<ApiResponse<()>, DriverError>;
}

/// [`TextStore`] over HTTP. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct HttpTextStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTextStore {
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("textstore-loadgen/", env!("CARGO_PKG_VERSION"))),
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn text_url(&self, id: &str) -> String {
        format!("{}/texts/{}", self.base_url, id)
    }

    async fn exchange<T: DeserializeOwned>(
        &self,
        op: Operation,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, DriverError> {
        let transport = |source| DriverError::Transport { op, source };
        let resp = request.send().await.map_err(transport)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(transport)?;
        let parsed = serde_json::from_str(&body).ok();
        Ok(ApiResponse {
            status,
            body,
            parsed,
        })
    }
}

#[async_trait]
impl TextStore for HttpTextStore {
    async fn create(&self, text: &str) -> Result<ApiResponse<CreatedBody>, DriverError> {
        let url = format!("{}/texts", self.base_url);
        let request = self.client.post(url).json(&TextRequest { data: text });
        self.exchange(Operation::Create, request).await
    }

    async fn read(&self, id: &str) -> Result<ApiResponse<TextBody>, DriverError> {
        let request = self.client.get(self.text_url(id));
        self.exchange(Operation::Read, request).await
    }

    async fn search(&self, id: &str, term: &str) -> Result<ApiResponse<SearchBody>, DriverError> {
        let url = format!("{}/search", self.text_url(id));
        let request = self.client.get(url).query(&[("term", term)]);
        self.exchange(Operation::Search, request).await
    }

    async fn delete(&self, id: &str) -> Result<ApiResponse<()>, DriverError> {
        let request = self.client.delete(self.text_url(id));
        self.exchange(Operation::Delete, request).await
    }
}
